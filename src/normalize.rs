//! Derivation of structured fields from the free-text university name.
//!
//! The listing pages put the name, the town and sometimes the state into one
//! cell, e.g. `"University of Lagos, Akoka, Lagos State"`. Everything here is
//! a pure function of that string.

use crate::models::Location;
use once_cell::sync::Lazy;
use regex::Regex;

/// Words skipped when building an abbreviation, compared case-insensitively.
const STOP_WORDS: [&str; 4] = ["of", "the", "and", "for"];

/// Longest abbreviation produced.
pub const MAX_ABBREVIATION_LEN: usize = 6;

static STATE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i) State$").expect("state suffix pattern is valid"));

/// Build an abbreviation from the initials of the significant words of `name`.
///
/// Parentheses, commas and periods are removed, stop-words dropped, and the
/// first letter of every remaining word is uppercased. The result is cut to
/// [`MAX_ABBREVIATION_LEN`] characters. Words that do not start with a letter
/// contribute nothing, so the output only ever holds letters.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(derive_abbreviation("University of Lagos, Akoka, Lagos State"), "ULALS");
/// assert_eq!(derive_abbreviation("of the and"), "");
/// ```
pub fn derive_abbreviation(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | ',' | '.'))
        .collect();

    cleaned
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(&word.to_lowercase().as_str()))
        .filter_map(|word| word.chars().next())
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_uppercase)
        .take(MAX_ABBREVIATION_LEN)
        .collect()
}

/// Split `name` on commas and derive the city and state from its segments.
///
/// - Three or more segments: city is the second, state the third.
/// - Exactly two segments: city and state are both the second segment.
/// - Otherwise both are empty.
///
/// A trailing `" State"` (any case) is removed from the state value, and from
/// the shared value in the two-segment case.
pub fn derive_location(name: &str) -> Location {
    let parts: Vec<&str> = name.split(',').map(str::trim).collect();

    match parts.as_slice() {
        [_, city, state, ..] => Location {
            city: city.to_string(),
            state: strip_state_suffix(state),
        },
        // Two segments give no way to tell the town from the state.
        [_, place] => {
            let place = strip_state_suffix(place);
            Location {
                city: place.clone(),
                state: place,
            }
        }
        _ => Location::default(),
    }
}

fn strip_state_suffix(segment: &str) -> String {
    STATE_SUFFIX.replace(segment, "").trim().to_string()
}
