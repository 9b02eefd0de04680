//! Read-only queries over the current university snapshot.
//!
//! Every [`QueryService`] call takes one snapshot at its start and answers
//! entirely from it, so a concurrent cycle replacing the collection cannot
//! make a single answer mix old and new records.

use crate::collection::Collection;
use crate::models::{University, UniversityType};
use std::sync::Arc;

/// Optional, conjunctive filters for [`QueryService::list`].
///
/// Empty strings count as absent.
#[derive(Debug, Clone, Default)]
pub struct UniversityFilter {
    /// Exact state, case-insensitive.
    pub state: Option<String>,
    /// Exact city, case-insensitive.
    pub city: Option<String>,
    /// Exact university type, case-insensitive.
    pub university_type: Option<String>,
    /// Case-insensitive substring of the name or abbreviation.
    pub search: Option<String>,
}

impl UniversityFilter {
    /// Build a filter from decoded query-string pairs (`state`, `city`,
    /// `type`, `search`). The first occurrence of a key wins; unknown keys
    /// are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "state" => &mut filter.state,
                "city" => &mut filter.city,
                "type" => &mut filter.university_type,
                "search" => &mut filter.search,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        filter
    }

    fn matches(&self, university: &University) -> bool {
        let state = present(&self.state);
        let city = present(&self.city);
        let kind = present(&self.university_type);
        let search = present(&self.search).map(str::to_lowercase);

        state.is_none_or(|s| eq_ignore_case(&university.state, s))
            && city.is_none_or(|c| eq_ignore_case(&university.city, c))
            && kind.is_none_or(|t| eq_ignore_case(university.university_type.as_str(), t))
            && search.is_none_or(|term| {
                university.name.to_lowercase().contains(&term)
                    || university.abbreviation.to_lowercase().contains(&term)
            })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Query operations over the latest published snapshot.
#[derive(Debug, Clone)]
pub struct QueryService {
    collection: Arc<Collection>,
}

impl QueryService {
    pub fn new(collection: Arc<Collection>) -> Self {
        Self { collection }
    }

    fn select(&self, predicate: impl Fn(&University) -> bool) -> Vec<University> {
        let snapshot = self.collection.snapshot();
        snapshot
            .universities
            .iter()
            .filter(|u| predicate(*u))
            .cloned()
            .collect()
    }

    /// All universities matching every filter that is set.
    pub fn list(&self, filter: &UniversityFilter) -> Vec<University> {
        self.select(|u| filter.matches(u))
    }

    pub fn by_city(&self, city: &str) -> Vec<University> {
        self.select(|u| eq_ignore_case(&u.city, city))
    }

    pub fn by_state(&self, state: &str) -> Vec<University> {
        self.select(|u| eq_ignore_case(&u.state, state))
    }

    pub fn private_only(&self) -> Vec<University> {
        self.select(|u| u.university_type == UniversityType::Private)
    }

    pub fn private_by_state(&self, state: &str) -> Vec<University> {
        self.select(|u| u.university_type == UniversityType::Private && eq_ignore_case(&u.state, state))
    }

    /// First university whose name or abbreviation equals `identifier`,
    /// ignoring case. `None` means not found.
    pub fn by_identifier(&self, identifier: &str) -> Option<University> {
        let snapshot = self.collection.snapshot();
        snapshot
            .universities
            .iter()
            .find(|u| eq_ignore_case(&u.name, identifier) || eq_ignore_case(&u.abbreviation, identifier))
            .cloned()
    }
}
