//! Data models for scraped university listings.
//!
//! This module defines the core data structures used throughout the application:
//! - [`RawRow`]: Text pulled from one table row, before any derivation
//! - [`University`]: The normalized record served by the API
//! - [`UniversityType`]: The category a source is configured with
//! - [`CycleReport`]: Outcome of one full scrape across all sources
//!
//! Field names are snake_case on the wire because that is the shape API
//! consumers already depend on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category assigned to every record of a source.
///
/// The value comes from source configuration, never from page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniversityType {
    Federal,
    State,
    Private,
}

impl UniversityType {
    /// Canonical label as it appears in JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            UniversityType::Federal => "Federal",
            UniversityType::State => "State",
            UniversityType::Private => "Private",
        }
    }
}

impl fmt::Display for UniversityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cell text extracted from a single table row.
///
/// All text fields are whitespace-collapsed and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub name: String,
    pub vice_chancellor: String,
    /// `href` of the first anchor in the website cell, or empty.
    pub website: String,
    pub year_of_establishment: String,
}

/// City and state derived from a university name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub city: String,
    pub state: String,
}

/// A normalized university record.
///
/// # Fields
///
/// * `name` - Raw name with whitespace collapsed
/// * `state`, `city` - Derived from the comma separated parts of `name`
/// * `abbreviation` - Up to six uppercase initials derived from `name`
/// * `university_type` - Category of the source this record was scraped from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct University {
    pub name: String,
    pub state: String,
    pub city: String,
    pub abbreviation: String,
    pub vice_chancellor: String,
    pub year_of_establishment: String,
    pub website: String,
    pub university_type: UniversityType,
}

/// A source that could not be scraped during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub url: String,
    pub university_type: UniversityType,
    pub message: String,
}

/// Summary of one completed scrape cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Monotonic id assigned when the cycle started.
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of records produced across all successful sources.
    pub records: usize,
    pub sources_succeeded: usize,
    pub failures: Vec<SourceFailure>,
    /// False when a newer cycle had already been published and this result was discarded.
    pub applied: bool,
}
