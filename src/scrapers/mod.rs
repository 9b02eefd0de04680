//! Scraping of the NUC university listing pages.
//!
//! Every configured [`Source`] runs through the same pipeline:
//!
//! 1. **Fetching**: Download the listing page ([`fetch`])
//! 2. **Extracting**: Pull raw rows out of the page table ([`table`])
//! 3. **Normalizing**: Derive abbreviation, city and state ([`crate::normalize`])
//! 4. **Tagging**: Stamp each record with the source's [`UniversityType`]
//!
//! Only the fetch can fail the pipeline. A page without a table is logged and
//! contributes zero records; malformed rows are dropped silently.

pub mod fetch;
pub mod table;

use crate::models::{University, UniversityType};
use crate::normalize::{derive_abbreviation, derive_location};
use fetch::{Fetch, FetchError};
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// A listing page and the category every row on it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub university_type: UniversityType,
}

impl Source {
    pub fn new(url: impl Into<String>, university_type: UniversityType) -> Self {
        Self {
            url: url.into(),
            university_type,
        }
    }
}

/// Run the full pipeline for one source.
///
/// # Errors
///
/// Returns the [`FetchError`] if the page could not be retrieved. Parsing
/// problems never surface as errors.
#[instrument(level = "info", skip_all, fields(url = %source.url, university_type = %source.university_type))]
pub async fn scrape_source<F>(fetcher: &F, source: &Source) -> Result<Vec<University>, FetchError>
where
    F: Fetch,
{
    let body = fetcher.fetch(&source.url).await?;
    let universities = extract_universities(&body, source);
    info!(count = universities.len(), "Scraped source");
    Ok(universities)
}

/// Parse a listing page and turn each well-formed row into a [`University`].
///
/// Row order on the page is preserved.
pub fn extract_universities(body: &str, source: &Source) -> Vec<University> {
    let document = Html::parse_document(body);
    let rows = match table::rows(&document) {
        Ok(rows) => rows,
        Err(e) => {
            warn!(url = %source.url, error = %e, "Listing page has no table; treating as empty");
            return Vec::new();
        }
    };

    rows.map(|row| {
        let location = derive_location(&row.name);
        University {
            abbreviation: derive_abbreviation(&row.name),
            name: row.name,
            state: location.state,
            city: location.city,
            vice_chancellor: row.vice_chancellor,
            year_of_establishment: row.year_of_establishment,
            website: row.website,
            university_type: source.university_type,
        }
    })
    .collect()
}
