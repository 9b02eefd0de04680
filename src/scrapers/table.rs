//! Row extraction from the NUC listing tables.
//!
//! Every listing page is a plain HTML table with one university per row:
//!
//! | cell | content |
//! |------|---------|
//! | 0 | serial number (ignored) |
//! | 1 | name, often followed by town and state |
//! | 2 | vice-chancellor |
//! | 3 | website link |
//! | 4 | year of establishment |
//!
//! The markup is not consistent across pages, so rows with fewer than
//! [`MIN_CELLS`] cells or an empty name are skipped without complaint.

use crate::models::RawRow;
use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Rows with fewer cells than this are treated as layout noise.
pub const MIN_CELLS: usize = 5;

const ROWS_SELECTOR: &str = "tbody tr";

static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse(ROWS_SELECTOR).expect("static selector"));
static CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("static selector"));
static TABLES: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("static selector"));
static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("static selector"));

/// The document holds nothing that looks like a table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no table found (expected rows matching `{rows_selector}`)")]
    NoTable { rows_selector: &'static str },
}

/// Iterate the rows of every table body in `document`.
///
/// The iterator is lazy: cells are only read as rows are pulled. Rows that
/// fail the shape check are dropped silently.
///
/// # Errors
///
/// Returns [`ParseError::NoTable`] when the document contains no `<table>`.
pub fn rows(document: &Html) -> Result<impl Iterator<Item = RawRow> + '_, ParseError> {
    if document.select(&TABLES).next().is_none() {
        return Err(ParseError::NoTable {
            rows_selector: ROWS_SELECTOR,
        });
    }
    Ok(document.select(&ROWS).filter_map(extract_row))
}

/// Turn one `<tr>` into a [`RawRow`], or `None` if it is malformed.
fn extract_row(row: ElementRef<'_>) -> Option<RawRow> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELLS).collect();
    if cells.len() < MIN_CELLS {
        return None;
    }

    let name = cell_text(cells[1]);
    if name.is_empty() {
        return None;
    }

    let website = cells[3]
        .select(&ANCHORS)
        .next()
        .and_then(|a| a.value().attr("href"))
        .unwrap_or_default()
        .to_string();

    Some(RawRow {
        name,
        vice_chancellor: cell_text(cells[2]),
        website,
        year_of_establishment: cell_text(cells[4]),
    })
}

fn cell_text(cell: ElementRef<'_>) -> String {
    collapse_whitespace(&cell.text().collect::<String>())
}
