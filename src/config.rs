//! Source table configuration.
//!
//! By default the three NUC listing pages are scraped. A YAML file can replace
//! that table:
//!
//! ```yaml
//! - url: https://www.nuc.edu.ng/nigerian-univerisities/federal-univeristies/
//!   university_type: Federal
//! - url: https://www.nuc.edu.ng/nigerian-univerisities/private-univeristies/
//!   university_type: Private
//! ```

use crate::models::UniversityType;
use crate::scrapers::Source;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

/// The listing pages scraped when no sources file is given.
pub const DEFAULT_SOURCES: [(&str, UniversityType); 3] = [
    (
        "https://www.nuc.edu.ng/nigerian-univerisities/federal-univeristies/",
        UniversityType::Federal,
    ),
    (
        "https://www.nuc.edu.ng/nigerian-univerisities/state-univerisity/",
        UniversityType::State,
    ),
    (
        "https://www.nuc.edu.ng/nigerian-univerisities/private-univeristies/",
        UniversityType::Private,
    ),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read sources file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid sources file {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("invalid source url {url:?}: {source}")]
    InvalidUrl { url: String, source: url::ParseError },

    #[error("source url {0:?} must use http or https")]
    UnsupportedScheme(String),

    #[error("sources file {0} lists no sources")]
    Empty(String),
}

pub fn default_sources() -> Vec<Source> {
    DEFAULT_SOURCES
        .iter()
        .map(|(url, kind)| Source::new(*url, *kind))
        .collect()
}

/// Resolve the source table: the YAML file at `path` when given, the
/// built-in table otherwise.
#[instrument(level = "info")]
pub async fn load_sources(path: Option<&Path>) -> Result<Vec<Source>, ConfigError> {
    let Some(path) = path else {
        return Ok(default_sources());
    };

    let origin = path.display().to_string();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: origin.clone(),
            source,
        })?;
    let sources = parse_sources(&text, &origin)?;
    info!(count = sources.len(), path = %origin, "Loaded sources file");
    Ok(sources)
}

/// Parse and validate a YAML source table. `origin` names the input in errors.
pub fn parse_sources(text: &str, origin: &str) -> Result<Vec<Source>, ConfigError> {
    let sources: Vec<Source> = serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
        path: origin.to_string(),
        source,
    })?;
    if sources.is_empty() {
        return Err(ConfigError::Empty(origin.to_string()));
    }
    for source in &sources {
        validate_url(&source.url)?;
    }
    Ok(sources)
}

fn validate_url(raw: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(ConfigError::UnsupportedScheme(raw.to_string())),
    }
}
