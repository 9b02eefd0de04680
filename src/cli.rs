//! Command-line interface definitions for the universities API.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! All arguments can be provided via command-line flags or environment variables.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the universities API server.
///
/// # Examples
///
/// ```sh
/// # Serve on the default port, scraping the built-in NUC pages once
/// nuc_universities
///
/// # Custom port and a daily refresh
/// nuc_universities --port 8080 --refresh-interval-secs 86400
///
/// # Scrape a different set of pages
/// nuc_universities --sources ./sources.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address to bind
    #[arg(short, long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: String,

    /// Optional YAML file replacing the built-in source table
    #[arg(short, long, env = "SOURCES_FILE")]
    pub sources: Option<PathBuf>,

    /// Per-request timeout when fetching a listing page, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Retry attempts for transient fetch failures
    #[arg(long, env = "FETCH_RETRIES", default_value_t = 2)]
    pub fetch_retries: usize,

    /// Re-scrape every N seconds after the startup cycle (disabled when unset)
    #[arg(long, env = "REFRESH_INTERVAL_SECS")]
    pub refresh_interval_secs: Option<u64>,
}
