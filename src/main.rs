//! # NUC Universities API
//!
//! Scrapes the National Universities Commission listing pages for federal,
//! state and private universities, normalizes every table row into a
//! structured record, and serves the result through a read-only JSON API.
//!
//! ## Usage
//!
//! ```sh
//! nuc_universities --port 3000
//! curl 'http://localhost:3000/api/universities?type=private&search=lag'
//! ```
//!
//! ## Architecture
//!
//! 1. **Scraping**: One pipeline per source runs concurrently (fetch, extract rows, normalize)
//! 2. **Publishing**: The merged records replace the shared collection in one step
//! 3. **Serving**: Every request answers from the latest published snapshot
//!
//! The server starts accepting requests immediately; until the first cycle
//! completes, queries answer from the empty collection and `/api/status`
//! reports the cycle as running.

use axum::ServiceExt;
use axum::extract::Request;
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod collection;
mod config;
mod models;
mod normalize;
mod orchestrator;
mod query;
mod routes;
mod scrapers;
mod utils;

use cli::Cli;
use orchestrator::Orchestrator;
use routes::{AppState, build_router};
use scrapers::fetch::{Fetch, HttpFetcher, RetryFetch};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("nuc_universities starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let sources = config::load_sources(args.sources.as_deref()).await?;
    for source in &sources {
        info!(url = %source.url, university_type = %source.university_type, "Configured source");
    }

    let http = HttpFetcher::new(Duration::from_secs(args.fetch_timeout_secs))?;
    let fetcher = RetryFetch::new(http, args.fetch_retries, Duration::from_secs(1));
    let orchestrator = Arc::new(Orchestrator::new(fetcher, sources));
    info!(sources = orchestrator.sources().len(), "Orchestrator ready");

    // ---- Startup cycle, then optional periodic refresh ----
    spawn_scraping(Arc::clone(&orchestrator), args.refresh_interval_secs);

    let collection = orchestrator.collection();
    tokio::spawn(async move {
        let status = collection.wait_until_completed().await;
        let records = status.last_cycle.map(|c| c.records).unwrap_or_default();
        info!(records, "Initial scrape finished; serving scraped data");
    });

    // ---- Serve ----
    let app = build_router(AppState::new(orchestrator.collection()));
    let addr = format!("{}:{}", args.bind, args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Nigerian Universities API listening");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;
    Ok(())
}

/// Run the startup cycle in the background and, if `refresh_secs` is set,
/// start a new full cycle on that interval.
fn spawn_scraping<F>(orchestrator: Arc<Orchestrator<F>>, refresh_secs: Option<u64>)
where
    F: Fetch + Send + Sync + 'static,
{
    tokio::spawn(async move {
        orchestrator.run_cycle().await;

        let Some(secs) = refresh_secs.filter(|s| *s > 0) else {
            return;
        };
        info!(interval_secs = secs, "Periodic refresh enabled");
        let mut interval = tokio::time::interval(Duration::from_secs(secs));
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let report = orchestrator.run_cycle().await;
            if !report.failures.is_empty() {
                warn!(
                    cycle = report.cycle,
                    failed = report.failures.len(),
                    "Refresh cycle finished with failed sources"
                );
            }
        }
    });
}
