//! Scrape cycle orchestration.
//!
//! A cycle fans out one pipeline per configured [`Source`], waits for every
//! one of them to resolve, and publishes the merged records to the
//! [`Collection`] in a single replacement.
//!
//! Each pipeline resolves to a tagged `Result`. Failures are logged and listed
//! in the [`CycleReport`] but never stop the other sources or the cycle.

use crate::collection::Collection;
use crate::models::{CycleReport, SourceFailure, University};
use crate::scrapers::fetch::Fetch;
use crate::scrapers::{Source, scrape_source};
use chrono::Utc;
use futures::future::join_all;
use itertools::{Either, Itertools};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Runs scrape cycles against a fixed set of sources.
#[derive(Debug)]
pub struct Orchestrator<F> {
    fetcher: F,
    sources: Vec<Source>,
    collection: Arc<Collection>,
}

impl<F> Orchestrator<F>
where
    F: Fetch + Send + Sync,
{
    /// Create an orchestrator that owns a fresh, empty [`Collection`].
    pub fn new(fetcher: F, sources: Vec<Source>) -> Self {
        Self {
            fetcher,
            sources,
            collection: Arc::new(Collection::new()),
        }
    }

    /// Handle to the collection this orchestrator publishes into.
    pub fn collection(&self) -> Arc<Collection> {
        Arc::clone(&self.collection)
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Run one full cycle across all sources.
    ///
    /// All pipelines start together. The returned report lists per-source
    /// failures; the records of every successful source are published in
    /// source order, each source keeping its own row order.
    #[instrument(level = "info", skip_all)]
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle = self.collection.begin_cycle();
        let started_at = Utc::now();
        let t0 = Instant::now();
        info!(cycle, sources = self.sources.len(), "Scrape cycle started");

        let outcomes = join_all(
            self.sources
                .iter()
                .map(|source| scrape_source(&self.fetcher, source)),
        )
        .await;

        let (batches, failures): (Vec<Vec<University>>, Vec<SourceFailure>) = self
            .sources
            .iter()
            .zip(outcomes)
            .partition_map(|(source, outcome)| match outcome {
                Ok(universities) => Either::Left(universities),
                Err(e) => {
                    error!(cycle, url = %e.url(), error = %e, "Failed to scrape source");
                    Either::Right(SourceFailure {
                        url: source.url.clone(),
                        university_type: source.university_type,
                        message: e.to_string(),
                    })
                }
            });

        let sources_succeeded = batches.len();
        let universities: Vec<University> = batches.into_iter().flatten().collect();

        let report = CycleReport {
            cycle,
            started_at,
            finished_at: Utc::now(),
            records: universities.len(),
            sources_succeeded,
            failures,
            applied: false,
        };
        let applied = self.collection.complete_cycle(report.clone(), universities);

        let elapsed = t0.elapsed();
        info!(
            cycle,
            records = report.records,
            succeeded = report.sources_succeeded,
            failed = report.failures.len(),
            applied,
            elapsed_ms = elapsed.as_millis() as u64,
            "Scrape cycle completed"
        );

        CycleReport { applied, ..report }
    }
}
