//! Process-wide university collection and scrape cycle status.
//!
//! The collection is never edited in place. Each completed cycle publishes a
//! brand new [`Snapshot`] through a `tokio::sync::watch` channel, and readers
//! clone the current `Arc` once per request. A reader therefore sees either
//! the old snapshot or the new one, never a half-built list.
//!
//! Cycle ids are handed out in increasing order. A cycle that finishes after a
//! newer one has been published is discarded, so the newest data always wins.

use crate::models::{CycleReport, University};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Immutable view of the collection at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Id of the cycle that produced this snapshot; 0 before any cycle completed.
    pub cycle: u64,
    pub universities: Arc<[University]>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            cycle: 0,
            universities: Arc::from(Vec::new()),
        }
    }
}

/// Lifecycle phase of scraping as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    /// No cycle has started yet.
    Idle,
    /// At least one cycle is in flight.
    Running,
    /// Every started cycle has finished.
    Completed,
}

/// Observable state of the scrape job.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeStatus {
    pub phase: CyclePhase,
    /// Cycles currently in flight.
    pub running: usize,
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub last_cycle: Option<CycleReport>,
}

impl Default for ScrapeStatus {
    fn default() -> Self {
        Self {
            phase: CyclePhase::Idle,
            running: 0,
            cycles_started: 0,
            cycles_completed: 0,
            last_cycle: None,
        }
    }
}

/// Shared holder of the current snapshot and scrape status.
#[derive(Debug)]
pub struct Collection {
    snapshot: watch::Sender<Snapshot>,
    status: watch::Sender<ScrapeStatus>,
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl Collection {
    /// An empty collection in the `Idle` phase.
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Snapshot::default());
        let (status, _) = watch::channel(ScrapeStatus::default());
        Self { snapshot, status }
    }

    /// The current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// The current scrape status.
    pub fn status(&self) -> ScrapeStatus {
        self.status.borrow().clone()
    }

    /// Register a new cycle and return its id.
    pub fn begin_cycle(&self) -> u64 {
        let mut cycle = 0;
        self.status.send_modify(|status| {
            status.cycles_started += 1;
            status.running += 1;
            status.phase = CyclePhase::Running;
            cycle = status.cycles_started;
        });
        debug!(cycle, "Cycle registered");
        cycle
    }

    /// Publish the records of a finished cycle.
    ///
    /// The snapshot is replaced in one step, and only if `report.cycle` is
    /// newer than the published one. Returns whether the records were applied;
    /// `report.applied` is overwritten with the same value.
    pub fn complete_cycle(&self, mut report: CycleReport, universities: Vec<University>) -> bool {
        let cycle = report.cycle;
        let universities: Arc<[University]> = Arc::from(universities);

        let applied = self.snapshot.send_if_modified(|current| {
            if cycle > current.cycle {
                *current = Snapshot {
                    cycle,
                    universities: Arc::clone(&universities),
                };
                true
            } else {
                false
            }
        });
        if !applied {
            warn!(
                cycle,
                published = self.snapshot.borrow().cycle,
                "Discarding results of a cycle older than the published snapshot"
            );
        }

        report.applied = applied;
        self.status.send_modify(|status| {
            status.running = status.running.saturating_sub(1);
            status.cycles_completed += 1;
            status.phase = if status.running == 0 {
                CyclePhase::Completed
            } else {
                CyclePhase::Running
            };
            status.last_cycle = Some(report);
        });
        applied
    }

    /// Wait until no cycle is in flight and at least one has completed.
    pub async fn wait_until_completed(&self) -> ScrapeStatus {
        let mut rx = self.status.subscribe();
        match rx.wait_for(|s| s.phase == CyclePhase::Completed).await {
            Ok(status) => status.clone(),
            // The sender lives in `self`, so the channel cannot close while we wait.
            Err(_) => self.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UniversityType;
    use chrono::Utc;
    use std::time::Duration;

    fn university(name: &str) -> University {
        University {
            name: name.to_string(),
            state: String::new(),
            city: String::new(),
            abbreviation: String::new(),
            vice_chancellor: String::new(),
            year_of_establishment: String::new(),
            website: String::new(),
            university_type: UniversityType::State,
        }
    }

    fn report(cycle: u64, records: usize) -> CycleReport {
        CycleReport {
            cycle,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            records,
            sources_succeeded: 1,
            failures: Vec::new(),
            applied: false,
        }
    }

    #[test]
    fn test_new_collection_is_empty_and_idle() {
        let collection = Collection::new();
        assert_eq!(collection.snapshot().universities.len(), 0);
        assert_eq!(collection.snapshot().cycle, 0);
        assert_eq!(collection.status().phase, CyclePhase::Idle);
    }

    #[test]
    fn test_cycle_replaces_snapshot() {
        let collection = Collection::new();
        let cycle = collection.begin_cycle();
        assert_eq!(collection.status().phase, CyclePhase::Running);

        assert!(collection.complete_cycle(report(cycle, 2), vec![university("A"), university("B")]));

        let snapshot = collection.snapshot();
        assert_eq!(snapshot.cycle, cycle);
        assert_eq!(snapshot.universities.len(), 2);

        let status = collection.status();
        assert_eq!(status.phase, CyclePhase::Completed);
        assert_eq!(status.cycles_completed, 1);
        assert!(status.last_cycle.unwrap().applied);
    }

    #[test]
    fn test_held_snapshot_is_unaffected_by_replacement() {
        let collection = Collection::new();
        let first = collection.begin_cycle();
        collection.complete_cycle(report(first, 1), vec![university("Old")]);
        let held = collection.snapshot();

        let second = collection.begin_cycle();
        collection.complete_cycle(report(second, 2), vec![university("New"), university("Newer")]);

        assert_eq!(held.universities.len(), 1);
        assert_eq!(held.universities[0].name, "Old");
        assert_eq!(collection.snapshot().universities.len(), 2);
    }

    #[test]
    fn test_stale_cycle_is_discarded() {
        let collection = Collection::new();
        let older = collection.begin_cycle();
        let newer = collection.begin_cycle();

        assert!(collection.complete_cycle(report(newer, 1), vec![university("Fresh")]));
        assert_eq!(collection.status().phase, CyclePhase::Running);

        assert!(!collection.complete_cycle(report(older, 1), vec![university("Stale")]));

        let snapshot = collection.snapshot();
        assert_eq!(snapshot.cycle, newer);
        assert_eq!(snapshot.universities[0].name, "Fresh");

        let status = collection.status();
        assert_eq!(status.phase, CyclePhase::Completed);
        assert_eq!(status.running, 0);
        assert!(!status.last_cycle.unwrap().applied);
    }

    #[tokio::test]
    async fn test_wait_until_completed_resolves_after_cycle() {
        let collection = Arc::new(Collection::new());
        let cycle = collection.begin_cycle();

        let worker = Arc::clone(&collection);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            worker.complete_cycle(report(cycle, 1), vec![university("Done")]);
        });

        let status = tokio::time::timeout(Duration::from_secs(5), collection.wait_until_completed())
            .await
            .expect("cycle should complete");
        assert_eq!(status.phase, CyclePhase::Completed);
        assert_eq!(collection.snapshot().universities.len(), 1);
    }
}
