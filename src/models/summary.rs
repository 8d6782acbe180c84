//! Run and merge summaries returned to callers.

use std::time::Duration;

use serde::Serialize;

use super::JobSource;

/// Summary of one orchestrator invocation against one adapter.
///
/// Ephemeral: produced at the end of a run and discarded by the caller;
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeRun {
    pub source: JobSource,
    pub query: String,
    pub location: String,
    pub pages_requested: u32,
    pub pages_fetched: u32,
    /// Records that normalized successfully.
    pub parsed_ok: usize,
    /// Pages or records that failed to parse/normalize.
    pub parse_failed: usize,
    /// Pages where the fetch retry budget was exhausted.
    pub fetch_failed: u32,
    /// True when the run was stopped before reaching `pages_requested`.
    pub cancelled: bool,
    #[serde(skip)]
    pub duration: Duration,
}

impl ScrapeRun {
    pub fn new(source: JobSource, query: &str, location: &str, pages_requested: u32) -> Self {
        Self {
            source,
            query: query.to_string(),
            location: location.to_string(),
            pages_requested,
            pages_fetched: 0,
            parsed_ok: 0,
            parse_failed: 0,
            fetch_failed: 0,
            cancelled: false,
            duration: Duration::ZERO,
        }
    }

    /// Total records encountered: `parsed_ok + parse_failed`.
    pub fn found(&self) -> usize {
        self.parsed_ok + self.parse_failed
    }
}

/// Outcome counts from an ingestion run.
///
/// `inserted` vs `updated` depends on what the store already contained,
/// so the split is order-dependent when merging several files; the final
/// store content is not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped_invalid: usize,
}

impl MergeSummary {
    /// Fold another summary into this one.
    pub fn absorb(&mut self, other: MergeSummary) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped_invalid += other.skipped_invalid;
    }

    pub fn total_written(&self) -> usize {
        self.inserted + self.updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_is_consistent() {
        let mut run = ScrapeRun::new(JobSource::Sample, "q", "l", 3);
        run.parsed_ok = 12;
        run.parse_failed = 2;
        assert_eq!(run.found(), 14);
    }

    #[test]
    fn test_absorb() {
        let mut a = MergeSummary {
            inserted: 3,
            updated: 1,
            skipped_invalid: 0,
        };
        a.absorb(MergeSummary {
            inserted: 2,
            updated: 4,
            skipped_invalid: 1,
        });
        assert_eq!(
            a,
            MergeSummary {
                inserted: 5,
                updated: 5,
                skipped_invalid: 1
            }
        );
    }
}
