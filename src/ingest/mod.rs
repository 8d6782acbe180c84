//! Ingestion and merge pipeline.
//!
//! Streams records into the store one at a time — from a scrape run or
//! from an external tabular file — resolving duplicates through the
//! store's upsert and reporting an honest [`MergeSummary`]. Rows that
//! cannot be reconstructed into a valid record are counted and skipped,
//! never fatal.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{JobRecord, JobSource, MergeSummary, RawPosting};
use crate::normalize;
use crate::store::csv::CsvReader;
use crate::store::{JobStore, StoreError, UpsertOutcome};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("'{path}' has no usable header row")]
    MissingHeader { path: String },
}

/// Stream already-normalized records into the store.
pub fn ingest_records<I>(store: &JobStore, records: I) -> Result<MergeSummary, StoreError>
where
    I: IntoIterator<Item = JobRecord>,
{
    let mut summary = MergeSummary::default();
    for record in records {
        match store.upsert(&record)? {
            UpsertOutcome::Inserted => summary.inserted += 1,
            UpsertOutcome::Updated => summary.updated += 1,
        }
    }
    Ok(summary)
}

/// Ingest an external CSV file, rebuilding each row through the
/// normalizer.
///
/// Understands this crate's own export header as well as older exports
/// (`job_title` for `title`, display-style source labels, extra columns
/// like `salary` which land in `raw_extra`). Rows lacking both a title
/// and a company count as `skipped_invalid` and ingestion continues.
/// `default_source` applies to rows whose source column is missing or
/// unrecognized.
pub fn ingest_csv(
    store: &JobStore,
    path: &Path,
    default_source: JobSource,
) -> Result<MergeSummary, IngestError> {
    let file = File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut reader = CsvReader::new(BufReader::new(file));

    let header = reader
        .next_record()
        .map_err(|e| IngestError::Io {
            path: path.display().to_string(),
            source: e,
        })?
        .ok_or_else(|| IngestError::MissingHeader {
            path: path.display().to_string(),
        })?;
    let columns = ColumnMap::from_header(&header).ok_or_else(|| IngestError::MissingHeader {
        path: path.display().to_string(),
    })?;

    let fallback_scraped_at = Utc::now();
    let mut summary = MergeSummary::default();
    let mut row_number = 1usize;

    loop {
        let row = match reader.next_record() {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) => {
                return Err(IngestError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };
        row_number += 1;

        let (raw, source, scraped_at) = columns.to_raw(&row, default_source, fallback_scraped_at);
        match normalize::normalize(&raw, source, scraped_at) {
            Ok(record) => match store.upsert(&record)? {
                UpsertOutcome::Inserted => summary.inserted += 1,
                UpsertOutcome::Updated => summary.updated += 1,
            },
            Err(e) => {
                summary.skipped_invalid += 1;
                debug!(row = row_number, error = %e, "skipping invalid row");
            }
        }
    }

    info!(
        path = %path.display(),
        inserted = summary.inserted,
        updated = summary.updated,
        skipped = summary.skipped_invalid,
        "ingested file"
    );
    Ok(summary)
}

/// Ingest several files in sequence into the same store.
///
/// The final store content is independent of file order (upsert is
/// idempotent and only refreshes non-empty fields); the inserted/updated
/// split in the summary is order-dependent. A file that cannot be opened
/// is skipped with a warning rather than aborting the remaining files.
pub fn merge_files(
    store: &JobStore,
    paths: &[&Path],
    default_source: JobSource,
) -> Result<MergeSummary, IngestError> {
    let mut total = MergeSummary::default();
    for path in paths {
        match ingest_csv(store, path, default_source) {
            Ok(summary) => total.absorb(summary),
            Err(IngestError::Io { path, source }) => {
                warn!(path, error = %source, "skipping unreadable file");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Header-to-field mapping for external tabular files.
struct ColumnMap {
    title: Option<usize>,
    company: Option<usize>,
    location: Option<usize>,
    description: Option<usize>,
    source: Option<usize>,
    source_url: Option<usize>,
    posted_date: Option<usize>,
    scraped_at: Option<usize>,
    raw_extra: Option<usize>,
    /// (column index, name) pairs for columns promoted into raw_extra.
    extra: Vec<(usize, String)>,
}

impl ColumnMap {
    fn from_header(header: &[String]) -> Option<Self> {
        let mut map = Self {
            title: None,
            company: None,
            location: None,
            description: None,
            source: None,
            source_url: None,
            posted_date: None,
            scraped_at: None,
            raw_extra: None,
            extra: Vec::new(),
        };

        for (index, name) in header.iter().enumerate() {
            match name.trim().to_lowercase().as_str() {
                "id" => {} // identity is recomputed, never trusted from files
                "title" | "job_title" => map.title = Some(index),
                "company" => map.company = Some(index),
                "location" => map.location = Some(index),
                "description" => map.description = Some(index),
                "source" => map.source = Some(index),
                "source_url" | "url" => map.source_url = Some(index),
                "posted_date" => map.posted_date = Some(index),
                "scraped_at" => map.scraped_at = Some(index),
                "raw_extra" => map.raw_extra = Some(index),
                other if !other.is_empty() => map.extra.push((index, other.to_string())),
                _ => {}
            }
        }

        // A file without identifying columns is not a job table.
        if map.title.is_none() && map.company.is_none() {
            return None;
        }
        Some(map)
    }

    fn to_raw(
        &self,
        row: &[String],
        default_source: JobSource,
        fallback_scraped_at: DateTime<Utc>,
    ) -> (RawPosting, JobSource, DateTime<Utc>) {
        let cell = |index: Option<usize>| -> String {
            index
                .and_then(|i| row.get(i))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        let mut raw = RawPosting::new(cell(self.title), cell(self.company));
        raw.location = cell(self.location);
        raw.description = cell(self.description);
        let url = cell(self.source_url);
        raw.source_url = (!url.is_empty()).then_some(url);
        raw.posted_date = parse_date(&cell(self.posted_date));

        let mut extra = serde_json::Map::new();
        if let Some(value) = parse_json_object(&cell(self.raw_extra)) {
            extra.extend(value);
        }
        for (index, name) in &self.extra {
            if let Some(value) = row.get(*index) {
                let value = value.trim();
                if !value.is_empty() {
                    extra
                        .entry(name.clone())
                        .or_insert_with(|| serde_json::Value::String(value.to_string()));
                }
            }
        }
        raw.extra = serde_json::Value::Object(extra);

        let source = JobSource::parse_flexible(&cell(self.source)).unwrap_or(default_source);
        let scraped_at = parse_datetime(&cell(self.scraped_at)).unwrap_or(fallback_scraped_at);
        (raw, source, scraped_at)
    }
}

fn parse_json_object(text: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }
    text.parse::<NaiveDate>().ok()
}

/// Accept RFC 3339 as written by the export, or the space-separated
/// format older files used (assumed UTC).
fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_ingest_csv_with_legacy_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "legacy.csv",
            "job_title,company,location,description,salary,experience_level,posted_date,source,scraped_at\n\
             Data Scientist,Acme,Riyadh,Great role,15000-25000 SAR,Mid Level,2024-03-05,Indeed,2024-06-01 08:00:00\n\
             ,,,missing identity,,,,,\n",
        );

        let store = JobStore::open_in_memory().unwrap();
        let summary = ingest_csv(&store, &path, JobSource::Manual).unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped_invalid, 1);

        let records = store.all().unwrap();
        assert_eq!(records[0].title, "Data Scientist");
        assert_eq!(records[0].source, JobSource::Indeed);
        assert_eq!(records[0].posted_date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(
            records[0].raw_extra.get("salary").and_then(|v| v.as_str()),
            Some("15000-25000 SAR")
        );
    }

    #[test]
    fn test_ingest_unknown_source_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "odd.csv",
            "title,company,source\nEngineer,Acme,glassdoor\n",
        );
        let store = JobStore::open_in_memory().unwrap();
        ingest_csv(&store, &path, JobSource::Manual).unwrap();
        assert_eq!(store.all().unwrap()[0].source, JobSource::Manual);
    }

    #[test]
    fn test_ingest_missing_header_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "headerless.csv", "a,b,c\n1,2,3\n");
        let store = JobStore::open_in_memory().unwrap();
        assert!(matches!(
            ingest_csv(&store, &path, JobSource::Manual),
            Err(IngestError::MissingHeader { .. })
        ));
    }

    #[test]
    fn test_ingest_records_counts_inserts_and_updates() {
        let store = JobStore::open_in_memory().unwrap();
        let raw = RawPosting::new("Engineer", "Acme");
        let record = normalize::normalize(&raw, JobSource::Manual, Utc::now()).unwrap();
        let summary =
            ingest_records(&store, vec![record.clone(), record]).unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_merge_files_skips_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(&dir, "good.csv", "title,company\nEngineer,Acme\n");
        let missing = dir.path().join("missing.csv");
        let store = JobStore::open_in_memory().unwrap();
        let summary =
            merge_files(&store, &[good.as_path(), missing.as_path()], JobSource::Manual).unwrap();
        assert_eq!(summary.inserted, 1);
    }

    #[test]
    fn test_merge_is_order_independent_for_content() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(
            &dir,
            "a.csv",
            "title,company,location,description,scraped_at\n\
             Data Scientist,Acme,Riyadh,From file A,2024-06-01T08:00:00Z\n\
             ML Engineer,STC,Jeddah,,2024-06-01T08:00:00Z\n",
        );
        let b = write_file(
            &dir,
            "b.csv",
            "title,company,location,description,scraped_at\n\
             Data Scientist,Acme,Riyadh,,2024-06-02T08:00:00Z\n\
             Data Engineer,Noon,Riyadh,From file B,2024-06-02T08:00:00Z\n",
        );

        let store_ab = JobStore::open_in_memory().unwrap();
        merge_files(&store_ab, &[a.as_path(), b.as_path()], JobSource::Manual).unwrap();
        let store_ba = JobStore::open_in_memory().unwrap();
        merge_files(&store_ba, &[b.as_path(), a.as_path()], JobSource::Manual).unwrap();

        let rows_ab = store_ab.all().unwrap();
        let rows_ba = store_ba.all().unwrap();
        assert_eq!(rows_ab.len(), 3);
        assert_eq!(rows_ab.len(), rows_ba.len());
        for (x, y) in rows_ab.iter().zip(rows_ba.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.title, y.title);
            // The non-empty description wins regardless of order.
            assert_eq!(x.description, y.description);
        }
    }
}
