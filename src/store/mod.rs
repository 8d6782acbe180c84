//! Durable, deduplicating job record store.
//!
//! A single SQLite file keyed by the content-derived record id. All
//! mutation goes through [`JobStore::upsert`], a single atomic
//! replace-or-merge statement, so a crash mid-write can never leave two
//! rows with the same id. Reads may run alongside writes (WAL mode) but
//! are not guaranteed to observe a write still in flight.

pub mod csv;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{JobRecord, JobSource};
use crate::normalize;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file or connection could not be opened.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A stored row no longer maps onto a valid record.
    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What an upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Composable record filters; all present filters must match (logical AND).
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    /// Case-insensitive substring on title.
    pub title_contains: Option<String>,
    /// Case-insensitive substring on location.
    pub location_contains: Option<String>,
    pub source: Option<JobSource>,
    /// Inclusive lower bound on posted_date.
    pub posted_after: Option<NaiveDate>,
    /// Inclusive upper bound on posted_date.
    pub posted_before: Option<NaiveDate>,
}

/// Snapshot export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Read-only aggregate counts over the store.
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    pub total: u64,
    /// (source, count), descending by count.
    pub by_source: Vec<(String, u64)>,
    /// (location, count), descending by count.
    pub by_location: Vec<(String, u64)>,
    pub earliest_scraped: Option<DateTime<Utc>>,
    pub latest_scraped: Option<DateTime<Utc>>,
}

/// Export column order; the sole contract with the analysis layer.
pub const EXPORT_COLUMNS: [&str; 10] = [
    "id",
    "title",
    "company",
    "location",
    "description",
    "source",
    "source_url",
    "posted_date",
    "scraped_at",
    "raw_extra",
];

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS job_postings (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    company TEXT NOT NULL,
    location TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    source TEXT NOT NULL,
    source_url TEXT,
    posted_date TEXT,
    scraped_at TEXT NOT NULL,
    raw_extra TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_job_postings_title ON job_postings(title);
CREATE INDEX IF NOT EXISTS idx_job_postings_location ON job_postings(location);
CREATE INDEX IF NOT EXISTS idx_job_postings_source ON job_postings(source);
CREATE INDEX IF NOT EXISTS idx_job_postings_posted_date ON job_postings(posted_date);
";

/// Merge-on-conflict upsert: incoming non-empty fields win over existing
/// empty ones, existing non-empty fields survive empty incoming ones, and
/// scraped_at moves to the later timestamp. One statement, so the
/// replace-or-merge is atomic.
const UPSERT: &str = "
INSERT INTO job_postings
    (id, title, company, location, description, source, source_url, posted_date, scraped_at, raw_extra)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
ON CONFLICT(id) DO UPDATE SET
    title       = CASE WHEN excluded.title       != '' THEN excluded.title       ELSE title       END,
    company     = CASE WHEN excluded.company     != '' THEN excluded.company     ELSE company     END,
    location    = CASE WHEN excluded.location    != '' THEN excluded.location    ELSE location    END,
    description = CASE WHEN excluded.description != '' THEN excluded.description ELSE description END,
    source_url  = COALESCE(excluded.source_url, source_url),
    posted_date = COALESCE(excluded.posted_date, posted_date),
    raw_extra   = CASE WHEN excluded.raw_extra NOT IN ('', '{}') THEN excluded.raw_extra ELSE raw_extra END,
    scraped_at  = MAX(scraped_at, excluded.scraped_at)
";

const SELECT_COLUMNS: &str =
    "id, title, company, location, description, source, source_url, posted_date, scraped_at, raw_extra";

/// Fixed-width UTC timestamps so MAX() and ORDER BY compare chronologically.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// The system's core data structure: a durable keyed collection of
/// [`JobRecord`].
///
/// Explicitly constructed and passed; there is no process-wide instance.
/// The connection sits behind a mutex so concurrent upserts for the same
/// id cannot interleave into a corrupted merge.
#[derive(Debug)]
pub struct JobStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl JobStore {
    /// Open a store file, creating it (and the schema) when absent.
    ///
    /// Fails fast with [`StoreError::Unavailable`] when the file or its
    /// directory cannot be opened.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!(
                        "cannot create store directory '{}': {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let conn = Connection::open(path).map_err(|e| {
            StoreError::Unavailable(format!("cannot open store '{}': {e}", path.display()))
        })?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        conn.execute_batch(SCHEMA).map_err(|e| {
            StoreError::Unavailable(format!("cannot initialize store schema: {e}"))
        })?;

        debug!(path = %path.display(), "store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(format!("cannot open in-memory store: {e}")))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned mutex means another thread panicked mid-operation;
        // the connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert the record or merge it into the existing row with the same id.
    pub fn upsert(&self, record: &JobRecord) -> StoreResult<UpsertOutcome> {
        let conn = self.lock();
        let existed: bool = conn
            .query_row(
                "SELECT 1 FROM job_postings WHERE id = ?1",
                params![record.id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        conn.execute(
            UPSERT,
            params![
                record.id,
                record.title,
                record.company,
                record.location,
                record.description,
                record.source.as_str(),
                record.source_url,
                record.posted_date.map(|d| d.to_string()),
                format_timestamp(record.scraped_at),
                record.raw_extra.to_string(),
            ],
        )?;

        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    pub fn get_by_id(&self, id: &str) -> StoreResult<Option<JobRecord>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM job_postings WHERE id = ?1"),
                params![id],
                row_to_raw,
            )
            .optional()?;
        row.map(RawRow::into_record).transpose()
    }

    /// Fetch records matching all present filters, ordered by id for
    /// deterministic output.
    pub fn query(&self, filter: &JobQuery) -> StoreResult<Vec<JobRecord>> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM job_postings WHERE 1=1");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref title) = filter.title_contains {
            sql.push_str(" AND LOWER(title) LIKE '%' || LOWER(?) || '%'");
            args.push(Box::new(title.clone()));
        }
        if let Some(ref location) = filter.location_contains {
            sql.push_str(" AND LOWER(location) LIKE '%' || LOWER(?) || '%'");
            args.push(Box::new(location.clone()));
        }
        if let Some(source) = filter.source {
            sql.push_str(" AND source = ?");
            args.push(Box::new(source.as_str().to_string()));
        }
        if let Some(after) = filter.posted_after {
            sql.push_str(" AND posted_date >= ?");
            args.push(Box::new(after.to_string()));
        }
        if let Some(before) = filter.posted_before {
            sql.push_str(" AND posted_date <= ?");
            args.push(Box::new(before.to_string()));
        }
        sql.push_str(" ORDER BY id");

        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), row_to_raw)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    /// All records, ordered by id.
    pub fn all(&self) -> StoreResult<Vec<JobRecord>> {
        self.query(&JobQuery::default())
    }

    pub fn count(&self) -> StoreResult<u64> {
        let conn = self.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM job_postings", [], |r| r.get(0))?;
        Ok(n as u64)
    }

    /// Maintenance pass: recompute every row's id under the current
    /// normalization rules and merge collisions.
    ///
    /// Repairs data ingested before a normalization rule change; distinct
    /// from the continuous dedup `upsert` performs. Within a collision
    /// group, the earliest-scraped row is the base and later rows
    /// contribute their non-empty fields (raw_extra keys are unioned,
    /// existing keys win). Returns the number of rows removed.
    pub fn remove_duplicates(&self) -> StoreResult<usize> {
        let records = self.all()?;

        // Group rows by recomputed identity.
        let mut groups: std::collections::HashMap<String, Vec<JobRecord>> =
            std::collections::HashMap::new();
        for record in records {
            let id = normalize::record_id(
                &record.title,
                &record.company,
                &record.location,
                record.source,
            );
            groups.entry(id).or_default().push(record);
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut removed = 0usize;

        for (new_id, mut group) in groups {
            let changed_ids = group.iter().any(|r| r.id != new_id);
            if group.len() == 1 && !changed_ids {
                continue;
            }

            group.sort_by(|a, b| a.scraped_at.cmp(&b.scraped_at));
            let mut merged = group[0].clone();
            for dup in &group[1..] {
                merge_record_fields(&mut merged, dup);
            }
            merged.id = new_id;
            removed += group.len() - 1;

            for old in &group {
                tx.execute("DELETE FROM job_postings WHERE id = ?1", params![old.id])?;
            }
            tx.execute(
                UPSERT,
                params![
                    merged.id,
                    merged.title,
                    merged.company,
                    merged.location,
                    merged.description,
                    merged.source.as_str(),
                    merged.source_url,
                    merged.posted_date.map(|d| d.to_string()),
                    format_timestamp(merged.scraped_at),
                    merged.raw_extra.to_string(),
                ],
            )?;
        }

        tx.commit()?;
        if removed > 0 {
            info!(removed, "removed duplicate rows");
        }
        Ok(removed)
    }

    /// Write a full snapshot with deterministic column order.
    ///
    /// Returns the number of records written.
    pub fn export(&self, path: &Path, format: ExportFormat) -> StoreResult<usize> {
        let records = self.all()?;
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);

        match format {
            ExportFormat::Csv => {
                csv::write_row(&mut out, &EXPORT_COLUMNS)?;
                for record in &records {
                    let posted = record
                        .posted_date
                        .map(|d| d.to_string())
                        .unwrap_or_default();
                    let extra = record.raw_extra.to_string();
                    let scraped = format_timestamp(record.scraped_at);
                    csv::write_row(
                        &mut out,
                        &[
                            record.id.as_str(),
                            record.title.as_str(),
                            record.company.as_str(),
                            record.location.as_str(),
                            record.description.as_str(),
                            record.source.as_str(),
                            record.source_url.as_deref().unwrap_or(""),
                            posted.as_str(),
                            scraped.as_str(),
                            extra.as_str(),
                        ],
                    )?;
                }
            }
            ExportFormat::Json => {
                serde_json::to_writer_pretty(&mut out, &records)
                    .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;
                writeln!(&mut out)?;
            }
        }
        out.flush()?;
        info!(count = records.len(), path = %path.display(), "exported store snapshot");
        Ok(records.len())
    }

    /// Aggregate counts; read-only.
    pub fn statistics(&self) -> StoreResult<StoreStatistics> {
        let conn = self.lock();
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM job_postings", [], |r| r.get(0))?;

        let mut by_source = Vec::new();
        let mut stmt = conn.prepare(
            "SELECT source, COUNT(*) AS n FROM job_postings GROUP BY source ORDER BY n DESC",
        )?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
        for row in rows {
            let (source, n) = row?;
            by_source.push((source, n as u64));
        }

        let mut by_location = Vec::new();
        let mut stmt = conn.prepare(
            "SELECT location, COUNT(*) AS n FROM job_postings \
             WHERE location != '' GROUP BY location ORDER BY n DESC",
        )?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
        for row in rows {
            let (location, n) = row?;
            by_location.push((location, n as u64));
        }

        let (earliest, latest): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(scraped_at), MAX(scraped_at) FROM job_postings",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        Ok(StoreStatistics {
            total: total as u64,
            by_source,
            by_location,
            earliest_scraped: earliest.as_deref().and_then(parse_timestamp),
            latest_scraped: latest.as_deref().and_then(parse_timestamp),
        })
    }

    /// Remove every row.
    pub fn clear(&self) -> StoreResult<usize> {
        let conn = self.lock();
        let n = conn.execute("DELETE FROM job_postings", [])?;
        Ok(n)
    }
}

/// Union non-empty fields from `dup` into `base`, keeping base values
/// where both are present.
fn merge_record_fields(base: &mut JobRecord, dup: &JobRecord) {
    if base.title.is_empty() && !dup.title.is_empty() {
        base.title = dup.title.clone();
    }
    if base.company.is_empty() && !dup.company.is_empty() {
        base.company = dup.company.clone();
    }
    if base.location.is_empty() && !dup.location.is_empty() {
        base.location = dup.location.clone();
    }
    if base.description.is_empty() && !dup.description.is_empty() {
        base.description = dup.description.clone();
    }
    if base.source_url.is_none() {
        base.source_url = dup.source_url.clone();
    }
    if base.posted_date.is_none() {
        base.posted_date = dup.posted_date;
    }
    if dup.scraped_at > base.scraped_at {
        base.scraped_at = dup.scraped_at;
    }
    if let (Some(base_map), Some(dup_map)) =
        (base.raw_extra.as_object().cloned(), dup.raw_extra.as_object())
    {
        let mut merged = base_map;
        for (key, value) in dup_map {
            merged.entry(key.clone()).or_insert_with(|| value.clone());
        }
        base.raw_extra = serde_json::Value::Object(merged);
    }
}

/// Intermediate row shape: everything as stored, parsed lazily so a bad
/// row reports which record it was.
struct RawRow {
    id: String,
    title: String,
    company: String,
    location: String,
    description: String,
    source: String,
    source_url: Option<String>,
    posted_date: Option<String>,
    scraped_at: String,
    raw_extra: String,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        title: row.get(1)?,
        company: row.get(2)?,
        location: row.get(3)?,
        description: row.get(4)?,
        source: row.get(5)?,
        source_url: row.get(6)?,
        posted_date: row.get(7)?,
        scraped_at: row.get(8)?,
        raw_extra: row.get(9)?,
    })
}

impl RawRow {
    fn into_record(self) -> StoreResult<JobRecord> {
        let source = JobSource::from_str(&self.source).ok_or_else(|| StoreError::InvalidRecord {
            id: self.id.clone(),
            reason: format!("unknown source '{}'", self.source),
        })?;
        let scraped_at =
            parse_timestamp(&self.scraped_at).ok_or_else(|| StoreError::InvalidRecord {
                id: self.id.clone(),
                reason: format!("bad scraped_at '{}'", self.scraped_at),
            })?;
        let posted_date = match self.posted_date.as_deref() {
            None | Some("") => None,
            Some(s) => Some(s.parse::<NaiveDate>().map_err(|_| {
                StoreError::InvalidRecord {
                    id: self.id.clone(),
                    reason: format!("bad posted_date '{s}'"),
                }
            })?),
        };
        let raw_extra =
            serde_json::from_str(&self.raw_extra).unwrap_or_else(|_| serde_json::json!({}));

        Ok(JobRecord {
            id: self.id,
            title: self.title,
            company: self.company,
            location: self.location,
            description: self.description,
            source,
            source_url: self.source_url,
            posted_date,
            scraped_at,
            raw_extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(title: &str, company: &str, location: &str) -> JobRecord {
        let scraped_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        JobRecord {
            id: normalize::record_id(title, company, location, JobSource::Manual),
            title: title.to_string(),
            company: company.to_string(),
            location: location.to_string(),
            description: String::new(),
            source: JobSource::Manual,
            source_url: None,
            posted_date: None,
            scraped_at,
            raw_extra: serde_json::json!({}),
        }
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let store = JobStore::open_in_memory().unwrap();
        let r = record("Data Scientist", "Acme", "Riyadh");
        assert_eq!(store.upsert(&r).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.upsert(&r).unwrap(), UpsertOutcome::Updated);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get_by_id(&r.id).unwrap().unwrap(), r);
    }

    #[test]
    fn test_merge_preserves_nonempty_fields() {
        let store = JobStore::open_in_memory().unwrap();
        let mut first = record("Data Scientist", "Acme", "Riyadh");
        first.description = "Great role".to_string();
        first.source_url = Some("https://example.com/1".to_string());
        store.upsert(&first).unwrap();

        // Same id, but empty description and no URL: must not erase.
        let mut second = record("Data Scientist", "Acme", "Riyadh");
        second.scraped_at = first.scraped_at + chrono::Duration::hours(1);
        store.upsert(&second).unwrap();

        let merged = store.get_by_id(&first.id).unwrap().unwrap();
        assert_eq!(merged.description, "Great role");
        assert_eq!(merged.source_url.as_deref(), Some("https://example.com/1"));
        // scraped_at refreshed to the later timestamp.
        assert_eq!(merged.scraped_at, second.scraped_at);
    }

    #[test]
    fn test_merge_fills_empty_fields() {
        let store = JobStore::open_in_memory().unwrap();
        let first = record("Data Scientist", "Acme", "Riyadh");
        store.upsert(&first).unwrap();

        let mut second = record("Data Scientist", "Acme", "Riyadh");
        second.description = "Now with details".to_string();
        second.posted_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        store.upsert(&second).unwrap();

        let merged = store.get_by_id(&first.id).unwrap().unwrap();
        assert_eq!(merged.description, "Now with details");
        assert_eq!(merged.posted_date, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn test_earlier_scraped_at_never_moves_backwards() {
        let store = JobStore::open_in_memory().unwrap();
        let first = record("Data Scientist", "Acme", "Riyadh");
        store.upsert(&first).unwrap();

        let mut older = record("Data Scientist", "Acme", "Riyadh");
        older.scraped_at = first.scraped_at - chrono::Duration::days(1);
        store.upsert(&older).unwrap();

        let merged = store.get_by_id(&first.id).unwrap().unwrap();
        assert_eq!(merged.scraped_at, first.scraped_at);
    }

    #[test]
    fn test_query_filters_compose() {
        let store = JobStore::open_in_memory().unwrap();
        store.upsert(&record("Data Scientist", "Acme", "Riyadh")).unwrap();
        store.upsert(&record("Data Engineer", "Acme", "Jeddah")).unwrap();
        store.upsert(&record("Designer", "Other", "Riyadh")).unwrap();

        let hits = store
            .query(&JobQuery {
                title_contains: Some("data".to_string()),
                location_contains: Some("riyadh".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Data Scientist");
    }

    #[test]
    fn test_query_by_source_and_date() {
        let store = JobStore::open_in_memory().unwrap();
        let mut a = record("A", "X", "L");
        a.posted_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        let mut b = record("B", "X", "L");
        b.posted_date = NaiveDate::from_ymd_opt(2024, 8, 1);
        let mut c = record("C", "X", "L");
        c.posted_date = None;
        store.upsert(&a).unwrap();
        store.upsert(&b).unwrap();
        store.upsert(&c).unwrap();

        let hits = store
            .query(&JobQuery {
                source: Some(JobSource::Manual),
                posted_after: NaiveDate::from_ymd_opt(2024, 4, 1),
                ..Default::default()
            })
            .unwrap();
        // Date filters exclude records without a posted_date.
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "B");
    }

    #[test]
    fn test_remove_duplicates_unions_fields() {
        let store = JobStore::open_in_memory().unwrap();

        // Two rows that normalize to the same identity but were stored
        // under different ids (pre-rule-change data).
        let mut a = record("Data  Scientist", "ACME", "Riyadh");
        a.id = "legacy-id-1".to_string();
        a.description = "desc from a".to_string();
        let mut b = record("data scientist", "Acme", "Riyadh");
        b.id = "legacy-id-2".to_string();
        b.source_url = Some("https://example.com/b".to_string());
        b.scraped_at = a.scraped_at + chrono::Duration::hours(2);
        store.upsert(&a).unwrap();
        store.upsert(&b).unwrap();
        assert_eq!(store.count().unwrap(), 2);

        let removed = store.remove_duplicates().unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count().unwrap(), 1);

        let survivor = &store.all().unwrap()[0];
        assert_eq!(
            survivor.id,
            normalize::record_id("Data Scientist", "ACME", "Riyadh", JobSource::Manual)
        );
        // Union of non-empty fields from both rows.
        assert_eq!(survivor.description, "desc from a");
        assert_eq!(survivor.source_url.as_deref(), Some("https://example.com/b"));
        assert_eq!(survivor.scraped_at, b.scraped_at);
    }

    #[test]
    fn test_remove_duplicates_rekeys_changed_ids() {
        let store = JobStore::open_in_memory().unwrap();
        let mut a = record("Engineer", "Acme", "Riyadh");
        a.id = "stale".to_string();
        store.upsert(&a).unwrap();

        assert_eq!(store.remove_duplicates().unwrap(), 0);
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.get_by_id("stale").unwrap().is_none());
        let expected = normalize::record_id("Engineer", "Acme", "Riyadh", JobSource::Manual);
        assert!(store.get_by_id(&expected).unwrap().is_some());
    }

    #[test]
    fn test_statistics() {
        let store = JobStore::open_in_memory().unwrap();
        store.upsert(&record("A", "X", "Riyadh")).unwrap();
        store.upsert(&record("B", "X", "Riyadh")).unwrap();
        store.upsert(&record("C", "X", "Jeddah")).unwrap();

        let stats = store.statistics().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_source, vec![("manual".to_string(), 3)]);
        assert_eq!(stats.by_location[0], ("Riyadh".to_string(), 2));
        assert!(stats.earliest_scraped.is_some());
        assert_eq!(stats.earliest_scraped, stats.latest_scraped);
    }

    #[test]
    fn test_clear() {
        let store = JobStore::open_in_memory().unwrap();
        store.upsert(&record("A", "X", "L")).unwrap();
        assert_eq!(store.clear().unwrap(), 1);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_open_creates_file_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jobs.db");
        {
            let store = JobStore::open(&path).unwrap();
            store.upsert(&record("A", "X", "L")).unwrap();
        }
        let store = JobStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_open_unreadable_path_fails_fast() {
        // A directory path cannot be opened as a database file.
        let dir = tempfile::tempdir().unwrap();
        let err = JobStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_raw_extra_round_trip() {
        let store = JobStore::open_in_memory().unwrap();
        let mut r = record("A", "X", "L");
        r.raw_extra = serde_json::json!({"salary": "15000-25000 SAR", "experience_level": "Lead"});
        store.upsert(&r).unwrap();
        let loaded = store.get_by_id(&r.id).unwrap().unwrap();
        assert_eq!(loaded.raw_extra, r.raw_extra);
    }
}
