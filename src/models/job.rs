//! Canonical job record and the raw posting shape adapters emit.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::JobSource;

/// A posting as extracted from one source's page structure.
///
/// Adapters emit these without any normalization; the dedup identity is
/// computed downstream when the posting becomes a [`JobRecord`].
#[derive(Debug, Clone, Default)]
pub struct RawPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    /// Original listing URL, when the source exposes one.
    pub source_url: Option<String>,
    /// Posting date, when the source exposes one.
    pub posted_date: Option<NaiveDate>,
    /// Source-specific fields not promoted to first-class columns
    /// (salary text, experience level, job type, ...).
    pub extra: serde_json::Value,
}

impl RawPosting {
    pub fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            extra: serde_json::json!({}),
            ..Default::default()
        }
    }
}

/// The canonical, source-independent representation of a job posting.
///
/// `id` is derived from the normalized (title, company, location, source)
/// tuple, so re-ingesting the same logical posting always maps onto the
/// same store row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Content-derived identifier (see `normalize::record_id`).
    pub id: String,
    /// Display title (trimmed, original case).
    pub title: String,
    /// Display company name (trimmed, original case).
    pub company: String,
    /// Display location (trimmed, original case).
    pub location: String,
    /// Free text, may be empty.
    pub description: String,
    /// Which adapter produced this record.
    pub source: JobSource,
    /// Original listing URL, used as a secondary dedup signal.
    pub source_url: Option<String>,
    /// Date the posting went up, absent when the source does not expose it.
    pub posted_date: Option<NaiveDate>,
    /// When this record entered the system (not the posting date).
    pub scraped_at: DateTime<Utc>,
    /// Opaque source-specific fields, preserved for forward compatibility.
    pub raw_extra: serde_json::Value,
}
