//! Raw posting to canonical record normalization.
//!
//! Pure functions: the same raw posting and timestamp always produce the
//! same record, and the record identifier depends only on the normalized
//! (title, company, location, source) tuple.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::{JobRecord, JobSource, RawPosting};

/// Separator between identity fields inside the hash preimage.
/// A control character cannot appear in collapsed text, so distinct
/// tuples can never collide by concatenation.
const FIELD_SEP: char = '\x1f';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// The posting carries neither a title nor a company, so there is
    /// nothing to identify it by.
    #[error("posting has no title and no company")]
    MissingIdentity,
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key form of a display string: collapsed and case-folded.
///
/// Used only for identity computation; stored records keep original case.
pub fn fold_key(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

/// Compute the content-derived record identifier.
///
/// Deterministic over the normalized (title, company, location, source)
/// tuple. Description, URLs, and timestamps never influence it.
pub fn record_id(title: &str, company: &str, location: &str, source: JobSource) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fold_key(title).as_bytes());
    hasher.update([FIELD_SEP as u8]);
    hasher.update(fold_key(company).as_bytes());
    hasher.update([FIELD_SEP as u8]);
    hasher.update(fold_key(location).as_bytes());
    hasher.update([FIELD_SEP as u8]);
    hasher.update(source.as_str().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..32].to_string()
}

/// Map a raw posting into the canonical record shape.
///
/// `scraped_at` is supplied by the caller so the function stays
/// deterministic and testable. Optional fields that are missing stay
/// absent; no placeholder sentinels are introduced.
pub fn normalize(
    raw: &RawPosting,
    source: JobSource,
    scraped_at: DateTime<Utc>,
) -> Result<JobRecord, NormalizeError> {
    let title = collapse_whitespace(&raw.title);
    let company = collapse_whitespace(&raw.company);
    if title.is_empty() && company.is_empty() {
        return Err(NormalizeError::MissingIdentity);
    }

    let location = collapse_whitespace(&raw.location);
    let raw_extra = match &raw.extra {
        serde_json::Value::Object(map) if !map.is_empty() => {
            serde_json::Value::Object(map.clone())
        }
        _ => serde_json::json!({}),
    };

    Ok(JobRecord {
        id: record_id(&title, &company, &location, source),
        title,
        company,
        location,
        description: collapse_whitespace(&raw.description),
        source,
        source_url: raw
            .source_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from),
        posted_date: raw.posted_date,
        scraped_at,
        raw_extra,
    })
}
