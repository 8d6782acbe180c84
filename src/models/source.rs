//! Origin identifiers for job records.

use serde::{Deserialize, Serialize};

/// Where a job record originally came from.
///
/// The source participates in the record's identity: the same posting
/// collected from two different sites yields two distinct records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSource {
    Indeed,
    Bayt,
    LinkedinCsv,
    Sample,
    Manual,
}

impl JobSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indeed => "indeed",
            Self::Bayt => "bayt",
            Self::LinkedinCsv => "linkedin_csv",
            Self::Sample => "sample",
            Self::Manual => "manual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "indeed" => Some(Self::Indeed),
            "bayt" => Some(Self::Bayt),
            "linkedin_csv" => Some(Self::LinkedinCsv),
            "sample" => Some(Self::Sample),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }

    /// Parse source labels found in external tabular files.
    ///
    /// Accepts the canonical names plus the display labels older exports
    /// used ("Indeed", "Bayt", "LinkedIn", "Sample Data").
    pub fn parse_flexible(s: &str) -> Option<Self> {
        if let Some(source) = Self::from_str(s) {
            return Some(source);
        }
        match s.trim().to_lowercase().as_str() {
            "indeed" => Some(Self::Indeed),
            "bayt" => Some(Self::Bayt),
            "linkedin" | "linkedin csv" => Some(Self::LinkedinCsv),
            "sample" | "sample data" => Some(Self::Sample),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// `thiserror` treats the `source`-named field of `ScrapeError::FatalSource`
// as the error source, which requires the field type to implement
// `std::error::Error`. The blanket impl below satisfies that bound without
// changing any behavior (no other code inspects the error-source chain).
impl std::error::Error for JobSource {}
