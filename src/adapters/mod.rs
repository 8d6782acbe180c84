//! Source adapters: one per job site.
//!
//! Each adapter owns the mapping from (query, location, page) to a request
//! URL and from a response body to raw postings. That mapping is the part
//! most likely to break when a site changes its markup, so it is isolated
//! per adapter and never shared. Adapters emit [`RawPosting`]s only; the
//! dedup identity is computed downstream by the normalizer.

mod bayt;
mod indeed;
mod linkedin;
mod sample;

pub use bayt::BaytAdapter;
pub use indeed::IndeedAdapter;
pub use linkedin::LinkedInAdapter;
pub use sample::SampleAdapter;

use async_trait::async_trait;
use thiserror::Error;

use crate::fetch::{FetchError, Fetcher};
use crate::models::{JobSource, RawPosting};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The page did not look like a listing page at all (site drift,
    /// interstitial, block page).
    #[error("unexpected page structure: {0}")]
    UnexpectedStructure(String),
}

/// Why a single page produced no postings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Capability set every job source implements.
///
/// Pages are 1-based and only restartable from page 1; there is no
/// resume-from-page cursor.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which [`JobSource`] records from this adapter carry.
    fn source(&self) -> JobSource;

    /// Request URL for one result page.
    fn page_url(&self, query: &str, location: &str, page: u32) -> String;

    /// Extract raw postings from a response body.
    ///
    /// An empty result means the listing ran out of pages; an error means
    /// the page structure was not recognized.
    fn parse_page(&self, body: &str) -> Result<Vec<RawPosting>, ParseError>;

    /// Fetch and parse one page through the shared fetcher.
    ///
    /// Adapters without a network side (sample data) override this.
    async fn list_page(
        &self,
        fetcher: &Fetcher,
        query: &str,
        location: &str,
        page: u32,
    ) -> Result<Vec<RawPosting>, PageError> {
        let url = self.page_url(query, location, page);
        let fetched = fetcher.fetch(&url).await?;
        Ok(self.parse_page(&fetched.body)?)
    }
}

/// Collect the visible text of an element, whitespace-joined.
pub(crate) fn element_text(element: &scraper::ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve a possibly-relative href against a base URL.
pub(crate) fn resolve_url(base: &str, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    url::Url::parse(base)
        .ok()?
        .join(href)
        .ok()
        .map(|u| u.to_string())
}
