//! LinkedIn placeholder adapter.
//!
//! LinkedIn requires authentication and actively blocks scrapers, so this
//! adapter never fetches. The supported path for LinkedIn data is ingesting
//! an exported CSV (`JobSource::LinkedinCsv`) through the ingest pipeline.

use async_trait::async_trait;
use tracing::warn;

use super::{PageError, ParseError, SourceAdapter};
use crate::fetch::Fetcher;
use crate::models::{JobSource, RawPosting};

pub struct LinkedInAdapter;

#[async_trait]
impl SourceAdapter for LinkedInAdapter {
    fn source(&self) -> JobSource {
        JobSource::LinkedinCsv
    }

    fn page_url(&self, query: &str, location: &str, _page: u32) -> String {
        format!(
            "https://www.linkedin.com/jobs/search?keywords={}&location={}",
            urlencoding::encode(query),
            urlencoding::encode(location)
        )
    }

    fn parse_page(&self, _body: &str) -> Result<Vec<RawPosting>, ParseError> {
        Ok(Vec::new())
    }

    async fn list_page(
        &self,
        _fetcher: &Fetcher,
        _query: &str,
        _location: &str,
        page: u32,
    ) -> Result<Vec<RawPosting>, PageError> {
        if page == 1 {
            warn!("LinkedIn blocks unauthenticated scraping; ingest an exported CSV instead");
        }
        Ok(Vec::new())
    }
}
