//! Indeed listing pages.

use scraper::{Html, Selector};

use super::{element_text, resolve_url, ParseError, SourceAdapter};
use crate::models::{JobSource, RawPosting};

/// Results per listing page; Indeed paginates with a `start` offset.
const PAGE_STRIDE: u32 = 10;

/// Adapter for Indeed country portals (`https://{country}.indeed.com`).
pub struct IndeedAdapter {
    base_url: String,
}

impl IndeedAdapter {
    /// `country` is the portal subdomain, e.g. "sa" or "www".
    pub fn new(country: &str) -> Self {
        Self {
            base_url: format!("https://{country}.indeed.com"),
        }
    }

    fn selector(css: &str) -> Selector {
        Selector::parse(css).expect("static selector")
    }
}

impl SourceAdapter for IndeedAdapter {
    fn source(&self) -> JobSource {
        JobSource::Indeed
    }

    fn page_url(&self, query: &str, location: &str, page: u32) -> String {
        let start = page.saturating_sub(1) * PAGE_STRIDE;
        format!(
            "{}/jobs?q={}&l={}&start={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(location),
            start
        )
    }

    fn parse_page(&self, body: &str) -> Result<Vec<RawPosting>, ParseError> {
        let document = Html::parse_document(body);
        let card_sel = Self::selector("div.job_seen_beacon");
        let title_sel = Self::selector("h2.jobTitle");
        let link_sel = Self::selector("h2.jobTitle a");
        let company_sel = Self::selector("span.companyName");
        let location_sel = Self::selector("div.companyLocation");
        let snippet_sel = Self::selector("div.job-snippet");

        let cards: Vec<_> = document.select(&card_sel).collect();
        if cards.is_empty() {
            // No job cards: past the last page of results.
            return Ok(Vec::new());
        }

        let mut postings = Vec::with_capacity(cards.len());
        for card in &cards {
            let title = card
                .select(&title_sel)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default();
            let company = card
                .select(&company_sel)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default();
            if title.is_empty() && company.is_empty() {
                continue;
            }

            let mut posting = RawPosting::new(title, company);
            posting.location = card
                .select(&location_sel)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default();
            posting.description = card
                .select(&snippet_sel)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default();
            posting.source_url = card
                .select(&link_sel)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| resolve_url(&self.base_url, href));
            postings.push(posting);
        }

        if postings.is_empty() {
            // Cards were present but none carried a title or company:
            // the markup has drifted from what this adapter expects.
            return Err(ParseError::UnexpectedStructure(
                "job cards present but no title/company fields found".to_string(),
            ));
        }
        Ok(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="job_seen_beacon">
            <h2 class="jobTitle"><a href="/rc/clk?jk=abc123"><span>Data Scientist</span></a></h2>
            <span class="companyName">Saudi Aramco</span>
            <div class="companyLocation">Riyadh</div>
            <div class="job-snippet">Python, SQL, and  machine learning.</div>
          </div>
          <div class="job_seen_beacon">
            <h2 class="jobTitle"><a href="/rc/clk?jk=def456">ML Engineer</a></h2>
            <span class="companyName">STC</span>
            <div class="companyLocation">Jeddah</div>
          </div>
        </body></html>"#;

    #[test]
    fn test_page_url_offsets_by_ten() {
        let adapter = IndeedAdapter::new("sa");
        assert_eq!(
            adapter.page_url("data scientist", "riyadh", 1),
            "https://sa.indeed.com/jobs?q=data%20scientist&l=riyadh&start=0"
        );
        assert_eq!(
            adapter.page_url("data scientist", "riyadh", 3),
            "https://sa.indeed.com/jobs?q=data%20scientist&l=riyadh&start=20"
        );
    }

    #[test]
    fn test_parse_cards() {
        let adapter = IndeedAdapter::new("sa");
        let postings = adapter.parse_page(PAGE).unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].title, "Data Scientist");
        assert_eq!(postings[0].company, "Saudi Aramco");
        assert_eq!(postings[0].location, "Riyadh");
        assert_eq!(postings[0].description, "Python, SQL, and machine learning.");
        assert_eq!(
            postings[0].source_url.as_deref(),
            Some("https://sa.indeed.com/rc/clk?jk=abc123")
        );
        // Second card has no snippet; description stays empty.
        assert_eq!(postings[1].description, "");
    }

    #[test]
    fn test_empty_page_means_end_of_listings() {
        let adapter = IndeedAdapter::new("sa");
        let postings = adapter.parse_page("<html><body></body></html>").unwrap();
        assert!(postings.is_empty());
    }

    #[test]
    fn test_drifted_markup_is_a_parse_error() {
        let adapter = IndeedAdapter::new("sa");
        let drifted = r#"<div class="job_seen_beacon"><span class="totally-new">x</span></div>"#;
        assert!(matches!(
            adapter.parse_page(drifted),
            Err(ParseError::UnexpectedStructure(_))
        ));
    }
}
