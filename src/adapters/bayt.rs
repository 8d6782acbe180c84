//! Bayt.com listing pages.

use scraper::{Html, Selector};

use super::{element_text, resolve_url, ParseError, SourceAdapter};
use crate::models::{JobSource, RawPosting};

const BASE_URL: &str = "https://www.bayt.com";

/// Adapter for Bayt.com country sections (`/en/{country}/jobs/...`).
pub struct BaytAdapter {
    country: String,
}

impl BaytAdapter {
    /// `country` is the path slug, e.g. "saudi-arabia" or "uae".
    pub fn new(country: &str) -> Self {
        Self {
            country: country.to_string(),
        }
    }

    fn selector(css: &str) -> Selector {
        Selector::parse(css).expect("static selector")
    }

    /// Bayt encodes the query in the path as a hyphenated slug.
    fn query_slug(query: &str) -> String {
        query
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl SourceAdapter for BaytAdapter {
    fn source(&self) -> JobSource {
        JobSource::Bayt
    }

    fn page_url(&self, query: &str, _location: &str, page: u32) -> String {
        format!(
            "{}/en/{}/jobs/{}-jobs/?page={}",
            BASE_URL,
            self.country,
            Self::query_slug(query),
            page
        )
    }

    fn parse_page(&self, body: &str) -> Result<Vec<RawPosting>, ParseError> {
        let document = Html::parse_document(body);
        let card_sel = Self::selector("li.has-pointer-d");
        let title_sel = Self::selector("h2");
        let link_sel = Self::selector("h2 a");
        let company_sel = Self::selector("b.t-default");
        let location_sel = Self::selector("span.t-mute");

        let cards: Vec<_> = document.select(&card_sel).collect();
        if cards.is_empty() {
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
            posting.source_url = card
                .select(&link_sel)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| resolve_url(BASE_URL, href));
            postings.push(posting);
        }

        if postings.is_empty() {
            return Err(ParseError::UnexpectedStructure(
                "listing items present but no title/company fields found".to_string(),
            ));
        }
        Ok(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body><ul>
          <li class="has-pointer-d">
            <h2><a href="/en/job/data-analyst-12345/">Data Analyst</a></h2>
            <b class="t-default">Jahez</b>
            <span class="t-mute">Riyadh, Saudi Arabia</span>
          </li>
        </ul></body></html>"#;

    #[test]
    fn test_page_url_slugs_query() {
        let adapter = BaytAdapter::new("saudi-arabia");
        assert_eq!(
            adapter.page_url("Data Scientist", "riyadh", 2),
            "https://www.bayt.com/en/saudi-arabia/jobs/data-scientist-jobs/?page=2"
        );
    }

    #[test]
    fn test_parse_cards() {
        let adapter = BaytAdapter::new("saudi-arabia");
        let postings = adapter.parse_page(PAGE).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].title, "Data Analyst");
        assert_eq!(postings[0].company, "Jahez");
        assert_eq!(postings[0].location, "Riyadh, Saudi Arabia");
        assert_eq!(
            postings[0].source_url.as_deref(),
            Some("https://www.bayt.com/en/job/data-analyst-12345/")
        );
    }

    #[test]
    fn test_empty_page() {
        let adapter = BaytAdapter::new("saudi-arabia");
        assert!(adapter.parse_page("<html></html>").unwrap().is_empty());
    }
}
