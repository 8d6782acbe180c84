//! Deterministic sample-data source.
//!
//! Generates plausible job postings without touching the network, mainly
//! for trying out the pipeline before pointing it at a real site. It is a
//! [`SourceAdapter`] like any other (`source = sample`): the orchestrator,
//! pipeline, and store treat it identically to network-backed sources.

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{PageError, ParseError, SourceAdapter};
use crate::fetch::Fetcher;
use crate::models::{JobSource, RawPosting};

const PAGE_SIZE: usize = 50;

const COMPANIES: &[&str] = &[
    "Saudi Aramco",
    "SDAIA",
    "STC",
    "Thmanyah",
    "Nana",
    "Jahez",
    "Tamatem",
    "Rewaa",
    "Hungerstation",
    "Noon",
    "Mrsool",
    "Seez",
];

const CITIES: &[&str] = &[
    "Riyadh", "Jeddah", "Dammam", "Khobar", "Dhahran", "Mecca", "Medina",
];

const TITLES: &[&str] = &[
    "Data Scientist",
    "Machine Learning Engineer",
    "Data Analyst",
    "Software Engineer",
    "Full Stack Developer",
    "DevOps Engineer",
    "Cloud Architect",
    "AI Engineer",
    "Business Intelligence Analyst",
    "Backend Developer",
    "Frontend Developer",
    "Data Engineer",
];

const DESCRIPTIONS: &[&str] = &[
    "Seeking experienced professional with Python, SQL, Machine Learning, TensorFlow, AWS skills",
    "Looking for talented engineer. Required: Java, Spring Boot, Kubernetes, Docker, Microservices",
    "Join our AI team! Skills needed: Python, PyTorch, NLP, Computer Vision, Deep Learning",
    "Data role requiring SQL, Tableau, Power BI, Excel, Python, Statistical Analysis",
    "Full stack position. React, Node.js, MongoDB, JavaScript, TypeScript, REST APIs",
    "Cloud engineer needed. AWS, Azure, Terraform, Kubernetes, CI/CD, DevOps practices",
    "Senior role requiring Python, Spark, Hadoop, Kafka, ETL, Data Pipeline design",
    "Exciting opportunity! Java, Python, SQL, Agile, Git, Problem Solving required",
];

const SALARIES: &[&str] = &["", "15000-25000 SAR", "20000-35000 SAR", "30000-50000 SAR"];

const EXPERIENCE_LEVELS: &[&str] = &["Entry Level", "Mid Level", "Senior Level", "Lead"];

/// Generates `count` postings across pages of 50, deterministically for a
/// given seed.
pub struct SampleAdapter {
    count: usize,
    seed: u64,
}

impl SampleAdapter {
    pub fn new(count: usize, seed: u64) -> Self {
        Self { count, seed }
    }

    fn generate(&self, page: u32, n: usize) -> Vec<RawPosting> {
        // Seed per page so any page can be produced independently.
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(page as u64));
        (0..n)
            .map(|_| {
                let pick = |items: &[&str], rng: &mut StdRng| -> String {
                    items[rng.gen_range(0..items.len())].to_string()
                };
                let month = rng.gen_range(1..=12u32);
                let day = rng.gen_range(1..=28u32);
                let mut posting =
                    RawPosting::new(pick(TITLES, &mut rng), pick(COMPANIES, &mut rng));
                posting.location = format!("{}, Saudi Arabia", pick(CITIES, &mut rng));
                posting.description = pick(DESCRIPTIONS, &mut rng);
                posting.posted_date = NaiveDate::from_ymd_opt(2024, month, day);
                posting.extra = serde_json::json!({
                    "salary": pick(SALARIES, &mut rng),
                    "experience_level": pick(EXPERIENCE_LEVELS, &mut rng),
                });
                posting
            })
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for SampleAdapter {
    fn source(&self) -> JobSource {
        JobSource::Sample
    }

    fn page_url(&self, _query: &str, _location: &str, page: u32) -> String {
        format!("sample://jobs?page={page}")
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
        let start = (page.saturating_sub(1) as usize) * PAGE_SIZE;
        if start >= self.count {
            return Ok(Vec::new());
        }
        let n = PAGE_SIZE.min(self.count - start);
        Ok(self.generate(page, n))
    }
}
