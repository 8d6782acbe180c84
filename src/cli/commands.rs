//! CLI commands implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::adapters::{BaytAdapter, IndeedAdapter, LinkedInAdapter, SampleAdapter, SourceAdapter};
use crate::config::Settings;
use crate::ingest;
use crate::models::{JobSource, MergeSummary};
use crate::orchestrate::{self, CancelToken, ScrapeOutcome};
use crate::store::{ExportFormat, JobQuery, JobStore};

/// Sample pages carry 50 postings each.
const SAMPLE_PAGE_SIZE: u32 = 50;

#[derive(Parser)]
#[command(name = "jobs")]
#[command(about = "Job market data acquisition and storage system")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Scrape job postings from one or more sources
    Scrape {
        /// Sources to scrape (indeed, bayt, linkedin, sample)
        sources: Vec<String>,
        /// Scrape all network sources
        #[arg(short, long)]
        all: bool,
        /// Job title or keywords
        #[arg(short, long, default_value = "software engineer")]
        query: String,
        /// City or region
        #[arg(short, long, default_value = "riyadh")]
        location: String,
        /// Number of result pages per source
        #[arg(short, long, default_value = "3")]
        pages: u32,
        /// Indeed country portal (subdomain)
        #[arg(long, default_value = "sa")]
        country: String,
        /// Bayt country section (path slug)
        #[arg(long, default_value = "saudi-arabia")]
        region: String,
    },

    /// Generate deterministic sample data into the store
    Sample {
        /// Number of postings to generate
        #[arg(short, long, default_value = "500")]
        count: u32,
        /// RNG seed; the same seed yields the same postings
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Ingest a CSV file of job postings
    Ingest {
        /// CSV file to ingest
        file: PathBuf,
        /// Source to assume for rows without a recognizable source column
        #[arg(short, long, default_value = "manual")]
        source: String,
    },

    /// Merge several CSV files into the store
    Merge {
        /// CSV files to merge, ingested in order
        files: Vec<PathBuf>,
        /// Source to assume for rows without a recognizable source column
        #[arg(short, long, default_value = "manual")]
        source: String,
    },

    /// Query stored records
    Query {
        /// Title substring (case-insensitive)
        #[arg(short, long)]
        title: Option<String>,
        /// Location substring (case-insensitive)
        #[arg(short, long)]
        location: Option<String>,
        /// Restrict to one source
        #[arg(short, long)]
        source: Option<String>,
        /// Only postings dated on/after this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// Only postings dated on/before this date (YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,
        /// Maximum rows to print (0 = unlimited)
        #[arg(short = 'n', long, default_value = "25")]
        limit: usize,
    },

    /// Export the full store snapshot
    Export {
        /// Output file path
        path: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = CliExportFormat::Csv)]
        format: CliExportFormat,
    },

    /// Show store statistics
    Stats,

    /// Re-key all records and merge duplicates
    Dedup,

    /// Delete every record from the store
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliExportFormat {
    Csv,
    Json,
}

impl From<CliExportFormat> for ExportFormat {
    fn from(format: CliExportFormat) -> Self {
        match format {
            CliExportFormat::Csv => ExportFormat::Csv,
            CliExportFormat::Json => ExportFormat::Json,
        }
    }
}

/// Parse and dispatch the command line.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    match cli.command {
        Commands::Init => cmd_init(&settings),
        Commands::Scrape {
            sources,
            all,
            query,
            location,
            pages,
            country,
            region,
        } => {
            cmd_scrape(
                &settings, sources, all, &query, &location, pages, &country, &region,
            )
            .await
        }
        Commands::Sample { count, seed } => cmd_sample(&settings, count, seed).await,
        Commands::Ingest { file, source } => cmd_ingest(&settings, &[file], &source),
        Commands::Merge { files, source } => cmd_ingest(&settings, &files, &source),
        Commands::Query {
            title,
            location,
            source,
            since,
            until,
            limit,
        } => cmd_query(&settings, title, location, source, since, until, limit),
        Commands::Export { path, format } => cmd_export(&settings, &path, format.into()),
        Commands::Stats => cmd_stats(&settings),
        Commands::Dedup => cmd_dedup(&settings),
        Commands::Clear { yes } => cmd_clear(&settings, yes),
    }
}

fn open_store(settings: &Settings) -> anyhow::Result<JobStore> {
    settings.ensure_directories()?;
    Ok(settings.open_store()?)
}

fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let store = settings.open_store()?;
    println!(
        "{} Initialized store at {}",
        style("✓").green(),
        style(store.path().display()).cyan()
    );
    Ok(())
}

fn parse_source(name: &str) -> anyhow::Result<JobSource> {
    JobSource::parse_flexible(name)
        .with_context(|| format!("unknown source '{name}' (expected indeed, bayt, linkedin, sample, or manual)"))
}

#[allow(clippy::too_many_arguments)]
async fn cmd_scrape(
    settings: &Settings,
    sources: Vec<String>,
    all: bool,
    query: &str,
    location: &str,
    pages: u32,
    country: &str,
    region: &str,
) -> anyhow::Result<()> {
    let names: Vec<String> = if all {
        vec!["indeed".to_string(), "bayt".to_string()]
    } else if sources.is_empty() {
        anyhow::bail!("no sources given; name at least one or pass --all");
    } else {
        sources
    };

    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(names.len());
    for name in &names {
        let adapter: Arc<dyn SourceAdapter> = match parse_source(name)? {
            JobSource::Indeed => Arc::new(IndeedAdapter::new(country)),
            JobSource::Bayt => Arc::new(BaytAdapter::new(region)),
            JobSource::LinkedinCsv => Arc::new(LinkedInAdapter),
            JobSource::Sample => Arc::new(SampleAdapter::new(
                (pages * SAMPLE_PAGE_SIZE) as usize,
                42,
            )),
            JobSource::Manual => anyhow::bail!("'manual' is not a scrapeable source"),
        };
        adapters.push(adapter);
    }

    let store = open_store(settings)?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nStopping after the current page...");
                cancel.cancel();
            }
        });
    }

    println!(
        "{} Scraping {} for '{}' in '{}' ({} pages max)",
        style("→").cyan(),
        names.join(", "),
        query,
        location,
        pages
    );

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {msg}").expect("progress template"));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("fetching pages...");

    let results = orchestrate::run_many(
        adapters,
        settings.fetch_config(),
        &settings.user_agent,
        query,
        location,
        pages,
        &cancel,
    )
    .await;
    pb.finish_and_clear();

    let mut total = MergeSummary::default();
    let mut any_ok = false;
    for (name, result) in names.iter().zip(results) {
        match result {
            Ok(ScrapeOutcome { records, summary }) => {
                any_ok = true;
                let written = ingest::ingest_records(&store, records)?;
                total.absorb(written);
                println!(
                    "{} {}: {} records from {} pages ({} parse failures, {} fetch failures) in {:.1}s{}",
                    style("✓").green(),
                    name,
                    summary.parsed_ok,
                    summary.pages_fetched,
                    summary.parse_failed,
                    summary.fetch_failed,
                    summary.duration.as_secs_f64(),
                    if summary.cancelled { " [cancelled]" } else { "" },
                );
            }
            Err(e) => {
                println!("{} {}: {}", style("✗").red(), name, e);
            }
        }
    }

    if !any_ok {
        anyhow::bail!("every source failed");
    }
    println!(
        "{} Stored {} new, {} updated",
        style("✓").green(),
        total.inserted,
        total.updated
    );
    Ok(())
}

async fn cmd_sample(settings: &Settings, count: u32, seed: u64) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let adapter = SampleAdapter::new(count as usize, seed);
    let fetcher = crate::fetch::Fetcher::new(settings.fetch_config(), &settings.user_agent);
    let pages = count.div_ceil(SAMPLE_PAGE_SIZE).max(1);

    let outcome = orchestrate::run(&adapter, &fetcher, "", "", pages, &CancelToken::new()).await?;
    let summary = ingest::ingest_records(&store, outcome.records)?;
    println!(
        "{} Generated {} sample postings: {} new, {} merged into existing rows",
        style("✓").green(),
        outcome.summary.parsed_ok,
        summary.inserted,
        summary.updated
    );
    Ok(())
}

fn cmd_ingest(settings: &Settings, files: &[PathBuf], source: &str) -> anyhow::Result<()> {
    if files.is_empty() {
        anyhow::bail!("no input files given");
    }
    let default_source = parse_source(source)?;
    let store = open_store(settings)?;

    let paths: Vec<&std::path::Path> = files.iter().map(PathBuf::as_path).collect();
    let summary = ingest::merge_files(&store, &paths, default_source)?;
    println!(
        "{} Ingested {} file(s): {} new, {} updated, {} skipped as invalid",
        style("✓").green(),
        files.len(),
        summary.inserted,
        summary.updated,
        summary.skipped_invalid
    );
    Ok(())
}

fn cmd_query(
    settings: &Settings,
    title: Option<String>,
    location: Option<String>,
    source: Option<String>,
    since: Option<String>,
    until: Option<String>,
    limit: usize,
) -> anyhow::Result<()> {
    let store = open_store(settings)?;

    let filter = JobQuery {
        title_contains: title,
        location_contains: location,
        source: source.as_deref().map(parse_source).transpose()?,
        posted_after: parse_date_arg(since.as_deref())?,
        posted_before: parse_date_arg(until.as_deref())?,
    };

    let mut records = store.query(&filter)?;
    let matched = records.len();
    if limit > 0 {
        records.truncate(limit);
    }

    for record in &records {
        let date = record
            .posted_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "no date".to_string());
        println!(
            "{}  {} at {} ({}) [{}] {}",
            style(record.id.get(..8).unwrap_or(&record.id)).dim(),
            style(&record.title).bold(),
            record.company,
            record.location,
            record.source,
            style(date).dim()
        );
    }
    if records.len() < matched {
        println!("... and {} more", matched - records.len());
    }
    println!(
        "{} {} record(s) matched",
        style("✓").green(),
        matched
    );
    Ok(())
}

fn parse_date_arg(arg: Option<&str>) -> anyhow::Result<Option<NaiveDate>> {
    arg.map(|s| {
        s.parse::<NaiveDate>()
            .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
    })
    .transpose()
}

fn cmd_export(settings: &Settings, path: &std::path::Path, format: ExportFormat) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let count = store.export(path, format)?;
    println!(
        "{} Exported {} records to {}",
        style("✓").green(),
        count,
        style(path.display()).cyan()
    );
    Ok(())
}

fn cmd_stats(settings: &Settings) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let stats = store.statistics()?;

    println!("{} Total records: {}", style("•").cyan(), stats.total);
    if stats.total == 0 {
        println!("  Store is empty. Run 'jobs scrape' or 'jobs sample' first.");
        return Ok(());
    }

    println!("\n{} By source:", style("•").cyan());
    for (source, count) in &stats.by_source {
        println!("    {source}: {count}");
    }

    println!("\n{} Top locations:", style("•").cyan());
    for (location, count) in stats.by_location.iter().take(10) {
        println!("    {location}: {count}");
    }

    if let (Some(earliest), Some(latest)) = (stats.earliest_scraped, stats.latest_scraped) {
        println!("\n{} Scraped between:", style("•").cyan());
        println!("    earliest: {earliest}");
        println!("    latest:   {latest}");
    }
    Ok(())
}

fn cmd_dedup(settings: &Settings) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let removed = store.remove_duplicates()?;
    println!(
        "{} Removed {} duplicate record(s)",
        style("✓").green(),
        removed
    );
    Ok(())
}

fn cmd_clear(settings: &Settings, yes: bool) -> anyhow::Result<()> {
    if !yes {
        anyhow::bail!("refusing to clear the store without --yes");
    }
    let store = open_store(settings)?;
    let removed = store.clear()?;
    println!("{} Deleted {} record(s)", style("!").yellow(), removed);
    Ok(())
}
