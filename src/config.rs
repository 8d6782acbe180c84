//! Application settings.

use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::FetchConfig;
use crate::store::{JobStore, StoreResult};

/// Default database filename inside the data directory.
pub const DEFAULT_DATABASE_FILENAME: &str = "jobs.db";

/// Application settings.
///
/// Explicitly constructed and passed down; nothing reads global state
/// after construction.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Lower bound of the jittered delay between requests, milliseconds.
    pub min_delay_ms: u64,
    /// Upper bound of the jittered delay between requests, milliseconds.
    pub max_delay_ms: u64,
    /// Retries allowed per request after the initial attempt.
    pub max_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/.local/share/jobharvest (or the platform
        // equivalent), falling back to home dir, then current dir.
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jobharvest");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            user_agent: "jobharvest/0.3 (job market research)".to_string(),
            request_timeout: 10,
            min_delay_ms: 3_000,
            max_delay_ms: 7_000,
            max_retries: 2,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Defaults overlaid with `JOBS_*` environment variables.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(dir) = std::env::var("JOBS_DATA_DIR") {
            if !dir.is_empty() {
                settings.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(agent) = std::env::var("JOBS_USER_AGENT") {
            if !agent.is_empty() {
                settings.user_agent = agent;
            }
        }
        settings.request_timeout =
            env_u64("JOBS_REQUEST_TIMEOUT_SECS", settings.request_timeout);
        settings.min_delay_ms = env_u64("JOBS_MIN_DELAY_MS", settings.min_delay_ms);
        settings.max_delay_ms = env_u64("JOBS_MAX_DELAY_MS", settings.max_delay_ms);
        settings.max_retries = env_u64("JOBS_MAX_RETRIES", settings.max_retries as u64) as u32;
        settings
    }

    /// Full path to the store database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Check if the database appears to be initialized.
    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create data directory '{}': {}",
                    self.data_dir.display(),
                    e
                ),
            )
        })
    }

    /// Fetcher policy derived from these settings.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.min_delay_ms)),
            timeout: Duration::from_secs(self.request_timeout),
            max_retries: self.max_retries,
            ..FetchConfig::default()
        }
    }

    /// Open the store at the configured path, creating it when absent.
    pub fn open_store(&self) -> StoreResult<JobStore> {
        JobStore::open(&self.database_path())
    }
}

fn env_u64(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path_joins_filename() {
        let settings = Settings::with_data_dir(PathBuf::from("/tmp/jh-test"));
        assert_eq!(
            settings.database_path(),
            PathBuf::from("/tmp/jh-test/jobs.db")
        );
    }

    #[test]
    fn test_fetch_config_keeps_bounds_ordered() {
        let settings = Settings {
            min_delay_ms: 5_000,
            max_delay_ms: 1_000,
            ..Settings::with_data_dir(PathBuf::from("/tmp"))
        };
        let config = settings.fetch_config();
        assert!(config.max_delay >= config.min_delay);
    }
}
