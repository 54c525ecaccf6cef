//! Run configuration.

use crate::error::{Result, ScrapeError};
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Search used when no URL is given
pub const DEFAULT_TARGET_URL: &str = "https://scholar.google.com/scholar?start=0&q=%22autism%22+and+%22bangladesh%22&hl=en&as_sdt=0,48&as_ylo=2020&as_yhi=2025&as_rr=1&as_vis=1";

/// Default dataset file
pub const DEFAULT_DATASET_PATH: &str = "scrapped_gscholar.csv";

/// Default bibliography file
pub const DEFAULT_BIBLIOGRAPHY_PATH: &str = "scrapped_gscholar.bib";

/// Options for one scraping run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Search results URL; its `start` parameter seeds a fresh run
    pub target_url: String,
    /// Pages dispatched in bounded mode
    pub page_count: u32,
    /// Pages in flight at once in bounded mode
    pub concurrency: usize,
    /// Fetch each new result's own page for abstract, keywords and DOI
    pub detail_enrichment_enabled: bool,
    /// Lower bound of the politeness delay before each page fetch
    pub min_wait_seconds: f64,
    /// Upper bound of the politeness delay before each page fetch
    pub max_wait_seconds: f64,
    pub dataset_path: PathBuf,
    pub bibliography_path: PathBuf,
    /// Proxy URL (e.g., "socks5://127.0.0.1:9050")
    pub proxy: Option<String>,
    /// Page budget in sequential mode; `None` runs until results run out
    pub max_pages: Option<u32>,
    /// Sequential mode gives up after this many failed pages in a row
    pub max_consecutive_failures: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            page_count: 10,
            concurrency: 5,
            detail_enrichment_enabled: true,
            min_wait_seconds: 2.0,
            max_wait_seconds: 5.0,
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            bibliography_path: PathBuf::from(DEFAULT_BIBLIOGRAPHY_PATH),
            proxy: None,
            max_pages: None,
            max_consecutive_failures: 3,
        }
    }
}

impl RunConfig {
    /// Reject settings a run cannot honour.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.target_url).map_err(|e| {
            ScrapeError::Config(format!("Invalid target URL '{}': {}", self.target_url, e))
        })?;

        if self.page_count == 0 {
            return Err(ScrapeError::Config("page_count must be at least 1".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ScrapeError::Config("concurrency must be at least 1".to_string()));
        }
        if self.max_consecutive_failures == 0 {
            return Err(ScrapeError::Config(
                "max_consecutive_failures must be at least 1".to_string(),
            ));
        }
        if !(self.min_wait_seconds >= 0.0 && self.min_wait_seconds <= self.max_wait_seconds) {
            return Err(ScrapeError::Config(format!(
                "wait bounds must satisfy 0 <= min <= max, got {} and {}",
                self.min_wait_seconds, self.max_wait_seconds
            )));
        }
        Ok(())
    }

    /// A random delay within the configured wait bounds.
    pub fn politeness_delay(&self) -> Duration {
        let min = self.min_wait_seconds.max(0.0);
        let max = self.max_wait_seconds.max(min);
        let secs = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        Duration::from_secs_f64(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_count, 10);
        assert_eq!(config.concurrency, 5);
        assert!(config.detail_enrichment_enabled);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_workers = RunConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(zero_workers.validate(), Err(ScrapeError::Config(_))));

        let inverted_wait = RunConfig {
            min_wait_seconds: 9.0,
            max_wait_seconds: 1.0,
            ..Default::default()
        };
        assert!(inverted_wait.validate().is_err());

        let bad_url = RunConfig {
            target_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_politeness_delay_within_bounds() {
        let config = RunConfig {
            min_wait_seconds: 0.5,
            max_wait_seconds: 1.0,
            ..Default::default()
        };
        for _ in 0..20 {
            let delay = config.politeness_delay();
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_secs(1));
        }

        let fixed = RunConfig {
            min_wait_seconds: 0.0,
            max_wait_seconds: 0.0,
            ..Default::default()
        };
        assert_eq!(fixed.politeness_delay(), Duration::ZERO);
    }
}
