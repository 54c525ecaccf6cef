//! Custom error types for scholar-harvest.
//!
//! Only a handful of conditions are fatal to a run (bad configuration, an
//! unreadable dataset, a failed persist). Fetch errors are carried through
//! this type too, but the run loop logs and counts them instead of bailing.

use thiserror::Error;

/// Main error type for scholar-harvest operations.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Fetch collaborator failed to produce a page
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP error: {code} - {message}")]
    Http {
        /// Status code
        code: u16,
        /// Reason text
        message: String,
    },

    /// Rate limited by the search engine
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// The engine served its unusual-traffic interstitial instead of results
    #[error("CAPTCHA page served instead of results")]
    Captcha,

    /// Markup or persisted value could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset file read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

impl ScrapeError {
    /// Whether the error belongs to the transient fetch class: the unit of
    /// work that hit it yields no data and the run moves on.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScrapeError::Fetch(_)
                | ScrapeError::Network(_)
                | ScrapeError::Http { .. }
                | ScrapeError::RateLimited(_)
                | ScrapeError::Captcha
        )
    }
}

/// Result type alias using `ScrapeError`
pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ScrapeError::Captcha.is_transient());
        assert!(ScrapeError::Fetch("boom".into()).is_transient());
        assert!(!ScrapeError::Config("bad".into()).is_transient());
        assert!(!ScrapeError::Parse("bad".into()).is_transient());
    }
}
