//! # scholar-harvest
//!
//! Incremental Google Scholar result harvester.
//!
//! ## Modules
//!
//! - [`extract`] - Field extractors for result snippets (year, citations, DOI)
//! - [`detail`] - Best-effort enrichment from a document's own page
//! - [`parser`] - Result and page parsing with identity-based skipping
//! - [`store`] - CSV dataset: load, merge, persist, resume offset
//! - [`bibtex`] - BibTeX export
//! - [`runner`] - Pagination in bounded-parallel and sequential modes
//! - [`fetch`] - Page fetching seam and HTTP implementation
//! - [`config`] - Run configuration
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scholar_harvest::{config::RunConfig, fetch::HttpFetcher, runner, store::DatasetStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RunConfig::default();
//!     let fetcher = HttpFetcher::new(None)?;
//!     let mut store = DatasetStore::load(&config.dataset_path)?;
//!     let summary = runner::run_bounded(&fetcher, &mut store, &config).await?;
//!     println!("Added {} records", summary.records_added);
//!     Ok(())
//! }
//! ```

pub mod bibtex;
pub mod config;
pub mod detail;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod parser;
pub mod record;
pub mod runner;
pub mod store;

pub use error::{Result, ScrapeError};
pub use record::Record;
