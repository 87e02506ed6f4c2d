//! A library for curating arXiv literature for a research project.
//!
//! The pipeline runs in a fixed order:
//! 1. [`clients::ArxivClient`] searches arXiv and parses the Atom feed into [`Paper`] records.
//! 2. [`scoring`] assigns each paper a heuristic relevance score between 4 and 10.
//! 3. [`query`] merges the relevant papers into a per-topic [`MetadataStore`].
//! 4. [`fetch::PdfFetcher`] downloads PDFs for high-scoring papers and flags them in their store.
//! 5. [`bibtex`] reads every store and writes a single bibliography file.
//!
//! # Example
//! ```rust,no_run
//! use curator::{config::Config, fetch::PdfFetcher};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!   let config = Config::load_or_default(None)?;
//!   let fetcher = PdfFetcher::new(&config.http, &config.download)?;
//!   let report = fetcher.download_all(&config.archive_root, config.download.min_score).await?;
//!   println!("Downloaded {} PDFs", report.downloaded);
//!
//!   Ok(())
//! }
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
#[cfg(test)] use tracing_test::traced_test;

pub mod bibtex;
pub mod clients;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod format;
pub mod paper;
pub mod query;
pub mod scoring;
pub mod store;

use clients::arxiv::ArxivClient;
use errors::CuratorError;
pub use paper::{IntegrationStatus, Paper, ScoringBreakdown};
pub use store::MetadataStore;
