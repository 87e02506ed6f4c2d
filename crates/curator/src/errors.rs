//! Error types for the curator library.
//!
//! A single error enum covers every failure mode of the pipeline:
//! - Network and HTTP protocol errors while querying arXiv or fetching PDFs
//! - Reading and writing metadata stores and configuration files
//! - Malformed feeds and configuration
//!
//! # Examples
//!
//! ```no_run
//! use curator::{config::Config, errors::CuratorError, fetch::PdfFetcher, Paper};
//!
//! # async fn example(paper: Paper) -> Result<(), CuratorError> {
//! let config = Config::default();
//! let fetcher = PdfFetcher::new(&config.http, &config.download)?;
//! match fetcher.fetch(&paper, "pdfs".as_ref()).await {
//!   Ok(outcome) => println!("{outcome:?}"),
//!   Err(e) if e.is_rate_limited() => println!("Slow down!"),
//!   Err(e) => println!("Download failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

/// Errors that can occur while curating papers.
///
/// Per-paper failures (network, HTTP status) are usually caught by the batch
/// drivers and recorded in their reports. Filesystem failures on the stores
/// themselves are returned to the caller.
#[derive(Error, Debug)]
pub enum CuratorError {
  /// A network request failed.
  ///
  /// This covers connection failures, timeouts and TLS errors, as well as
  /// failures while reading a response body.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// The server answered with a non-success status code.
  #[error("HTTP {0}")]
  HttpStatus(u16),

  /// The server answered with `429 Too Many Requests`.
  #[error("HTTP 429: rate limited")]
  RateLimited,

  /// An API returned a response that could not be interpreted.
  ///
  /// The string parameter carries the parser's message for debugging.
  #[error("API error: {0}")]
  ApiError(String),

  /// A query set or query with this name is not configured.
  #[error("Unknown query set: {0}")]
  UnknownQuery(String),

  /// A configuration value is out of range or inconsistent.
  #[error("Invalid configuration: {0}")]
  InvalidConfig(String),

  /// Failed to build a request URL.
  #[error(transparent)]
  InvalidUrl(#[from] url::ParseError),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// A metadata store could not be parsed or serialized.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// The configuration file could not be parsed.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// The configuration could not be serialized.
  #[error(transparent)]
  TomlSer(#[from] toml::ser::Error),

  /// A store discovery pattern was malformed.
  #[error(transparent)]
  Glob(#[from] glob::PatternError),

  /// A temporary file could not be moved over its target.
  #[error(transparent)]
  Persist(#[from] tempfile::PersistError),
}

impl CuratorError {
  /// Checks if this error represents a `429 Too Many Requests` answer.
  ///
  /// Batch drivers use this to tell a throttled item apart from an ordinary
  /// failure when reporting.
  pub fn is_rate_limited(&self) -> bool { matches!(self, CuratorError::RateLimited) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rate_limited_is_distinguished() {
    assert!(CuratorError::RateLimited.is_rate_limited());
    assert!(!CuratorError::HttpStatus(404).is_rate_limited());
    assert_eq!(CuratorError::HttpStatus(503).to_string(), "HTTP 503");
  }
}
