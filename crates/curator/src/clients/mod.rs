//! Clients for the remote services the pipeline talks to.
//!
//! - [`arxiv`] - search client for the arXiv Atom feed API
//!
//! # Examples
//!
//! ```no_run
//! use curator::{clients::ArxivClient, config::Config};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let client = ArxivClient::new(&config.http, &config.arxiv.base_url)?;
//! let papers = client.search("cat:cs.GT AND ti:voting", 10).await?;
//! # Ok(())
//! # }
//! ```

use quick_xml::de::from_str;

pub mod arxiv;

pub use arxiv::ArxivClient;

use super::*;

/// Builds the HTTP client shared by the arXiv client and the PDF fetcher.
pub(crate) fn http_client(http: &config::HttpConfig) -> Result<reqwest::Client, CuratorError> {
  Ok(
    reqwest::Client::builder()
      .user_agent(http.user_agent.clone())
      .timeout(http.timeout())
      .build()?,
  )
}
