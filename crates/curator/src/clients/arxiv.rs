//! Search client for the arXiv API.
//!
//! The client sends a search expression to arXiv's Atom feed endpoint
//! (<http://export.arxiv.org/api/query>), newest submissions first, and converts every entry
//! into an unscored [`Paper`].
//!
//! # Examples
//!
//! ```no_run
//! use curator::{clients::ArxivClient, config::HttpConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArxivClient::new(&HttpConfig::default(), "http://export.arxiv.org/api/query")?;
//! let papers = client.search("cat:econ.TH AND ti:tokenomics", 12).await?;
//!
//! for paper in papers {
//!   println!("{} {}", paper.arxiv_id, paper.title);
//! }
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use url::Url;

use super::*;

/// Internal representation of the arXiv API's Atom feed response.
#[derive(Debug, Deserialize)]
struct Feed {
  /// A `Feed` from arXiv may contain any number of `Entry`s, including none
  #[serde(rename = "entry", default)]
  entries: Vec<Entry>,
}

/// Internal representation of a paper entry from arXiv's API response.
#[derive(Debug, Deserialize)]
struct Entry {
  /// arXiv URL (e.g., "http://arxiv.org/abs/2301.07041v1")
  #[serde(rename = "id")]
  arxiv_url:  String,
  /// Paper title, wrapped over several lines
  #[serde(default)]
  title:      String,
  /// Paper abstract, wrapped over several lines
  #[serde(default)]
  summary:    String,
  /// First submission timestamp
  published:  DateTime<Utc>,
  /// Paper authors in order
  #[serde(rename = "author", default)]
  authors:    Vec<Author>,
  /// Subject categories
  #[serde(rename = "category", default)]
  categories: Vec<Category>,
  /// Abstract page, PDF and DOI links
  #[serde(rename = "link", default)]
  links:      Vec<Link>,
}

/// Internal representation of an author from arXiv's API response.
#[derive(Debug, Deserialize)]
struct Author {
  /// Author's full name
  name: String,
}

/// A `<category term="..."/>` element.
#[derive(Debug, Deserialize)]
struct Category {
  /// Category code, e.g. `cs.GT`
  #[serde(rename = "@term")]
  term: String,
}

/// A `<link href="..." title="..."/>` element.
#[derive(Debug, Deserialize)]
struct Link {
  /// Link target
  #[serde(rename = "@href")]
  href:  String,
  /// `pdf` for the PDF link, absent for the abstract page
  #[serde(rename = "@title", default)]
  title: Option<String>,
}

impl Entry {
  /// Converts the feed entry into a fresh, unscored paper record.
  fn into_paper(self) -> Paper {
    let arxiv_id = match self.arxiv_url.rsplit_once("/abs/") {
      Some((_, id)) => id.to_string(),
      None => self.arxiv_url.clone(),
    };

    let mut paper = Paper::new(arxiv_id, format::collapse_whitespace(&self.title));
    if let Some(pdf) = self.links.into_iter().find(|link| link.title.as_deref() == Some("pdf")) {
      paper.pdf_url = pdf.href;
    }
    paper.authors = self.authors.into_iter().map(|author| author.name).collect();
    paper.submitted_date = Some(self.published.date_naive());
    paper.categories = self.categories.into_iter().map(|category| category.term).collect();
    paper.abstract_text = format::collapse_whitespace(&self.summary);
    paper
  }
}

/// Client for the arXiv search API.
///
/// The underlying HTTP client carries the configured user agent and timeout and is reused for
/// every request.
pub struct ArxivClient {
  /// Internal web client used to connect to the API.
  client:   reqwest::Client,
  /// Query endpoint
  base_url: Url,
}

impl ArxivClient {
  /// Creates a client for the given endpoint.
  pub fn new(http: &config::HttpConfig, base_url: &str) -> Result<Self, CuratorError> {
    Ok(Self { client: clients::http_client(http)?, base_url: Url::parse(base_url)? })
  }

  /// The full request URL for a search.
  ///
  /// The expression is form-encoded, so spaces become `+`.
  pub fn search_url(&self, query_string: &str, max_results: usize) -> Url {
    let mut url = self.base_url.clone();
    url
      .query_pairs_mut()
      .append_pair("search_query", query_string)
      .append_pair("max_results", &max_results.to_string())
      .append_pair("sortBy", "submittedDate")
      .append_pair("sortOrder", "descending");
    url
  }

  /// Runs a search and returns the matching papers, newest first.
  ///
  /// # Errors
  ///
  /// This function will return an error if:
  /// - The network request fails or times out
  /// - The API answers with a non-success status
  /// - The response is not a parseable Atom feed
  pub async fn search(
    &self,
    query_string: &str,
    max_results: usize,
  ) -> Result<Vec<Paper>, CuratorError> {
    let url = self.search_url(query_string, max_results);
    debug!("Fetching from arXiv via: {url}");

    let response = self.client.get(url).send().await?;
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
      return Err(CuratorError::RateLimited);
    }
    if !status.is_success() {
      return Err(CuratorError::HttpStatus(status.as_u16()));
    }

    let body = response.text().await?;
    trace!("arXiv response: {body}");

    let papers = parse_feed(&body)?;
    info!("arXiv returned {} papers for `{query_string}`", papers.len());
    Ok(papers)
  }
}

/// Parses an Atom feed body into paper records.
pub fn parse_feed(body: &str) -> Result<Vec<Paper>, CuratorError> {
  let feed: Feed =
    from_str(body).map_err(|e| CuratorError::ApiError(format!("Failed to parse XML: {}", e)))?;
  Ok(feed.entries.into_iter().map(Entry::into_paper).collect())
}
