//! Rate-limited PDF downloads for high-scoring papers.
//!
//! Downloads are strictly sequential. For each paper the fetcher:
//! 1. derives the target file name from the sanitized arXiv identifier,
//! 2. returns immediately, without touching the network, if that file already exists,
//! 3. otherwise sleeps for the configured delay and then requests the PDF,
//! 4. writes the body only after it has been read completely, via a temporary file that is
//!    renamed into place, so failures never leave a partial PDF behind.
//!
//! A `429 Too Many Requests` answer costs an extra backoff pause before the failure is reported;
//! the paper is not retried within the same run.
//!
//! [`PdfFetcher::download_all`] drives this over every store in the archive and flags each
//! downloaded paper as `pdf_stored_locally` in its store.
//!
//! # Examples
//!
//! ```no_run
//! use curator::{config::Config, fetch::PdfFetcher};
//!
//! # async fn example() -> Result<(), curator::errors::CuratorError> {
//! let config = Config::default();
//! let fetcher = PdfFetcher::new(&config.http, &config.download)?;
//! let report = fetcher.download_all(&config.archive_root, 8).await?;
//! for error in &report.errors {
//!   eprintln!("{error}");
//! }
//! # Ok(())
//! # }
//! ```

use std::{io::Write, time::Duration};

use reqwest::StatusCode;
use tempfile::NamedTempFile;

use super::*;

/// What a successful fetch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
  /// The PDF was downloaded and written
  Downloaded,
  /// The PDF was already on disk; no request was made
  AlreadyPresent,
}

/// Counts and messages from a [`PdfFetcher::download_all`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
  /// Papers that met the score threshold
  pub total:      usize,
  /// Papers downloaded during this run
  pub downloaded: usize,
  /// Papers whose PDF was already on disk
  pub skipped:    usize,
  /// Papers whose download failed
  pub failed:     usize,
  /// One message per failure, prefixed with the arXiv identifier
  pub errors:     Vec<String>,
}

impl DownloadReport {
  /// Percentage of attempted downloads that succeeded, `None` when nothing was attempted.
  pub fn success_rate(&self) -> Option<f64> {
    let attempted = self.downloaded + self.failed;
    (attempted > 0).then(|| self.downloaded as f64 / attempted as f64 * 100.0)
  }
}

/// Downloads PDFs one at a time with a fixed pause before every request.
pub struct PdfFetcher {
  /// Shared HTTP client with user agent and timeout
  client:             reqwest::Client,
  /// Pause before every request
  delay:              Duration,
  /// Extra pause after a `429`
  rate_limit_backoff: Duration,
}

impl PdfFetcher {
  /// Creates a fetcher from the HTTP and download settings.
  pub fn new(
    http: &config::HttpConfig,
    download: &config::DownloadConfig,
  ) -> Result<Self, CuratorError> {
    Ok(Self {
      client:             clients::http_client(http)?,
      delay:              download.delay(),
      rate_limit_backoff: download.rate_limit_backoff(),
    })
  }

  /// Overrides the pause before every request.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  /// Overrides the pause after a `429`.
  pub fn with_rate_limit_backoff(mut self, backoff: Duration) -> Self {
    self.rate_limit_backoff = backoff;
    self
  }

  /// Downloads a paper's PDF into `output_dir` unless it is already there.
  ///
  /// The output directory is created if needed; failing to create it is returned like any other
  /// error, and callers that batch downloads should treat it as fatal.
  ///
  /// # Errors
  ///
  /// - [`CuratorError::RateLimited`] after a `429` and the backoff pause
  /// - [`CuratorError::HttpStatus`] for any other non-200 answer
  /// - [`CuratorError::Network`] for connection failures, timeouts and body read errors
  /// - [`CuratorError::Path`] or [`CuratorError::Persist`] when the file cannot be written
  pub async fn fetch(
    &self,
    paper: &Paper,
    output_dir: &Path,
  ) -> Result<FetchOutcome, CuratorError> {
    let path = output_dir.join(paper.pdf_filename());
    if path.exists() {
      debug!("[SKIP] {} - already exists", paper.arxiv_id);
      return Ok(FetchOutcome::AlreadyPresent);
    }

    std::fs::create_dir_all(output_dir)?;

    let url = paper.resolved_pdf_url();
    info!("[DOWNLOAD] {} from {url}", paper.arxiv_id);

    tokio::time::sleep(self.delay).await;

    let response = self.client.get(&url).send().await?;
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
      warn!(
        "[RATE LIMIT] {} - waiting {}s before continuing",
        paper.arxiv_id,
        self.rate_limit_backoff.as_secs()
      );
      tokio::time::sleep(self.rate_limit_backoff).await;
      return Err(CuratorError::RateLimited);
    }
    if status != StatusCode::OK {
      return Err(CuratorError::HttpStatus(status.as_u16()));
    }

    let bytes = response.bytes().await?;

    let mut tmp = NamedTempFile::new_in(output_dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&path)?;

    info!("[SUCCESS] {} saved to {} ({} bytes)", paper.arxiv_id, path.display(), bytes.len());
    Ok(FetchOutcome::Downloaded)
  }

  /// Fetches one paper belonging to the store at `store_path` and records the result there.
  ///
  /// The PDF goes into the store's `pdfs` directory. After a download, or when the file was
  /// already present but the record does not say so yet, the store is re-read, the paper's
  /// `pdf_stored_locally` flag is set and the store is rewritten.
  pub async fn fetch_into_store(
    &self,
    paper: &Paper,
    store_path: &Path,
  ) -> Result<FetchOutcome, CuratorError> {
    let outcome = self.fetch(paper, &MetadataStore::pdfs_dir(store_path)).await?;
    if outcome == FetchOutcome::Downloaded || !paper.pdf_stored_locally {
      MetadataStore::mark_pdf_stored(store_path, &paper.arxiv_id)?;
    }
    Ok(outcome)
  }

  /// Downloads every paper scoring at least `min_score` across all stores under `archive_root`.
  ///
  /// Per-paper failures are logged and collected in the report; the run always continues with
  /// the next paper. Errors reading or writing a store, or creating a `pdfs` directory, abort
  /// the run.
  pub async fn download_all(
    &self,
    archive_root: &Path,
    min_score: u8,
  ) -> Result<DownloadReport, CuratorError> {
    let mut queue: Vec<(PathBuf, Paper)> = Vec::new();
    for store_path in MetadataStore::discover(archive_root)? {
      let store = MetadataStore::load(&store_path)?;
      queue.extend(
        store
          .papers
          .into_iter()
          .filter(|paper| paper.relevance_score >= min_score)
          .map(|paper| (store_path.clone(), paper)),
      );
    }

    let mut report = DownloadReport { total: queue.len(), ..Default::default() };
    info!("Found {} papers scoring >= {min_score}", report.total);

    for (i, (store_path, paper)) in queue.iter().enumerate() {
      debug!(
        "[{}/{}] {} (score: {}/10) {}",
        i + 1,
        report.total,
        paper.arxiv_id,
        paper.relevance_score,
        format::preview(&paper.title, 80)
      );

      match self.fetch_into_store(paper, store_path).await {
        Ok(FetchOutcome::Downloaded) => report.downloaded += 1,
        Ok(FetchOutcome::AlreadyPresent) => report.skipped += 1,
        Err(e @ (CuratorError::Path(_) | CuratorError::Json(_) | CuratorError::Persist(_))) => {
          return Err(e);
        },
        Err(e) => {
          warn!("[ERROR] {} - {e}", paper.arxiv_id);
          report.failed += 1;
          report.errors.push(format!("{}: {e}", paper.arxiv_id));
        },
      }
    }

    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use std::time::Instant;

  use mockito::Server;
  use tempfile::tempdir;

  use super::*;

  fn fetcher() -> PdfFetcher {
    let download = config::DownloadConfig { delay_secs: 0.0, ..Default::default() };
    PdfFetcher::new(&config::HttpConfig::default(), &download)
      .unwrap()
      .with_rate_limit_backoff(Duration::from_millis(50))
  }

  fn paper(id: &str, pdf_url: String, score: u8) -> Paper {
    let mut paper = Paper::new(id, format!("Paper {id}"));
    paper.pdf_url = pdf_url;
    paper.relevance_score = score;
    paper
  }

  fn save_store(path: &Path, papers: Vec<Paper>) -> MetadataStore {
    let mut store = MetadataStore::new("voting", "2024-2025");
    store.merge(papers);
    store.save(path).unwrap();
    store
  }

  #[traced_test]
  #[tokio::test]
  async fn test_download_then_skip() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("GET", "/pdf/2401.00001")
      .match_header("user-agent", "Mozilla/5.0 (Academic Research Bot)")
      .with_status(200)
      .with_body(b"%PDF-1.4...")
      .expect(1)
      .create_async()
      .await;

    let dir = tempdir()?;
    let store_path = dir.path().join(store::METADATA_FILE);
    let paper = paper("2401.00001", format!("{}/pdf/2401.00001", server.url()), 8);
    save_store(&store_path, vec![paper.clone()]);

    let fetcher = fetcher();
    let outcome = fetcher.fetch_into_store(&paper, &store_path).await?;
    assert_eq!(outcome, FetchOutcome::Downloaded);

    let pdf = dir.path().join("pdfs").join("2401.00001.pdf");
    assert_eq!(std::fs::read(&pdf)?, b"%PDF-1.4...");
    assert!(MetadataStore::load(&store_path)?.papers[0].pdf_stored_locally);

    // A second run finds the file and never reaches the server.
    let outcome = fetcher.fetch_into_store(&paper, &store_path).await?;
    assert_eq!(outcome, FetchOutcome::AlreadyPresent);
    mock.assert_async().await;
    Ok(())
  }

  #[tokio::test]
  async fn test_existing_file_makes_no_request() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock = server.mock("GET", mockito::Matcher::Any).expect(0).create_async().await;

    let dir = tempdir()?;
    std::fs::write(dir.path().join("hep-th_9901001.pdf"), b"cached")?;

    let paper = paper("hep-th/9901001", format!("{}/pdf/hep-th/9901001", server.url()), 9);
    let outcome = fetcher().with_delay(Duration::from_secs(30)).fetch(&paper, dir.path()).await?;
    assert_eq!(outcome, FetchOutcome::AlreadyPresent);
    assert_eq!(std::fs::read(dir.path().join("hep-th_9901001.pdf"))?, b"cached");
    mock.assert_async().await;
    Ok(())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_rate_limited_backs_off_and_writes_nothing() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock =
      server.mock("GET", "/pdf/2401.00001").with_status(429).expect(1).create_async().await;

    let dir = tempdir()?;
    let store_path = dir.path().join(store::METADATA_FILE);
    let paper = paper("2401.00001", format!("{}/pdf/2401.00001", server.url()), 8);
    save_store(&store_path, vec![paper.clone()]);
    let before = std::fs::read(&store_path)?;

    let started = Instant::now();
    let result = fetcher().fetch_into_store(&paper, &store_path).await;
    assert!(matches!(result, Err(CuratorError::RateLimited)));
    assert!(started.elapsed() >= Duration::from_millis(50));

    assert!(!dir.path().join("pdfs").join("2401.00001.pdf").exists());
    assert_eq!(std::fs::read(&store_path)?, before);
    assert!(logs_contain("RATE LIMIT"));
    // The throttled paper is not retried after the backoff.
    mock.assert_async().await;
    Ok(())
  }

  #[tokio::test]
  async fn test_http_error_leaves_no_file() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let _mock = server.mock("GET", "/pdf/missing").with_status(404).create_async().await;

    let dir = tempdir()?;
    let paper = paper("missing", format!("{}/pdf/missing", server.url()), 8);
    let result = fetcher().fetch(&paper, dir.path()).await;
    assert!(matches!(result, Err(CuratorError::HttpStatus(404))));
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
  }

  #[tokio::test]
  async fn test_delay_precedes_request() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let _mock =
      server.mock("GET", "/pdf/2401.00002").with_status(200).with_body("%PDF").create_async().await;

    let dir = tempdir()?;
    let paper = paper("2401.00002", format!("{}/pdf/2401.00002", server.url()), 8);
    let started = Instant::now();
    fetcher().with_delay(Duration::from_millis(100)).fetch(&paper, dir.path()).await?;
    assert!(started.elapsed() >= Duration::from_millis(100));
    Ok(())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_download_all_summarizes_run() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let ok = server
      .mock("GET", "/pdf/2401.00001")
      .with_status(200)
      .with_body("%PDF-1.4")
      .expect(1)
      .create_async()
      .await;
    let _gone = server.mock("GET", "/pdf/2401.00002").with_status(500).create_async().await;
    let low = server.mock("GET", "/pdf/2401.00004").expect(0).create_async().await;

    let root = tempdir()?;
    let voting = root.path().join("voting").join("2024-2025").join(store::METADATA_FILE);
    let tokens = root.path().join("tokenomics").join("2024-2025").join(store::METADATA_FILE);
    save_store(&voting, vec![
      paper("2401.00001", format!("{}/pdf/2401.00001", server.url()), 8),
      paper("2401.00002", format!("{}/pdf/2401.00002", server.url()), 10),
    ]);
    save_store(&tokens, vec![
      paper("2401.00003", format!("{}/pdf/2401.00003", server.url()), 9),
      paper("2401.00004", format!("{}/pdf/2401.00004", server.url()), 7),
    ]);
    // Already archived by hand, but never flagged.
    let tokens_pdfs = MetadataStore::pdfs_dir(&tokens);
    std::fs::create_dir_all(&tokens_pdfs)?;
    std::fs::write(tokens_pdfs.join("2401.00003.pdf"), "%PDF")?;

    let report = fetcher().download_all(root.path(), 8).await?;
    assert_eq!(report.total, 3);
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors, vec!["2401.00002: HTTP 500".to_string()]);
    assert_eq!(report.success_rate(), Some(50.0));

    let voting = MetadataStore::load(&voting)?;
    assert!(voting.papers[0].pdf_stored_locally);
    assert!(!voting.papers[1].pdf_stored_locally);
    let tokens = MetadataStore::load(&tokens)?;
    assert!(tokens.papers[0].pdf_stored_locally);
    assert!(!tokens.papers[1].pdf_stored_locally);

    ok.assert_async().await;
    low.assert_async().await;
    Ok(())
  }

  #[test]
  fn test_success_rate_without_attempts() {
    let report = DownloadReport { total: 2, skipped: 2, ..Default::default() };
    assert_eq!(report.success_rate(), None);
  }
}
