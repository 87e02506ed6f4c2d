//! Configuration for the curation pipeline.
//!
//! Configuration is a single TOML file, by default `config.toml` in the user's config
//! directory under `curator/`. Every key is optional; missing keys take the defaults shown
//! below.
//!
//! ```toml
//! archive_root = "arxiv-sources"
//!
//! [http]
//! user_agent = "Mozilla/5.0 (Academic Research Bot)"
//! timeout_secs = 30
//!
//! [arxiv]
//! base_url = "http://export.arxiv.org/api/query"
//! query_delay_secs = 3
//!
//! [download]
//! delay_secs = 3.0
//! rate_limit_backoff_secs = 60
//! min_score = 8
//!
//! [bibliography]
//! output = "references.bib"
//!
//! [[query_sets]]
//! name = "peripheral"
//! base_dir = "05-peripheral-topics"
//!
//! [[query_sets.queries]]
//! id = "5A"
//! topic = "voting-mechanisms"
//! query_string = "cat:cs.GT AND ti:\"quadratic voting\""
//! keywords = ["voting", "quadratic", "conviction"]
//! ```

use std::time::Duration;

use super::*;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Directory that holds all topic stores
  pub archive_root: PathBuf,
  /// Settings shared by every HTTP request
  pub http:         HttpConfig,
  /// arXiv search API settings
  pub arxiv:        ArxivConfig,
  /// PDF download policy
  pub download:     DownloadConfig,
  /// Bibliography output
  pub bibliography: BibliographyConfig,
  /// Named groups of arXiv queries
  pub query_sets:   Vec<QuerySet>,
}

/// Settings shared by every HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
  /// Value of the `User-Agent` header
  pub user_agent:   String,
  /// Per-request timeout
  pub timeout_secs: u64,
}

/// arXiv search API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivConfig {
  /// Query endpoint
  pub base_url:         String,
  /// Pause between consecutive queries
  pub query_delay_secs: u64,
}

/// PDF download policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
  /// Pause before every PDF request
  pub delay_secs:              f64,
  /// Extra pause after a `429 Too Many Requests`
  pub rate_limit_backoff_secs: u64,
  /// Only papers scoring at least this much are downloaded
  pub min_score:               u8,
}

/// Bibliography output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BibliographyConfig {
  /// File the bibliography is written to
  pub output:     PathBuf,
  /// First line of the header comment
  pub title:      String,
  /// Citation style line in the header comment
  pub style_note: String,
}

/// A named group of queries that share an output directory and store header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySet {
  /// Name used to select the set on the command line
  pub name:            String,
  /// Directory below `archive_root` that topic stores are created in
  #[serde(default)]
  pub base_dir:        PathBuf,
  /// Time period sub-directory and store header value
  #[serde(default = "default_time_period")]
  pub time_period:     String,
  /// Store header value
  #[serde(default)]
  pub priority:        String,
  /// Store header value
  #[serde(default = "default_curation_status")]
  pub curation_status: String,
  /// Papers scoring below this are not stored
  #[serde(default = "default_min_relevance")]
  pub min_relevance:   u8,
  /// The queries to run, in order
  #[serde(default)]
  pub queries:         Vec<QueryDefinition>,
}

/// One arXiv search and the topic it feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
  /// Short identifier, e.g. `5A`
  pub id:           String,
  /// Human-readable summary
  #[serde(default)]
  pub description:  String,
  /// arXiv search expression
  pub query_string: String,
  /// Upper bound on returned entries
  #[serde(default = "default_max_results")]
  pub max_results:  usize,
  /// Topic sub-directory, also the store's `topic` header
  pub topic:        String,
  /// Topic-match vocabulary for the scorer
  #[serde(default)]
  pub keywords:     Vec<String>,
}

/// Default store time period.
fn default_time_period() -> String { "2024-2025".into() }

/// Default store curation status.
fn default_curation_status() -> String { "Phase 1 - Complete".into() }

/// Default storage threshold.
fn default_min_relevance() -> u8 { 7 }

/// Default result cap per query.
fn default_max_results() -> usize { 20 }

impl Default for Config {
  fn default() -> Self {
    Self {
      archive_root: PathBuf::from("arxiv-sources"),
      http:         HttpConfig::default(),
      arxiv:        ArxivConfig::default(),
      download:     DownloadConfig::default(),
      bibliography: BibliographyConfig::default(),
      query_sets:   Vec::new(),
    }
  }
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self { user_agent: "Mozilla/5.0 (Academic Research Bot)".into(), timeout_secs: 30 }
  }
}

impl Default for ArxivConfig {
  fn default() -> Self {
    Self { base_url: "http://export.arxiv.org/api/query".into(), query_delay_secs: 3 }
  }
}

impl Default for DownloadConfig {
  fn default() -> Self { Self { delay_secs: 3.0, rate_limit_backoff_secs: 60, min_score: 8 } }
}

impl Default for BibliographyConfig {
  fn default() -> Self {
    Self {
      output:     PathBuf::from("references.bib"),
      title:      "BibTeX Bibliography".into(),
      style_note: "Harvard author-date style".into(),
    }
  }
}

impl HttpConfig {
  /// The request timeout as a [`Duration`].
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

impl DownloadConfig {
  /// The pre-request pause as a [`Duration`]; negative or non-finite values mean no pause.
  pub fn delay(&self) -> Duration {
    Duration::try_from_secs_f64(self.delay_secs).unwrap_or(Duration::ZERO)
  }

  /// The post-429 pause as a [`Duration`].
  pub fn rate_limit_backoff(&self) -> Duration {
    Duration::from_secs(self.rate_limit_backoff_secs)
  }
}

impl Config {
  /// Default configuration file location in the user's config directory.
  pub fn default_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("curator").join("config.toml")
  }

  /// Reads and validates a configuration file.
  pub fn load(path: &Path) -> Result<Self, CuratorError> {
    debug!("Loading configuration from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
  }

  /// Loads `path` (or the default location); a missing file yields the defaults.
  pub fn load_or_default(path: Option<&Path>) -> Result<Self, CuratorError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
    if path.exists() {
      Self::load(&path)
    } else {
      debug!("No configuration at {}, using defaults", path.display());
      Ok(Self::default())
    }
  }

  /// Writes the configuration as TOML, creating parent directories.
  pub fn save(&self, path: &Path) -> Result<(), CuratorError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(self)?)?;
    Ok(())
  }

  /// Looks up a query set by name.
  pub fn query_set(&self, name: &str) -> Result<&QuerySet, CuratorError> {
    self
      .query_sets
      .iter()
      .find(|set| set.name == name)
      .ok_or_else(|| CuratorError::UnknownQuery(name.to_string()))
  }

  /// Rejects values the pipeline cannot work with.
  pub fn validate(&self) -> Result<(), CuratorError> {
    if !self.download.delay_secs.is_finite() || self.download.delay_secs < 0.0 {
      return Err(CuratorError::InvalidConfig(format!(
        "download.delay_secs must be a non-negative number, got {}",
        self.download.delay_secs
      )));
    }
    for set in &self.query_sets {
      if set.queries.iter().any(|q| q.max_results == 0) {
        return Err(CuratorError::InvalidConfig(format!(
          "query set `{}` has a query with max_results = 0",
          set.name
        )));
      }
      let mut ids: Vec<&str> = set.queries.iter().map(|q| q.id.as_str()).collect();
      ids.sort_unstable();
      if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(CuratorError::InvalidConfig(format!(
          "query set `{}` defines query `{}` twice",
          set.name, pair[0]
        )));
      }
    }
    Ok(())
  }

  /// A starter configuration with one example query set.
  pub fn sample() -> Self {
    Self {
      query_sets: vec![QuerySet {
        name:            "peripheral".into(),
        base_dir:        PathBuf::from("05-peripheral-topics"),
        time_period:     default_time_period(),
        priority:        "P3 - Peripheral topics".into(),
        curation_status: default_curation_status(),
        min_relevance:   default_min_relevance(),
        queries:         vec![
          QueryDefinition {
            id:           "5A".into(),
            description:  "Voting Mechanisms (quadratic, conviction, liquid democracy)".into(),
            query_string: "cat:cs.GT OR cat:econ.TH AND (ti:\"quadratic voting\" OR \
                           ti:\"conviction voting\" OR ti:\"liquid democracy\")"
              .into(),
            max_results:  15,
            topic:        "voting-mechanisms".into(),
            keywords:     ["voting", "quadratic", "conviction", "liquid democracy", "delegation"]
              .map(String::from)
              .to_vec(),
          },
          QueryDefinition {
            id:           "5B".into(),
            description:  "Tokenomics (velocity, bonding curves, dual-token models)".into(),
            query_string: "cat:econ.TH OR cat:cs.CR AND (ti:tokenomics OR ti:\"bonding curve\") \
                           AND abs:blockchain"
              .into(),
            max_results:  12,
            topic:        "tokenomics".into(),
            keywords:     ["tokenomics", "token", "bonding curve", "velocity", "dual-token"]
              .map(String::from)
              .to_vec(),
          },
        ],
      }],
      ..Default::default()
    }
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn test_empty_file_gives_defaults() -> anyhow::Result<()> {
    let config: Config = toml::from_str("")?;
    assert_eq!(config, Config::default());
    assert_eq!(config.download.delay(), Duration::from_secs(3));
    assert_eq!(config.download.rate_limit_backoff(), Duration::from_secs(60));
    assert_eq!(config.http.timeout(), Duration::from_secs(30));
    Ok(())
  }

  #[test]
  fn test_partial_file_fills_in_defaults() -> anyhow::Result<()> {
    let config: Config = toml::from_str(
      r#"
      archive_root = "papers"

      [download]
      delay_secs = 0.5

      [[query_sets]]
      name = "firm"

      [[query_sets.queries]]
      id = "4A"
      topic = "governance"
      query_string = "cat:econ.TH AND ti:voting"
      "#,
    )?;
    assert_eq!(config.archive_root, PathBuf::from("papers"));
    assert_eq!(config.download.delay(), Duration::from_millis(500));
    assert_eq!(config.download.min_score, 8);

    let set = config.query_set("firm")?;
    assert_eq!(set.min_relevance, 7);
    assert_eq!(set.time_period, "2024-2025");
    assert_eq!(set.queries[0].max_results, 20);
    assert!(matches!(config.query_set("nope"), Err(CuratorError::UnknownQuery(_))));
    Ok(())
  }

  #[test]
  fn test_sample_round_trips_through_disk() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("nested").join("config.toml");
    let sample = Config::sample();
    sample.save(&path)?;
    assert_eq!(Config::load(&path)?, sample);
    assert_eq!(Config::load_or_default(Some(&dir.path().join("missing.toml")))?, Config::default());
    Ok(())
  }

  #[test]
  fn test_validate_rejects_bad_values() {
    let mut config = Config::sample();
    config.download.delay_secs = -1.0;
    assert!(matches!(config.validate(), Err(CuratorError::InvalidConfig(_))));

    let mut config = Config::sample();
    let duplicate = config.query_sets[0].queries[0].clone();
    config.query_sets[0].queries.push(duplicate);
    assert!(matches!(config.validate(), Err(CuratorError::InvalidConfig(_))));

    let mut config = Config::sample();
    config.query_sets[0].queries[1].max_results = 0;
    assert!(matches!(config.validate(), Err(CuratorError::InvalidConfig(_))));
  }
}
