//! Per-topic metadata stores.
//!
//! Each topic/time-period directory holds a single `metadata.json` with a small header and the
//! ordered list of [`Paper`] records for that scope. A store is always read and written as a
//! whole. Writes go to a temporary file in the same directory that is then renamed over the
//! target, so an interrupted run never leaves a truncated store behind.
//!
//! Stores assume a single writer; two concurrent runs against the same store can lose updates.
//!
//! # Examples
//!
//! ```no_run
//! use curator::store::MetadataStore;
//!
//! # fn example() -> Result<(), curator::errors::CuratorError> {
//! for path in MetadataStore::discover("arxiv-sources".as_ref())? {
//!   let store = MetadataStore::load(&path)?;
//!   println!("{}: {} papers", store.topic, store.papers.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use super::*;

/// File name every store is saved under.
pub const METADATA_FILE: &str = "metadata.json";

/// Name of the directory, next to the store, that archived PDFs live in.
pub const PDFS_DIR: &str = "pdfs";

/// The full contents of one `metadata.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataStore {
  /// Topic slug, e.g. `voting-mechanisms`
  #[serde(default)]
  pub topic:           String,
  /// Time period the store covers, e.g. `2024-2025`
  #[serde(default)]
  pub time_period:     String,
  /// RFC 3339 timestamp of the last pipeline write
  #[serde(default)]
  pub last_updated:    String,
  /// Number of papers at the last write
  #[serde(default)]
  pub total_papers:    usize,
  /// Free-form curation phase
  #[serde(default)]
  pub curation_status: String,
  /// Free-form priority label for the topic
  #[serde(default)]
  pub priority:        String,
  /// Paper records in insertion order
  #[serde(default)]
  pub papers:          Vec<Paper>,
  /// Header keys this crate does not know about
  #[serde(flatten)]
  pub extra:           Map<String, Value>,
}

impl MetadataStore {
  /// Creates an empty store for a topic and time period.
  pub fn new(topic: impl Into<String>, time_period: impl Into<String>) -> Self {
    Self { topic: topic.into(), time_period: time_period.into(), ..Default::default() }
  }

  /// Reads a store from disk.
  pub fn load(path: &Path) -> Result<Self, CuratorError> {
    trace!("Loading metadata store: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
  }

  /// Reads a store, or starts an empty one when the file does not exist yet.
  pub fn load_or_new(
    path: &Path,
    topic: &str,
    time_period: &str,
  ) -> Result<Self, CuratorError> {
    if path.exists() {
      Self::load(path)
    } else {
      debug!("No store at {}, starting a new one", path.display());
      Ok(Self::new(topic, time_period))
    }
  }

  /// Writes the whole store to `path`, replacing any previous file atomically.
  ///
  /// Parent directories are created as needed.
  pub fn save(&self, path: &Path) -> Result<(), CuratorError> {
    let dir = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut json = serde_json::to_string_pretty(self)?;
    json.push('\n');

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    debug!("Saved {} papers to {}", self.papers.len(), path.display());
    Ok(())
  }

  /// Looks up a paper by identifier.
  pub fn get(&self, arxiv_id: &str) -> Option<&Paper> {
    self.papers.iter().find(|paper| paper.arxiv_id == arxiv_id)
  }

  /// Mutable lookup by identifier.
  pub fn get_mut(&mut self, arxiv_id: &str) -> Option<&mut Paper> {
    self.papers.iter_mut().find(|paper| paper.arxiv_id == arxiv_id)
  }

  /// Appends every paper whose identifier is not yet in the store.
  ///
  /// Records already present are left untouched so that tags, review status and the PDF flag
  /// survive a re-run of the query. Returns the number of papers added.
  pub fn merge(&mut self, papers: impl IntoIterator<Item = Paper>) -> usize {
    let mut added = 0;
    for paper in papers {
      if self.get(&paper.arxiv_id).is_some() {
        trace!("{} already in store {}, keeping existing record", paper.arxiv_id, self.topic);
        continue;
      }
      self.papers.push(paper);
      added += 1;
    }
    self.total_papers = self.papers.len();
    added
  }

  /// Refreshes `last_updated` and `total_papers`.
  pub fn touch(&mut self, now: DateTime<Utc>) {
    self.last_updated = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    self.total_papers = self.papers.len();
  }

  /// Re-opens the store at `path`, flags `arxiv_id` as archived and rewrites the store.
  ///
  /// Returns `false`, without writing, when no record matches or the flag was already set.
  pub fn mark_pdf_stored(path: &Path, arxiv_id: &str) -> Result<bool, CuratorError> {
    let mut store = Self::load(path)?;
    let Some(paper) = store.get_mut(arxiv_id) else {
      warn!("{arxiv_id} not found in {}", path.display());
      return Ok(false);
    };
    if paper.pdf_stored_locally {
      return Ok(false);
    }
    paper.pdf_stored_locally = true;
    store.save(path)?;
    info!("Updated {} for {arxiv_id}", path.display());
    Ok(true)
  }

  /// Finds every store below `root`, sorted by path.
  ///
  /// A missing root yields no stores.
  pub fn discover(root: &Path) -> Result<Vec<PathBuf>, CuratorError> {
    let escaped = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = format!("{escaped}/**/{METADATA_FILE}");
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)?
      .filter_map(|entry| match entry {
        Ok(path) => Some(path),
        Err(e) => {
          warn!("Skipping unreadable path: {e}");
          None
        },
      })
      .collect();
    paths.sort();
    debug!("Discovered {} metadata stores under {}", paths.len(), root.display());
    Ok(paths)
  }

  /// The `pdfs` directory next to the store at `path`.
  pub fn pdfs_dir(path: &Path) -> PathBuf {
    path.parent().unwrap_or_else(|| Path::new(".")).join(PDFS_DIR)
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  fn sample_paper(id: &str) -> Paper {
    let mut paper = Paper::new(id, format!("Paper {id}"));
    paper.authors = vec!["Smith, John".into(), "Doe, Jane".into()];
    paper.submitted_date = NaiveDate::from_ymd_opt(2024, 3, 1);
    paper.categories = vec!["cs.GT".into(), "econ.TH".into()];
    paper.abstract_text = "A formal model of voting.".into();
    paper.relevance_score = 8;
    paper
  }

  #[test]
  fn test_save_then_load_round_trip() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("voting").join("2024-2025").join(METADATA_FILE);

    let mut store = MetadataStore::new("voting", "2024-2025");
    store.priority = "P3".into();
    store.extra.insert("owner".into(), Value::from("governance-wg"));
    store.merge(vec![sample_paper("2401.00001"), sample_paper("2401.00002")]);
    store.save(&path)?;

    let loaded = MetadataStore::load(&path)?;
    assert_eq!(loaded, store);
    assert_eq!(loaded.total_papers, 2);

    // Saving an unchanged store reproduces the same bytes.
    let before = std::fs::read(&path)?;
    loaded.save(&path)?;
    assert_eq!(std::fs::read(&path)?, before);
    Ok(())
  }

  #[test]
  fn test_save_leaves_no_temp_files() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join(METADATA_FILE);
    MetadataStore::new("t", "p").save(&path)?;
    MetadataStore::new("t", "p").save(&path)?;
    let entries = std::fs::read_dir(dir.path())?.count();
    assert_eq!(entries, 1);
    Ok(())
  }

  #[test]
  fn test_merge_keeps_existing_records() {
    let mut store = MetadataStore::new("voting", "2024-2025");
    let mut reviewed = sample_paper("2401.00001");
    reviewed.tags = vec!["core".into()];
    store.merge(vec![reviewed]);

    let added = store.merge(vec![sample_paper("2401.00001"), sample_paper("2401.00003")]);
    assert_eq!(added, 1);
    assert_eq!(store.papers.len(), 2);
    assert_eq!(store.papers[0].tags, vec!["core".to_string()]);
    assert_eq!(store.papers[1].arxiv_id, "2401.00003");
    assert_eq!(store.total_papers, 2);
  }

  #[test]
  fn test_mark_pdf_stored() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join(METADATA_FILE);
    let mut store = MetadataStore::new("voting", "2024-2025");
    store.merge(vec![sample_paper("2401.00001"), sample_paper("2401.00002")]);
    store.save(&path)?;

    assert!(MetadataStore::mark_pdf_stored(&path, "2401.00002")?);
    assert!(!MetadataStore::mark_pdf_stored(&path, "2401.00002")?);
    assert!(!MetadataStore::mark_pdf_stored(&path, "9999.99999")?);

    let loaded = MetadataStore::load(&path)?;
    assert!(!loaded.papers[0].pdf_stored_locally);
    assert!(loaded.papers[1].pdf_stored_locally);
    // Everything else is untouched.
    assert_eq!(loaded.papers[0], store.papers[0]);
    assert_eq!(loaded.papers[1].title, store.papers[1].title);
    Ok(())
  }

  #[test]
  fn test_discover_finds_nested_stores() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let a = dir.path().join("05-peripheral").join("tokenomics").join("2024-2025");
    let b = dir.path().join("04-firm").join("2024-2025");
    MetadataStore::new("tokenomics", "2024-2025").save(&a.join(METADATA_FILE))?;
    MetadataStore::new("firm", "2024-2025").save(&b.join(METADATA_FILE))?;
    std::fs::write(dir.path().join("notes.json"), "{}")?;

    let found = MetadataStore::discover(dir.path())?;
    assert_eq!(found, vec![b.join(METADATA_FILE), a.join(METADATA_FILE)]);

    assert!(MetadataStore::discover(&dir.path().join("missing"))?.is_empty());
    Ok(())
  }

  #[test]
  fn test_discover_root_with_pattern_characters() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("papers[2024]*?");
    let path = root.join("voting").join(METADATA_FILE);
    MetadataStore::new("voting", "2024-2025").save(&path)?;

    assert_eq!(MetadataStore::discover(&root)?, vec![path]);
    Ok(())
  }

  #[test]
  fn test_pdfs_dir_is_sibling() {
    let path = Path::new("arxiv-sources/voting/2024-2025/metadata.json");
    assert_eq!(MetadataStore::pdfs_dir(path), Path::new("arxiv-sources/voting/2024-2025/pdfs"));
  }

  #[test]
  fn test_touch_sets_timestamp() -> anyhow::Result<()> {
    let mut store = MetadataStore::new("t", "p");
    let now = DateTime::parse_from_rfc3339("2026-02-09T19:30:00Z")?.with_timezone(&Utc);
    store.touch(now);
    assert_eq!(store.last_updated, "2026-02-09T19:30:00Z");
    Ok(())
  }
}
