//! Paper records and their curation metadata.
//!
//! A [`Paper`] is one arXiv entry plus the bookkeeping the pipeline attaches to it: the
//! relevance score and its breakdown, user-assigned tags, the integration status and whether
//! the PDF has been archived locally.
//!
//! Every field has a serde default so that hand-edited or older metadata files load without
//! failing, and unknown keys are carried through untouched.
//!
//! # Examples
//!
//! ```
//! use curator::paper::{IntegrationStatus, Paper};
//!
//! let paper = Paper::new("math.AG/0601001", "On Moduli of Curves");
//! assert_eq!(paper.integration_status, IntegrationStatus::PendingReview);
//! assert_eq!(paper.pdf_filename(), "math.AG_0601001.pdf");
//! ```

use serde_json::{Map, Value};

use super::*;

/// Where a paper stands in the manual review workflow.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
  /// Freshly fetched, not looked at yet
  #[default]
  PendingReview,
  /// Read and assessed
  Reviewed,
  /// Cited or otherwise used in the project
  Integrated,
}

impl std::fmt::Display for IntegrationStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      IntegrationStatus::PendingReview => write!(f, "pending_review"),
      IntegrationStatus::Reviewed => write!(f, "reviewed"),
      IntegrationStatus::Integrated => write!(f, "integrated"),
    }
  }
}

/// The four sub-scores that add up to a paper's relevance score.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScoringBreakdown {
  /// Topic keyword hits, 1 to 3
  #[serde(default)]
  pub topic_match:        u8,
  /// Rigor indicators in the abstract, 1 to 3
  #[serde(default)]
  pub methodology_rigor:  u8,
  /// High-impact phrasing in the abstract, 1 or 2
  #[serde(default)]
  pub citation_potential: u8,
  /// Submitted in 2024 or later, 1 or 2
  #[serde(default)]
  pub recency:            u8,
}

impl ScoringBreakdown {
  /// Sum of all sub-scores.
  pub fn total(&self) -> u8 {
    self.topic_match + self.methodology_rigor + self.citation_potential + self.recency
  }
}

/// A single paper together with its curation metadata.
///
/// `arxiv_id` is unique within one [`MetadataStore`]; the same paper may appear in several
/// stores when it is relevant to more than one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
  /// arXiv identifier, e.g. `2401.00001` or `math.AG/0601001`
  #[serde(default)]
  pub arxiv_id:           String,
  /// The paper's title
  #[serde(default)]
  pub title:              String,
  /// Author names in the order arXiv lists them
  #[serde(default)]
  pub authors:            Vec<String>,
  /// Date of the first submitted version
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub submitted_date:     Option<NaiveDate>,
  /// arXiv subject categories, primary category first
  #[serde(default)]
  pub categories:         Vec<String>,
  /// The abstract text
  #[serde(default, rename = "abstract")]
  pub abstract_text:      String,
  /// Where the PDF can be downloaded from
  #[serde(default)]
  pub pdf_url:            String,
  /// Heuristic relevance, 4 to 10 once scored
  #[serde(default)]
  pub relevance_score:    u8,
  /// The sub-scores behind `relevance_score`
  #[serde(default)]
  pub scoring_breakdown:  ScoringBreakdown,
  /// Human-readable priority and scoring remarks
  #[serde(default)]
  pub notes:              String,
  /// User-assigned labels
  #[serde(default)]
  pub tags:               Vec<String>,
  /// Known citation count
  #[serde(default)]
  pub citation_count:     u32,
  /// Review workflow status
  #[serde(default)]
  pub integration_status: IntegrationStatus,
  /// Whether the PDF has been archived next to the store
  #[serde(default)]
  pub pdf_stored_locally: bool,
  /// Keys this crate does not know about, kept for round-tripping
  #[serde(flatten)]
  pub extra:              Map<String, Value>,
}

impl Paper {
  /// Creates an unscored paper with the given identifier and title.
  ///
  /// The PDF URL defaults to the canonical arXiv location for the identifier.
  pub fn new(arxiv_id: impl Into<String>, title: impl Into<String>) -> Self {
    let arxiv_id = arxiv_id.into();
    let pdf_url = default_pdf_url(&arxiv_id);
    Self {
      arxiv_id,
      title: title.into(),
      authors: Vec::new(),
      submitted_date: None,
      categories: Vec::new(),
      abstract_text: String::new(),
      pdf_url,
      relevance_score: 0,
      scoring_breakdown: ScoringBreakdown::default(),
      notes: String::new(),
      tags: Vec::new(),
      citation_count: 0,
      integration_status: IntegrationStatus::PendingReview,
      pdf_stored_locally: false,
      extra: Map::new(),
    }
  }

  /// Submission year, if the date is known.
  pub fn year(&self) -> Option<i32> { self.submitted_date.map(|date| date.year()) }

  /// The URL to download from, falling back to arXiv's canonical PDF location.
  pub fn resolved_pdf_url(&self) -> String {
    if self.pdf_url.is_empty() {
      default_pdf_url(&self.arxiv_id)
    } else {
      self.pdf_url.clone()
    }
  }

  /// File name of the archived PDF, derived from the sanitized identifier.
  pub fn pdf_filename(&self) -> String {
    format!("{}.pdf", format::sanitize_identifier(&self.arxiv_id))
  }
}

/// Canonical arXiv PDF location for an identifier.
fn default_pdf_url(arxiv_id: &str) -> String { format!("https://arxiv.org/pdf/{arxiv_id}.pdf") }
