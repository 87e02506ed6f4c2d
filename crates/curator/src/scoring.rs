//! Keyword heuristics that rate how relevant a paper is to a topic.
//!
//! The relevance score is the sum of four independent sub-scores:
//!
//! | Sub-score            | Range | Signal                                                    |
//! |----------------------|-------|-----------------------------------------------------------|
//! | `topic_match`        | 1–3   | topic keywords found in the title or abstract             |
//! | `methodology_rigor`  | 1–3   | rigor indicators ("proof", "empirical", ...) in the abstract |
//! | `citation_potential` | 1–2   | high-impact phrasing ("survey", "novel", ...) in the abstract |
//! | `recency`            | 1–2   | submitted in 2024 or later                                |
//!
//! The total therefore lies in 4..=10. Scoring never fails: a paper with no title, abstract or
//! date simply collects the minimum for each sub-score.
//!
//! # Examples
//!
//! ```
//! use curator::{
//!   scoring::{score, Priority, TopicContext},
//!   Paper,
//! };
//!
//! let mut paper = Paper::new("2401.00001", "Quadratic Voting with Delegation");
//! paper.abstract_text = "We give a formal proof for a novel voting model.".into();
//!
//! let context = TopicContext::new(["voting", "quadratic", "delegation"]);
//! let score = score(&paper, &context);
//! assert_eq!(score.relevance_score, 7);
//! assert_eq!(score.priority, Priority::Medium);
//! ```

use super::*;

/// Words in an abstract that suggest a rigorous methodology.
pub const RIGOR_INDICATORS: [&str; 7] =
  ["formal", "proof", "theorem", "model", "framework", "analysis", "empirical"];

/// Phrases in an abstract that suggest a widely cited paper.
pub const HIGH_IMPACT_TERMS: [&str; 5] =
  ["novel", "comprehensive", "survey", "systematic", "state-of-the-art"];

/// Papers submitted in this year or later earn the recency bonus.
pub const RECENT_YEAR: i32 = 2024;

/// Topic vocabulary a paper is matched against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicContext {
  /// Lowercased keywords or phrases
  keywords: Vec<String>,
}

impl TopicContext {
  /// Builds a context from keywords; matching is case-insensitive.
  pub fn new<I, S>(keywords: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>, {
    Self { keywords: keywords.into_iter().map(|k| k.as_ref().to_lowercase()).collect() }
  }

  /// The normalized keywords.
  pub fn keywords(&self) -> &[String] { &self.keywords }
}

/// Coarse priority bucket derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
  /// Below 7
  Low,
  /// 7 or 8
  Medium,
  /// 9 or 10
  High,
}

impl Priority {
  /// Maps a relevance score to its priority bucket.
  pub fn from_score(score: u8) -> Self {
    match score {
      s if s >= 9 => Priority::High,
      s if s >= 7 => Priority::Medium,
      _ => Priority::Low,
    }
  }
}

impl std::fmt::Display for Priority {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Priority::Low => write!(f, "LOW"),
      Priority::Medium => write!(f, "MEDIUM"),
      Priority::High => write!(f, "HIGH"),
    }
  }
}

/// Result of scoring one paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
  /// Total, 4 to 10
  pub relevance_score:   u8,
  /// The individual sub-scores
  pub scoring_breakdown: ScoringBreakdown,
  /// Priority bucket for `relevance_score`
  pub priority:          Priority,
  /// Priority label followed by remarks on the strongest sub-scores
  pub notes:             String,
}

impl Score {
  /// Copies the score onto the paper record.
  pub fn apply(self, paper: &mut Paper) {
    paper.relevance_score = self.relevance_score;
    paper.scoring_breakdown = self.scoring_breakdown;
    paper.notes = self.notes;
  }
}

/// Maps a hit count onto 1..=3: one point, plus one per two hits.
fn banded(hits: usize) -> u8 { (1 + hits / 2).min(3) as u8 }

/// Scores a paper against a topic.
pub fn score(paper: &Paper, context: &TopicContext) -> Score {
  let title = paper.title.to_lowercase();
  let abstract_text = paper.abstract_text.to_lowercase();

  let keyword_hits = context
    .keywords
    .iter()
    .filter(|keyword| title.contains(keyword.as_str()) || abstract_text.contains(keyword.as_str()))
    .count();
  let topic_match = banded(keyword_hits);

  let rigor_hits =
    RIGOR_INDICATORS.iter().filter(|indicator| abstract_text.contains(*indicator)).count();
  let methodology_rigor = banded(rigor_hits);

  let citation_potential =
    if HIGH_IMPACT_TERMS.iter().any(|term| abstract_text.contains(term)) { 2 } else { 1 };

  let recency = match paper.year() {
    Some(year) if year >= RECENT_YEAR => 2,
    _ => 1,
  };

  let scoring_breakdown =
    ScoringBreakdown { topic_match, methodology_rigor, citation_potential, recency };
  let relevance_score = scoring_breakdown.total();
  let priority = Priority::from_score(relevance_score);

  let mut notes = format!("{priority} -");
  if topic_match == 3 {
    notes.push_str(" Strong topic alignment.");
  }
  if methodology_rigor == 3 {
    notes.push_str(" Rigorous methodology.");
  }
  if citation_potential == 2 {
    notes.push_str(" High citation potential.");
  }

  trace!("Scored {}: {relevance_score} ({scoring_breakdown:?})", paper.arxiv_id);

  Score { relevance_score, scoring_breakdown, priority, notes }
}
