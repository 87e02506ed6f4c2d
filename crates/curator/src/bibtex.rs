//! BibTeX generation from every metadata store in the archive.
//!
//! Each paper gets a citation key of the form `{surname}{year}{keyword}`:
//! - `surname` is the last word of the first author's family name, lowercased, or `unknown`
//!   when the paper lists no authors;
//! - `year` is the submission year;
//! - `keyword` is the first title word longer than three characters that is not a stop word,
//!   lowercased, or `paper` when there is none.
//!
//! Keys are unique across the whole bibliography: the second paper that would receive
//! `smith2024voting` becomes `smith2024voting_2`, the third `smith2024voting_3`, and so on.
//!
//! # Examples
//!
//! ```
//! use curator::{bibtex::CitationKeys, Paper};
//!
//! let mut paper = Paper::new("2401.00001", "On Quadratic Voting");
//! paper.authors = vec!["Smith, John".into()];
//! paper.submitted_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2);
//!
//! let mut keys = CitationKeys::default();
//! assert_eq!(keys.assign(&paper), "smith2024quadratic");
//! assert_eq!(keys.assign(&paper), "smith2024quadratic_2");
//! ```

use std::collections::HashSet;

use chrono::Utc;

use super::*;

/// Title words that never become the key's keyword.
pub const STOP_WORDS: [&str; 11] =
  ["a", "an", "the", "of", "for", "in", "on", "with", "and", "or", "to"];

/// Year used in keys and entries for papers without a submission date.
pub const DEFAULT_YEAR: i32 = 2025;

/// Surname of the first author, lowercased, or `unknown`.
///
/// Names in `Family, Given` form use the part before the comma; in either form the last
/// whitespace-separated word is taken.
pub fn first_author_surname(paper: &Paper) -> String {
  paper
    .authors
    .first()
    .and_then(|author| author.split(',').next())
    .and_then(|family| family.split_whitespace().last())
    .map(|surname| surname.to_lowercase())
    .unwrap_or_else(|| "unknown".to_string())
}

/// First significant title word, lowercased, or `paper`.
pub fn title_keyword(title: &str) -> String {
  title
    .split_whitespace()
    .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
    .find(|word| word.chars().count() > 3 && !STOP_WORDS.contains(&word.as_str()))
    .unwrap_or_else(|| "paper".to_string())
}

/// The citation key before collision handling.
pub fn base_citation_key(paper: &Paper) -> String {
  format!(
    "{}{}{}",
    first_author_surname(paper),
    paper.year().unwrap_or(DEFAULT_YEAR),
    title_keyword(&paper.title)
  )
}

/// Hands out unique citation keys.
#[derive(Debug, Clone, Default)]
pub struct CitationKeys {
  /// Every key issued so far
  used: HashSet<String>,
}

impl CitationKeys {
  /// Returns the paper's key, suffixed with `_2`, `_3`, ... if it was already issued.
  pub fn assign(&mut self, paper: &Paper) -> String {
    let base = base_citation_key(paper);
    let mut key = base.clone();
    let mut counter = 2;
    while self.used.contains(&key) {
      key = format!("{base}_{counter}");
      counter += 1;
    }
    self.used.insert(key.clone());
    key
  }
}

/// Formats one `@misc` entry for an arXiv preprint.
pub fn format_entry(paper: &Paper, key: &str) -> String {
  let authors = paper.authors.iter().map(|a| a.trim()).collect::<Vec<_>>().join(" and ");

  let primary_class = paper
    .categories
    .first()
    .map(|category| format!("  primaryClass = {{{category}}},\n"))
    .unwrap_or_default();

  format!(
    "@misc{{{key},\n  author = {{{authors}}},\n  title = {{{{{title}}}}},\n  year = {{{year}}},\n  \
     eprint = {{{eprint}}},\n  archivePrefix = {{arXiv}},\n{primary_class}  url = {{{url}}},\n  \
     note = {{arXiv preprint}},\n  abstract = {{{{{abstract_text}}}}}\n}}\n",
    title = format::escape_bibtex(&paper.title),
    year = paper.year().unwrap_or(DEFAULT_YEAR),
    eprint = paper.arxiv_id,
    url = paper.resolved_pdf_url(),
    abstract_text = format::escape_bibtex(&paper.abstract_text),
  )
}

/// A keyed entry ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
  /// Unique citation key
  pub key:   String,
  /// Formatted BibTeX entry
  pub entry: String,
}

/// Assigns keys and formats entries for papers in the given order.
pub fn build_citations<'a>(papers: impl IntoIterator<Item = &'a Paper>) -> Vec<Citation> {
  let mut keys = CitationKeys::default();
  papers
    .into_iter()
    .map(|paper| {
      let key = keys.assign(paper);
      let entry = format_entry(paper, &key);
      Citation { key, entry }
    })
    .collect()
}

/// Renders the header comment block and all entries.
pub fn render(
  citations: &[Citation],
  settings: &config::BibliographyConfig,
  date: NaiveDate,
) -> String {
  let mut out = format!(
    "% {}\n% Auto-generated from arXiv metadata\n% Total entries: {}\n% Format: {}\n\
     % Last updated: {date}\n",
    settings.title,
    citations.len(),
    settings.style_note,
  );
  out.push('\n');
  for citation in citations {
    out.push_str(&citation.entry);
    out.push('\n');
  }
  out
}

/// Reads every store under `archive_root` and overwrites `output` with the full bibliography.
///
/// Stores are read in path order and papers in store order, so keys are stable between runs
/// over the same archive. Returns the citations written.
pub fn generate(
  archive_root: &Path,
  output: &Path,
  settings: &config::BibliographyConfig,
) -> Result<Vec<Citation>, CuratorError> {
  let mut papers = Vec::new();
  for path in MetadataStore::discover(archive_root)? {
    papers.extend(MetadataStore::load(&path)?.papers);
  }
  info!("Loaded {} papers from metadata files", papers.len());

  let citations = build_citations(&papers);
  if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(output, render(&citations, settings, Utc::now().date_naive()))?;
  info!("Generated {} BibTeX entries in {}", citations.len(), output.display());
  Ok(citations)
}
