//! Runs configured arXiv query sets and files the relevant results into topic stores.
//!
//! For every query in a [`QuerySet`] the runner searches arXiv, scores each result against the
//! query's keywords, keeps the papers at or above the set's `min_relevance`, and merges them
//! into `archive_root/base_dir/topic/time_period/metadata.json`. Queries are separated by a
//! fixed pause. A query that fails is logged and skipped; the others still run.

use std::{collections::BTreeMap, time::Duration};

use chrono::Utc;

use super::*;
use crate::{
  config::{QueryDefinition, QuerySet},
  scoring::TopicContext,
};

/// What happened to a single query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutcome {
  /// Query identifier, e.g. `5A`
  pub query_id:           String,
  /// Store the results were merged into
  pub store_path:         PathBuf,
  /// Entries arXiv returned
  pub fetched:            usize,
  /// Entries at or above the relevance threshold
  pub kept:               usize,
  /// Kept entries that were new to the store
  pub added:              usize,
  /// Number of kept papers per relevance score
  pub score_distribution: BTreeMap<u8, usize>,
  /// Why the query failed, if it did
  pub error:              Option<String>,
}

/// Outcomes of every query in a set, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryReport {
  /// Per-query outcomes
  pub outcomes: Vec<QueryOutcome>,
}

impl QueryReport {
  /// Total papers newly added to stores.
  pub fn added(&self) -> usize { self.outcomes.iter().map(|o| o.added).sum() }

  /// Queries that failed.
  pub fn failures(&self) -> impl Iterator<Item = &QueryOutcome> {
    self.outcomes.iter().filter(|o| o.error.is_some())
  }
}

/// Location of the store a query writes to.
pub fn store_path(archive_root: &Path, set: &QuerySet, query: &QueryDefinition) -> PathBuf {
  archive_root
    .join(&set.base_dir)
    .join(&query.topic)
    .join(&set.time_period)
    .join(store::METADATA_FILE)
}

/// Scores papers against a topic and keeps those reaching `min_relevance`.
pub fn score_and_filter(
  papers: Vec<Paper>,
  context: &TopicContext,
  min_relevance: u8,
) -> Vec<Paper> {
  papers
    .into_iter()
    .filter_map(|mut paper| {
      scoring::score(&paper, context).apply(&mut paper);
      (paper.relevance_score >= min_relevance).then_some(paper)
    })
    .collect()
}

/// Runs every query of `set`, pausing `delay` between consecutive queries.
///
/// Errors loading or saving a store are returned; search failures are recorded in the report.
pub async fn run_query_set(
  set: &QuerySet,
  client: &ArxivClient,
  archive_root: &Path,
  delay: Duration,
) -> Result<QueryReport, CuratorError> {
  let mut report = QueryReport::default();

  for (i, query) in set.queries.iter().enumerate() {
    if i > 0 {
      debug!("Rate limiting: waiting {}s", delay.as_secs_f64());
      tokio::time::sleep(delay).await;
    }

    info!("[{}] {}", query.id, query.description);
    let path = store_path(archive_root, set, query);
    let mut outcome =
      QueryOutcome { query_id: query.id.clone(), store_path: path.clone(), ..Default::default() };

    let papers = match client.search(&query.query_string, query.max_results).await {
      Ok(papers) => papers,
      Err(e) => {
        warn!("Query {} failed: {e}", query.id);
        outcome.error = Some(e.to_string());
        report.outcomes.push(outcome);
        continue;
      },
    };
    outcome.fetched = papers.len();

    let context = TopicContext::new(&query.keywords);
    let relevant = score_and_filter(papers, &context, set.min_relevance);
    outcome.kept = relevant.len();
    for paper in &relevant {
      *outcome.score_distribution.entry(paper.relevance_score).or_default() += 1;
    }
    info!(
      "[{}] High relevance (>={}/10): {}/{} papers",
      query.id, set.min_relevance, outcome.kept, outcome.fetched
    );

    if relevant.is_empty() {
      report.outcomes.push(outcome);
      continue;
    }

    let mut store = MetadataStore::load_or_new(&path, &query.topic, &set.time_period)?;
    outcome.added = store.merge(relevant);
    store.topic = query.topic.clone();
    store.time_period = set.time_period.clone();
    store.curation_status = set.curation_status.clone();
    store.priority = set.priority.clone();
    store.touch(Utc::now());
    store.save(&path)?;
    info!("Metadata saved to {} ({} new)", path.display(), outcome.added);

    report.outcomes.push(outcome);
  }

  Ok(report)
}

#[cfg(test)]
mod tests {
  use mockito::{Matcher, Server};
  use tempfile::tempdir;

  use super::*;

  /// Builds a feed with one entry per `(id, title, abstract, published)` tuple.
  fn feed(entries: &[(&str, &str, &str, &str)]) -> String {
    let body: String = entries
      .iter()
      .map(|(id, title, summary, published)| {
        format!(
          "<entry><id>http://arxiv.org/abs/{id}</id><published>{published}</published>\
           <title>{title}</title><summary>{summary}</summary>\
           <author><name>Ann Author</name></author>\
           <category term=\"cs.GT\"/></entry>"
        )
      })
      .collect();
    format!("<feed xmlns=\"http://www.w3.org/2005/Atom\">{body}</feed>")
  }

  fn query(id: &str, topic: &str, search: &str) -> QueryDefinition {
    QueryDefinition {
      id:           id.into(),
      description:  format!("query {id}"),
      query_string: search.into(),
      max_results:  10,
      topic:        topic.into(),
      keywords:     vec!["voting".into(), "quadratic".into(), "delegation".into()],
    }
  }

  fn query_set(queries: Vec<QueryDefinition>) -> QuerySet {
    QuerySet {
      name: "peripheral".into(),
      base_dir: PathBuf::from("05-peripheral-topics"),
      time_period: "2024-2025".into(),
      priority: "P3".into(),
      curation_status: "Phase 1".into(),
      min_relevance: 7,
      queries,
    }
  }

  #[test]
  fn test_score_and_filter() {
    let mut strong = Paper::new("1", "Quadratic Voting with Delegation");
    strong.abstract_text = "A novel formal model and proof.".into();
    strong.submitted_date = NaiveDate::from_ymd_opt(2024, 5, 1);
    let weak = Paper::new("2", "Unrelated");

    let context = TopicContext::new(["voting", "quadratic", "delegation"]);
    let kept = score_and_filter(vec![strong, weak], &context, 7);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].arxiv_id, "1");
    assert_eq!(kept[0].relevance_score, 8);
    assert!(kept[0].notes.starts_with("MEDIUM"));
  }

  #[traced_test]
  #[tokio::test]
  async fn test_run_query_set_writes_and_merges() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let _voting = server
      .mock("GET", "/api/query")
      .match_query(Matcher::UrlEncoded("search_query".into(), "ti:voting".into()))
      .with_status(200)
      .with_body(feed(&[
        (
          "2401.00001v1",
          "Quadratic Voting with Delegation",
          "A novel formal model and proof.",
          "2024-01-02T00:00:00Z",
        ),
        ("2001.00002v1", "Something Else", "Nothing here.", "2020-01-02T00:00:00Z"),
      ]))
      .expect(2)
      .create_async()
      .await;
    let _broken = server
      .mock("GET", "/api/query")
      .match_query(Matcher::UrlEncoded("search_query".into(), "ti:broken".into()))
      .with_status(503)
      .create_async()
      .await;

    let root = tempdir()?;
    let set = query_set(vec![
      query("5A", "voting-mechanisms", "ti:voting"),
      query("5X", "broken", "ti:broken"),
    ]);
    let client =
      ArxivClient::new(&config::HttpConfig::default(), &format!("{}/api/query", server.url()))?;

    let report = run_query_set(&set, &client, root.path(), Duration::ZERO).await?;
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.added(), 1);

    let voting = &report.outcomes[0];
    assert_eq!(voting.fetched, 2);
    assert_eq!(voting.kept, 1);
    assert_eq!(voting.score_distribution, BTreeMap::from([(8, 1)]));
    assert_eq!(
      voting.store_path,
      root.path().join("05-peripheral-topics/voting-mechanisms/2024-2025/metadata.json")
    );

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].query_id, "5X");
    assert!(!root.path().join("05-peripheral-topics/broken").exists());

    let mut store = MetadataStore::load(&voting.store_path)?;
    assert_eq!(store.topic, "voting-mechanisms");
    assert_eq!(store.priority, "P3");
    assert_eq!(store.total_papers, 1);
    assert_eq!(store.papers[0].arxiv_id, "2401.00001v1");

    // User edits survive a re-run, and the duplicate is not appended again.
    store.papers[0].tags = vec!["core".into()];
    store.papers[0].integration_status = IntegrationStatus::Reviewed;
    store.save(&voting.store_path)?;

    let report = run_query_set(&set, &client, root.path(), Duration::ZERO).await?;
    assert_eq!(report.added(), 0);
    let store = MetadataStore::load(&voting.store_path)?;
    assert_eq!(store.papers.len(), 1);
    assert_eq!(store.papers[0].tags, vec!["core".to_string()]);
    assert_eq!(store.papers[0].integration_status, IntegrationStatus::Reviewed);
    Ok(())
  }
}
