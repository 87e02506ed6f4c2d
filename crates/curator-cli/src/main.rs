use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use clap::{builder::ArgAction, Parser, Subcommand};
use console::{style, Emoji};
use curator::{
  bibtex,
  clients::ArxivClient,
  config::{Config, QuerySet},
  errors::CuratorError,
  fetch::PdfFetcher,
  query, MetadataStore,
};
use errors::CuratorCliError;
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

pub mod errors;

static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
static BOOKS: Emoji<'_, '_> = Emoji("📚 ", "");
static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static PAPER: Emoji<'_, '_> = Emoji("📄 ", "");
static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✨ ", "");

#[derive(Parser)]
#[command(author, version, about = "Query arXiv, archive relevant PDFs and build a bibliography")]
struct Cli {
  /// Verbose mode (-v, -vv, -vvv)
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Configuration file (defaults to the user config directory)
  #[arg(long, short, global = true)]
  config: Option<PathBuf>,

  /// Archive root, overriding `archive_root` from the configuration
  #[arg(long, global = true)]
  root: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Write a starter configuration file
  Init {
    /// Overwrite an existing configuration without asking
    #[arg(long, short)]
    force: bool,
  },
  /// Run configured arXiv query sets and update the topic stores
  Query {
    /// Only run the query set with this name
    #[arg(long, short)]
    set: Option<String>,
  },
  /// Download PDFs of high-scoring papers
  Download {
    /// Minimum relevance score to download
    #[arg(long)]
    min_score: Option<u8>,
    /// Seconds to wait before each request
    #[arg(long)]
    delay: Option<f64>,
  },
  /// Regenerate the BibTeX bibliography from every store
  Bibtex {
    /// Output file
    #[arg(long, short)]
    output: Option<PathBuf>,
  },
  /// Summarize the stores in the archive
  Status,
}

/// Setup logging with the specified verbosity level
fn setup_logging(verbosity: u8) {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true)
    .init();
}

/// Loads the configuration and applies the `--root` override.
fn load_config(cli: &Cli) -> Result<Config, CuratorCliError> {
  let mut config = Config::load_or_default(cli.config.as_deref())?;
  if let Some(root) = &cli.root {
    config.archive_root = root.clone();
  }
  trace!("Archive root: {}", config.archive_root.display());
  Ok(config)
}

/// Writes the starter configuration, asking before replacing an existing file.
fn init(cli: &Cli, force: bool) -> Result<(), CuratorCliError> {
  let path = cli.config.clone().unwrap_or_else(|| {
    let default_path = Config::default_path();
    println!(
      "{} Using default configuration path: {}",
      style(BOOKS).cyan(),
      style(default_path.display()).yellow()
    );
    default_path
  });

  if path.exists() && !force {
    println!(
      "{} Configuration already exists at: {}",
      style(WARNING).yellow(),
      style(path.display()).yellow()
    );

    let confirm = dialoguer::Confirm::new()
      .with_prompt("Do you want to overwrite it with the starter configuration?")
      .default(false)
      .interact()?;

    if !confirm {
      println!("{} Keeping existing configuration", style("ℹ").blue());
      return Ok(());
    }
  }

  let mut config = Config::sample();
  if let Some(root) = &cli.root {
    config.archive_root = root.clone();
  }

  println!(
    "{} Writing configuration to: {}",
    style(ROCKET).cyan(),
    style(path.display()).yellow()
  );
  config.save(&path)?;

  println!("{} Configuration written successfully!", style(SUCCESS).green());
  println!(
    "   {} {}",
    style("Archive root:").green().bold(),
    style(config.archive_root.display()).white()
  );
  Ok(())
}

/// Runs one or all query sets.
async fn run_queries(config: &Config, set: Option<&str>) -> Result<(), CuratorCliError> {
  let sets: Vec<&QuerySet> = match set {
    Some(name) => vec![config.query_set(name)?],
    None => config.query_sets.iter().collect(),
  };
  if sets.is_empty() {
    println!(
      "{} No query sets configured. Run {} to create a starter configuration.",
      style(WARNING).yellow(),
      style("curator init").yellow().bold()
    );
    return Ok(());
  }

  let client = ArxivClient::new(&config.http, &config.arxiv.base_url)?;
  let delay = Duration::from_secs(config.arxiv.query_delay_secs);

  let mut added = 0;
  let mut failed = 0;
  for (i, set) in sets.iter().enumerate() {
    if i > 0 {
      tokio::time::sleep(delay).await;
    }

    println!(
      "\n{} Running query set {} ({} queries)",
      style(LOOKING_GLASS).cyan(),
      style(&set.name).yellow(),
      set.queries.len()
    );

    let report = query::run_query_set(set, &client, &config.archive_root, delay).await?;
    for outcome in &report.outcomes {
      if let Some(error) = &outcome.error {
        println!(
          "   {} [{}] {}",
          style("✖").red(),
          style(&outcome.query_id).yellow(),
          style(error).red()
        );
        continue;
      }

      println!(
        "   {} [{}] kept {}/{} papers, {} new",
        style("✔").green(),
        style(&outcome.query_id).yellow(),
        outcome.kept,
        outcome.fetched,
        style(outcome.added).green().bold()
      );
      for (score, count) in outcome.score_distribution.iter().rev() {
        println!("      Score {score}/10: {count} paper(s)");
      }
      if outcome.kept > 0 {
        println!("      {}", style(outcome.store_path.display()).dim());
      }
    }
    added += report.added();
    failed += report.failures().count();
  }

  println!("\n{} Added {} new papers", style(SAVE).green(), style(added).yellow());
  if failed > 0 {
    println!("{} {} queries failed", style(WARNING).yellow(), style(failed).red());
  }
  Ok(())
}

/// Downloads PDFs for every paper at or above the score threshold.
async fn download(
  config: &Config,
  min_score: Option<u8>,
  delay: Option<f64>,
) -> Result<(), CuratorCliError> {
  let min_score = min_score.unwrap_or(config.download.min_score);
  let mut settings = config.download.clone();
  if let Some(delay) = delay {
    if !delay.is_finite() || delay < 0.0 {
      return Err(
        CuratorError::InvalidConfig(format!("--delay must be a non-negative number, got {delay}"))
          .into(),
      );
    }
    settings.delay_secs = delay;
  }

  println!(
    "{} Downloading PDFs scoring {}+ from {}",
    style(PAPER).cyan(),
    style(min_score).yellow(),
    style(config.archive_root.display()).yellow()
  );
  debug!("Delay between requests: {}s", settings.delay_secs);

  let fetcher = PdfFetcher::new(&config.http, &settings)?;
  let report = fetcher.download_all(&config.archive_root, min_score).await?;

  println!("\n{} Download summary", style(SUCCESS).green());
  println!("   {} {}", style("Total:").green().bold(), report.total);
  println!("   {} {}", style("Downloaded:").green().bold(), report.downloaded);
  println!("   {} {}", style("Skipped:").green().bold(), report.skipped);
  println!("   {} {}", style("Failed:").green().bold(), report.failed);
  if let Some(rate) = report.success_rate() {
    println!("   {} {rate:.1}%", style("Success rate:").green().bold());
  }

  if !report.errors.is_empty() {
    println!("\n{} Errors:", style(WARNING).yellow());
    for error in &report.errors {
      println!("   {} {}", style("-").red(), error);
    }
  }
  Ok(())
}

/// Rewrites the bibliography.
fn write_bibliography(config: &Config, output: Option<PathBuf>) -> Result<(), CuratorCliError> {
  let output = output.unwrap_or_else(|| config.bibliography.output.clone());
  println!(
    "{} Generating bibliography from {}",
    style(BOOKS).cyan(),
    style(config.archive_root.display()).yellow()
  );

  let citations = bibtex::generate(&config.archive_root, &output, &config.bibliography)?;

  println!(
    "{} Wrote {} entries to {}",
    style(SUCCESS).green(),
    style(citations.len()).yellow(),
    style(output.display()).yellow()
  );
  Ok(())
}

/// Prints one line per store plus archive totals.
fn status(config: &Config) -> Result<(), CuratorCliError> {
  let stores = MetadataStore::discover(&config.archive_root)?;
  if stores.is_empty() {
    println!(
      "{} No metadata stores found under {}",
      style(WARNING).yellow(),
      style(config.archive_root.display()).yellow()
    );
    return Ok(());
  }

  let mut total_papers = 0;
  let mut total_pdfs = 0;
  let mut distribution: BTreeMap<u8, usize> = BTreeMap::new();

  println!("{} Archive: {}", style(BOOKS).cyan(), style(config.archive_root.display()).yellow());
  for path in stores {
    let store = MetadataStore::load(&path)?;
    let pdfs = store.papers.iter().filter(|paper| paper.pdf_stored_locally).count();
    for paper in &store.papers {
      *distribution.entry(paper.relevance_score).or_default() += 1;
    }

    let display = path.strip_prefix(&config.archive_root).unwrap_or(&path);
    println!(
      "\n{} {} ({})",
      style(PAPER).green(),
      style(&store.topic).white().bold(),
      style(&store.time_period).cyan()
    );
    println!("   {} {}", style("Store:").green(), style(display.display()).dim());
    println!("   {} {}", style("Papers:").green(), store.papers.len());
    println!("   {} {}", style("PDFs stored:").green(), pdfs);
    if !store.last_updated.is_empty() {
      println!("   {} {}", style("Last updated:").green(), store.last_updated);
    }

    total_papers += store.papers.len();
    total_pdfs += pdfs;
  }

  println!(
    "\n{} {} papers, {} PDFs stored",
    style("Total:").green().bold(),
    style(total_papers).yellow(),
    style(total_pdfs).yellow()
  );
  for (score, count) in distribution.iter().rev() {
    println!("   Score {score}/10: {count}");
  }
  Ok(())
}

#[tokio::main]
async fn main() -> Result<(), CuratorCliError> {
  let cli = Cli::parse();
  setup_logging(cli.verbose);

  match &cli.command {
    Commands::Init { force } => init(&cli, *force),
    Commands::Query { set } => run_queries(&load_config(&cli)?, set.as_deref()).await,
    Commands::Download { min_score, delay } =>
      download(&load_config(&cli)?, *min_score, *delay).await,
    Commands::Bibtex { output } => write_bibliography(&load_config(&cli)?, output.clone()),
    Commands::Status => status(&load_config(&cli)?),
  }
}
