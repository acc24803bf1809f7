//! pagetrail binary.
//!
//! Reads `pagetrail.toml` (or the path given with `--config`) and
//! `PAGETRAIL_*` environment variables, then runs one pipeline step against
//! the data directory.

mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pagetrail_core::{
  collect::{PageStatus, collect},
  history::{PageHistory, SiteHistory, page_history, site_history},
  page::TrackedPage,
  store::Ledger,
};
use pagetrail_diff::generate_diffs;
use pagetrail_github::GithubSource;
use pagetrail_store_fs::{FsBlobStore, FsLedger};
use serde::Serialize;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

#[derive(Parser)]
#[command(author, version, about = "Track page versions and render their diffs")]
struct Cli {
  /// Path to the TOML settings file.
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Data directory; overrides the settings file and environment.
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create the data package, or add pages to an existing one.
  Init {
    /// Page id to track; repeatable.
    #[arg(long = "page")]
    pages: Vec<String>,
  },
  /// Fetch and record new versions of every tracked page.
  Collect,
  /// Render every diff that is not cached yet.
  Diff,
  /// Print version history as JSON.
  History {
    /// Only this page.
    #[arg(long)]
    page: Option<String>,
  },
}

/// JSON handed to the site renderer.
#[derive(Serialize)]
struct HistoryExport<'a, T: Serialize> {
  base_url: Option<&'a str>,
  #[serde(flatten)]
  history:  T,
}

#[derive(Serialize)]
struct SinglePage {
  last_updated: Option<DateTime<Utc>>,
  page:         PageHistory,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let mut settings = Settings::load(cli.config.as_deref())?;
  if let Some(dir) = cli.data_dir {
    settings.data_dir = dir;
  }
  let data_dir = settings.data_dir.clone();

  match cli.command {
    Command::Init { pages } => {
      let pages: Vec<_> = pages.into_iter().map(TrackedPage::new).collect();
      let ledger = FsLedger::init(&data_dir, &pages)
        .await
        .with_context(|| format!("failed to initialise {}", data_dir.display()))?;
      let tracked = ledger.tracked_pages().await.context("failed to read tracked pages")?;
      info!(pages = tracked.len(), dir = %data_dir.display(), "data package ready");
    }

    Command::Collect => {
      let ledger = open_ledger(&data_dir).await?;
      let content = FsBlobStore::content(&data_dir);
      let source = GithubSource::new(settings.github()).context("failed to build GitHub client")?;

      let pages = ledger.tracked_pages().await.context("failed to read tracked pages")?;
      let report = collect(&pages, &ledger, &content, &source)
        .await
        .context("collection aborted")?;

      for page in &report.pages {
        let known = page.already_collected;
        match &page.status {
          PageStatus::UpToDate => info!(page = %page.page_id, known, "up to date"),
          PageStatus::Collected { count } => {
            info!(page = %page.page_id, count, known, "collected")
          }
          PageStatus::Failed { reason } => warn!(page = %page.page_id, %reason, "failed"),
        }
      }
      info!(
        versions = report.collected(),
        failed_pages = report.failed().count(),
        "collection finished"
      );
    }

    Command::Diff => {
      let ledger = open_ledger(&data_dir).await?;
      let content = FsBlobStore::content(&data_dir);
      let diffs = FsBlobStore::diffs(&data_dir);

      let report = generate_diffs(&ledger, &content, &diffs)
        .await
        .context("diff generation aborted")?;
      info!(
        written = report.written,
        cached = report.cached,
        missing_content = report.missing_content,
        failed = report.failed,
        "diffs finished"
      );
    }

    Command::History { page } => {
      let ledger = open_ledger(&data_dir).await?;
      let content = FsBlobStore::content(&data_dir);
      let base_url = settings.base_url.as_deref();

      let json = match page {
        Some(page_id) => {
          let page = page_history(&ledger, &content, &page_id)
            .await
            .with_context(|| format!("failed to build history for {page_id}"))?;
          let last_updated = ledger.last_updated().await.context("failed to read ledger")?;
          serde_json::to_string_pretty(&HistoryExport {
            base_url,
            history: SinglePage { last_updated, page },
          })
        }
        None => {
          let history: SiteHistory =
            site_history(&ledger, &content).await.context("failed to build history")?;
          serde_json::to_string_pretty(&HistoryExport { base_url, history })
        }
      }
      .context("failed to serialise history")?;
      println!("{json}");
    }
  }

  Ok(())
}

async fn open_ledger(data_dir: &std::path::Path) -> anyhow::Result<FsLedger> {
  FsLedger::open(data_dir)
    .await
    .with_context(|| format!("failed to open data package in {}", data_dir.display()))
}
