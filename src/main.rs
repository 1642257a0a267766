//! # Zenn Article Sync
//!
//! Keeps the "latest article" card of a static portfolio page in step with
//! the newest post on Zenn.
//!
//! ## Commands
//!
//! - `feed`: RSS on stdin → one JSON article record on stdout. Never fails;
//!   a broken feed produces the configured fallback article.
//! - `update`: Zenn API + article page → article record → page merge → git
//!   commit and push when the page changed.
//! - `apply`: JSON article record → page merge → git commit and push when
//!   the page changed.
//!
//! ## Architecture
//!
//! Each run is one sequential pass:
//! 1. **Extraction**: build an [`ArticleRecord`](models::ArticleRecord)
//! 2. **Merge**: rewrite the title, description and link of the page's card
//! 3. **Publish**: stage, commit and push, only if the merge changed the file
//!
//! Logs go to stderr so that stdout stays a clean JSON channel.

use chrono::Local;
use clap::Parser;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod error;
mod extractors;
mod models;
mod outputs;
mod publish;
mod settings;
mod utils;

use api::{HttpZennApi, RetryFetch};
use cli::{Cli, Command, TargetArgs};
use error::Error;
use models::ArticleRecord;
use outputs::document::{Fingerprint, update_document};
use publish::GitPublisher;
use settings::Settings;
use utils::default_index_path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn StdError>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let result = match args.command {
        Command::Feed => {
            // The feed contract holds even when the config is broken.
            let settings = Settings::load(args.config.as_deref()).unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default settings");
                Settings::default()
            });
            run_feed(&settings).await
        }
        Command::Update { username, target } => {
            let mut settings = Settings::load(args.config.as_deref())?;
            if let Some(username) = username {
                settings.username = username;
            }
            run_update(&settings, &target).await
        }
        Command::Apply {
            record,
            allow_fallback,
            target,
        } => {
            let settings = Settings::load(args.config.as_deref())?;
            run_apply(&settings, record.as_deref(), allow_fallback, &target).await
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    result.map_err(Into::into)
}

/// `feed`: RSS on stdin, JSON on stdout.
#[instrument(level = "info", skip_all)]
async fn run_feed(settings: &Settings) -> Result<(), Error> {
    let mut input = Vec::new();
    let record = match tokio::io::stdin().read_to_end(&mut input).await {
        Ok(_) => extractors::feed::latest_from_feed(&input, settings),
        Err(e) => {
            error!(error = %e, "Failed to read feed from stdin");
            settings.fallback.to_record(Some(e.to_string()))
        }
    };

    let stdout = std::io::stdout();
    outputs::json::write_record(&mut stdout.lock(), &record)?;
    Ok(())
}

/// `update`: scrape Zenn, merge, publish.
#[instrument(level = "info", skip_all, fields(username = %settings.username))]
async fn run_update(settings: &Settings, target: &TargetArgs) -> Result<(), Error> {
    info!(started_at = %Local::now(), "Zenn article update starting");

    let api = RetryFetch::new(
        HttpZennApi::new(settings)?,
        settings.max_retries,
        settings.retry_base_delay(),
    );
    let today = Local::now().date_naive();

    let Some(record) = extractors::zenn::fetch_latest_article(&api, settings, today).await else {
        warn!("Failed to fetch latest article");
        return Ok(());
    };

    info!(
        title = %record.title,
        published = record.published.as_deref().unwrap_or(""),
        url = %record.link,
        "Latest article"
    );

    sync_document(settings, &record, target).await
}

/// `apply`: read a record, merge, publish.
#[instrument(level = "info", skip_all)]
async fn run_apply(
    settings: &Settings,
    record_path: Option<&Path>,
    allow_fallback: bool,
    target: &TargetArgs,
) -> Result<(), Error> {
    let raw = match record_path {
        Some(path) => tokio::fs::read(path).await?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin().read_to_end(&mut buf).await?;
            buf
        }
    };
    let record: ArticleRecord = serde_json::from_slice(&raw)
        .map_err(|e| Error::Config(format!("invalid article record: {e}")))?;

    if !record.updated && !allow_fallback {
        warn!(
            error = record.error.as_deref().unwrap_or(""),
            "Record is the fallback article; skipping (use --allow-fallback to apply it)"
        );
        return Ok(());
    }

    sync_document(settings, &record, target).await
}

fn resolve_index_path(settings: &Settings, target: &TargetArgs) -> PathBuf {
    target
        .index_path
        .clone()
        .or_else(|| settings.index_path.clone())
        .unwrap_or_else(default_index_path)
}

/// Merge `record` into the page and publish it if the page changed.
async fn sync_document(
    settings: &Settings,
    record: &ArticleRecord,
    target: &TargetArgs,
) -> Result<(), Error> {
    let path = resolve_index_path(settings, target);
    let fingerprint = Fingerprint::new(&settings.section_label)?;

    let changed = match update_document(&path, record, &fingerprint).await {
        Ok(changed) => changed,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to update document");
            return Err(e);
        }
    };

    if !changed {
        info!("No update needed");
        return Ok(());
    }
    info!(path = %path.display(), title = %record.title, "Updated page with latest article");

    if target.no_publish {
        info!("Publishing disabled; leaving the change uncommitted");
        return Ok(());
    }

    let publisher = GitPublisher::for_document(&path, &settings.git_remote, &settings.git_branch);
    if let Err(e) = publisher
        .publish(&path, &settings.render_commit_message(record))
        .await
    {
        error!(error = %e, "Git operation failed");
    }
    Ok(())
}
