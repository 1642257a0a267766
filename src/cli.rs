//! Command-line interface definitions for Zenn Article Sync.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Options that matter to scheduled runs can also be provided via environment
//! variables.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Zenn Article Sync application.
///
/// # Examples
///
/// ```sh
/// # Print the newest feed entry as JSON
/// curl -s https://zenn.dev/tenormusica/feed | zenn_article_sync feed
///
/// # Scrape Zenn, update index.html next to the binary, commit and push
/// zenn_article_sync update
///
/// # Merge a previously produced record without publishing
/// zenn_article_sync apply --record latest.json --index-path ./index.html --no-publish
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, global = true, env = "ZENN_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read an RSS feed on stdin and print its newest article as JSON
    Feed,

    /// Fetch the newest article from the Zenn API and update the page
    Update {
        /// Zenn account to mirror
        #[arg(short, long, env = "ZENN_USERNAME")]
        username: Option<String>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Merge an article record (JSON, as printed by `feed`) into the page
    Apply {
        /// Record file; reads stdin when omitted
        #[arg(short, long)]
        record: Option<PathBuf>,

        /// Also apply records that are the fallback article
        #[arg(long)]
        allow_fallback: bool,

        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Where the page lives and whether to publish it.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Page to update (defaults to index.html next to the executable)
    #[arg(short, long, env = "ZENN_SYNC_INDEX")]
    pub index_path: Option<PathBuf>,

    /// Update the page but skip git add/commit/push
    #[arg(long)]
    pub no_publish: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_feed() {
        let cli = Cli::parse_from(["zenn_article_sync", "feed"]);
        assert!(matches!(cli.command, Command::Feed));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_update_flags() {
        let cli = Cli::parse_from([
            "zenn_article_sync",
            "update",
            "--username",
            "someone",
            "--index-path",
            "/srv/site/index.html",
            "--no-publish",
        ]);
        match cli.command {
            Command::Update { username, target } => {
                assert_eq!(username.as_deref(), Some("someone"));
                assert_eq!(target.index_path, Some(PathBuf::from("/srv/site/index.html")));
                assert!(target.no_publish);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_apply_short_flags_and_global_config() {
        let cli = Cli::parse_from([
            "zenn_article_sync",
            "apply",
            "-r",
            "latest.json",
            "-i",
            "index.html",
            "-c",
            "sync.yaml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("sync.yaml")));
        match cli.command {
            Command::Apply {
                record,
                allow_fallback,
                target,
            } => {
                assert_eq!(record, Some(PathBuf::from("latest.json")));
                assert!(!allow_fallback);
                assert!(!target.no_publish);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
