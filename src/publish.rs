//! Publishing the updated page with git.
//!
//! Runs the three steps the site has always used, in the document's directory:
//!
//! ```text
//! git add <file>
//! git commit -m <message>
//! git push <remote> <branch>
//! ```
//!
//! The first failing step aborts the rest and is reported as
//! [`Error::Publish`]. Nothing is retried within a run.

use crate::error::{Error, Result};
use crate::utils::truncate_for_log;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct GitPublisher {
    repo_dir: PathBuf,
    remote: String,
    branch: String,
}

impl GitPublisher {
    pub fn new(repo_dir: impl Into<PathBuf>, remote: &str, branch: &str) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            remote: remote.to_string(),
            branch: branch.to_string(),
        }
    }

    /// Publisher rooted at the directory containing `document`.
    pub fn for_document(document: &Path, remote: &str, branch: &str) -> Self {
        let dir = document
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Self::new(dir, remote, branch)
    }

    async fn git(&self, args: &[&str]) -> Result<()> {
        let t0 = Instant::now();
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|e| Error::Publish(format!("failed to run git {}: {e}", args[0])))?;

        debug!(
            step = args[0],
            status = %output.status,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "git step finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Publish(format!(
                "git {} exited with {}: {}",
                args[0],
                output.status,
                truncate_for_log(stderr.trim(), 500)
            )));
        }
        Ok(())
    }

    /// Stage `file`, commit it with `message`, and push.
    #[instrument(level = "info", skip_all, fields(repo = %self.repo_dir.display(), remote = %self.remote, branch = %self.branch))]
    pub async fn publish(&self, file: &Path, message: &str) -> Result<()> {
        let file_arg = file
            .strip_prefix(&self.repo_dir)
            .unwrap_or(file)
            .to_string_lossy()
            .into_owned();

        self.git(&["add", file_arg.as_str()]).await?;
        self.git(&["commit", "-m", message]).await?;
        self.git(&["push", self.remote.as_str(), self.branch.as_str()]).await?;

        info!("Successfully committed and pushed");
        Ok(())
    }
}
