//! Runtime settings.
//!
//! Every tunable the pipeline uses lives here with a built-in default, so a
//! run without any configuration file behaves exactly like the site's cron
//! job always has. An optional YAML file can override any subset of fields:
//!
//! ```yaml
//! username: tenormusica
//! section_label: 最新投稿記事
//! max_retries: 2
//! fallback:
//!   title: Placeholder
//!   link: https://zenn.dev/tenormusica
//!   description: Read the latest posts on Zenn.
//! ```

use crate::error::{Error, Result};
use crate::models::ArticleRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

/// The article mirrored into the page when live extraction fails entirely.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FallbackArticle {
    pub title: String,
    pub link: String,
    pub description: String,
}

impl Default for FallbackArticle {
    fn default() -> Self {
        Self {
            title: "Sora 2とGrok Imagine、どっちが使えるのか - 6秒動画と60秒動画の現実".to_string(),
            link: "https://zenn.dev/tenormusica/articles/sora2-grok-video-generation-reality-2025"
                .to_string(),
            description: "Sora 2 is here | OpenAI\nhttps://openai.com/index/sora-2/\n\nxAI Grok Imagine 0.9 brings speed and quality improvements..."
                .to_string(),
        }
    }
}

impl FallbackArticle {
    /// Build the fallback [`ArticleRecord`], optionally carrying the failure that caused it.
    pub fn to_record(&self, error: Option<String>) -> ArticleRecord {
        ArticleRecord {
            title: self.title.clone(),
            link: self.link.clone(),
            description: self.description.clone(),
            published: None,
            updated: false,
            error,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Zenn account whose articles are mirrored.
    pub username: String,
    /// Listing endpoint; `{username}` is substituted.
    pub api_url: String,
    /// Article URL prefix; `{username}` is substituted, the slug is appended.
    pub article_base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Extra attempts per request after the first one fails.
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,

    /// Page to update. Defaults to `index.html` next to the executable.
    pub index_path: Option<PathBuf>,
    /// `<h2>` label that anchors the article card.
    pub section_label: String,

    /// Maximum feed description length, in characters.
    pub description_limit: usize,
    pub ellipsis: String,
    /// How many leading `<p>` elements are considered for the description.
    pub paragraph_sample: usize,
    /// Paragraphs must be strictly longer than this to count.
    pub meaningful_min_chars: usize,
    pub letters_per_minute: u64,
    pub reading_time_suffix: String,

    pub fallback: FallbackArticle,

    pub git_remote: String,
    pub git_branch: String,
    /// Commit message; `{title}` and `{url}` are substituted.
    pub commit_message: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: "tenormusica".to_string(),
            api_url: "https://zenn.dev/api/articles?username={username}&order=latest".to_string(),
            article_base_url: "https://zenn.dev/{username}/articles/".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            request_timeout_secs: 10,
            max_retries: 0,
            retry_base_delay_ms: 1000,
            index_path: None,
            section_label: "最新投稿記事".to_string(),
            description_limit: 200,
            ellipsis: "...".to_string(),
            paragraph_sample: 3,
            meaningful_min_chars: 20,
            letters_per_minute: 400,
            reading_time_suffix: "分で読めます".to_string(),
            fallback: FallbackArticle::default(),
            git_remote: "origin".to_string(),
            git_branch: "main".to_string(),
            commit_message: "Update latest Zenn article\n\n{title}\n{url}".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file, or return the defaults when no path is given.
    ///
    /// # Arguments
    ///
    /// * `path` - Optional YAML file; fields it leaves out keep their defaults
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - Defaults overlaid with the file's values
    /// * `Err(Error::Config)` - The file cannot be read, is not valid YAML, or fails validation
    ///
    /// # Example
    ///
    /// ```ignore
    /// let settings = Settings::load(cli.config.as_deref())?;
    /// let api = HttpZennApi::new(&settings)?;
    /// ```
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let settings = Self::from_yaml(&raw)?;
        info!(path = %path.display(), username = %settings.username, "Loaded configuration");
        Ok(settings)
    }

    /// Parse and validate settings from YAML text.
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - Parsed settings; blank input yields the defaults
    /// * `Err(Error::Config)` - Invalid YAML, or `username` / `section_label` empty, or `letters_per_minute` zero
    pub fn from_yaml(raw: &str) -> Result<Self> {
        // An empty file deserializes to `null`, which should mean "all defaults".
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::Config("username must not be empty".to_string()));
        }
        if self.letters_per_minute == 0 {
            return Err(Error::Config("letters_per_minute must be positive".to_string()));
        }
        if self.section_label.trim().is_empty() {
            return Err(Error::Config("section_label must not be empty".to_string()));
        }
        Ok(())
    }

    /// Listing endpoint with the URL-encoded username substituted.
    pub fn listing_url(&self) -> String {
        self.api_url
            .replace("{username}", &urlencoding::encode(&self.username))
    }

    /// Public URL of the article identified by `slug`.
    pub fn article_url(&self, slug: &str) -> String {
        let base = self
            .article_base_url
            .replace("{username}", &urlencoding::encode(&self.username));
        format!("{}{}", base, slug)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Fill the commit message template with the record's title and link.
    pub fn render_commit_message(&self, record: &ArticleRecord) -> String {
        self.commit_message
            .replace("{title}", &record.title)
            .replace("{url}", &record.link)
    }
}
