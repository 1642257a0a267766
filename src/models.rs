//! Data models shared by the extractors, the document merger and the publisher.
//!
//! - [`ArticleRecord`]: the normalized article both extractors produce
//! - [`ArticleList`] / [`ZennArticle`]: the subset of the Zenn listing API we read

use serde::{Deserialize, Serialize};

/// The normalized article mirrored into the portfolio page.
///
/// Serialized field order is part of the `feed` command's output contract:
/// `title`, `link`, `description`, `updated`, then `error` when present.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "RecordInput")]
pub struct ArticleRecord {
    /// Platform-provided title, used verbatim.
    pub title: String,
    /// Absolute article URL.
    pub link: String,
    /// Plain text, no markup, trimmed.
    pub description: String,
    /// Publication date, only set by the page-scrape extractor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    /// `false` when the record is the configured fallback.
    pub updated: bool,
    /// Why the fallback was substituted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Accepted input shape for [`ArticleRecord`].
///
/// Older producers wrote `url` instead of `link` and left `updated` out.
/// Without the key, a record counts as live unless it carries an `error`.
#[derive(Deserialize)]
struct RecordInput {
    title: String,
    #[serde(alias = "url")]
    link: String,
    description: String,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    updated: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

impl From<RecordInput> for ArticleRecord {
    fn from(input: RecordInput) -> Self {
        Self {
            updated: input.updated.unwrap_or(input.error.is_none()),
            title: input.title,
            link: input.link,
            description: input.description,
            published: input.published,
            error: input.error,
        }
    }
}

/// Response body of `GET /api/articles`.
#[derive(Debug, Default, Deserialize)]
pub struct ArticleList {
    #[serde(default)]
    pub articles: Vec<ZennArticle>,
}

/// One entry of the listing. Only the fields the sync needs are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct ZennArticle {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub body_letters_count: Option<u64>,
    #[serde(default)]
    pub published_at: Option<String>,
}
