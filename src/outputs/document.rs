//! In-place update of the portfolio page's "latest article" card.
//!
//! The page is treated as text. A fingerprint regex finds the single card that
//! sits under the `<h2>` section label and captures three spans: the title,
//! the description and the link `href`. Only those spans are rewritten; every
//! other byte of the file is copied through unchanged.
//!
//! ```html
//! <div class="article-section">
//!   <h2>最新投稿記事</h2>
//!   <div class="article-card">
//!     <h3 class="article-title">TITLE</h3>
//!     <p class="article-description">DESCRIPTION</p>
//!     <a href="LINK" class="article-link">…</a>
//!   </div>
//! </div>
//! ```

use crate::error::{Error, Result};
use crate::models::ArticleRecord;
use quick_xml::escape::{escape, partial_escape};
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Outcome of matching the fingerprint against a document.
#[derive(Debug, PartialEq, Eq)]
pub enum Merge {
    /// Exactly one region matched; the document with the fields substituted.
    Replaced(String),
    /// The fingerprint does not occur.
    NoMatch,
    /// The fingerprint occurs this many times; nothing is touched.
    Ambiguous(usize),
}

/// Structural pattern that locates the article card.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    re: Regex,
}

impl Fingerprint {
    /// Build the fingerprint for the section whose `<h2>` reads `label`.
    pub fn new(label: &str) -> Result<Self> {
        let pattern = format!(
            concat!(
                r#"(?s)(<div class="article-section">.*?<h2>{}</h2>.*?<div class="article-card">.*?<h3 class="article-title">)"#,
                r#"(.*?)"#,
                r#"(</h3>.*?<p class="article-description">)"#,
                r#"(.*?)"#,
                r#"(</p>.*?<a href=")"#,
                r#"(.*?)"#,
                r#"(" class="article-link")"#,
            ),
            regex::escape(label)
        );
        let re = Regex::new(&pattern).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self { re })
    }

    /// Substitute the record's fields into the single matching region.
    ///
    /// Record fields are plain text: the feed extractor has already resolved
    /// XML entities, and the scrape extractor collects DOM text. Inserted text
    /// is therefore always escaped, so it cannot open or close tags. A literal
    /// `&amp;` left in a field (a feed that escaped its markup twice) is
    /// written as `&amp;amp;` and renders as the five characters `&amp;`.
    pub fn apply(&self, content: &str, record: &ArticleRecord) -> Merge {
        let mut matches = self.re.captures_iter(content);
        let Some(caps) = matches.next() else {
            return Merge::NoMatch;
        };
        let extra = matches.count();
        if extra > 0 {
            return Merge::Ambiguous(extra + 1);
        }

        let (Some(title), Some(description), Some(link)) = (caps.get(2), caps.get(4), caps.get(6))
        else {
            return Merge::NoMatch;
        };

        let mut out = String::with_capacity(content.len() + record.description.len());
        out.push_str(&content[..title.start()]);
        out.push_str(&partial_escape(&record.title));
        out.push_str(&content[title.end()..description.start()]);
        out.push_str(&partial_escape(&record.description));
        out.push_str(&content[description.end()..link.start()]);
        out.push_str(&escape(&record.link));
        out.push_str(&content[link.end()..]);
        Merge::Replaced(out)
    }
}

/// Merge `record` into the document at `path`.
///
/// Returns `Ok(true)` when the file was rewritten and `Ok(false)` when its
/// content would not change (including when the fingerprint did not match).
///
/// # Errors
///
/// [`Error::DocumentNotFound`] when `path` does not exist; I/O errors from
/// reading or writing the file.
#[instrument(level = "info", skip_all, fields(path = %path.display(), title = %record.title))]
pub async fn update_document(
    path: &Path,
    record: &ArticleRecord,
    fingerprint: &Fingerprint,
) -> Result<bool> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(Error::DocumentNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).await?;
    let new_content = match fingerprint.apply(&content, record) {
        Merge::Replaced(new_content) => new_content,
        Merge::NoMatch => {
            warn!("Article section not found in document; leaving it untouched");
            return Ok(false);
        }
        Merge::Ambiguous(count) => {
            warn!(count, "Article section matched more than once; leaving document untouched");
            return Ok(false);
        }
    };

    if new_content == content {
        info!("No changes detected - article is already up to date");
        return Ok(false);
    }

    fs::write(path, new_content).await?;
    info!("Updated document with latest article");
    Ok(true)
}
