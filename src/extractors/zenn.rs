//! Zenn page-scrape extractor.
//!
//! Asks the Zenn API for the account's article listing, takes the newest
//! entry, downloads its rendered page and rebuilds a description from the
//! first few paragraphs of body text.
//!
//! # Description heuristic
//!
//! Only the first `paragraph_sample` `<p>` elements are considered. Each one
//! whose text is longer than `meaningful_min_chars` characters is appended,
//! followed by a blank line. When none qualifies the description becomes the
//! article's emoji plus a reading-time estimate of
//! `body_letters_count / letters_per_minute` minutes.

use crate::api::ZennApi;
use crate::error::Result;
use crate::models::{ArticleRecord, ZennArticle};
use crate::settings::Settings;
use chrono::NaiveDate;
use scraper::{Html, Selector};
use tracing::{debug, error, info, instrument};

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Build the description from page HTML, falling back to the reading-time line.
pub fn describe(html: &str, article: &ZennArticle, settings: &Settings) -> String {
    let document = Html::parse_document(html);
    let paragraph_selector = Selector::parse("p").unwrap();

    let mut description = String::new();
    for p in document
        .select(&paragraph_selector)
        .take(settings.paragraph_sample)
    {
        let text: String = p
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if text.chars().count() > settings.meaningful_min_chars {
            description.push_str(&text);
            description.push_str(PARAGRAPH_SEPARATOR);
        }
    }

    if description.is_empty() {
        description = reading_time(article, settings);
        debug!(%description, "No meaningful paragraphs; using reading time");
    }

    description.trim().to_string()
}

/// `"{emoji} {minutes}{suffix}"`, with minutes rounded down.
pub fn reading_time(article: &ZennArticle, settings: &Settings) -> String {
    let minutes = article.body_letters_count.unwrap_or(0) / settings.letters_per_minute;
    format!(
        "{} {}{}",
        article.emoji.as_deref().unwrap_or(""),
        minutes,
        settings.reading_time_suffix
    )
}

/// Fetch and describe the newest article.
///
/// Returns `Ok(None)` when the account has no articles.
#[instrument(level = "info", skip_all, fields(username = %settings.username))]
pub async fn try_fetch_latest<A: ZennApi>(
    api: &A,
    settings: &Settings,
    today: NaiveDate,
) -> Result<Option<ArticleRecord>> {
    let listing = api.list_articles().await?;
    let Some(latest) = listing.articles.into_iter().next() else {
        info!("No articles found");
        return Ok(None);
    };

    let url = settings.article_url(&latest.slug);
    info!(slug = %latest.slug, %url, "Selected newest article");

    let html = api.article_html(&url).await?;
    let description = describe(&html, &latest, settings);

    let published = latest
        .published_at
        .clone()
        .unwrap_or_else(|| today.format("%Y-%m-%d").to_string());

    Ok(Some(ArticleRecord {
        title: latest.title,
        link: url,
        description,
        published: Some(published),
        updated: true,
        error: None,
    }))
}

/// Fetch the newest article, logging and absorbing any failure.
///
/// `None` means "nothing to do this run", whether because the account has no
/// articles or because a request failed.
pub async fn fetch_latest_article<A: ZennApi>(
    api: &A,
    settings: &Settings,
    today: NaiveDate,
) -> Option<ArticleRecord> {
    match try_fetch_latest(api, settings, today).await {
        Ok(record) => record,
        Err(e) => {
            error!(error = %e, details = ?e, "Error fetching article");
            None
        }
    }
}
