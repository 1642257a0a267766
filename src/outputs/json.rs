//! JSON output of an [`ArticleRecord`] for the `feed` command.
//!
//! Stdout is the only machine-readable contract of that command, so whatever
//! happens the bytes written must form one valid JSON object. Non-ASCII text
//! is written as-is (serde_json never escapes it).

use crate::models::ArticleRecord;
use serde_json::json;
use std::io::Write;
use tracing::{error, instrument};

/// Pretty-print a record with two-space indentation.
pub fn render_record(record: &ArticleRecord) -> String {
    match serde_json::to_string_pretty(record) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Failed to serialize article record");
            json!({
                "title": record.title,
                "link": record.link,
                "description": record.description,
                "updated": false,
                "error": e.to_string(),
            })
            .to_string()
        }
    }
}

/// Write the rendered record to `out` and flush it.
#[instrument(level = "debug", skip_all, fields(updated = record.updated))]
pub fn write_record<W: Write>(out: &mut W, record: &ArticleRecord) -> std::io::Result<()> {
    out.write_all(render_record(record).as_bytes())?;
    out.flush()
}
