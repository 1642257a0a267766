//! Utility functions for text decoding, log previews, and path resolution.

use std::path::PathBuf;
use tracing::instrument;

/// Decode bytes as UTF-8, dropping invalid sequences instead of replacing them.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(decode_permissive(b"ab\xffc"), "abc");
/// ```
pub fn decode_permissive(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Keep the first `max` characters of `s`.
pub fn take_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` characters with an ellipsis and the number
/// of dropped bytes appended. Cuts always land on a char boundary, since page
/// text is mostly Japanese.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = take_chars(s, max);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}

/// Default location of the portfolio page: `index.html` beside the executable.
///
/// Falls back to the working directory when the executable path is unknown.
#[instrument(level = "debug")]
pub fn default_index_path() -> PathBuf {
    let dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    let path = dir.join("index.html");
    tracing::debug!(path = %path.display(), "Resolved default index path");
    path
}
