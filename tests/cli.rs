use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>tenormusicaさんのフィード</title>
    <item>
      <title>Rustで静的サイトを更新する</title>
      <link>https://zenn.dev/tenormusica/articles/rust-static-site</link>
      <description><![CDATA[<p>最新記事の<strong>説明</strong>です。</p>]]></description>
    </item>
    <item>
      <title>Older</title>
      <link>https://zenn.dev/tenormusica/articles/older</link>
      <description>older</description>
    </item>
  </channel>
</rss>"#;

const PAGE: &str = r#"<html><body>
<div class="article-section">
  <h2>最新投稿記事</h2>
  <div class="article-card">
    <h3 class="article-title">Old</h3>
    <p class="article-description">Old description</p>
    <a href="https://zenn.dev/tenormusica/articles/old" class="article-link">Read</a>
  </div>
</div>
</body></html>
"#;

fn run_with_stdin(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_zenn_article_sync"))
        .args(args)
        .env_remove("ZENN_SYNC_CONFIG")
        .env_remove("ZENN_SYNC_INDEX")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn CLI");

    child
        .stdin
        .take()
        .expect("stdin open")
        .write_all(stdin)
        .expect("write stdin");

    child.wait_with_output().expect("read CLI output")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "cli exited with {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[test]
fn feed_prints_newest_item_as_json() {
    let output = run_with_stdin(&["feed"], FEED.as_bytes());
    let value = stdout_json(&output);

    assert_eq!(value["title"], "Rustで静的サイトを更新する");
    assert_eq!(
        value["link"],
        "https://zenn.dev/tenormusica/articles/rust-static-site"
    );
    assert_eq!(value["description"], "最新記事の説明です。");
    assert_eq!(value["updated"], true);
    assert!(value.get("error").is_none());

    // Non-ASCII is written as-is, not \u-escaped.
    assert!(String::from_utf8_lossy(&output.stdout).contains("最新記事の説明です。"));
}

#[test]
fn feed_with_malformed_xml_still_prints_json() {
    let output = run_with_stdin(&["feed"], b"<rss><channel><item></rss>");
    let value = stdout_json(&output);

    assert_eq!(value["updated"], false);
    assert!(value["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert!(value["title"].as_str().is_some_and(|t| !t.is_empty()));
}

#[test]
fn feed_with_empty_stdin_prints_fallback() {
    let value = stdout_json(&run_with_stdin(&["feed"], b""));
    assert_eq!(value["updated"], false);
    assert!(value["link"].as_str().is_some_and(|l| l.starts_with("https://")));
}

#[test]
fn feed_without_items_prints_fallback() {
    let feed = "<rss><channel><title>empty</title></channel></rss>";
    let value = stdout_json(&run_with_stdin(&["feed"], feed.as_bytes()));
    assert_eq!(value["updated"], false);
    assert!(value.get("error").is_none());
}

fn write_page(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("index.html");
    std::fs::write(&path, PAGE).unwrap();
    path
}

#[test]
fn apply_merges_feed_output_into_page() {
    let dir = tempfile::tempdir().unwrap();
    let page = write_page(dir.path());
    let page_arg = page.to_str().unwrap();

    let feed_out = run_with_stdin(&["feed"], FEED.as_bytes());
    assert!(feed_out.status.success());

    let output = run_with_stdin(
        &["apply", "--index-path", page_arg, "--no-publish"],
        &feed_out.stdout,
    );
    assert!(
        output.status.success(),
        "apply failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let merged = std::fs::read_to_string(&page).unwrap();
    assert!(merged.contains(r#"<h3 class="article-title">Rustで静的サイトを更新する</h3>"#));
    assert!(merged.contains(r#"<p class="article-description">最新記事の説明です。</p>"#));
    assert!(merged.contains(
        r#"<a href="https://zenn.dev/tenormusica/articles/rust-static-site" class="article-link">Read</a>"#
    ));
    assert!(merged.starts_with("<html><body>\n<div class=\"article-section\">"));

    // Same record again: no change.
    let again = run_with_stdin(
        &["apply", "--index-path", page_arg, "--no-publish"],
        &feed_out.stdout,
    );
    assert!(again.status.success());
    assert_eq!(std::fs::read_to_string(&page).unwrap(), merged);
}

#[test]
fn apply_skips_fallback_records() {
    let dir = tempfile::tempdir().unwrap();
    let page = write_page(dir.path());

    let fallback = run_with_stdin(&["feed"], b"not xml");
    let output = run_with_stdin(
        &["apply", "--index-path", page.to_str().unwrap(), "--no-publish"],
        &fallback.stdout,
    );
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&page).unwrap(), PAGE);
}

#[test]
fn apply_accepts_record_without_updated_key() {
    let dir = tempfile::tempdir().unwrap();
    let page = write_page(dir.path());

    let record = r#"{
        "title": "手書きのレコード",
        "url": "https://zenn.dev/tenormusica/articles/handwritten",
        "description": "説明文",
        "published": "2025-10-19"
    }"#;
    let output = run_with_stdin(
        &["apply", "--index-path", page.to_str().unwrap(), "--no-publish"],
        record.as_bytes(),
    );
    assert!(
        output.status.success(),
        "apply failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let merged = std::fs::read_to_string(&page).unwrap();
    assert!(merged.contains(r#"<h3 class="article-title">手書きのレコード</h3>"#));
    assert!(merged.contains(r#"href="https://zenn.dev/tenormusica/articles/handwritten""#));
}

#[test]
fn feed_with_unbound_prefix_prints_fallback() {
    let feed = "<rss><channel><item><title>T</title><dc:creator>x</dc:creator></item></channel></rss>";
    let value = stdout_json(&run_with_stdin(&["feed"], feed.as_bytes()));
    assert_eq!(value["updated"], false);
    assert!(value["error"].as_str().is_some_and(|e| e.contains("unbound prefix")));
}

#[test]
fn apply_to_missing_document_fails_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("index.html");

    let feed_out = run_with_stdin(&["feed"], FEED.as_bytes());
    let output = run_with_stdin(
        &["apply", "--index-path", missing.to_str().unwrap(), "--no-publish"],
        &feed_out.stdout,
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("document not found"));
    assert!(!missing.exists());
}
