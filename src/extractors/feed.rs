//! RSS feed extractor.
//!
//! Reads a Zenn RSS document (for example `https://zenn.dev/{user}/feed`) and
//! turns its newest `<item>` into an [`ArticleRecord`]. The feed is assumed to
//! be ordered newest-first, so the first item in document order wins.
//!
//! The whole document is streamed through `quick_xml` before anything is
//! returned: a feed whose first item is fine but whose tail is broken is still
//! rejected as malformed.
//!
//! # Description cleanup
//!
//! 1. every `<...>` span is removed and the result trimmed,
//! 2. the first `description_limit` characters are kept,
//! 3. the ellipsis is appended when the *raw* trimmed description was longer
//!    than the limit.
//!
//! Step 3 measures the text before tags were stripped, so a short description
//! wrapped in a lot of markup still gets an ellipsis. Downstream consumers rely
//! on that exact output, so it is kept.

use crate::error::{Error, Result};
use crate::models::ArticleRecord;
use crate::settings::Settings;
use crate::utils::{decode_permissive, take_chars};
use once_cell::sync::Lazy;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));

/// Raw text of the first feed item, before any cleanup.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            _ => None,
        }
    }
}

/// Capture state for the first `<item>`.
///
/// Only direct children are read, and only the text that precedes their first
/// nested element. Each slot is `None` while the child is absent and
/// `Some(None)` when it is present without any leading text.
#[derive(Default)]
struct ItemCapture {
    /// Depth of the `<item>` element itself (root element is depth 1).
    depth: usize,
    title: Option<Option<String>>,
    link: Option<Option<String>>,
    description: Option<Option<String>>,
    field: Option<Field>,
    buf: String,
    /// A nested element opened inside the current field; stop collecting.
    nested: bool,
}

impl ItemCapture {
    fn slot(&mut self, field: Field) -> &mut Option<Option<String>> {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
        }
    }

    fn open_field(&mut self, field: Field) {
        // The first matching child wins.
        if self.slot(field).is_none() {
            self.field = Some(field);
            self.buf.clear();
            self.nested = false;
        }
    }

    fn close_field(&mut self) {
        if let Some(field) = self.field.take() {
            let text = std::mem::take(&mut self.buf);
            *self.slot(field) = Some((!text.is_empty()).then_some(text));
        }
    }

    fn push(&mut self, text: &str) {
        if self.field.is_some() && !self.nested {
            self.buf.push_str(text);
        }
    }

    /// A missing child reads as empty text. A `<description>` that is present
    /// but carries no text of its own cannot be cleaned and is an error.
    fn finish(self) -> Result<FeedItem> {
        let description = match self.description {
            None => String::new(),
            Some(Some(text)) => text,
            Some(None) => {
                return Err(Error::Parse(
                    "item description has no text content".to_string(),
                ));
            }
        };
        Ok(FeedItem {
            title: self.title.flatten().unwrap_or_default(),
            link: self.link.flatten().unwrap_or_default(),
            description,
        })
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Parse(e.to_string()))
}

fn malformed(reader: &NsReader<&[u8]>, what: &str) -> Error {
    Error::Parse(format!("{what} at position {}", reader.buffer_position()))
}

/// Simplified XML `Name` production: a letter, `_` or `:`, then name characters.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == ':')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.' | '\u{b7}'))
}

/// Check the tag name and every attribute of a start or empty tag.
///
/// Rejects invalid names, duplicate attributes, attributes without a quoted
/// value, and attribute prefixes with no namespace binding in scope.
fn check_tag(reader: &NsReader<&[u8]>, tag: &BytesStart<'_>) -> Result<()> {
    let qname = tag.name();
    let name = utf8(qname.as_ref())?;
    if !is_xml_name(name) {
        return Err(malformed(reader, &format!("invalid element name <{name}>")));
    }

    let mut attributes = tag.attributes();
    attributes.with_checks(true);
    for attribute in attributes {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = utf8(attribute.key.as_ref())?;
        if !is_xml_name(key) {
            return Err(malformed(reader, &format!("invalid attribute name {key}")));
        }
        if attribute.key.as_namespace_binding().is_some() {
            continue;
        }
        if let (ResolveResult::Unknown(prefix), _) = reader.resolve_attribute(attribute.key) {
            return Err(malformed(
                reader,
                &format!("unbound prefix {}", String::from_utf8_lossy(&prefix)),
            ));
        }
    }
    Ok(())
}

/// Stream the document and return the first `<item>`, if any.
///
/// Fails with [`Error::Parse`] when the document is not well-formed XML,
/// including namespace-level errors such as an unbound prefix.
pub fn first_item(xml: &str) -> Result<Option<FeedItem>> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().check_end_names = true;

    let mut depth = 0usize;
    let mut seen_root = false;
    let mut capture: Option<ItemCapture> = None;
    let mut done: Option<ItemCapture> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        let unbound = match resolved {
            ResolveResult::Unknown(prefix) => Some(String::from_utf8_lossy(&prefix).into_owned()),
            _ => None,
        };
        if let Some(prefix) = unbound {
            return Err(malformed(&reader, &format!("unbound prefix {prefix}")));
        }

        match event {
            Event::Start(e) => {
                check_tag(&reader, &e)?;
                if depth == 0 {
                    if seen_root {
                        return Err(malformed(&reader, "junk after document element"));
                    }
                    seen_root = true;
                }
                depth += 1;
                let qname = e.name();
                let name: &[u8] = qname.as_ref();
                if let Some(cap) = capture.as_mut() {
                    if cap.field.is_some() {
                        cap.nested = true;
                    } else if depth == cap.depth + 1 {
                        if let Some(field) = Field::from_name(name) {
                            cap.open_field(field);
                        }
                    }
                } else if done.is_none() && name == b"item" {
                    capture = Some(ItemCapture {
                        depth,
                        ..Default::default()
                    });
                }
            }
            Event::Empty(e) => {
                check_tag(&reader, &e)?;
                if depth == 0 {
                    if seen_root {
                        return Err(malformed(&reader, "junk after document element"));
                    }
                    seen_root = true;
                }
                let qname = e.name();
                let name: &[u8] = qname.as_ref();
                if let Some(cap) = capture.as_mut() {
                    if cap.field.is_some() {
                        cap.nested = true;
                    } else if depth == cap.depth {
                        if let Some(field) = Field::from_name(name) {
                            cap.slot(field).get_or_insert(None);
                        }
                    }
                } else if done.is_none() && name == b"item" {
                    done = Some(ItemCapture::default());
                }
            }
            Event::End(_) => {
                if depth == 0 {
                    return Err(malformed(&reader, "unmatched closing tag"));
                }
                if let Some(cap) = capture.as_mut() {
                    if cap.field.is_some() && depth == cap.depth + 1 {
                        cap.close_field();
                    } else if depth == cap.depth {
                        done = capture.take();
                    }
                }
                depth -= 1;
            }
            Event::Text(e) => {
                let text = utf8(&e)?;
                if depth == 0 {
                    if !text.trim().is_empty() {
                        return Err(malformed(&reader, "text outside the document element"));
                    }
                    continue;
                }
                if let Some(cap) = capture.as_mut() {
                    let text = unescape(text).map_err(|e| Error::Parse(e.to_string()))?;
                    cap.push(&text);
                }
            }
            Event::CData(e) => {
                if depth == 0 {
                    return Err(malformed(&reader, "CDATA outside the document element"));
                }
                let text = utf8(&e)?;
                if let Some(cap) = capture.as_mut() {
                    cap.push(text);
                }
            }
            Event::GeneralRef(e) => {
                if depth == 0 {
                    return Err(malformed(&reader, "entity outside the document element"));
                }
                let name = utf8(&e)?;
                let reference = format!("&{name};");
                let resolved = unescape(&reference)
                    .map_err(|err| Error::Parse(format!("undefined entity {reference}: {err}")))?;
                if let Some(cap) = capture.as_mut() {
                    cap.push(&resolved);
                }
            }
            Event::Eof => {
                if !seen_root {
                    return Err(Error::Parse("no element found".to_string()));
                }
                if depth != 0 {
                    return Err(malformed(&reader, "unclosed element at end of document"));
                }
                break;
            }
            _ => {}
        }
    }

    done.map(ItemCapture::finish).transpose()
}

/// Strip markup, truncate to `limit` characters, and append `ellipsis` when
/// the raw trimmed text exceeded `limit`.
pub fn clean_description(raw: &str, limit: usize, ellipsis: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, "");
    let mut clean = take_chars(stripped.trim(), limit).to_string();
    if raw.trim().chars().count() > limit {
        clean.push_str(ellipsis);
    }
    clean
}

/// Extract the newest article from raw feed bytes.
///
/// Returns `Ok(None)` for a well-formed feed without any `<item>`.
#[instrument(level = "info", skip_all, fields(bytes = bytes.len()))]
pub fn extract_latest(bytes: &[u8], settings: &Settings) -> Result<Option<ArticleRecord>> {
    let xml = decode_permissive(bytes);
    let Some(item) = first_item(xml.trim_start_matches('\u{feff}'))? else {
        info!("Feed contains no items");
        return Ok(None);
    };
    debug!(title = %item.title, link = %item.link, "Selected first feed item");

    Ok(Some(ArticleRecord {
        description: clean_description(
            &item.description,
            settings.description_limit,
            &settings.ellipsis,
        ),
        title: item.title,
        link: item.link,
        published: None,
        updated: true,
        error: None,
    }))
}

/// Extract the newest article, substituting the configured fallback on any failure.
///
/// Never fails: a feed without items yields the fallback record, and a
/// malformed feed yields the fallback record with `error` set.
pub fn latest_from_feed(bytes: &[u8], settings: &Settings) -> ArticleRecord {
    match extract_latest(bytes, settings) {
        Ok(Some(record)) => {
            info!(title = %record.title, "Extracted latest article from feed");
            record
        }
        Ok(None) => {
            warn!("No entry found in feed; using fallback article");
            settings.fallback.to_record(None)
        }
        Err(e) => {
            warn!(error = %e, "Feed extraction failed; using fallback article");
            settings.fallback.to_record(Some(e.to_string()))
        }
    }
}
