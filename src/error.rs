//! Error taxonomy for the sync pipeline.
//!
//! Each stage maps its failures onto one variant so the caller can decide how
//! far a failure is allowed to travel:
//!
//! | Variant | Raised by | Policy |
//! |---------|-----------|--------|
//! | [`Error::Parse`] | feed extractor | converted into the fallback record |
//! | [`Error::Fetch`] | Zenn API client | logged, run ends without a record |
//! | [`Error::DocumentNotFound`] | document merger | hard stop |
//! | [`Error::Publish`] | git publisher | logged, not retried |
//!
//! A fingerprint that does not match is not an error; see
//! [`crate::outputs::document::Merge`].

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The syndication document is not well-formed XML.
    #[error("feed parse error: {0}")]
    Parse(String),

    /// A request to the platform failed, timed out, or returned an unusable body.
    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    /// A git step exited unsuccessfully or could not be spawned.
    #[error("publish error: {0}")]
    Publish(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Fetch(format!("request timed out: {e}"))
        } else {
            Error::Fetch(e.to_string())
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}
