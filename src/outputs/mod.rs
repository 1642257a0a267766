//! Output stages.
//!
//! - [`json`]: prints an article record as the `feed` command's JSON contract
//! - [`document`]: merges an article record into the portfolio page

pub mod document;
pub mod json;
