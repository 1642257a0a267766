//! Article extractors.
//!
//! Both extractors produce the same [`ArticleRecord`](crate::models::ArticleRecord)
//! but differ in where they read from and in how they fail:
//!
//! | Extractor | Input | On failure |
//! |-----------|-------|------------|
//! | [`feed`] | RSS bytes on stdin | returns the configured fallback record |
//! | [`zenn`] | Zenn listing API + article page | logs and returns `None` |

pub mod feed;
pub mod zenn;
