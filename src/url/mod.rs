//! URL handling module
//!
//! This module provides URL normalization, domain extraction and the
//! same-domain predicate used to keep a crawl inside its seed domain.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, is_same_domain};
pub use normalize::{normalize, normalize_url};
