//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and backoff
//! - HTML parsing with link and image extraction
//! - Per-run admission of URLs (depth, domain, robots, visited)
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod session;
mod user_agent;

pub use coordinator::Coordinator;
pub use fetcher::{
    retry_with_backoff, AttemptOutcome, DocumentFetcher, FetchedPage, HttpDocumentFetcher,
    RetryPolicy,
};
pub use parser::{
    extract_assets, extract_css_images, extract_images, extract_links, Document, PageAssets,
};
pub use session::{CrawlSession, Rejection};
pub use user_agent::random_user_agent;
