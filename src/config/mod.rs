//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional, so a crawl can also run on `Config::default()`.
//!
//! # Example
//!
//! ```no_run
//! use webscraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("webscraper.toml")).unwrap();
//! println!("Link workers: {}", config.crawler.link_pool_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, ImagesConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
