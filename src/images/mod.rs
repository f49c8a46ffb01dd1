//! Image acquisition and re-encoding
//!
//! Image references found while crawling are fetched through one of several
//! strategies, and anything large enough is re-encoded as a JPEG of roughly
//! half the original size.
//!
//! # Components
//!
//! - `strategy`: data URI, templated URL and plain HTTP fetchers
//! - `compressor`: quality search and JPEG encoding
//! - `pipeline`: dedup, size gate, file output and metadata persistence

mod compressor;
mod pipeline;
mod strategy;

pub use compressor::{find_optimal_quality, CompressionResult, JpegCompressor, QualityEncoder};
pub use pipeline::{ImageOutcome, ImagePipeline, ProcessedImageCache, MIN_COMPRESS_SIZE};
pub use strategy::{
    decode_data_uri, default_strategies, fill_template, prepare_image_url, DataUriStrategy,
    ImageFetchStrategy, RegularStrategy, TemplateStrategy,
};

use thiserror::Error;

/// Errors from processing a single image
///
/// None of these abort a crawl; the pipeline logs them and moves on.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Malformed data URI: {0}")]
    InvalidDataUri(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Empty image data")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image task failed: {0}")]
    Task(String),
}
