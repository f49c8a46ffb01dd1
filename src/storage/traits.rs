//! Storage traits and error types
//!
//! This module defines the trait interface for image metadata backends and
//! associated error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata for one re-encoded image, as handed to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Reference the image was discovered under (URL or data URI)
    pub original_url: String,
    /// Where the compressed JPEG was written
    pub stored_path: String,
    pub original_size: u64,
    pub compressed_size: u64,
}

/// An image record as read back from the store
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub id: i64,
    pub record: ImageRecord,
    pub saved_at: DateTime<Utc>,
}

/// Trait for image metadata backends
///
/// Implementations must be safe to call from several blocking tasks at once.
pub trait ImageStore: Send + Sync {
    /// Saves a record, replacing any earlier one for the same original URL
    fn save(&self, record: &ImageRecord) -> StorageResult<()>;

    /// Looks up the record stored for `original_url`
    fn find_by_original_url(&self, original_url: &str) -> StorageResult<Option<StoredImage>>;

    /// Counts stored images
    fn count_images(&self) -> StorageResult<u64>;
}
