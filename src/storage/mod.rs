//! Storage module for persisting image metadata
//!
//! Every image the pipeline re-encodes is recorded with its original
//! reference, the path of the compressed file and both sizes.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteImageStore;
pub use traits::{ImageRecord, ImageStore, StorageError, StorageResult, StoredImage};

use std::path::Path;

/// Opens the image database at `path`, creating it if needed
pub fn open_store(path: &Path) -> StorageResult<SqliteImageStore> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    SqliteImageStore::new(path)
}
