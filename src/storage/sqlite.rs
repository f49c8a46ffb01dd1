//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ImageStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ImageRecord, ImageStore, StorageError, StorageResult, StoredImage};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
///
/// The connection sits behind a mutex so the store can be shared between
/// image tasks.
pub struct SqliteImageStore {
    conn: Mutex<Connection>,
}

impl SqliteImageStore {
    /// Opens or creates the database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteImageStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // The connection holds no invariant a panicking writer could break
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ImageStore for SqliteImageStore {
    fn save(&self, record: &ImageRecord) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO images (original_url, stored_path, original_size, compressed_size, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(original_url) DO UPDATE SET
                stored_path = excluded.stored_path,
                original_size = excluded.original_size,
                compressed_size = excluded.compressed_size,
                saved_at = excluded.saved_at",
            params![
                record.original_url,
                record.stored_path,
                record.original_size as i64,
                record.compressed_size as i64,
                now
            ],
        )?;
        Ok(())
    }

    fn find_by_original_url(&self, original_url: &str) -> StorageResult<Option<StoredImage>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, original_url, stored_path, original_size, compressed_size, saved_at
                 FROM images WHERE original_url = ?1",
                params![original_url],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        ImageRecord {
                            original_url: row.get(1)?,
                            stored_path: row.get(2)?,
                            original_size: row.get::<_, i64>(3)? as u64,
                            compressed_size: row.get::<_, i64>(4)? as u64,
                        },
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, record, saved_at)) => {
                let saved_at = DateTime::parse_from_rfc3339(&saved_at)
                    .map_err(|_| StorageError::InvalidTimestamp(saved_at.clone()))?
                    .with_timezone(&Utc);
                Ok(Some(StoredImage {
                    id,
                    record,
                    saved_at,
                }))
            }
            None => Ok(None),
        }
    }

    fn count_images(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
