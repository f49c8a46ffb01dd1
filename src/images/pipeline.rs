use crate::images::compressor::JpegCompressor;
use crate::images::strategy::{default_strategies, ImageFetchStrategy};
use crate::images::ImageError;
use crate::storage::{ImageRecord, ImageStore};
use dashmap::{DashMap, DashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Images smaller than this are not worth re-encoding
pub const MIN_COMPRESS_SIZE: usize = 200 * 1024;

/// References that have already been stored, shared across crawl sessions
#[derive(Debug, Default)]
pub struct ProcessedImageCache {
    processed: DashSet<String>,
}

impl ProcessedImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.processed.contains(reference)
    }

    pub fn mark_processed(&self, reference: &str) {
        self.processed.insert(reference.to_string());
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}

/// What happened to one image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Already stored by an earlier task or session
    AlreadyProcessed,
    /// No strategy claimed the reference
    NoStrategy,
    /// The bytes could not be obtained
    Unavailable,
    /// Smaller than [`MIN_COMPRESS_SIZE`]; left alone
    BelowThreshold(usize),
    /// Re-encoded, written to disk and handed to the store
    Stored(ImageRecord),
}

/// Fetches, re-encodes and records discovered images
pub struct ImagePipeline {
    strategies: Vec<Box<dyn ImageFetchStrategy>>,
    compressor: JpegCompressor,
    store: Arc<dyn ImageStore>,
    cache: Arc<ProcessedImageCache>,
    output_root: PathBuf,
    domain_dirs: DashMap<String, PathBuf>,
}

impl ImagePipeline {
    /// Creates a pipeline with the standard strategy chain
    ///
    /// The output root is created immediately.
    pub fn new(
        output_root: impl Into<PathBuf>,
        store: Arc<dyn ImageStore>,
        cache: Arc<ProcessedImageCache>,
    ) -> Result<Self, ImageError> {
        Self::with_strategies(default_strategies()?, output_root, store, cache)
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn ImageFetchStrategy>>,
        output_root: impl Into<PathBuf>,
        store: Arc<dyn ImageStore>,
        cache: Arc<ProcessedImageCache>,
    ) -> Result<Self, ImageError> {
        let output_root = output_root.into();
        std::fs::create_dir_all(&output_root)?;

        Ok(Self {
            strategies,
            compressor: JpegCompressor,
            store,
            cache,
            output_root,
            domain_dirs: DashMap::new(),
        })
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Processes a single image reference found on `domain`
    ///
    /// # Errors
    ///
    /// Malformed references, undecodable images and I/O failures are
    /// returned; a failing store is only logged.
    pub async fn process_image(
        &self,
        reference: &str,
        domain: &str,
    ) -> Result<ImageOutcome, ImageError> {
        if self.cache.contains(reference) {
            tracing::debug!("Image {} already processed", reference);
            return Ok(ImageOutcome::AlreadyProcessed);
        }

        let Some(strategy) = self.strategies.iter().find(|s| s.supports(reference)) else {
            tracing::warn!("No fetch strategy for image {}", reference);
            return Ok(ImageOutcome::NoStrategy);
        };

        let Some(bytes) = strategy.fetch(reference).await? else {
            tracing::warn!("Could not obtain image data for {}", reference);
            return Ok(ImageOutcome::Unavailable);
        };

        if bytes.len() < MIN_COMPRESS_SIZE {
            tracing::debug!(
                "Image {} is {} bytes, below threshold; skipping",
                reference,
                bytes.len()
            );
            return Ok(ImageOutcome::BelowThreshold(bytes.len()));
        }

        let dir = self.domain_dir(domain)?;
        let original_size = bytes.len() as u64;
        let compressor = self.compressor;

        let result = tokio::task::spawn_blocking(move || compressor.compress_and_save(&bytes, &dir))
            .await
            .map_err(|e| ImageError::Task(e.to_string()))??;

        let record = ImageRecord {
            original_url: reference.to_string(),
            stored_path: result.path.to_string_lossy().into_owned(),
            original_size,
            compressed_size: result.compressed_size,
        };

        let store = self.store.clone();
        let to_save = record.clone();
        match tokio::task::spawn_blocking(move || store.save(&to_save)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Failed to record image {}: {}", reference, e),
            Err(e) => tracing::warn!("Image store task failed for {}: {}", reference, e),
        }

        self.cache.mark_processed(reference);
        tracing::info!(
            "Stored {} ({} -> {} bytes)",
            reference,
            record.original_size,
            record.compressed_size
        );

        Ok(ImageOutcome::Stored(record))
    }

    /// Returns `output_root/domain`, creating it on first use
    fn domain_dir(&self, domain: &str) -> Result<PathBuf, ImageError> {
        let entry = self
            .domain_dirs
            .entry(domain.to_string())
            .or_try_insert_with(|| {
                let dir = self.output_root.join(domain);
                std::fs::create_dir_all(&dir).map(|_| dir)
            })?;
        Ok(entry.value().clone())
    }
}
