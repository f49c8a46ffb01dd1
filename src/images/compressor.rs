//! JPEG re-encoding with a size-targeting quality search

use crate::images::ImageError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Maximum number of midpoints tried by the quality search
const MAX_ITERATIONS: u32 = 10;

/// Relative distance from the target size that ends the search early
const TOLERANCE: f64 = 0.05;

/// Outcome of compressing one image to disk
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub compressed_size: u64,
    pub path: PathBuf,
    /// Quality on a 0.0..=1.0 scale
    pub quality: f32,
}

/// Something that can report the encoded size of an image at a quality
pub trait QualityEncoder {
    fn encoded_size(&mut self, quality: f32) -> Result<usize, ImageError>;
}

/// Binary-searches the quality whose encoded size is closest to `target`
///
/// Returns 1.0 if even full quality fits, 0.0 if even the lowest quality is
/// too big, and otherwise the last midpoint tried, stopping early once a
/// size lands within 5% of the target.
pub fn find_optimal_quality<E: QualityEncoder + ?Sized>(
    encoder: &mut E,
    target: usize,
) -> Result<f32, ImageError> {
    if encoder.encoded_size(1.0)? <= target {
        return Ok(1.0);
    }
    if encoder.encoded_size(0.0)? > target {
        return Ok(0.0);
    }

    let mut low = 0.0f32;
    let mut high = 1.0f32;
    let mut best = 0.5f32;

    for i in 0..MAX_ITERATIONS {
        let mid = (low + high) / 2.0;
        let size = encoder.encoded_size(mid)?;
        best = mid;
        tracing::trace!("quality search {}: quality {:.4} -> {} bytes", i, mid, size);

        if (size as f64 - target as f64).abs() < target as f64 * TOLERANCE {
            break;
        }
        if size > target {
            high = mid;
        } else {
            low = mid;
        }
    }

    Ok(best)
}

/// Maps a 0.0..=1.0 quality onto the encoder's 1..=100 scale
fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
}

fn encode_jpeg(image: &RgbImage, quality: f32) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality)).encode_image(image)?;
    Ok(buffer)
}

/// Encodes an in-memory RGB image to measure sizes
struct InMemoryJpeg<'a> {
    image: &'a RgbImage,
}

impl QualityEncoder for InMemoryJpeg<'_> {
    fn encoded_size(&mut self, quality: f32) -> Result<usize, ImageError> {
        Ok(encode_jpeg(self.image, quality)?.len())
    }
}

/// Re-encodes images as JPEG at roughly half their original size
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCompressor;

impl JpegCompressor {
    /// Decodes `bytes`, compresses them and writes `{uuid}.jpg` into `output_dir`
    ///
    /// This is CPU-bound; async callers should run it on a blocking thread.
    pub fn compress_and_save(
        &self,
        bytes: &[u8],
        output_dir: &Path,
    ) -> Result<CompressionResult, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        let rgb = decode_image(bytes)?.to_rgb8();
        let target = bytes.len() / 2;

        let quality = find_optimal_quality(&mut InMemoryJpeg { image: &rgb }, target)?;
        let encoded = encode_jpeg(&rgb, quality)?;

        let path = output_dir.join(format!("{}.jpg", Uuid::new_v4()));
        std::fs::write(&path, &encoded)?;

        tracing::debug!(
            "Compressed {} bytes to {} bytes at quality {:.3}",
            bytes.len(),
            encoded.len(),
            quality
        );

        Ok(CompressionResult {
            compressed_size: encoded.len() as u64,
            path,
            quality,
        })
    }
}

/// Decodes any enabled format, WebP included, by sniffing its signature
fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    image::load_from_memory(bytes).map_err(|e| {
        tracing::debug!("Could not decode {} byte image: {}", bytes.len(), e);
        ImageError::from(e)
    })
}
