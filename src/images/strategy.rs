//! Image fetch strategies
//!
//! Strategies are consulted in a fixed order and the first one that
//! supports a reference handles it.

use crate::images::ImageError;
use async_trait::async_trait;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

/// Value substituted for every `{placeholder}` in a templated image URL
const TEMPLATE_DEFAULT_VALUE: &str = "defaultValue";

/// Standard alphabet; trailing `=` padding is optional
const DATA_URI_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("Invalid placeholder regex"));

/// One way of turning an image reference into bytes
#[async_trait]
pub trait ImageFetchStrategy: Send + Sync {
    /// Whether this strategy handles `reference`
    fn supports(&self, reference: &str) -> bool;

    /// Fetches the image
    ///
    /// `Ok(None)` means the image was unavailable (already logged); `Err` is
    /// reserved for references that are malformed.
    async fn fetch(&self, reference: &str) -> Result<Option<Vec<u8>>, ImageError>;
}

/// Builds the standard strategy chain: data URI, template, regular
pub fn default_strategies() -> Result<Vec<Box<dyn ImageFetchStrategy>>, ImageError> {
    let client = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(DOWNLOAD_TIMEOUT)
        .build()?;

    Ok(vec![
        Box::new(DataUriStrategy),
        Box::new(TemplateStrategy::new(client.clone())),
        Box::new(RegularStrategy::new(client)),
    ])
}

/// Inline `data:` URIs
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUriStrategy;

#[async_trait]
impl ImageFetchStrategy for DataUriStrategy {
    fn supports(&self, reference: &str) -> bool {
        reference.starts_with("data:")
    }

    async fn fetch(&self, reference: &str) -> Result<Option<Vec<u8>>, ImageError> {
        decode_data_uri(reference).map(Some)
    }
}

/// Decodes the payload of a `data:` URI
///
/// Base64 payloads may omit padding but must otherwise be valid; anything else is percent-decoded
/// as text.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, ImageError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ImageError::InvalidDataUri("missing data: prefix".to_string()))?;

    let (metadata, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageError::InvalidDataUri("missing comma".to_string()))?;

    if metadata.contains(";base64") {
        Ok(DATA_URI_BASE64.decode(payload.trim())?)
    } else {
        let text = urlencoding::decode(payload)
            .map_err(|e| ImageError::InvalidDataUri(e.to_string()))?;
        Ok(text.into_owned().into_bytes())
    }
}

/// URLs carrying `{placeholder}` segments
#[derive(Debug, Clone)]
pub struct TemplateStrategy {
    client: Client,
}

impl TemplateStrategy {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetchStrategy for TemplateStrategy {
    fn supports(&self, reference: &str) -> bool {
        reference.contains('{') && reference.contains('}')
    }

    async fn fetch(&self, reference: &str) -> Result<Option<Vec<u8>>, ImageError> {
        match fill_template(reference) {
            Some(url) => Ok(download(&self.client, &url).await),
            None => {
                tracing::warn!("No placeholder found in templated image URL {}", reference);
                Ok(None)
            }
        }
    }
}

/// Replaces every `{name}` with the default value
///
/// Returns `None` when there is nothing to replace.
pub fn fill_template(template: &str) -> Option<String> {
    if !PLACEHOLDER.is_match(template) {
        return None;
    }
    Some(
        PLACEHOLDER
            .replace_all(template, TEMPLATE_DEFAULT_VALUE)
            .into_owned(),
    )
}

/// Plain HTTP(S) image URLs
#[derive(Debug, Clone)]
pub struct RegularStrategy {
    client: Client,
}

impl RegularStrategy {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetchStrategy for RegularStrategy {
    fn supports(&self, _reference: &str) -> bool {
        true
    }

    async fn fetch(&self, reference: &str) -> Result<Option<Vec<u8>>, ImageError> {
        let url = prepare_image_url(reference);
        Ok(download(&self.client, &url).await)
    }
}

/// Percent-decodes an image URL and drops its query string
///
/// A `?` at position 0 is left alone. If decoding fails the original is
/// used unchanged.
pub fn prepare_image_url(url: &str) -> String {
    let decoded = match urlencoding::decode(url) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::debug!("Could not decode {}: {}; using it as is", url, e);
            url.to_string()
        }
    };

    match decoded.find('?') {
        Some(index) if index > 0 => decoded[..index].to_string(),
        _ => decoded,
    }
}

async fn download(client: &Client, url: &str) -> Option<Vec<u8>> {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to download image {}: {}", url, e);
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::warn!("Image {} returned HTTP {}", url, response.status());
        return None;
    }

    match response.bytes().await {
        Ok(bytes) => Some(bytes.to_vec()),
        Err(e) => {
            tracing::warn!("Failed to read image body {}: {}", url, e);
            None
        }
    }
}
