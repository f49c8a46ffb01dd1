//! HTTP fetcher implementation
//!
//! This module handles all document requests for the crawler, including:
//! - One HTTP client per proxy, built on first use
//! - Rotating browser user agents
//! - Retry with exponential backoff for transient failures
//! - Error classification
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 429, 502 | Retry with backoff |
//! | Timeout, connection or body error | Retry with backoff |
//! | Any other non-2xx (e.g. 404) | Give up immediately |
//! | Non-HTML Content-Type | Give up immediately |
//! | Invalid request | Give up immediately |

use crate::crawler::user_agent::random_user_agent;
use crate::proxy::ProxyInfo;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Proxy, StatusCode};
use std::future::Future;
use std::time::Duration;
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.5";

/// Timeout for one document request
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A successfully fetched HTML document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects; relative references resolve against it
    pub url: Url,
    /// Document body
    pub body: String,
}

/// Outcome of a single attempt inside [`retry_with_backoff`]
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// The attempt produced a value
    Success(T),
    /// A transient failure; try again after backoff
    Retryable(String),
    /// A permanent failure; stop trying
    Terminal(String),
}

/// Backoff schedule for document fetches
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(2000),
            multiplier: 2,
        }
    }
}

/// Runs `attempt` until it succeeds, fails terminally or runs out of tries
///
/// The closure receives the 1-based attempt number. Backoff starts at
/// `initial_backoff` and is multiplied after every retryable failure; there
/// is no sleep after the final attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    url: &str,
    mut attempt: F,
) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome<T>>,
{
    let mut backoff = policy.initial_backoff;

    for n in 1..=policy.max_attempts {
        match attempt(n).await {
            AttemptOutcome::Success(value) => return Some(value),
            AttemptOutcome::Terminal(reason) => {
                tracing::warn!("Giving up on {}: {}", url, reason);
                return None;
            }
            AttemptOutcome::Retryable(reason) => {
                if n == policy.max_attempts {
                    tracing::error!(
                        "Failed to fetch {} after {} attempts: {}",
                        url,
                        policy.max_attempts,
                        reason
                    );
                    return None;
                }
                tracing::warn!(
                    "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                    n,
                    policy.max_attempts,
                    url,
                    reason,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(policy.multiplier);
            }
        }
    }

    None
}

/// Fetches documents for the crawler
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetches `url`, optionally through `proxy`
    ///
    /// Never fails outward: every failure is logged and reported as `None`.
    async fn fetch(&self, url: &str, proxy: Option<&ProxyInfo>) -> Option<FetchedPage>;
}

/// Document fetcher backed by reqwest
#[derive(Debug, Default)]
pub struct HttpDocumentFetcher {
    clients: DashMap<Option<ProxyInfo>, Client>,
    policy: RetryPolicy,
}

impl HttpDocumentFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        Self {
            clients: DashMap::new(),
            policy,
        }
    }

    /// Returns the client for `proxy`, building it on first use
    fn client_for(&self, proxy: Option<&ProxyInfo>) -> Result<Client, reqwest::Error> {
        let entry = self
            .clients
            .entry(proxy.cloned())
            .or_try_insert_with(|| build_document_client(proxy))?;
        Ok(entry.value().clone())
    }

    async fn attempt(&self, client: &Client, url: &str) -> AttemptOutcome<FetchedPage> {
        let request = client
            .get(url)
            .header(USER_AGENT, random_user_agent())
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => return AttemptOutcome::Terminal(e.to_string()),
            Err(e) => return AttemptOutcome::Retryable(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::BAD_GATEWAY {
            return AttemptOutcome::Retryable(format!("HTTP {}", status));
        }
        if !status.is_success() {
            return AttemptOutcome::Terminal(format!("HTTP {}", status));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_html_content_type(content_type) {
                return AttemptOutcome::Terminal(format!("not a document ({})", content_type));
            }
        }

        let final_url = response.url().clone();
        match response.text().await {
            Ok(body) => AttemptOutcome::Success(FetchedPage {
                url: final_url,
                body,
            }),
            Err(e) => AttemptOutcome::Retryable(format!("body read failed: {}", e)),
        }
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, url: &str, proxy: Option<&ProxyInfo>) -> Option<FetchedPage> {
        let client = match self.client_for(proxy) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("Cannot build HTTP client for {}: {}", url, e);
                return None;
            }
        };

        let client = &client;
        retry_with_backoff(&self.policy, url, move |_| self.attempt(client, url)).await
    }
}

/// Builds an HTTP client for document fetches
fn build_document_client(proxy: Option<&ProxyInfo>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(FETCH_TIMEOUT)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy.to_url())?);
    }

    builder.build()
}

/// Whether a Content-Type names something the extractor can parse
fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    mime.is_empty()
        || mime.starts_with("text/")
        || mime == "application/xhtml+xml"
        || mime == "application/xml"
        || mime.ends_with("+xml")
}
