//! Robots.txt handling module
//!
//! This module fetches and parses a domain's robots.txt once per crawl
//! session. A missing or unreachable robots.txt means no restrictions.

mod parser;

pub use parser::RobotsPolicy;

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Timeout for the robots.txt request
const ROBOTS_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of robots.txt policies
#[async_trait]
pub trait RobotsPolicyProvider: Send + Sync {
    /// Fetches and parses the policy for `domain`
    ///
    /// Returns `None` when the domain publishes no usable robots.txt.
    async fn get_policy(&self, domain: &str) -> Option<RobotsPolicy>;
}

/// Fetches robots.txt over HTTPS
#[derive(Debug, Clone)]
pub struct HttpRobotsProvider {
    client: Client,
    agent_token: String,
    base_url: Option<String>,
}

impl HttpRobotsProvider {
    /// Builds a provider identifying itself with the configured user agent
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.header_value())
            .timeout(ROBOTS_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            agent_token: config.crawler_name.clone(),
            base_url: None,
        })
    }

    /// Fetches robots.txt from `base_url` instead of `https://{domain}`
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn robots_url(&self, domain: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/robots.txt", base.trim_end_matches('/')),
            None => format!("https://{}/robots.txt", domain),
        }
    }
}

#[async_trait]
impl RobotsPolicyProvider for HttpRobotsProvider {
    async fn get_policy(&self, domain: &str) -> Option<RobotsPolicy> {
        let url = self.robots_url(domain);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Could not fetch {}: {}", url, e);
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            tracing::debug!("No robots.txt at {} (HTTP {})", url, response.status());
            return None;
        }

        match response.text().await {
            Ok(body) => {
                let policy = RobotsPolicy::from_content(&body, &self.agent_token);
                tracing::info!(
                    "Loaded robots.txt for {} (crawl-delay: {:?})",
                    domain,
                    policy.crawl_delay()
                );
                Some(policy)
            }
            Err(e) => {
                tracing::debug!("Failed to read robots.txt body from {}: {}", url, e);
                None
            }
        }
    }
}

/// Checks if a URL is allowed by an optional robots policy
///
/// # Returns
///
/// * `true` - If there is no policy or the policy allows the URL
/// * `false` - If the policy disallows the URL
pub fn is_allowed(url: &str, policy: Option<&RobotsPolicy>) -> bool {
    policy.map_or(true, |p| p.is_allowed(url))
}
