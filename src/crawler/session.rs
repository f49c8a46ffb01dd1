//! Per-run crawl state

use crate::proxy::{ProxyInfo, RoundRobinProxySelector};
use crate::robots::{self, RobotsPolicy};
use crate::state::{effective_delay, RateLimiter};
use crate::url::{extract_domain, is_same_domain};
use crate::ScraperError;
use dashmap::DashSet;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Why a URL was not admitted to the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooDeep,
    OffDomain,
    DisallowedByRobots,
    AlreadyVisited,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::TooDeep => "beyond max depth",
            Self::OffDomain => "outside crawl domain",
            Self::DisallowedByRobots => "disallowed by robots.txt",
            Self::AlreadyVisited => "already visited",
        };
        f.write_str(reason)
    }
}

/// State shared by every task of one `start_scraping` call
///
/// The visited sets only ever grow, and inserting into them is the single
/// point where duplicate work is stopped.
#[derive(Debug)]
pub struct CrawlSession {
    seed: Url,
    domain: String,
    max_depth: u32,
    robots: Option<RobotsPolicy>,
    user_delay: Option<Duration>,
    proxies: Vec<ProxyInfo>,
    proxy_selector: RoundRobinProxySelector,
    rate_limiter: RateLimiter,
    visited_links: DashSet<String>,
    visited_images: DashSet<String>,
}

impl CrawlSession {
    /// Builds a session rooted at `seed`
    ///
    /// # Errors
    ///
    /// Returns `ScraperError::InvalidSeed` if the seed has no host.
    pub fn new(
        seed: Url,
        max_depth: u32,
        robots: Option<RobotsPolicy>,
        user_delay: Option<Duration>,
        proxies: Vec<ProxyInfo>,
    ) -> Result<Self, ScraperError> {
        let domain = extract_domain(&seed).ok_or_else(|| ScraperError::InvalidSeed {
            url: seed.to_string(),
            reason: "no host".to_string(),
        })?;

        let delay = effective_delay(robots.as_ref().and_then(|r| r.crawl_delay()), user_delay);

        Ok(Self {
            seed,
            domain,
            max_depth,
            robots,
            user_delay,
            proxies,
            proxy_selector: RoundRobinProxySelector::new(),
            rate_limiter: RateLimiter::new(delay),
            visited_links: DashSet::new(),
            visited_images: DashSet::new(),
        })
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn robots(&self) -> Option<&RobotsPolicy> {
        self.robots.as_ref()
    }

    pub fn user_delay(&self) -> Option<Duration> {
        self.user_delay
    }

    pub fn proxies(&self) -> &[ProxyInfo] {
        &self.proxies
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Next proxy in rotation, if the pool is not empty
    pub fn next_proxy(&self) -> Option<ProxyInfo> {
        self.proxy_selector.select(&self.proxies)
    }

    /// Decides whether a normalized URL at `depth` should be fetched
    ///
    /// On success the URL is marked visited, so exactly one caller is
    /// admitted per URL.
    pub fn admit(&self, url: &str, depth: u32) -> Result<(), Rejection> {
        if depth > self.max_depth {
            return Err(Rejection::TooDeep);
        }
        if !is_same_domain(url, &self.domain) {
            return Err(Rejection::OffDomain);
        }
        if !robots::is_allowed(url, self.robots.as_ref()) {
            return Err(Rejection::DisallowedByRobots);
        }
        if !self.visited_links.insert(url.to_string()) {
            return Err(Rejection::AlreadyVisited);
        }
        Ok(())
    }

    /// Records an image reference; true if it had not been seen this session
    pub fn mark_image_seen(&self, reference: &str) -> bool {
        self.visited_images.insert(reference.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited_links.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited_links.len()
    }

    /// Snapshot of every admitted link
    pub fn visited_links(&self) -> HashSet<String> {
        self.visited_links.iter().map(|url| url.key().clone()).collect()
    }
}
