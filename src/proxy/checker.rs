use crate::proxy::ProxyInfo;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;

/// Timeout for one probe request through a candidate proxy
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Decides whether a proxy is usable
#[async_trait]
pub trait ProxyChecker: Send + Sync {
    async fn is_working(&self, proxy: &ProxyInfo) -> bool;
}

/// Probes a proxy by fetching a known URL through it
#[derive(Debug, Clone)]
pub struct HttpProxyChecker {
    probe_url: String,
}

impl HttpProxyChecker {
    pub fn new(probe_url: impl Into<String>) -> Self {
        Self {
            probe_url: probe_url.into(),
        }
    }

    fn client_for(proxy: &ProxyInfo) -> Result<Client, reqwest::Error> {
        // Only reachability matters here, so certificate problems on the
        // probe target are not a reason to drop the proxy.
        Client::builder()
            .proxy(Proxy::all(proxy.to_url())?)
            .danger_accept_invalid_certs(true)
            .timeout(PROBE_TIMEOUT)
            .build()
    }
}

#[async_trait]
impl ProxyChecker for HttpProxyChecker {
    async fn is_working(&self, proxy: &ProxyInfo) -> bool {
        let client = match Self::client_for(proxy) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("Cannot build client for proxy {}: {}", proxy, e);
                return false;
            }
        };

        match client.get(&self.probe_url).send().await {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                tracing::debug!("Proxy {} probe returned HTTP {}", proxy, response.status());
                false
            }
            Err(e) => {
                tracing::debug!("Proxy {} probe failed: {}", proxy, e);
                false
            }
        }
    }
}

/// Checks every candidate concurrently and keeps the working ones
///
/// Input order is preserved.
pub async fn filter_working_proxies(
    checker: &dyn ProxyChecker,
    candidates: Vec<ProxyInfo>,
) -> Vec<ProxyInfo> {
    if candidates.is_empty() {
        return candidates;
    }

    let results = join_all(candidates.iter().map(|p| checker.is_working(p))).await;

    let working: Vec<ProxyInfo> = candidates
        .into_iter()
        .zip(results)
        .filter_map(|(proxy, ok)| ok.then_some(proxy))
        .collect();

    tracing::info!("{} working proxies after check", working.len());
    working
}
