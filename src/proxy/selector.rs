use crate::proxy::ProxyInfo;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out proxies from a pool in rotation
///
/// The cursor is shared by every task in a session, so concurrent callers
/// still spread evenly over the pool.
#[derive(Debug, Default)]
pub struct RoundRobinProxySelector {
    cursor: AtomicUsize,
}

impl RoundRobinProxySelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the next proxy, or `None` for an empty pool
    pub fn select(&self, pool: &[ProxyInfo]) -> Option<ProxyInfo> {
        if pool.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % pool.len();
        pool.get(index).cloned()
    }
}
