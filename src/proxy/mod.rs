//! Outbound proxy support
//!
//! A session's proxy pool is checked once up front; every document fetch
//! then takes the next working proxy in round-robin order.

mod checker;
mod selector;

pub use checker::{filter_working_proxies, HttpProxyChecker, ProxyChecker};
pub use selector::RoundRobinProxySelector;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single HTTP proxy endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyInfo {
    pub host: String,
    pub port: u16,
}

/// Errors parsing a `host:port` proxy address
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProxyParseError {
    #[error("Proxy must be in host:port form, got '{0}'")]
    MissingPort(String),

    #[error("Proxy host cannot be empty")]
    EmptyHost,

    #[error("Invalid proxy port '{0}'")]
    InvalidPort(String),
}

impl ProxyInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Proxy URL as reqwest expects it
    pub fn to_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ProxyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ProxyInfo {
    type Err = ProxyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ProxyParseError::MissingPort(s.to_string()))?;

        let host = host.trim();
        if host.is_empty() {
            return Err(ProxyParseError::EmptyHost);
        }

        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ProxyParseError::InvalidPort(port.to_string()))?;

        Ok(Self::new(host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_port() {
        let proxy: ProxyInfo = "10.0.0.1:8080".parse().unwrap();
        assert_eq!(proxy, ProxyInfo::new("10.0.0.1", 8080));
        assert_eq!(proxy.to_url(), "http://10.0.0.1:8080");
        assert_eq!(proxy.to_string(), "10.0.0.1:8080");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "proxy.local".parse::<ProxyInfo>(),
            Err(ProxyParseError::MissingPort("proxy.local".to_string()))
        );
        assert_eq!(":8080".parse::<ProxyInfo>(), Err(ProxyParseError::EmptyHost));
        assert!(matches!(
            "proxy.local:http".parse::<ProxyInfo>(),
            Err(ProxyParseError::InvalidPort(_))
        ));
        assert!(matches!(
            "proxy.local:70000".parse::<ProxyInfo>(),
            Err(ProxyParseError::InvalidPort(_))
        ));
    }
}
