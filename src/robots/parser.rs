//! Robots.txt parser implementation
//!
//! Allow/deny matching is delegated to the robotstxt crate; only the
//! `Crawl-delay` directive is scanned here.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Parsed robots.txt policy for one crawl session
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt content
    content: String,
    /// Product token matched against `User-agent` lines
    user_agent: String,
    /// Crawl delay for this agent, resolved once at parse time
    crawl_delay: Option<Duration>,
}

impl RobotsPolicy {
    /// Creates a policy from raw robots.txt content
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    /// * `user_agent` - The crawler's product token (e.g. "WebScraper")
    pub fn from_content(content: &str, user_agent: &str) -> Self {
        let crawl_delay = parse_crawl_delay(content, user_agent)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        Self {
            content: content.to_string(),
            user_agent: user_agent.to_string(),
            crawl_delay,
        }
    }

    /// Returns the crawl delay declared for this agent, if any
    pub fn crawl_delay(&self) -> Option<Duration> {
        self.crawl_delay
    }

    /// Checks if a URL is allowed for this policy's user agent
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL or path to check
    pub fn is_allowed(&self, url: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, &self.user_agent, url)
    }
}

/// Scans robots.txt content for the `Crawl-delay` applying to `user_agent`
///
/// A delay in a group naming the agent wins over one in the `*` group.
/// The value is in seconds and may be fractional.
fn parse_crawl_delay(content: &str, user_agent: &str) -> Option<f64> {
    let mut current_user_agents: Vec<String> = Vec::new();
    let mut in_group_body = false;
    let mut delay_for_wildcard: Option<f64> = None;
    let mut delay_for_agent: Option<f64> = None;

    let normalized_agent = user_agent.to_lowercase();

    for line in content.lines() {
        // Strip trailing comments
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                // A User-agent line after rules starts a new group
                if in_group_body {
                    current_user_agents.clear();
                    in_group_body = false;
                }
                if !value.is_empty() {
                    current_user_agents.push(value.to_lowercase());
                }
            }
            "crawl-delay" => {
                in_group_body = true;
                let Ok(delay) = value.parse::<f64>() else {
                    continue;
                };

                if current_user_agents
                    .iter()
                    .any(|ua| ua != "*" && normalized_agent.contains(ua.as_str()))
                {
                    delay_for_agent = Some(delay);
                } else if current_user_agents.iter().any(|ua| ua == "*") {
                    delay_for_wildcard = Some(delay);
                }
            }
            _ => in_group_body = true,
        }
    }

    delay_for_agent.or(delay_for_wildcard)
}
