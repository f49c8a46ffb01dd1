use serde::Deserialize;

/// Main configuration structure
///
/// Every section is optional in the TOML file; missing sections fall back to
/// their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent link (document) tasks
    #[serde(rename = "link-pool-size", default = "default_link_pool_size")]
    pub link_pool_size: u32,

    /// Maximum number of concurrent image tasks
    #[serde(rename = "image-pool-size", default = "default_image_pool_size")]
    pub image_pool_size: u32,
}

/// User agent identification used for robots.txt
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email", default = "default_contact_email")]
    pub contact_email: String,
}

/// Image pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    /// Root directory for compressed images (one subdirectory per domain)
    #[serde(rename = "output-directory", default = "default_output_directory")]
    pub output_directory: String,

    /// HTTPS URL requested through each proxy to check it works
    #[serde(rename = "probe-url", default = "default_probe_url")]
    pub probe_url: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding image records
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl UserAgentConfig {
    /// Formats the identifying user agent string
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            link_pool_size: default_link_pool_size(),
            image_pool_size: default_image_pool_size(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
            contact_email: default_contact_email(),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            output_directory: default_output_directory(),
            probe_url: default_probe_url(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_link_pool_size() -> u32 {
    16
}

fn default_image_pool_size() -> u32 {
    4
}

fn default_crawler_name() -> String {
    "WebScraper".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact_url() -> String {
    "https://example.com/webscraper".to_string()
}

fn default_contact_email() -> String {
    "webscraper@example.com".to_string()
}

fn default_output_directory() -> String {
    "compressed-images".to_string()
}

fn default_probe_url() -> String {
    "https://www.google.com".to_string()
}

fn default_database_path() -> String {
    "images.db".to_string()
}
