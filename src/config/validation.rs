use crate::config::types::{Config, CrawlerConfig, ImagesConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound for either worker pool
const MAX_POOL_SIZE: u32 = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_images_config(&config.images)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_pool_size("link_pool_size", config.link_pool_size)?;
    validate_pool_size("image_pool_size", config.image_pool_size)?;
    Ok(())
}

fn validate_pool_size(name: &str, value: u32) -> Result<(), ConfigError> {
    if value < 1 || value > MAX_POOL_SIZE {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_POOL_SIZE, value
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates image pipeline configuration
fn validate_images_config(config: &ImagesConfig) -> Result<(), ConfigError> {
    if config.output_directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output_directory cannot be empty".to_string(),
        ));
    }

    let probe = Url::parse(&config.probe_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid probe_url: {}", e)))?;

    if probe.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "probe_url '{}' must use HTTPS scheme",
            config.probe_url
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let (local, domain) = match email.split_once('@') {
        Some(parts) if !parts.1.contains('@') => parts,
        _ => {
            return Err(ConfigError::Validation(format!(
                "Invalid email format: '{}'",
                email
            )))
        }
    };

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_pool_size_bounds() {
        assert!(validate_pool_size("link_pool_size", 1).is_ok());
        assert!(validate_pool_size("link_pool_size", 256).is_ok());
        assert!(validate_pool_size("link_pool_size", 0).is_err());
        assert!(validate_pool_size("link_pool_size", 257).is_err());
    }

    #[test]
    fn test_crawler_name_rejects_spaces() {
        let mut config = Config::default();
        config.user_agent.crawler_name = "Web Scraper".to_string();
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn test_invalid_contact_url() {
        let mut config = Config::default();
        config.user_agent.contact_url = "not a url".to_string();
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::InvalidUrl(_)
        ));
    }

    #[test]
    fn test_probe_url_must_be_https() {
        let mut config = Config::default();
        config.images.probe_url = "http://example.com".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_paths_rejected() {
        let mut config = Config::default();
        config.images.output_directory = " ".to_string();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.output.database_path = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }
}
