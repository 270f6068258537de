use crate::config::types::{AuthConfig, Config, CrawlerConfig, ImagesConfig};
use crate::url::parse_origin;
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use std::collections::HashMap;

const MAX_PAGE_WORKERS: usize = 256;
const MAX_IMAGE_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_images_config(&config.images)?;
    if let Some(auth) = &config.auth {
        validate_auth_config(auth)?;
    }
    validate_headers(&config.headers)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    parse_origin(&config.seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", config.seed, e)))?;

    if config.max_workers < 1 || config.max_workers > MAX_PAGE_WORKERS {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and {}, got {}",
            MAX_PAGE_WORKERS, config.max_workers
        )));
    }

    if let Some(user_agent) = &config.user_agent {
        if user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates image loading configuration
fn validate_images_config(config: &ImagesConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_IMAGE_WORKERS {
        return Err(ConfigError::Validation(format!(
            "images.workers must be between 1 and {}, got {}",
            MAX_IMAGE_WORKERS, config.workers
        )));
    }

    Ok(())
}

/// Validates basic auth credentials
fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    if config.username.is_empty() {
        return Err(ConfigError::Validation(
            "auth.username cannot be empty".to_string(),
        ));
    }

    // Credentials are only sent when both parts are present
    if config.password.is_empty() {
        return Err(ConfigError::Validation(
            "auth.password cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every header can be sent as-is
fn validate_headers(headers: &HashMap<String, String>) -> Result<(), ConfigError> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ConfigError::Validation(format!("Invalid header name '{}'", name))
        })?;
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::Validation(format!("Invalid value for header '{}'", name))
        })?;
    }

    Ok(())
}
