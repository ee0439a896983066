use crate::config::types::{Config, EndpointsConfig, EngineConfig, OutputConfig, SessionConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_session_config(&config.session)?;
    validate_engine_config(&config.engine)?;
    validate_endpoints_config(&config.endpoints)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the session section
///
/// A cookie without a `ct0` pair is accepted; calls then go out with an
/// empty CSRF token.
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.cookie.trim().is_empty() {
        return Err(ConfigError::Validation("cookie cannot be empty".to_string()));
    }

    if config
        .cookie
        .chars()
        .any(|c| c == '\r' || c == '\n')
    {
        return Err(ConfigError::Validation(
            "cookie must be a single header line".to_string(),
        ));
    }

    Ok(())
}

/// Validates engine pacing settings
fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    if config.timeout < 100 {
        return Err(ConfigError::Validation(format!(
            "timeout must be >= 100ms, got {}ms",
            config.timeout
        )));
    }

    if config.fetch_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch_interval must be >= 1s, got {}s",
            config.fetch_interval
        )));
    }

    Ok(())
}

/// Validates the upstream base URL
fn validate_endpoints_config(config: &EndpointsConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' has no host",
            config.base_url
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
