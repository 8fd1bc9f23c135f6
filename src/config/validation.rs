use crate::config::types::{ApiConfig, BackupConfig, Config, UserAgentConfig, WalkerConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound for `api.max-retries`
const MAX_RETRIES_LIMIT: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_walker_config(&config.walker)?;
    validate_api_config(&config.api)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_backup_config(&config.backup)?;
    Ok(())
}

/// Validates crawl behavior configuration
fn validate_walker_config(config: &WalkerConfig) -> Result<(), ConfigError> {
    if config.seed_title.trim().is_empty() {
        return Err(ConfigError::Validation(
            "seed_title is required (set walker.seed-title or pass --seed)".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    // max_pages = 0 means unlimited, request_delay_ms = 0 disables the delay

    Ok(())
}

/// Validates upstream API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint: {}", e)))?;

    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "endpoint must use http or https, got '{}'",
            config.endpoint
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.max_retries > MAX_RETRIES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= {}, got {}",
            MAX_RETRIES_LIMIT, config.max_retries
        )));
    }

    if config.retry_backoff_ms > config.retry_backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "retry_backoff_ms ({}) must not exceed retry_backoff_max_ms ({})",
            config.retry_backoff_ms, config.retry_backoff_max_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if let Some(custom) = &config.custom {
        if custom.trim().is_empty() {
            return Err(ConfigError::Validation(
                "custom user agent cannot be blank".to_string(),
            ));
        }
        return Ok(());
    }

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

    if config.crawler_version.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates snapshot configuration (only when enabled)
fn validate_backup_config(config: &BackupConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "backup directory cannot be empty".to_string(),
        ));
    }

    if config.max_count < 1 {
        return Err(ConfigError::Validation(format!(
            "backup max_count must be >= 1, got {}",
            config.max_count
        )));
    }

    if config.every_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "backup every_pages must be >= 1, got {}",
            config.every_pages
        )));
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

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
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
