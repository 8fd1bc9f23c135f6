use crate::config::types::{Config, ConfigOverrides};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses a configuration file without validating it
///
/// A missing path yields the defaults, so the walker can run from CLI flags
/// alone.
pub fn parse_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        }
        None => Ok(Config::default()),
    }
}

/// Loads a configuration file, applies overrides and validates the result
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use wiki_walker::config::{load_config, ConfigOverrides};
///
/// let config = load_config(Some(Path::new("walker.toml")), &ConfigOverrides::default()).unwrap();
/// println!("Seed: {}", config.walker.seed_title);
/// ```
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config, ConfigError> {
    let mut config = parse_config(path)?;
    config.apply_overrides(overrides);
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the effective configuration
///
/// The hash covers the merged values, CLI overrides included.
pub fn compute_config_hash(config: &Config) -> String {
    let canonical = toml::to_string(config).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<(Config, String), ConfigError> {
    let config = load_config(path, overrides)?;
    let hash = compute_config_hash(&config);
    Ok((config, hash))
}
