//! Configuration module for the walker
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, merged with command-line overrides.
//!
//! # Example
//!
//! ```no_run
//! use wiki_walker::config::{load_config, ConfigOverrides};
//! use std::path::Path;
//!
//! let config = load_config(Some(Path::new("walker.toml")), &ConfigOverrides::default()).unwrap();
//! println!("Page budget: {}", config.walker.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ApiConfig, BackupConfig, Config, ConfigOverrides, UserAgentConfig, WalkerConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
