//! wiki-walker: a resumable MediaWiki link-graph walker
//!
//! This crate incrementally discovers encyclopedia pages and their outbound
//! links, persisting both in SQLite so that a crawl survives restarts without
//! losing progress or double-counting edges.

pub mod backup;
pub mod config;
pub mod crawler;
pub mod mediawiki;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for walker operations
#[derive(Debug, Error)]
pub enum WalkerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("API error: {0}")]
    Api(#[from] mediawiki::ApiError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Seed page could not be resolved: {title}: {source}")]
    SeedNotFound {
        title: String,
        source: mediawiki::ApiError,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for walker operations
pub type Result<T> = std::result::Result<T, WalkerError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{RunSummary, StopReason, Walker};
pub use mediawiki::{ApiError, ApiResult, WikiClient};
pub use state::{CanonicalPage, CrawlStatus};
pub use storage::{PageStore, SqliteStore};
