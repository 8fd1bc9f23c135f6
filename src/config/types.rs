use serde::{Deserialize, Serialize};

/// Main configuration structure for the walker
///
/// Every section is optional in the file; only the seed title has no usable
/// default and is checked during validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub walker: WalkerConfig,
    pub api: ApiConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub backup: BackupConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WalkerConfig {
    /// Title the crawl starts from on an empty database
    pub seed_title: String,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Maximum number of pages claimed per run (0 = unlimited)
    pub max_pages: u64,

    /// Politeness delay before every upstream request (milliseconds)
    pub request_delay_ms: u64,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            seed_title: String::new(),
            database_path: "wikipedia_walker.sqlite3".to_string(),
            max_pages: 200,
            request_delay_ms: 500,
        }
    }
}

/// Upstream API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ApiConfig {
    /// MediaWiki Action API endpoint (`api.php`)
    pub endpoint: String,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Additional attempts for transient failures
    pub max_retries: u32,

    /// Initial retry backoff (milliseconds), doubled per attempt
    pub retry_backoff_ms: u64,

    /// Upper bound for a single retry backoff (milliseconds)
    pub retry_backoff_max_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://en.wikipedia.org/w/api.php".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_retries: 3,
            retry_backoff_ms: 1000,
            retry_backoff_max_ms: 30_000,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,

    /// Full user agent string, replacing the composed one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "wiki-walker".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.invalid".to_string(),
            contact_email: "you@example.invalid".to_string(),
            custom: None,
        }
    }
}

impl UserAgentConfig {
    /// The header value sent with every request
    pub fn header_value(&self) -> String {
        match &self.custom {
            Some(custom) => custom.clone(),
            None => format!(
                "{}/{} (+{}; {})",
                self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
            ),
        }
    }
}

/// Database snapshot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BackupConfig {
    pub enabled: bool,

    /// Directory snapshots are written to
    pub directory: String,

    /// Number of snapshots kept
    pub max_count: usize,

    /// Completed pages between snapshots
    pub every_pages: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: "backups".to_string(),
            max_count: 5,
            every_pages: 200,
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub seed_title: Option<String>,
    pub database_path: Option<String>,
    pub max_pages: Option<u64>,
    pub request_delay_ms: Option<u64>,
    pub user_agent: Option<String>,
}

impl Config {
    /// Applies command-line overrides on top of file values
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(seed) = &overrides.seed_title {
            self.walker.seed_title = seed.clone();
        }
        if let Some(path) = &overrides.database_path {
            self.walker.database_path = path.clone();
        }
        if let Some(max_pages) = overrides.max_pages {
            self.walker.max_pages = max_pages;
        }
        if let Some(delay) = overrides.request_delay_ms {
            self.walker.request_delay_ms = delay;
        }
        if let Some(user_agent) = &overrides.user_agent {
            self.user_agent.custom = Some(user_agent.clone());
        }
    }
}
