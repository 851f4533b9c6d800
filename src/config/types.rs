use serde::Deserialize;

/// Main configuration structure for webtrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            user_agent: UserAgentConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum time between requests to the same host, in milliseconds
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Per-request fetch timeout, in seconds
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Maximum number of attempts for a URL before giving up
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Age (in seconds) after which an `in_progress` frontier entry is
    /// considered abandoned and reclaimed back to `pending`
    #[serde(rename = "stuck-threshold-secs", default = "default_stuck_threshold_secs")]
    pub stuck_threshold_secs: i64,

    /// Grace period (in seconds) the controller waits for workers to
    /// finish their current job before abandoning them on shutdown
    #[serde(rename = "shutdown-grace-secs", default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_retries: default_max_retries(),
            stuck_threshold_secs: default_stuck_threshold_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_stuck_threshold_secs() -> i64 {
    3600
}

fn default_shutdown_grace_secs() -> u64 {
    2
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,

    #[serde(rename = "contact-email", default = "default_contact_email")]
    pub contact_email: String,
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

fn default_crawler_name() -> String {
    "webtrawl".to_string()
}
fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
fn default_contact_url() -> String {
    "https://example.com/about".to_string()
}
fn default_contact_email() -> String {
    "crawler@example.com".to_string()
}

/// Output/storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Directory where fetched bodies are stored, content-addressed by hash
    #[serde(rename = "blob-dir", default = "default_blob_dir")]
    pub blob_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            blob_dir: default_blob_dir(),
        }
    }
}

fn default_database_path() -> String {
    "./data/webtrawl.db".to_string()
}
fn default_blob_dir() -> String {
    "./data/pages".to_string()
}
