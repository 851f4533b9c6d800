//! webtrawl: a polite, multi-worker web crawler
//!
//! Starting from one or more seed URLs, discovers and fetches HTML pages
//! within a configurable set of allowed domains, persists fetched content
//! with content-addressed deduplication, and records per-URL metadata in
//! a durable SQLite-backed frontier.

pub mod config;
pub mod content;
pub mod controller;
pub mod fetcher;
pub mod htmlparse;
pub mod pacing;
pub mod robots;
pub mod storage;
pub mod urlnorm;
pub mod worker;

use thiserror::Error;

/// Top-level error type for webtrawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Robots.txt error: {0}")]
    Robots(String),

    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },
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

/// Result type alias for webtrawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use storage::{FrontierEntry, Store, StoreStats};
