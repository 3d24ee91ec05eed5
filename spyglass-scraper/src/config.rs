use std::env::var;

use dotenvy::dotenv;

/// Scraper configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file path
    /// Env: DATABASE_PATH (default: "spyglass.db")
    pub database_path: String,

    /// Log every scraped server
    /// Env: SCRAPE_VERBOSE (default: false)
    pub verbose: bool,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv();
        Self {
            database_path: env_or_default_string("DATABASE_PATH", "spyglass.db"),
            verbose: env_or_default("SCRAPE_VERBOSE", false),
        }
    }

    /// Create configuration with all default values
    pub fn default() -> Self {
        Self {
            database_path: "spyglass.db".to_string(),
            verbose: false,
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}
