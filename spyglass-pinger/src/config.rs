use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;

/// Sweep configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file path
    /// Env: DATABASE_PATH (default: "spyglass.db")
    pub database_path: String,

    /// Servers polled concurrently per committed batch
    /// Env: SWEEP_BATCH_SIZE (default: 200)
    pub batch_size: usize,

    /// Log every merged record
    /// Env: SWEEP_VERBOSE (default: false)
    pub verbose: bool,

    /// Per-exchange network timeout in seconds
    /// Env: PING_TIMEOUT_SECS (default: 5)
    pub ping_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv();
        Self {
            database_path: env_or_default_string("DATABASE_PATH", "spyglass.db"),
            batch_size: env_or_default("SWEEP_BATCH_SIZE", 200),
            verbose: env_or_default("SWEEP_VERBOSE", false),
            ping_timeout: Duration::from_secs(env_or_default("PING_TIMEOUT_SECS", 5)),
        }
    }

    /// Create configuration with all default values
    pub fn default() -> Self {
        Self {
            database_path: "spyglass.db".to_string(),
            batch_size: 200,
            verbose: false,
            ping_timeout: Duration::from_secs(5),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database_path, "spyglass.db");
        assert_eq!(config.batch_size, 200);
        assert!(!config.verbose);
        assert_eq!(config.ping_timeout, Duration::from_secs(5));
    }
}
