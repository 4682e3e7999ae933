//! # Configuration File Parser
//!
//! Reads `populatr.toml`, the optional configuration file that supplies
//! defaults for a run without CLI flags:
//!
//! - `[database]`: connection URL and PostgreSQL schema
//! - `[generate]`: rows per table, seed, overall timeout
//! - `[insert]`: retry attempts and base backoff delay
//! - `[graph]`: whether reference cycles are tolerated
//!
//! Example `populatr.toml`:
//!
//! ```toml
//! [database]
//! url = "postgres://localhost/app"
//! schema = "public"
//!
//! [generate]
//! rows = 10
//! seed = 42
//! timeout_secs = 15
//!
//! [insert]
//! retry_attempts = 3
//! retry_delay_ms = 100
//!
//! [graph]
//! allow_cycles = false
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{PopulatrError, Result};
use crate::insert::retry::RetryPolicy;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "populatr.toml";

pub const DEFAULT_ROWS: usize = 10;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;

/// Top-level populatr.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopulatrConfig {
    pub database: DatabaseConfig,
    pub generate: GenerateConfig,
    pub insert: InsertConfig,
    pub graph: GraphConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "postgres://localhost/myapp").
    pub url: Option<String>,
    /// Schema name to introspect (PostgreSQL only).
    pub schema: Option<String>,
}

/// Default generation settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Rows per table.
    pub rows: Option<usize>,
    /// Fixed random seed for reproducible runs.
    pub seed: Option<u64>,
    /// Overall limit for generation and insertion.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InsertConfig {
    /// Tries per row, including the first.
    pub retry_attempts: Option<u32>,
    /// Backoff before the first retry; doubles on each further retry.
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Insert in best-effort order instead of failing on reference cycles.
    pub allow_cycles: bool,
}

/// Read and parse a populatr.toml file from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed or is invalid.
pub fn read_config(dir: &Path) -> Result<Option<PopulatrConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| PopulatrError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let config = parse_config(&content).map_err(|e| match e {
        PopulatrError::Config { message } => PopulatrError::Config {
            message: format!("{}: {}", path.display(), message),
        },
        other => other,
    })?;

    Ok(Some(config))
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<PopulatrConfig> {
    let config: PopulatrConfig = toml::from_str(content).map_err(|e| PopulatrError::Config {
        message: format!("Failed to parse: {}", e),
    })?;
    config.validate()?;
    Ok(config)
}

impl PopulatrConfig {
    /// Validate semantic constraints that serde can't enforce.
    pub fn validate(&self) -> Result<()> {
        if self.generate.rows == Some(0) {
            return Err(PopulatrError::Config {
                message: "[generate] rows must be at least 1".to_string(),
            });
        }
        if self.insert.retry_attempts == Some(0) {
            return Err(PopulatrError::Config {
                message: "[insert] retry_attempts must be at least 1".to_string(),
            });
        }
        if let Some(schema) = &self.database.schema {
            if schema.trim().is_empty() {
                return Err(PopulatrError::Config {
                    message: "[database] schema must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.generate.rows.unwrap_or(DEFAULT_ROWS)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.generate.timeout_secs.map(Duration::from_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.insert.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            Duration::from_millis(self.insert.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS)),
        )
    }
}

/// Pick the database URL: explicit flag (or `DATABASE_URL`, which clap
/// folds into the flag), then the config file.
pub fn resolve_database_url(flag: Option<&str>, config: Option<&PopulatrConfig>) -> Result<String> {
    if let Some(url) = flag.filter(|u| !u.trim().is_empty()) {
        return Ok(url.to_string());
    }
    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            return Ok(url);
        }
    }
    config
        .and_then(|c| c.database.url.clone())
        .ok_or(PopulatrError::NoDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[database]
url = "postgres://localhost/app"
schema = "public"

[generate]
rows = 25
seed = 42
timeout_secs = 15

[insert]
retry_attempts = 5
retry_delay_ms = 50

[graph]
allow_cycles = true
"#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/app"));
        assert_eq!(config.database.schema.as_deref(), Some("public"));
        assert_eq!(config.rows(), 25);
        assert_eq!(config.generate.seed, Some(42));
        assert_eq!(config.timeout(), Some(Duration::from_secs(15)));
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(5, Duration::from_millis(50))
        );
        assert!(config.graph.allow_cycles);
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.rows(), DEFAULT_ROWS);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(!config.graph.allow_cycles);
    }

    #[test]
    fn test_validate_rejects_zero_rows_and_attempts() {
        assert!(parse_config("[generate]\nrows = 0\n").is_err());
        assert!(parse_config("[insert]\nretry_attempts = 0\n").is_err());
        assert!(parse_config("[database]\nschema = \"  \"\n").is_err());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = parse_config("[tables.users]\nrows = 5\n").unwrap_err();
        assert!(matches!(err, PopulatrError::Config { .. }));
    }

    #[test]
    fn test_read_config_nonexistent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_read_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[generate]\nrows = 7\n[insert]\nretry_delay_ms = 10\n",
        )
        .unwrap();

        let config = read_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.rows(), 7);
        assert_eq!(config.retry_policy().base_delay, Duration::from_millis(10));
        assert_eq!(config.retry_policy().attempts, DEFAULT_RETRY_ATTEMPTS);
    }

    #[test]
    fn test_read_config_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[generate\nrows = ").unwrap();

        let err = read_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_resolve_database_url_prefers_flag() {
        let config = parse_config("[database]\nurl = \"sqlite::memory:\"\n").unwrap();
        assert_eq!(
            resolve_database_url(Some("postgres://flag/db"), Some(&config)).unwrap(),
            "postgres://flag/db"
        );
    }
}
