use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Connection string and pool policy for the PostgreSQL store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Relational connection URL. Usually supplied through `DATABASE_URL`.
    pub url: String,

    /// Connections the pool is sized for under normal load.
    pub pool_size: u32,

    /// Extra connections allowed on top of `pool_size` during bursts.
    pub max_overflow: u32,

    /// Connections kept open even when idle.
    pub min_idle: u32,

    /// Validate a pooled connection with a round trip before handing it out.
    pub pre_ping: bool,

    /// Close and replace connections older than this many seconds.
    pub recycle_secs: u64,

    /// How long a caller waits for a free connection before giving up.
    pub acquire_timeout_secs: u64,

    /// Idle connections above `min_idle` are closed after this many seconds.
    pub idle_timeout_secs: u64,

    /// Hosting providers whose URLs must not carry `sslmode` and always need TLS.
    /// Matched as a suffix of the URL host.
    pub ssl_required_hosts: Vec<String>,

    /// Log every statement at DEBUG. Off by default.
    pub log_statements: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            pool_size: 20,
            max_overflow: 10,
            min_idle: 0,
            pre_ping: true,
            recycle_secs: 3600,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            ssl_required_hosts: vec!["render.com".to_string()],
            log_statements: false,
        }
    }
}

impl DatabaseSettings {
    /// Default pool policy pointed at `url`.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Upper bound on simultaneously open connections.
    pub fn max_connections(&self) -> u32 {
        self.pool_size + self.max_overflow
    }

    pub fn recycle(&self) -> Duration {
        Duration::from_secs(self.recycle_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if self.pool_size == 0 {
            return Err(ConfigError::ValidationError(
                "database.pool_size must be at least 1".to_string(),
            ));
        }
        if self.min_idle > self.max_connections() {
            return Err(ConfigError::ValidationError(format!(
                "database.min_idle ({}) exceeds pool_size + max_overflow ({})",
                self.min_idle,
                self.max_connections()
            )));
        }
        if self.acquire_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "database.acquire_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where and how verbosely to log.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is not set (e.g. "info" or "database=debug").
    pub level: String,

    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,

    /// File name prefix for the rolling log file.
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "rideshare.log".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_defaults() {
        let settings = DatabaseSettings::default();
        assert_eq!(settings.pool_size, 20);
        assert_eq!(settings.max_overflow, 10);
        assert_eq!(settings.max_connections(), 30);
        assert!(settings.pre_ping);
        assert_eq!(settings.recycle(), Duration::from_secs(3600));
        assert_eq!(settings.ssl_required_hosts, vec!["render.com".to_string()]);
    }

    #[test]
    fn test_empty_url_is_missing() {
        let err = DatabaseSettings::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabaseUrl));

        let err = DatabaseSettings::with_url("   ").validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabaseUrl));
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let settings = DatabaseSettings {
            pool_size: 0,
            ..DatabaseSettings::with_url("postgres://localhost/rideshare")
        };
        assert!(matches!(settings.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_min_idle_bounded_by_pool() {
        let settings = DatabaseSettings {
            pool_size: 2,
            max_overflow: 1,
            min_idle: 4,
            ..DatabaseSettings::with_url("postgres://localhost/rideshare")
        };
        assert!(matches!(settings.validate(), Err(ConfigError::ValidationError(_))));
    }
}
