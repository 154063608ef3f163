use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Upper bound for `files.max_expiry_days`; keeps expiry dates within year 9999.
pub const EXPIRY_DAYS_LIMIT: i64 = 2_900_000;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted upload body, in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Lifetime applied when an upload does not specify one.
    #[serde(default = "default_expiry_days")]
    pub default_expiry_days: i64,
    #[serde(default = "default_max_expiry_days")]
    pub max_expiry_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_size() -> usize {
    100
}

fn default_db_path() -> String {
    "data/fileshare.db".to_string()
}

fn default_expiry_days() -> i64 {
    7
}

fn default_max_expiry_days() -> i64 {
    365
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            default_expiry_days: default_expiry_days(),
            max_expiry_days: default_max_expiry_days(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid configuration")
    }

    fn load_from_file() -> Result<Self> {
        let explicit = env::var("FILESHARE_CONFIG").ok();
        let candidates = explicit
            .iter()
            .map(String::as_str)
            .chain(["config.toml", "data/config.toml"]);

        for path in candidates {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("failed to read configuration from {path}"))?;
                let config = Self::parse(&content).with_context(|| format!("in {path}"))?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: FILESHARE_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("FILESHARE_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("FILESHARE_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = env::var("FILESHARE_SERVER_MAX_UPLOAD_SIZE_MB") {
            if let Ok(size) = val.parse() {
                self.server.max_upload_size_mb = size;
            }
        }

        if let Ok(val) = env::var("FILESHARE_DATABASE_PATH") {
            self.database.path = val;
        }

        if let Ok(val) = env::var("FILESHARE_FILES_DEFAULT_EXPIRY_DAYS") {
            if let Ok(days) = val.parse() {
                self.files.default_expiry_days = days;
            }
        }
        if let Ok(val) = env::var("FILESHARE_FILES_MAX_EXPIRY_DAYS") {
            if let Ok(days) = val.parse() {
                self.files.max_expiry_days = days;
            }
        }

        if let Ok(val) = env::var("FILESHARE_LOGGING_LEVEL") {
            self.logging.level = val;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.files.default_expiry_days < 1 {
            bail!("files.default_expiry_days must be at least 1");
        }
        if self.files.default_expiry_days > self.files.max_expiry_days {
            bail!("files.default_expiry_days must not exceed files.max_expiry_days");
        }
        if self.files.max_expiry_days > EXPIRY_DAYS_LIMIT {
            bail!("files.max_expiry_days must not exceed {EXPIRY_DAYS_LIMIT}");
        }
        Ok(())
    }

    /// Address the HTTP server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.files.default_expiry_days, 7);
        assert_eq!(config.database.path, "data/fileshare.db");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
            [server]
            port = 9000

            [files]
            default_expiry_days = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.files.default_expiry_days, 3);
        assert_eq!(config.files.max_expiry_days, 365);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        let err = Config::parse("[server\nport = ").unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn test_validate_expiry_bounds() {
        let mut config = Config::default();
        config.files.default_expiry_days = 0;
        assert!(config.validate().is_err());

        config.files.default_expiry_days = 30;
        config.files.max_expiry_days = 10;
        assert!(config.validate().is_err());

        config.files.max_expiry_days = EXPIRY_DAYS_LIMIT;
        assert!(config.validate().is_ok());

        config.files.max_expiry_days = EXPIRY_DAYS_LIMIT + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_expiry_days"));
    }
}
