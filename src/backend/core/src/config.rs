//! Configuration management.

use serde::Deserialize;
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Authentication and token configuration
    pub auth: AuthConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Attachment storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Upper bound on ownership-fact lookups; overruns fail closed.
    #[serde(default = "default_fact_timeout", with = "humantime_serde")]
    pub fact_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for access tokens
    pub access_secret: String,

    /// HMAC secret for refresh tokens. Must differ from the access secret
    /// so a leaked refresh secret cannot mint access tokens.
    pub refresh_secret: String,

    /// Access token lifetime
    #[serde(default = "default_access_ttl", with = "humantime_serde")]
    pub access_ttl: Duration,

    /// Refresh token lifetime
    #[serde(default = "default_refresh_ttl", with = "humantime_serde")]
    pub refresh_ttl: Duration,

    /// Leeway for expiry checks, in seconds
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// OpenTelemetry OTLP endpoint
    pub otlp_endpoint: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory for uploaded attachment bytes
    #[serde(default = "default_attachment_dir")]
    pub attachment_dir: String,

    /// Maximum accepted attachment size in bytes
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            attachment_dir: default_attachment_dir(),
            max_attachment_bytes: default_max_attachment_bytes(),
        }
    }
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 5 }
fn default_fact_timeout() -> Duration { Duration::from_secs(5) }
fn default_access_ttl() -> Duration { Duration::from_secs(24 * 60 * 60) }
fn default_refresh_ttl() -> Duration { Duration::from_secs(7 * 24 * 60 * 60) }
fn default_leeway_secs() -> u64 { 60 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_attachment_dir() -> String { "attachments".to_string() }
fn default_max_attachment_bytes() -> usize { 10 * 1024 * 1024 }

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("TASKFORGE").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("TASKFORGE").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.auth.access_secret.is_empty() || self.auth.refresh_secret.is_empty() {
            anyhow::bail!("token secrets must not be empty");
        }
        if self.auth.access_secret == self.auth.refresh_secret {
            anyhow::bail!("access and refresh token secrets must differ");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(access: &str, refresh: &str) -> Config {
        Config {
            server: Default::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/taskforge".into(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                fact_timeout: default_fact_timeout(),
            },
            auth: AuthConfig {
                access_secret: access.into(),
                refresh_secret: refresh.into(),
                access_ttl: default_access_ttl(),
                refresh_ttl: default_refresh_ttl(),
                leeway_secs: default_leeway_secs(),
            },
            observability: Default::default(),
            storage: Default::default(),
        }
    }

    #[test]
    fn test_distinct_secrets_required() {
        assert!(base_config("a-secret", "a-secret").validate().is_err());
        assert!(base_config("a-secret", "b-secret").validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskforge.toml");
        std::fs::write(
            &path,
            r#"
[database]
url = "postgres://localhost/taskforge"
fact_timeout = "250ms"

[auth]
access_secret = "access"
refresh_secret = "refresh"
access_ttl = "1h"
"#,
        )
        .unwrap();

        let cfg = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.database.fact_timeout, Duration::from_millis(250));
        assert_eq!(cfg.auth.access_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn test_default_ttls() {
        let cfg = base_config("a", "b");
        assert_eq!(cfg.auth.access_ttl, Duration::from_secs(86_400));
        assert_eq!(cfg.auth.refresh_ttl, Duration::from_secs(604_800));
    }
}
