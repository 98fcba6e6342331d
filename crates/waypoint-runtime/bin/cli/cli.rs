use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use waypoint_core::ShortKey;
use waypoint_runtime::config::{DEFAULT_IDLE_TIMEOUT, DEFAULT_STORE_TIMEOUT, DEFAULT_SWEEP_INTERVAL};
use waypoint_runtime::RuntimeConfig;
use waypoint_telemetry::LogFormat;

pub const STORAGE_BACKEND_ENV: &str = "WAYPOINT_STORAGE_BACKEND";
pub const REDIS_URL_ENV: &str = "WAYPOINT_REDIS_URL";
pub const REDIS_KEY_PREFIX_ENV: &str = "WAYPOINT_REDIS_KEY_PREFIX";
pub const MYSQL_DSN_ENV: &str = "WAYPOINT_MYSQL_DSN";
pub const LOG_FORMAT_ENV: &str = "WAYPOINT_LOG_FORMAT";
pub const IDLE_TIMEOUT_ENV: &str = "WAYPOINT_IDLE_TIMEOUT_SECS";
pub const SWEEP_INTERVAL_ENV: &str = "WAYPOINT_SWEEP_INTERVAL_SECS";
pub const RELEASE_AFTER_WRITE_ENV: &str = "WAYPOINT_RELEASE_AFTER_WRITE";
pub const STORE_TIMEOUT_ENV: &str = "WAYPOINT_STORE_TIMEOUT_MILLIS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Redis => write!(f, "redis"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Point a short key at a URL.
    Set { key: String, url: String },
    /// Print the URL a short key points at.
    Get { key: String },
}

impl Command {
    pub fn key(&self) -> ShortKey {
        match self {
            Command::Set { key, .. } | Command::Get { key } => ShortKey::new(key.as_str()),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "waypoint", about = "Read and write short links through the waypoint runtime")]
pub struct CLI {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("storage", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = REDIS_KEY_PREFIX_ENV)]
    pub redis_key_prefix: Option<String>,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[arg(long, env = IDLE_TIMEOUT_ENV, default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs())]
    pub idle_timeout_secs: u64,

    #[arg(
        long,
        env = SWEEP_INTERVAL_ENV,
        default_value_t = DEFAULT_SWEEP_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sweep_interval_secs: u64,

    #[arg(
        long,
        env = STORE_TIMEOUT_ENV,
        default_value_t = DEFAULT_STORE_TIMEOUT.as_millis() as u64
    )]
    pub store_timeout_millis: u64,

    /// Drop each cell as soon as its write is durable.
    #[arg(long, env = RELEASE_AFTER_WRITE_ENV)]
    pub release_after_write: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl CLI {
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::builder()
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .sweep_interval(Duration::from_secs(self.sweep_interval_secs))
            .store_timeout(Duration::from_millis(self.store_timeout_millis))
            .release_after_write(self.release_after_write)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_with_defaults() {
        let cli = CLI::try_parse_from(["waypoint", "set", "abc123", "https://example.com/a"]).unwrap();

        assert_eq!(cli.storage, StorageBackendArg::InMemory);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert_eq!(cli.command.key(), ShortKey::new("abc123"));
        let config = cli.runtime_config();
        assert_eq!(config.store_timeout, DEFAULT_STORE_TIMEOUT);
        assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
        assert!(!config.release_after_write);
    }

    #[test]
    fn runtime_tuning_flags() {
        let cli = CLI::try_parse_from([
            "waypoint",
            "--idle-timeout-secs",
            "60",
            "--sweep-interval-secs",
            "5",
            "--store-timeout-millis",
            "250",
            "--release-after-write",
            "get",
            "abc123",
        ])
        .unwrap();

        let config = cli.runtime_config();
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert!(config.release_after_write);
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let result = CLI::try_parse_from(["waypoint", "--sweep-interval-secs", "0", "get", "abc123"]);
        assert!(result.is_err());
    }

    #[test]
    fn redis_backend_requires_url() {
        let result = CLI::try_parse_from(["waypoint", "--storage", "redis", "get", "abc123"]);
        assert!(result.is_err());

        let cli = CLI::try_parse_from([
            "waypoint",
            "--storage",
            "redis",
            "--redis-url",
            "redis://127.0.0.1:6379",
            "get",
            "abc123",
        ])
        .unwrap();
        assert_eq!(cli.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
    }

    #[test]
    fn mysql_backend_requires_dsn() {
        let result = CLI::try_parse_from(["waypoint", "--storage", "mysql", "get", "abc123"]);
        assert!(result.is_err());
    }
}
