//! Explicit settings objects for the query engine, the dashboard service and
//! the remote-call policy.
//!
//! Values come from CLI flags or the environment (after `.env` is loaded by
//! the binary). Nothing here is process-global; every client receives the
//! settings it needs at construction.

use clap::Args;
use reqwest::Url;
use std::time::Duration;

use crate::error::{Error, Result};

/// Where the Trino coordinator lives and which catalog/schema to work in.
#[derive(Debug, Clone, Args)]
pub struct TrinoSettings {
    /// Trino coordinator base URL
    #[arg(long = "trino-url", env = "TRINO_URL", default_value = "http://localhost:8080")]
    pub url: String,

    #[arg(long = "trino-user", env = "TRINO_USER", default_value = "admin")]
    pub user: String,

    #[arg(long = "trino-catalog", env = "TRINO_CATALOG", default_value = "hive")]
    pub catalog: String,

    #[arg(long = "trino-schema", env = "TRINO_SCHEMA", default_value = "nyc_taxi")]
    pub schema: String,
}

impl TrinoSettings {
    /// SQLAlchemy URI under which the dashboard service reaches this Trino,
    /// e.g. `trino://admin@localhost:8080/hive`.
    pub fn sqlalchemy_uri(&self) -> Result<String> {
        let url = Url::parse(&self.url)
            .map_err(|e| Error::Config(format!("invalid Trino URL '{}': {e}", self.url)))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::Config(format!("Trino URL '{}' has no host", self.url)))?;
        let port = url.port_or_known_default().unwrap_or(8080);

        Ok(format!(
            "trino://{}@{}:{}/{}",
            self.user, host, port, self.catalog
        ))
    }
}

/// Dashboard service endpoint and login.
#[derive(Debug, Clone, Args)]
pub struct SupersetSettings {
    /// Superset base URL
    #[arg(long = "superset-url", env = "SUPERSET_URL", default_value = "http://localhost:8088")]
    pub url: String,

    #[arg(long = "superset-username", env = "SUPERSET_USERNAME", default_value = "admin")]
    pub username: String,

    #[arg(
        long = "superset-password",
        env = "SUPERSET_PASSWORD",
        hide_env_values = true
    )]
    pub password: String,
}

/// Timeout, pacing and retry policy applied to every remote call.
#[derive(Debug, Clone, Args)]
pub struct RemotePolicyArgs {
    /// Ceiling for a single remote call, in seconds
    #[arg(long, env = "REMOTE_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Minimum spacing between dashboard-service calls, in milliseconds
    #[arg(long, env = "REMOTE_MIN_INTERVAL_MS", default_value_t = 250)]
    pub min_interval_ms: u64,

    /// Retries for connectivity failures (0 disables retrying)
    #[arg(long, env = "REMOTE_MAX_RETRIES", default_value_t = 2)]
    pub max_retries: u32,

    /// First backoff delay in milliseconds, doubled on each retry
    #[arg(long, env = "REMOTE_BACKOFF_MS", default_value_t = 500)]
    pub backoff_ms: u64,
}

impl From<RemotePolicyArgs> for RemotePolicy {
    fn from(args: RemotePolicyArgs) -> Self {
        RemotePolicy {
            request_timeout: Duration::from_secs(args.timeout_secs),
            min_interval: Duration::from_millis(args.min_interval_ms),
            max_retries: args.max_retries,
            backoff_base: Duration::from_millis(args.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePolicy {
    pub request_timeout: Duration,
    pub min_interval: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RemotePolicy {
    /// Delay before retry number `attempt` (1-based), capped at 30 seconds.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base
            .saturating_mul(factor)
            .min(Duration::from_secs(30))
    }
}

impl Default for RemotePolicy {
    fn default() -> Self {
        RemotePolicy {
            request_timeout: Duration::from_secs(30),
            min_interval: Duration::from_millis(250),
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trino(url: &str) -> TrinoSettings {
        TrinoSettings {
            url: url.to_string(),
            user: "admin".to_string(),
            catalog: "hive".to_string(),
            schema: "nyc_taxi".to_string(),
        }
    }

    #[test]
    fn test_sqlalchemy_uri_from_trino_url() {
        let uri = trino("http://trino.internal:8080").sqlalchemy_uri().unwrap();
        assert_eq!(uri, "trino://admin@trino.internal:8080/hive");
    }

    #[test]
    fn test_sqlalchemy_uri_uses_scheme_default_port() {
        let uri = trino("https://trino.example.com").sqlalchemy_uri().unwrap();
        assert_eq!(uri, "trino://admin@trino.example.com:443/hive");
    }

    #[test]
    fn test_sqlalchemy_uri_rejects_garbage() {
        assert!(matches!(
            trino("not a url").sqlalchemy_uri(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RemotePolicy {
            backoff_base: Duration::from_millis(500),
            ..RemotePolicy::default()
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff(20), Duration::from_secs(30));
    }
}
