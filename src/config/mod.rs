//! Client configuration management

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::graphql::pagination::{DEFAULT_PAGE_SIZE, clamp_limit};

/// Client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// GraphQL endpoint URL
    pub endpoint: String,

    /// Name of the stored auth token (file name under `auth_token_dir`)
    pub auth_token_key: String,

    /// Directory holding stored auth tokens
    pub auth_token_dir: PathBuf,

    /// Token supplied directly through the environment, takes precedence
    /// over the stored one
    pub auth_token: Option<String>,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Maximum requests per second sent to the endpoint
    pub requests_per_second: u32,

    /// Burst capacity above the steady rate
    pub request_burst: u32,

    /// Page size used when a paginated read does not pass one
    pub default_page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4000/graphql".to_string(),
            auth_token_key: "auth_token".to_string(),
            auth_token_dir: default_token_dir(),
            auth_token: None,
            request_timeout: Duration::from_secs(parse_var(
                "REQUEST_TIMEOUT_SECS",
                env::var("REQUEST_TIMEOUT_SECS").ok(),
                defaults.request_timeout.as_secs(),
            )?),

            requests_per_second: parse_var(
                "REQUESTS_PER_SECOND",
                env::var("REQUESTS_PER_SECOND").ok(),
                defaults.requests_per_second,
            )?,

            request_burst: parse_var(
                "REQUEST_BURST",
                env::var("REQUEST_BURST").ok(),
                defaults.request_burst,
            )?,

            default_page_size: clamp_limit(parse_var(
                "DEFAULT_PAGE_SIZE",
                env::var("DEFAULT_PAGE_SIZE").ok(),
                defaults.default_page_size,
            )?),
        })
    }

    /// Path of the stored token file
    pub fn token_path(&self) -> PathBuf {
        self.auth_token_dir.join(&self.auth_token_key)
    }
}

/// Parse an optional variable, falling back to `default` only when unset.
fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", name, raw)),
        None => Ok(default),
    }
}

fn default_token_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crudkit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, "http://localhost:4000/graphql");
        assert_eq!(config.default_page_size, DEFAULT_PAGE_SIZE);
        assert!(config.token_path().ends_with("crudkit/auth_token"));
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        assert_eq!(parse_var::<u32>("REQUEST_BURST", None, 20).unwrap(), 20);
        assert_eq!(parse_var::<u32>("REQUEST_BURST", Some(" 5 ".into()), 20).unwrap(), 5);

        let err = parse_var::<u32>("REQUESTS_PER_SECOND", Some("fast".into()), 10).unwrap_err();
        assert!(err.to_string().contains("Invalid REQUESTS_PER_SECOND: fast"));
        assert!(parse_var::<u64>("REQUEST_TIMEOUT_SECS", Some("-1".into()), 30).is_err());
    }
}
