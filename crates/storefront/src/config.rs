//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for sessions
//!   (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `SOUQ_API_BASE_URL` - Store API root (e.g., `https://api.souq.example/api/`)
//! - `SOUQ_STORE_TENANT` - Tenant the storefront serves (e.g., `hwm.souq.example`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SOUQ_API_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `SOUQ_API_CACHE_TTL_SECS` - Response cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0 to 1.0 (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const MAX_API_TIMEOUT_SECS: u64 = 120;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Store API configuration
    pub api: ApiConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production")
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
}

/// Store API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API root; versioned paths are joined onto it
    pub base_url: Url,
    /// Tenant (store domain) used in `/v1/store/{tenant}` paths
    pub tenant: String,
    /// Client-side timeout for every request
    pub timeout: Duration,
    /// Lifetime of cached responses
    pub cache_ttl: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        parse_url("STOREFRONT_BASE_URL", &base_url)?;

        let api = ApiConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            api,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl ApiConfig {
    /// Build an API configuration with default timeout and cache lifetime.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL or tenant is invalid.
    pub fn new(base_url: &str, tenant: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_api_base("SOUQ_API_BASE_URL", base_url)?,
            tenant: validate_tenant(tenant)?,
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        })
    }

    /// Load the API settings alone, for tools that never serve pages.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_required_env("SOUQ_API_BASE_URL")?;
        let tenant = get_required_env("SOUQ_STORE_TENANT")?;
        let mut config = Self::new(&base_url, &tenant)?;

        let timeout = get_secs("SOUQ_API_TIMEOUT_SECS", DEFAULT_API_TIMEOUT_SECS)?;
        if timeout == 0 || timeout > MAX_API_TIMEOUT_SECS {
            return Err(ConfigError::InvalidEnvVar(
                "SOUQ_API_TIMEOUT_SECS".to_string(),
                format!("must be between 1 and {MAX_API_TIMEOUT_SECS}"),
            ));
        }
        config.timeout = Duration::from_secs(timeout);
        config.cache_ttl =
            Duration::from_secs(get_secs("SOUQ_API_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?);
        Ok(config)
    }
}

/// Session database URL from `STOREFRONT_DATABASE_URL` or `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    get_database_url("STOREFRONT_DATABASE_URL")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_secs(key: &str, default: u64) -> Result<u64, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |v| {
        v.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a sample rate in `[0.0, 1.0]`.
fn get_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    let rate = raw
        .trim()
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be between 0.0 and 1.0".to_string(),
        ));
    }
    Ok(rate)
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

/// Parse the API root, making sure it ends with a slash so joins append.
fn parse_api_base(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url = parse_url(key, value)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Tenants are store domains: ASCII letters, digits, dots and hyphens.
fn validate_tenant(tenant: &str) -> Result<String, ConfigError> {
    let tenant = tenant.trim();
    let valid = !tenant.is_empty()
        && !tenant.starts_with(['.', '-'])
        && !tenant.ends_with(['.', '-'])
        && tenant
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if valid {
        Ok(tenant.to_ascii_lowercase())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "SOUQ_STORE_TENANT".to_string(),
            format!("not a valid store domain: {tenant:?}"),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_defaults() {
        let api = ApiConfig::new("https://api.souq.example/api", "hwm.souq.example").unwrap();
        assert_eq!(api.base_url.as_str(), "https://api.souq.example/api/");
        assert_eq!(api.timeout, Duration::from_secs(10));
        assert_eq!(api.cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_api_base_keeps_trailing_slash() {
        let api = ApiConfig::new("http://127.0.0.1:8080/", "shop").unwrap();
        assert_eq!(api.base_url.as_str(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn test_api_config_rejects_bad_url() {
        assert!(matches!(
            ApiConfig::new("not a url", "shop"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(ApiConfig::new("ftp://files.example", "shop").is_err());
    }

    #[test]
    fn test_tenant_validation() {
        assert_eq!(validate_tenant(" HWM.Souq.Example ").unwrap(), "hwm.souq.example");
        assert!(validate_tenant("").is_err());
        assert!(validate_tenant("shop/../admin").is_err());
        assert!(validate_tenant("-shop").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            api: ApiConfig::new("http://localhost:8080", "shop").unwrap(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_config_debug_redacts_database_url() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://user:hunter2@db/souq"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://shop.example".to_string(),
            api: ApiConfig::new("https://api.example", "shop").unwrap(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
        assert!(debug_output.contains("api.example"));
    }
}
