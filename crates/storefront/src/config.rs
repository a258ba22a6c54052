//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; defaults target the production backend.
//!
//! - `TECHHUB_API_BASE_URL` - Backend base URL (default:
//!   `https://lot-ecom-backend.onrender.com/api/v1`)
//! - `TECHHUB_SESSION_FILE` - Where the bearer token is persisted (default:
//!   `$HOME/.techhub/session.json`)
//! - `TECHHUB_PAGE_SIZE` - Products per catalog page, 1-100 (default: 10)
//! - `TECHHUB_DEBOUNCE_MS` - Quiet period before a quantity edit is synced
//!   (default: 500)
//! - `TECHHUB_RATE_LIMIT_BACKOFF_MS` - Wait before the single retry of a
//!   rate-limited read (default: 2000)
//! - `TECHHUB_CHECKOUT_SETTLE_MS` - Pause between the pre-checkout cart
//!   refresh and submission (default: 300)
//! - `TECHHUB_REQUEST_TIMEOUT_SECS` - HTTP request timeout (default: 30)
//! - `TECHHUB_RESYNC_POLICY` - `refetch` or `trust-local` (default: `refetch`)
//! - `TECHHUB_STRICT_SESSION` - Revoke a stored token the backend rejects
//!   during bootstrap (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Production backend.
pub const DEFAULT_API_BASE_URL: &str = "https://lot-ecom-backend.onrender.com/api/v1";

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_RATE_LIMIT_BACKOFF_MS: u64 = 2000;
const DEFAULT_CHECKOUT_SETTLE_MS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// What the cart does after the backend confirms a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResyncPolicy {
    /// Re-fetch the whole cart; changes made elsewhere become visible.
    #[default]
    Refetch,
    /// Keep the optimistic local state and skip the extra request.
    TrustLocal,
}

impl FromStr for ResyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "refetch" => Ok(Self::Refetch),
            "trust-local" | "trust_local" => Ok(Self::TrustLocal),
            other => Err(format!("expected 'refetch' or 'trust-local', got '{other}'")),
        }
    }
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend base URL; endpoint paths are appended to it
    pub api_base_url: Url,
    /// File holding the persisted bearer token
    pub session_file: PathBuf,
    /// Products requested per catalog page
    pub page_size: u32,
    /// Cart timing and resync behavior
    pub cart: CartSettings,
    /// Pause after the pre-checkout refresh
    pub checkout_settle: Duration,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Revoke a stored token the backend rejects during bootstrap
    pub strict_session_validation: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Timing and policy knobs for the cart synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSettings {
    /// Quiet period before a quantity edit reaches the backend
    pub debounce: Duration,
    /// Wait before retrying a rate-limited cart read
    pub rate_limit_backoff: Duration,
    /// Behavior after a confirmed write
    pub resync: ResyncPolicy,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            rate_limit_backoff: Duration::from_millis(DEFAULT_RATE_LIMIT_BACKOFF_MS),
            resync: ResyncPolicy::default(),
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_base_url(),
            session_file: default_session_file(),
            page_size: DEFAULT_PAGE_SIZE,
            cart: CartSettings::default(),
            checkout_settle: Duration::from_millis(DEFAULT_CHECKOUT_SETTLE_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            strict_session_validation: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = match lookup("TECHHUB_API_BASE_URL") {
            Some(raw) => parse_base_url(&raw)?,
            None => defaults.api_base_url,
        };

        let session_file = lookup("TECHHUB_SESSION_FILE")
            .map_or(defaults.session_file, PathBuf::from);

        let page_size = parse_or("TECHHUB_PAGE_SIZE", &lookup, DEFAULT_PAGE_SIZE)?;
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ConfigError::InvalidEnvVar(
                "TECHHUB_PAGE_SIZE".to_string(),
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        let cart = CartSettings {
            debounce: Duration::from_millis(parse_or(
                "TECHHUB_DEBOUNCE_MS",
                &lookup,
                DEFAULT_DEBOUNCE_MS,
            )?),
            rate_limit_backoff: Duration::from_millis(parse_or(
                "TECHHUB_RATE_LIMIT_BACKOFF_MS",
                &lookup,
                DEFAULT_RATE_LIMIT_BACKOFF_MS,
            )?),
            resync: parse_or("TECHHUB_RESYNC_POLICY", &lookup, ResyncPolicy::default())?,
        };

        let checkout_settle = Duration::from_millis(parse_or(
            "TECHHUB_CHECKOUT_SETTLE_MS",
            &lookup,
            DEFAULT_CHECKOUT_SETTLE_MS,
        )?);
        let request_timeout = Duration::from_secs(parse_or(
            "TECHHUB_REQUEST_TIMEOUT_SECS",
            &lookup,
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let strict_session_validation = parse_bool_or("TECHHUB_STRICT_SESSION", &lookup, false)?;

        Ok(Self {
            api_base_url,
            session_file,
            page_size,
            cart,
            checkout_settle,
            request_timeout,
            strict_session_validation,
            sentry_dsn: lookup("SENTRY_DSN").filter(|v| !v.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT").filter(|v| !v.is_empty()),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// # Panics
///
/// Never in practice: `DEFAULT_API_BASE_URL` is a valid https URL.
fn default_base_url() -> Url {
    parse_base_url(DEFAULT_API_BASE_URL).expect("default API base URL is valid")
}

/// `$HOME/.techhub/session.json`, or a file in the working directory when
/// no home directory is known.
fn default_session_file() -> PathBuf {
    std::env::var_os("HOME").map_or_else(
        || PathBuf::from(".techhub-session.json"),
        |home| PathBuf::from(home).join(".techhub").join("session.json"),
    )
}

/// Parse a base URL, requiring http(s) and a trailing slash so relative
/// endpoint paths join underneath it.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid =
        |msg: String| ConfigError::InvalidEnvVar("TECHHUB_API_BASE_URL".to_string(), msg);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Parse a variable with `FromStr`, falling back to a default when unset.
fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Parse a boolean flag (`true/false/1/0/yes/no`).
fn parse_bool_or<F>(key: &str, lookup: &F, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = StorefrontConfig::from_lookup(|_| None).unwrap();
        assert_eq!(
            config.api_base_url.as_str(),
            "https://lot-ecom-backend.onrender.com/api/v1/"
        );
        assert_eq!(config.page_size, 10);
        assert_eq!(config.cart.debounce, Duration::from_millis(500));
        assert_eq!(config.cart.rate_limit_backoff, Duration::from_secs(2));
        assert_eq!(config.cart.resync, ResyncPolicy::Refetch);
        assert!(!config.strict_session_validation);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config =
            StorefrontConfig::from_lookup(lookup_from(&[("TECHHUB_API_BASE_URL", "http://127.0.0.1:8080/api/v1")]))
                .unwrap();
        assert_eq!(config.api_base_url.as_str(), "http://127.0.0.1:8080/api/v1/");
        assert_eq!(
            config.api_base_url.join("cart").unwrap().as_str(),
            "http://127.0.0.1:8080/api/v1/cart"
        );
    }

    #[test]
    fn test_base_url_rejects_other_schemes() {
        let err = StorefrontConfig::from_lookup(lookup_from(&[("TECHHUB_API_BASE_URL", "ftp://example.com")]))
            .unwrap_err();
        assert!(err.to_string().contains("TECHHUB_API_BASE_URL"));
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(StorefrontConfig::from_lookup(lookup_from(&[("TECHHUB_PAGE_SIZE", "0")])).is_err());
        assert!(StorefrontConfig::from_lookup(lookup_from(&[("TECHHUB_PAGE_SIZE", "101")])).is_err());
        assert!(StorefrontConfig::from_lookup(lookup_from(&[("TECHHUB_PAGE_SIZE", "abc")])).is_err());
        let config = StorefrontConfig::from_lookup(lookup_from(&[("TECHHUB_PAGE_SIZE", "25")])).unwrap();
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn test_resync_policy_parsing() {
        let config =
            StorefrontConfig::from_lookup(lookup_from(&[("TECHHUB_RESYNC_POLICY", "trust-local")])).unwrap();
        assert_eq!(config.cart.resync, ResyncPolicy::TrustLocal);
        assert!(StorefrontConfig::from_lookup(lookup_from(&[("TECHHUB_RESYNC_POLICY", "sometimes")])).is_err());
    }

    #[test]
    fn test_strict_session_flag() {
        let config = StorefrontConfig::from_lookup(lookup_from(&[("TECHHUB_STRICT_SESSION", "yes")])).unwrap();
        assert!(config.strict_session_validation);
        assert!(StorefrontConfig::from_lookup(lookup_from(&[("TECHHUB_STRICT_SESSION", "maybe")])).is_err());
    }

    #[test]
    fn test_empty_sentry_dsn_is_none() {
        let config = StorefrontConfig::from_lookup(lookup_from(&[("SENTRY_DSN", "")])).unwrap();
        assert!(config.sentry_dsn.is_none());
    }
}
