// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the immutable
//! [`VerificationConfig`] snapshot every gateway component is built from.
//! The snapshot is resolved exactly once in `main` and then shared behind an
//! `Arc`; nothing reads the environment while serving requests.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ENVIRONMENT` | `development` or `production` | `production` |
//! | `PORTAL_URL` | Portal base URL (overrides the mode default) | see [`DEV_PORTAL_URL`] / [`PROD_PORTAL_URL`] |
//! | `AUTH_MODE` | `remote` (portal lookup) or `stateless` (signed token) | `remote` |
//! | `PORTAL_SECRET` | HS256 shared secret | Required for `stateless` |
//! | `TOKEN_ISSUER` | Expected `iss` claim | portal URL |
//! | `TOKEN_AUDIENCE` | Expected `aud` claim | `hrms` |
//! | `PORTAL_TIMEOUT_MS` | Per-attempt portal timeout | `3000` |
//! | `PORTAL_MAX_RETRIES` | Retries after the first attempt | `2` |
//! | `PORTAL_RETRY_BASE_MS` | Backoff base delay | `200` |
//! | `VERIFY_BUDGET_MS` | Total verification budget | `5000` |
//! | `REQUEST_TIMEOUT_MS` | Whole-request deadline | `15000` |
//! | `SESSION_CACHE_TTL_SECS` | Validation cache TTL | `60` |
//! | `SESSION_CACHE_CAPACITY` | Validation cache capacity | `10000` |
//! | `SESSION_CACHE_SWEEP_SECS` | Expired-entry sweep interval, `0` disables | `30` |
//! | `SESSION_COOKIE_NAME` | Session cookie name | `session_id` |
//! | `SESSION_HEADER_NAME` | Session header name | `x-session-id` |
//! | `SESSION_QUERY_FALLBACK` | Accept `?session_id=` as last resort | `false` |
//! | `GATEWAY_API_MODE` | Answer JSON clients with 401 instead of redirect | `false` |
//! | `GATEWAY_PUBLIC_PATHS` | Extra public routes, comma separated | empty |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const ENVIRONMENT_ENV: &str = "ENVIRONMENT";
pub const PORTAL_URL_ENV: &str = "PORTAL_URL";
pub const AUTH_MODE_ENV: &str = "AUTH_MODE";
pub const PORTAL_SECRET_ENV: &str = "PORTAL_SECRET";
pub const TOKEN_ISSUER_ENV: &str = "TOKEN_ISSUER";
pub const TOKEN_AUDIENCE_ENV: &str = "TOKEN_AUDIENCE";
pub const PORTAL_TIMEOUT_ENV: &str = "PORTAL_TIMEOUT_MS";
pub const PORTAL_MAX_RETRIES_ENV: &str = "PORTAL_MAX_RETRIES";
pub const PORTAL_RETRY_BASE_ENV: &str = "PORTAL_RETRY_BASE_MS";
pub const VERIFY_BUDGET_ENV: &str = "VERIFY_BUDGET_MS";
pub const REQUEST_TIMEOUT_ENV: &str = "REQUEST_TIMEOUT_MS";
pub const CACHE_TTL_ENV: &str = "SESSION_CACHE_TTL_SECS";
pub const CACHE_CAPACITY_ENV: &str = "SESSION_CACHE_CAPACITY";
pub const CACHE_SWEEP_ENV: &str = "SESSION_CACHE_SWEEP_SECS";
pub const COOKIE_NAME_ENV: &str = "SESSION_COOKIE_NAME";
pub const HEADER_NAME_ENV: &str = "SESSION_HEADER_NAME";
pub const QUERY_FALLBACK_ENV: &str = "SESSION_QUERY_FALLBACK";
pub const API_MODE_ENV: &str = "GATEWAY_API_MODE";
pub const PUBLIC_PATHS_ENV: &str = "GATEWAY_PUBLIC_PATHS";

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";
/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";
/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Portal used when `ENVIRONMENT=development`.
pub const DEV_PORTAL_URL: &str = "http://localhost:8081";
/// Portal used for every other deployment mode.
pub const PROD_PORTAL_URL: &str = "https://portal.vaics-consulting.com";

/// Minimum accepted length of the HS256 shared secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_BASE_MS: u64 = 200;
const DEFAULT_VERIFY_BUDGET_MS: u64 = 5_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_CACHE_CAPACITY: usize = 10_000;
const DEFAULT_SWEEP_SECS: u64 = 30;
const DEFAULT_COOKIE_NAME: &str = "session_id";
const DEFAULT_HEADER_NAME: &str = "x-session-id";
const DEFAULT_AUDIENCE: &str = "hrms";

/// Startup configuration failures. Any of these aborts the process before it
/// binds a listener.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PORTAL_SECRET is required when AUTH_MODE=stateless")]
    MissingSecret,

    #[error("PORTAL_SECRET must be at least {min} bytes")]
    WeakSecret { min: usize },

    #[error("{var} is not a valid absolute http(s) URL: {value}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} has an unsupported value: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("verification budget ({budget_ms} ms) must be shorter than the request deadline ({deadline_ms} ms)")]
    BudgetExceedsDeadline { budget_ms: u128, deadline_ms: u128 },

    #[error("failed to build portal HTTP client: {0}")]
    HttpClient(String),

    #[error("invalid token verification settings: {0}")]
    TokenSettings(String),
}

/// Deployment mode, selected by `ENVIRONMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    Development,
    Production,
}

impl DeploymentMode {
    fn parse(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("development") || v.eq_ignore_ascii_case("dev") => {
                DeploymentMode::Development
            }
            _ => DeploymentMode::Production,
        }
    }

    fn default_portal_url(self) -> &'static str {
        match self {
            DeploymentMode::Development => DEV_PORTAL_URL,
            DeploymentMode::Production => PROD_PORTAL_URL,
        }
    }
}

/// How session credentials are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    /// Every unknown credential is looked up at the portal.
    Remote,
    /// Credentials are HS256 tokens checked locally with the shared secret.
    Stateless,
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationMode::Remote => write!(f, "remote"),
            VerificationMode::Stateless => write!(f, "stateless"),
        }
    }
}

/// Immutable verification settings shared by every request handler.
#[derive(Clone)]
pub struct VerificationConfig {
    pub deployment: DeploymentMode,
    /// Portal base URL without a trailing slash.
    pub portal_url: String,
    pub mode: VerificationMode,
    pub shared_secret: Option<String>,
    pub token_issuer: String,
    pub token_audience: String,
    /// Timeout of a single portal attempt.
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    /// Upper bound for one verification including every retry.
    pub verify_budget: Duration,
    /// Deadline for handling a whole request.
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    /// `None` disables the background sweep.
    pub cache_sweep_interval: Option<Duration>,
    pub cookie_name: String,
    pub header_name: String,
    pub query_fallback: bool,
    pub api_mode: bool,
    pub public_paths: Vec<String>,
}

impl fmt::Debug for VerificationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationConfig")
            .field("deployment", &self.deployment)
            .field("portal_url", &self.portal_url)
            .field("mode", &self.mode)
            .field("shared_secret", &self.shared_secret.as_ref().map(|_| "<redacted>"))
            .field("token_issuer", &self.token_issuer)
            .field("token_audience", &self.token_audience)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("verify_budget", &self.verify_budget)
            .field("request_timeout", &self.request_timeout)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_capacity", &self.cache_capacity)
            .field("cache_sweep_interval", &self.cache_sweep_interval)
            .field("cookie_name", &self.cookie_name)
            .field("header_name", &self.header_name)
            .field("query_fallback", &self.query_fallback)
            .field("api_mode", &self.api_mode)
            .field("public_paths", &self.public_paths)
            .finish()
    }
}

impl VerificationConfig {
    /// Resolve the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    pub fn resolve<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let deployment = DeploymentMode::parse(get(ENVIRONMENT_ENV));

        let portal_url = match get(PORTAL_URL_ENV) {
            Some(raw) => normalize_url(PORTAL_URL_ENV, &raw)?,
            None => deployment.default_portal_url().to_string(),
        };

        let mode = match get(AUTH_MODE_ENV) {
            None => VerificationMode::Remote,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "remote" | "portal" => VerificationMode::Remote,
                "stateless" | "token" | "jwt" => VerificationMode::Stateless,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: AUTH_MODE_ENV,
                        value: raw,
                    })
                }
            },
        };

        let shared_secret = get(PORTAL_SECRET_ENV);
        if mode == VerificationMode::Stateless {
            match &shared_secret {
                None => return Err(ConfigError::MissingSecret),
                Some(secret) if secret.len() < MIN_SECRET_LEN => {
                    return Err(ConfigError::WeakSecret {
                        min: MIN_SECRET_LEN,
                    })
                }
                Some(_) => {}
            }
        }

        let token_issuer = get(TOKEN_ISSUER_ENV).unwrap_or_else(|| portal_url.clone());
        let token_audience =
            get(TOKEN_AUDIENCE_ENV).unwrap_or_else(|| DEFAULT_AUDIENCE.to_string());

        let timeout = millis(get(PORTAL_TIMEOUT_ENV), PORTAL_TIMEOUT_ENV, DEFAULT_TIMEOUT_MS)?;
        let max_retries = number::<u32>(
            get(PORTAL_MAX_RETRIES_ENV),
            PORTAL_MAX_RETRIES_ENV,
            DEFAULT_MAX_RETRIES,
        )?;
        let retry_base_delay = millis(
            get(PORTAL_RETRY_BASE_ENV),
            PORTAL_RETRY_BASE_ENV,
            DEFAULT_RETRY_BASE_MS,
        )?;
        let verify_budget = millis(
            get(VERIFY_BUDGET_ENV),
            VERIFY_BUDGET_ENV,
            DEFAULT_VERIFY_BUDGET_MS,
        )?;
        let request_timeout = millis(
            get(REQUEST_TIMEOUT_ENV),
            REQUEST_TIMEOUT_ENV,
            DEFAULT_REQUEST_TIMEOUT_MS,
        )?;
        if verify_budget >= request_timeout {
            return Err(ConfigError::BudgetExceedsDeadline {
                budget_ms: verify_budget.as_millis(),
                deadline_ms: request_timeout.as_millis(),
            });
        }

        let cache_ttl = Duration::from_secs(number::<u64>(
            get(CACHE_TTL_ENV),
            CACHE_TTL_ENV,
            DEFAULT_CACHE_TTL_SECS,
        )?);
        let cache_capacity = number::<usize>(
            get(CACHE_CAPACITY_ENV),
            CACHE_CAPACITY_ENV,
            DEFAULT_CACHE_CAPACITY,
        )?;
        if cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                var: CACHE_CAPACITY_ENV,
                value: "0".to_string(),
            });
        }
        let sweep_secs = number::<u64>(get(CACHE_SWEEP_ENV), CACHE_SWEEP_ENV, DEFAULT_SWEEP_SECS)?;
        let cache_sweep_interval = (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs));

        let cookie_name = get(COOKIE_NAME_ENV)
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());
        let header_name = get(HEADER_NAME_ENV)
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_HEADER_NAME.to_string());
        if axum::http::HeaderName::from_bytes(header_name.as_bytes()).is_err() {
            return Err(ConfigError::InvalidValue {
                var: HEADER_NAME_ENV,
                value: header_name,
            });
        }

        let query_fallback = flag(get(QUERY_FALLBACK_ENV), QUERY_FALLBACK_ENV)?;
        let api_mode = flag(get(API_MODE_ENV), API_MODE_ENV)?;

        let public_paths = get(PUBLIC_PATHS_ENV)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            deployment,
            portal_url,
            mode,
            shared_secret,
            token_issuer,
            token_audience,
            timeout,
            max_retries,
            retry_base_delay,
            verify_budget,
            request_timeout,
            cache_ttl,
            cache_capacity,
            cache_sweep_interval,
            cookie_name,
            header_name,
            query_fallback,
            api_mode,
            public_paths,
        })
    }

    /// Whether issued cookies must carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.deployment == DeploymentMode::Production
    }

    /// Portal login page that sends the user back to `return_to`.
    pub fn login_url(&self, return_to: &str) -> String {
        let base = format!("{}/login", self.portal_url);
        match Url::parse(&base) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("return_to", return_to);
                url.into()
            }
            // portal_url is validated at resolve time
            Err(_) => base,
        }
    }

    /// Portal endpoint answering session lookups.
    pub fn validation_endpoint(&self) -> String {
        format!("{}/auth/validate-session", self.portal_url)
    }
}

fn normalize_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
            Ok(trimmed.to_string())
        }
        _ => Err(ConfigError::InvalidUrl {
            var,
            value: raw.to_string(),
        }),
    }
}

/// Resolve the listener address from `HOST` and `PORT`.
pub fn bind_address<F>(lookup: F) -> Result<SocketAddr, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let port = number::<u16>(lookup(PORT_ENV), PORT_ENV, 8080)?;
    let host = lookup(HOST_ENV)
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let ip: IpAddr = host.parse().map_err(|_| ConfigError::InvalidValue {
        var: HOST_ENV,
        value: host.clone(),
    })?;
    Ok(SocketAddr::new(ip, port))
}

fn number<T: std::str::FromStr>(
    value: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
    }
}

fn millis(value: Option<String>, var: &'static str, default: u64) -> Result<Duration, ConfigError> {
    number::<u64>(value, var, default).map(Duration::from_millis)
}

fn flag(value: Option<String>, var: &'static str) -> Result<bool, ConfigError> {
    match value {
        None => Ok(false),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { var, value: raw }),
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) const TEST_SECRET: &str = "test-secret-that-is-definitely-32-bytes-long";

    fn resolve_with(vars: &[(&str, &str)]) -> Result<VerificationConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        VerificationConfig::resolve(|name| map.get(name).cloned())
    }

    /// Configuration used by gateway and verifier tests.
    pub(crate) fn test_config() -> VerificationConfig {
        resolve_with(&[
            (ENVIRONMENT_ENV, "development"),
            (PORTAL_URL_ENV, "http://portal.test"),
        ])
        .expect("test config resolves")
    }

    #[test]
    fn bind_address_defaults_and_rejects_garbage() {
        fn lookup(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
            move |name| {
                vars.iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| v.to_string())
            }
        }

        assert_eq!(
            bind_address(lookup(&[])).unwrap(),
            "0.0.0.0:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            bind_address(lookup(&[(HOST_ENV, "::1"), (PORT_ENV, "9000")])).unwrap(),
            "[::1]:9000".parse::<SocketAddr>().unwrap()
        );
        assert!(matches!(
            bind_address(lookup(&[(PORT_ENV, "eighty")])),
            Err(ConfigError::InvalidNumber { var: PORT_ENV, .. })
        ));
        assert!(matches!(
            bind_address(lookup(&[(PORT_ENV, "70000")])),
            Err(ConfigError::InvalidNumber { var: PORT_ENV, .. })
        ));
        assert!(matches!(
            bind_address(lookup(&[(HOST_ENV, "not a host")])),
            Err(ConfigError::InvalidValue { var: HOST_ENV, .. })
        ));
    }

    #[test]
    fn production_is_the_default_mode() {
        let config = resolve_with(&[]).unwrap();
        assert_eq!(config.deployment, DeploymentMode::Production);
        assert_eq!(config.portal_url, PROD_PORTAL_URL);
        assert_eq!(config.mode, VerificationMode::Remote);
        assert!(config.secure_cookies());
    }

    #[test]
    fn development_defaults_to_loopback_portal() {
        let config = resolve_with(&[(ENVIRONMENT_ENV, "Development")]).unwrap();
        assert_eq!(config.deployment, DeploymentMode::Development);
        assert_eq!(config.portal_url, DEV_PORTAL_URL);
        assert!(!config.secure_cookies());
    }

    #[test]
    fn explicit_portal_url_wins_and_is_trimmed() {
        let config = resolve_with(&[
            (ENVIRONMENT_ENV, "development"),
            (PORTAL_URL_ENV, "https://sso.example.com/"),
        ])
        .unwrap();
        assert_eq!(config.portal_url, "https://sso.example.com");
        assert_eq!(
            config.validation_endpoint(),
            "https://sso.example.com/auth/validate-session"
        );
    }

    #[test]
    fn invalid_portal_url_is_rejected() {
        let err = resolve_with(&[(PORTAL_URL_ENV, "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { var: PORTAL_URL_ENV, .. }));

        let err = resolve_with(&[(PORTAL_URL_ENV, "ftp://portal.example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn stateless_mode_requires_secret() {
        let err = resolve_with(&[(AUTH_MODE_ENV, "stateless")]).unwrap_err();
        assert_eq!(err, ConfigError::MissingSecret);

        let err = resolve_with(&[(AUTH_MODE_ENV, "stateless"), (PORTAL_SECRET_ENV, "short")])
            .unwrap_err();
        assert_eq!(err, ConfigError::WeakSecret { min: MIN_SECRET_LEN });

        let config = resolve_with(&[
            (AUTH_MODE_ENV, "stateless"),
            (PORTAL_SECRET_ENV, TEST_SECRET),
        ])
        .unwrap();
        assert_eq!(config.mode, VerificationMode::Stateless);
        assert_eq!(config.token_issuer, PROD_PORTAL_URL);
        assert_eq!(config.token_audience, "hrms");
    }

    #[test]
    fn remote_mode_does_not_need_secret() {
        let config = resolve_with(&[(AUTH_MODE_ENV, "remote")]).unwrap();
        assert!(config.shared_secret.is_none());
    }

    #[test]
    fn unknown_auth_mode_is_rejected() {
        let err = resolve_with(&[(AUTH_MODE_ENV, "magic")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: AUTH_MODE_ENV, .. }));
    }

    #[test]
    fn numeric_overrides_are_applied() {
        let config = resolve_with(&[
            (PORTAL_TIMEOUT_ENV, "1500"),
            (PORTAL_MAX_RETRIES_ENV, "0"),
            (CACHE_TTL_ENV, "5"),
            (CACHE_CAPACITY_ENV, "2"),
            (CACHE_SWEEP_ENV, "0"),
        ])
        .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.cache_capacity, 2);
        assert!(config.cache_sweep_interval.is_none());
    }

    #[test]
    fn garbage_numbers_fail_fast() {
        let err = resolve_with(&[(PORTAL_TIMEOUT_ENV, "3s")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: PORTAL_TIMEOUT_ENV,
                value: "3s".to_string()
            }
        );
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = resolve_with(&[(CACHE_CAPACITY_ENV, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: CACHE_CAPACITY_ENV, .. }));
    }

    #[test]
    fn budget_must_fit_inside_request_deadline() {
        let err = resolve_with(&[
            (VERIFY_BUDGET_ENV, "20000"),
            (REQUEST_TIMEOUT_ENV, "10000"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::BudgetExceedsDeadline { .. }));
    }

    #[test]
    fn flags_and_public_paths_parse() {
        let config = resolve_with(&[
            (API_MODE_ENV, "true"),
            (QUERY_FALLBACK_ENV, "1"),
            (PUBLIC_PATHS_ENV, "/status, /public/jobs/*, ,"),
        ])
        .unwrap();
        assert!(config.api_mode);
        assert!(config.query_fallback);
        assert_eq!(config.public_paths, vec!["/status", "/public/jobs/*"]);

        let err = resolve_with(&[(API_MODE_ENV, "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: API_MODE_ENV, .. }));
    }

    #[test]
    fn login_url_encodes_return_target() {
        let config = test_config();
        assert_eq!(
            config.login_url("http://hr.test/jobs?page=2"),
            "http://portal.test/login?return_to=http%3A%2F%2Fhr.test%2Fjobs%3Fpage%3D2"
        );
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = resolve_with(&[
            (AUTH_MODE_ENV, "stateless"),
            (PORTAL_SECRET_ENV, TEST_SECRET),
        ])
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(TEST_SECRET));
        assert!(rendered.contains("<redacted>"));
    }
}
