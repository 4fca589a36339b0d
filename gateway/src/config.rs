use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PLACEHOLDER: &str = "{{PAGE_SIZE}}";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Prefix of the environment variables that override file configuration.
pub const ENV_PREFIX: &str = "DATAGATE_";

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Default page size must be at least 1")]
    InvalidPageSize,

    #[error("Timeout must be at least 1 millisecond")]
    InvalidTimeout,

    #[error("Placeholder token cannot be empty")]
    EmptyPlaceholder,

    #[error("Max response bytes must be at least 1")]
    InvalidMaxResponseBytes,

    #[error("Invalid auth header name: {0}")]
    InvalidAuthHeaderName(String),

    #[error("Invalid auth header value")]
    InvalidAuthHeaderValue,

    #[error("Auth header requires both a name and a value")]
    IncompleteAuthHeader,

    #[error("Invalid value for {var}: {value}")]
    InvalidEnvValue { var: String, value: String },
}

/// Static authentication header added to every upstream request.
#[derive(Clone, Deserialize, PartialEq)]
pub struct AuthHeader {
    pub name: String,
    pub value: String,
}

// The value is a credential and must never reach logs.
impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Upstream gateway configuration. Built once at startup and shared read-only.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GatewayConfig {
    /// Bound on a single upstream call, covering connect, headers and body.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Page size used when the caller does not request a positive limit.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default)]
    pub auth_header: Option<AuthHeader>,
    /// Token substituted with the effective page size in stored URL templates.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Report undecodable success bodies as errors instead of empty results.
    #[serde(default)]
    pub strict_json: bool,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            default_page_size: DEFAULT_PAGE_SIZE,
            auth_header: None,
            placeholder: default_placeholder(),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            strict_json: false,
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates the gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_page_size == 0 {
            return Err(ValidationError::InvalidPageSize);
        }
        if self.timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.placeholder.is_empty() {
            return Err(ValidationError::EmptyPlaceholder);
        }
        if self.max_response_bytes == 0 {
            return Err(ValidationError::InvalidMaxResponseBytes);
        }
        if let Some(header) = &self.auth_header {
            header.to_header_pair()?;
        }
        Ok(())
    }

    /// Applies `DATAGATE_*` overrides on top of file configuration.
    ///
    /// `lookup` resolves a variable name to its value; the binary passes
    /// `std::env::var`, tests pass a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        if let Some((name, value)) = var("TIMEOUT_MS") {
            self.timeout_ms = parse_env(&name, &value)?;
        }
        if let Some((name, value)) = var("DEFAULT_PAGE_SIZE") {
            self.default_page_size = parse_env(&name, &value)?;
        }
        if let Some((_, value)) = var("PLACEHOLDER") {
            self.placeholder = value;
        }

        let header_name = var("AUTH_HEADER_NAME").map(|(_, v)| v);
        let header_value = var("AUTH_HEADER_VALUE").map(|(_, v)| v);
        if header_name.is_some() || header_value.is_some() {
            let existing = self.auth_header.take();
            let name = header_name.or_else(|| existing.as_ref().map(|h| h.name.clone()));
            let value = header_value.or_else(|| existing.map(|h| h.value));
            match (name, value) {
                (Some(name), Some(value)) => self.auth_header = Some(AuthHeader { name, value }),
                _ => return Err(ValidationError::IncompleteAuthHeader),
            }
        }

        Ok(())
    }
}

impl AuthHeader {
    pub(crate) fn to_header_pair(&self) -> Result<(HeaderName, HeaderValue), ValidationError> {
        let name = HeaderName::from_bytes(self.name.as_bytes())
            .map_err(|_| ValidationError::InvalidAuthHeaderName(self.name.clone()))?;
        let mut value = HeaderValue::from_str(&self.value)
            .map_err(|_| ValidationError::InvalidAuthHeaderValue)?;
        value.set_sensitive(true);
        Ok((name, value))
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ValidationError> {
    value
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidEnvValue {
            var: var.to_string(),
            value: value.to_string(),
        })
}
