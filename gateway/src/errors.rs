use std::time::Duration;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Failures of a single upstream preview call.
///
/// The `Display` output is meant for operator logs. Anything crossing the
/// user-facing boundary should use [`GatewayError::code`] instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Upstream returned HTTP {status}")]
    UpstreamHttpError {
        status: u16,
        /// Upstream body: JSON when it decodes, text when it is non-empty UTF-8.
        body: Option<serde_json::Value>,
    },

    #[error("Upstream did not respond within {timeout:?}")]
    UpstreamTimeout { timeout: Duration },

    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Upstream response malformed: {0}")]
    UpstreamMalformed(String),
}

impl GatewayError {
    /// Stable, non-sensitive identifier for this kind of failure.
    pub const fn code(&self) -> &'static str {
        match self {
            GatewayError::UpstreamHttpError { .. } => "upstream_http_error",
            GatewayError::UpstreamTimeout { .. } => "upstream_timeout",
            GatewayError::UpstreamUnreachable(_) => "upstream_unreachable",
            GatewayError::UpstreamMalformed(_) => "upstream_malformed",
        }
    }

    /// Whether retrying later has a reasonable chance of succeeding.
    pub const fn is_transient(&self) -> bool {
        match self {
            GatewayError::UpstreamTimeout { .. } => true,
            GatewayError::UpstreamHttpError { status, .. } => *status >= 500 || *status == 429,
            GatewayError::UpstreamUnreachable(_) | GatewayError::UpstreamMalformed(_) => false,
        }
    }
}
