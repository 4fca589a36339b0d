//! Upstream data gateway.
//!
//! Fetches a bounded preview of a catalog item's rows from the third-party
//! open-data API referenced by the item's stored URL template.
//!
//! # Request flow
//!
//! 1. The page size is resolved from the caller's limit or the configured default.
//! 2. The page size placeholder in the template, if any, is substituted. Templates
//!    without it are sent unmodified.
//! 3. A single GET is issued with the configured auth header and timeout.
//! 4. The body is classified as one of the envelope shapes in [`envelope`] and
//!    truncated according to its shape and whether the upstream saw a size hint.
//!
//! Upstream bodies that cannot be rendered degrade to an empty preview. Transport
//! and HTTP failures are reported as [`GatewayError`]. Nothing is cached or retried.

pub mod config;
pub mod envelope;
pub mod errors;
mod http;
pub mod metrics_defs;
pub mod template;

#[cfg(test)]
mod testutils;

use reqwest::header::HeaderMap;
use serde_json::Value;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

pub use config::{AuthHeader, GatewayConfig, ValidationError};
use envelope::Envelope;
pub use errors::GatewayError;
use errors::Result;
use http::{decode_error_body, send_to_upstream, upstream_identifier};
use metrics_defs::{PREVIEW_DEGRADED, PREVIEW_ROWS, UPSTREAM_REQUEST_DURATION, UPSTREAM_REQUEST_ERROR};
use template::{EffectivePageSize, UrlTemplate};

/// An opaque upstream row.
pub type RowRecord = Value;

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("invalid gateway config: {0}")]
    InvalidConfig(#[from] ValidationError),
    #[error("could not build HTTP client: {0}")]
    ClientError(#[from] reqwest::Error),
}

/// Handle to the upstream gateway.
///
/// Cheap to clone; clones share one connection pool and the same configuration.
#[derive(Clone)]
pub struct Gateway {
    client: reqwest::Client,
    config: Arc<GatewayConfig>,
}

impl Gateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, BuildError> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        if let Some(auth_header) = &config.auth_header {
            let (name, value) = auth_header.to_header_pair()?;
            default_headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .connect_timeout(config.timeout())
            .build()?;

        Ok(Gateway {
            client,
            config: Arc::new(config.clone()),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Fetch a bounded preview of the rows behind `url_template`.
    ///
    /// `requested_limit` is used as the page size when positive; otherwise the
    /// configured default applies.
    pub async fn fetch_preview(
        &self,
        url_template: &str,
        requested_limit: Option<i64>,
    ) -> Result<Vec<RowRecord>> {
        let page_size =
            EffectivePageSize::resolve(requested_limit, self.config.default_page_size);
        let resolved = UrlTemplate::new(url_template, &self.config.placeholder).resolve(page_size);
        let upstream = upstream_identifier(&resolved.url);

        tracing::debug!(
            upstream = %upstream,
            page_size = page_size.get(),
            has_placeholder = resolved.has_placeholder,
            "Fetching upstream preview"
        );

        let started = Instant::now();
        let result = send_to_upstream(
            &self.client,
            &resolved.url,
            self.config.timeout(),
            self.config.max_response_bytes,
        )
        .await;
        histogram!(UPSTREAM_REQUEST_DURATION).record(started.elapsed().as_secs_f64());

        let response = result.inspect_err(|e| report_error(&upstream, e))?;

        if !response.status.is_success() {
            let error = GatewayError::UpstreamHttpError {
                status: response.status.as_u16(),
                body: decode_error_body(&response.body),
            };
            report_error(&upstream, &error);
            return Err(error);
        }

        let rows = self
            .normalize(&response.body, page_size, resolved.has_placeholder, &upstream)
            .inspect_err(|e| report_error(&upstream, e))?;

        Ok(rows)
    }

    /// Turns a success body into rows, degrading unrenderable bodies to none.
    fn normalize(
        &self,
        body: &[u8],
        page_size: EffectivePageSize,
        has_placeholder: bool,
        upstream: &str,
    ) -> Result<Vec<RowRecord>> {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) if self.config.strict_json => {
                return Err(GatewayError::UpstreamMalformed(format!(
                    "body is not valid JSON: {e}"
                )));
            }
            Err(e) => {
                tracing::info!(
                    upstream = %upstream,
                    error = %e,
                    body_len = body.len(),
                    "Upstream body is not valid JSON, returning empty preview"
                );
                counter!(PREVIEW_DEGRADED, "reason" => "invalid_json").increment(1);
                return Ok(Vec::new());
            }
        };

        let Some(envelope) = Envelope::classify(value) else {
            tracing::info!(
                upstream = %upstream,
                "Upstream body has no recognizable row envelope, returning empty preview"
            );
            counter!(PREVIEW_DEGRADED, "reason" => "unknown_shape").increment(1);
            return Ok(Vec::new());
        };

        let kind = envelope.kind();
        let rows = envelope.into_rows(page_size, has_placeholder);

        tracing::debug!(
            upstream = %upstream,
            envelope = kind,
            rows = rows.len(),
            "Upstream preview normalized"
        );
        histogram!(PREVIEW_ROWS, "envelope" => kind).record(rows.len() as f64);

        Ok(rows)
    }
}

fn report_error(upstream: &str, error: &GatewayError) {
    counter!(UPSTREAM_REQUEST_ERROR, "code" => error.code()).increment(1);

    match error {
        GatewayError::UpstreamHttpError { status, body } => {
            tracing::warn!(
                upstream = %upstream,
                status = status,
                body = ?body,
                "Upstream returned an error status"
            );
        }
        GatewayError::UpstreamTimeout { timeout } => {
            tracing::warn!(upstream = %upstream, timeout = ?timeout, "Upstream timed out");
        }
        GatewayError::UpstreamUnreachable(reason) => {
            tracing::warn!(upstream = %upstream, reason = %reason, "Upstream unreachable");
        }
        GatewayError::UpstreamMalformed(reason) => {
            tracing::warn!(upstream = %upstream, reason = %reason, "Upstream response malformed");
        }
    }
}
