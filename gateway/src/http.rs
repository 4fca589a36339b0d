use reqwest::StatusCode;
use serde_json::Value;
use std::error::Error as StdError;
use std::time::Duration;
use tokio::time::timeout;

use crate::errors::{GatewayError, Result};

/// A fully collected upstream response.
pub(crate) struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Issue a single GET to the upstream and collect its body.
///
/// # Timeout Behavior
///
/// `request_timeout` bounds the whole exchange: connecting, receiving the
/// response headers and collecting the body. Elapsing it yields
/// [`GatewayError::UpstreamTimeout`]; every other failure to get a response is
/// [`GatewayError::UpstreamUnreachable`], including URLs the client rejects.
///
/// Dropping the returned future aborts the request.
pub(crate) async fn send_to_upstream(
    client: &reqwest::Client,
    url: &str,
    request_timeout: Duration,
    max_response_bytes: usize,
) -> Result<UpstreamResponse> {
    let exchange = async {
        let mut response = client
            .get(url)
            .send()
            .await
            .map_err(|e| map_send_error(e, request_timeout))?;

        let status = response.status();
        let body = read_body_limited(&mut response, max_response_bytes, request_timeout).await;
        let body = match body {
            Ok(body) => body,
            // An error status is reported as such even when its body is unusable.
            Err(GatewayError::UpstreamMalformed(reason)) if !status.is_success() => {
                tracing::debug!(
                    status = status.as_u16(),
                    reason = %reason,
                    "Discarding unreadable error body"
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        Ok::<_, GatewayError>(UpstreamResponse { status, body })
    };

    timeout(request_timeout, exchange)
        .await
        // Outer error: the deadline elapsed before the exchange finished
        .map_err(|_| GatewayError::UpstreamTimeout {
            timeout: request_timeout,
        })?
}

/// Reads the response body while enforcing a byte limit.
async fn read_body_limited(
    response: &mut reqwest::Response,
    max_bytes: usize,
    request_timeout: Duration,
) -> Result<Vec<u8>> {
    if let Some(expected) = response.content_length()
        && expected > max_bytes as u64
    {
        return Err(GatewayError::UpstreamMalformed(format!(
            "declared body of {expected} bytes exceeds limit of {max_bytes}"
        )));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| {
        if e.is_timeout() {
            GatewayError::UpstreamTimeout {
                timeout: request_timeout,
            }
        } else {
            GatewayError::UpstreamMalformed(format!(
                "failed to read body: {}",
                error_chain(&e.without_url())
            ))
        }
    })? {
        if body.len() + chunk.len() > max_bytes {
            return Err(GatewayError::UpstreamMalformed(format!(
                "body exceeds limit of {max_bytes} bytes"
            )));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

fn map_send_error(error: reqwest::Error, request_timeout: Duration) -> GatewayError {
    if error.is_timeout() {
        return GatewayError::UpstreamTimeout {
            timeout: request_timeout,
        };
    }
    // The URL can carry upstream credentials in its query string.
    GatewayError::UpstreamUnreachable(error_chain(&error.without_url()))
}

/// Joins an error with its sources, e.g. "error sending request: connection refused".
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Decodes an error response body for operator logs.
///
/// JSON bodies are kept as JSON, other non-empty UTF-8 bodies as a string.
pub(crate) fn decode_error_body(body: &[u8]) -> Option<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    if let Ok(value) = serde_json::from_slice(body) {
        return Some(value);
    }
    std::str::from_utf8(body)
        .ok()
        .map(|text| Value::String(text.trim().to_string()))
}

/// Host of the upstream URL, used to identify it in logs without leaking
/// path or query contents.
pub(crate) fn upstream_identifier(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| "<invalid url>".to_string())
}
