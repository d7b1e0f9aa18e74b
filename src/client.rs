//! HTTP transport to the OCR endpoint: multipart upload, per-attempt
//! timeout, and bounded retry with exponential backoff.

use crate::registry::EndpointConfig;
use crate::types::ExtractionRequest;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

/// Status codes retried automatically, up to the configured bound.
const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

/// Timeout for the liveness probe, independent of the endpoint's own
/// (much longer) request timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport-level failure, surfaced only after the retry budget is spent.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("cannot connect to {url}: {message}")]
    Connection { url: String, message: String },

    #[error("endpoint returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
}

impl TransportError {
    /// Retryable-and-transient: the listed status codes and connection
    /// failures. Timeouts and all other statuses fail immediately.
    fn is_retryable(&self) -> bool {
        match self {
            TransportError::HttpStatus { status, .. } => RETRYABLE_STATUS.contains(status),
            TransportError::Connection { .. } => true,
            TransportError::Timeout { .. } => false,
        }
    }
}

/// POST the image and instruction to the endpoint, retrying transient
/// failures, and return the raw response body text.
///
/// At most `config.max_retries` retries follow the initial attempt. The
/// backoff before retry `n` (1-based) is `retry_backoff * 2^(n-1)` seconds.
pub async fn send(
    client: &Client,
    config: &EndpointConfig,
    request: &ExtractionRequest,
) -> Result<String, TransportError> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match send_once(client, config, request).await {
            Ok(body) => {
                info!(url = %config.url, attempt, "OCR endpoint replied");
                return Ok(body);
            }
            Err(err) if err.is_retryable() && attempt <= config.max_retries => {
                let delay = backoff_delay(config.retry_backoff, attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, %err, "transient failure, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// One request/response cycle against the endpoint.
async fn send_once(
    client: &Client,
    config: &EndpointConfig,
    request: &ExtractionRequest,
) -> Result<String, TransportError> {
    let image = Part::bytes(request.image.clone())
        .file_name(request.file_name.clone())
        .mime_str(&request.content_type)
        .map_err(|e| TransportError::Connection {
            url: config.url.clone(),
            message: format!("invalid content type {:?}: {e}", request.content_type),
        })?;
    let form = Form::new()
        .part("image", image)
        .text("query", request.query.clone());

    let mut builder = client
        .post(&config.url)
        .timeout(Duration::from_secs(config.timeout))
        .multipart(form);
    for (key, value) in &config.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    if config.auth_required && !config.auth_token.is_empty() {
        builder = builder.bearer_auth(&config.auth_token);
    }

    let resp = builder.send().await.map_err(|e| classify(e, config))?;
    let status = resp.status();
    if status.is_success() {
        resp.text().await.map_err(|e| classify(e, config))
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(TransportError::HttpStatus {
            status: status.as_u16(),
            body,
        })
    }
}

/// Liveness probe: HEAD the endpoint and report whether anything answered.
///
/// Any HTTP response counts as alive, including "method not allowed" from
/// endpoints that only accept POST. Only connect or timeout failures count
/// as dead: reachable is a weaker claim than "produced a usable result".
pub async fn probe(client: &Client, config: &EndpointConfig) -> bool {
    match client
        .head(&config.url)
        .timeout(PROBE_TIMEOUT)
        .send()
        .await
    {
        Ok(_) => true,
        Err(err) => {
            warn!(url = %config.url, %err, "endpoint liveness probe failed");
            false
        }
    }
}

fn classify(err: reqwest::Error, config: &EndpointConfig) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: config.url.clone(),
            seconds: config.timeout,
        }
    } else {
        TransportError::Connection {
            url: config.url.clone(),
            message: err.to_string(),
        }
    }
}

/// Backoff before the retry following completed attempt `attempt` (1-based).
fn backoff_delay(base_seconds: f64, attempt: u32) -> Duration {
    let factor = 2f64.powi(attempt.saturating_sub(1) as i32);
    Duration::from_secs_f64((base_seconds * factor).max(0.0))
}
