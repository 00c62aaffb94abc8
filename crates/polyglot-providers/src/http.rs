//! HTTP plumbing shared by the remote providers.
//!
//! Every remote provider maps upstream failures through the same
//! classification so the router sees consistent transient/permanent kinds.

use polyglot_abstraction::{FailureReason, ProviderError};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on a health probe. A probe that takes longer is unhealthy.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Transport-level timeout applied to every provider client.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Builds the client a provider owns for its lifetime.
pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to default HTTP client");
        Client::new()
    })
}

/// Maps a non-success HTTP status to a classified provider error.
pub fn classify_status(provider: &str, status: StatusCode, body: &str) -> ProviderError {
    let detail = truncate(body);
    let message = format!("HTTP {}: {}", status.as_u16(), detail);

    let reason = match status.as_u16() {
        408 | 425 => FailureReason::Timeout,
        429 => FailureReason::RateLimited,
        401 | 403 => FailureReason::Authentication,
        // DeepL signals an exhausted character quota with 456.
        456 => FailureReason::QuotaExceeded,
        400 | 422 if mentions_language(body) => FailureReason::UnsupportedLanguagePair,
        code if (500..600).contains(&code) => FailureReason::ServiceUnavailable,
        _ => FailureReason::InvalidRequest,
    };

    ProviderError::new(provider, reason, message)
}

/// Maps a reqwest transport error to a transient provider error.
pub fn classify_transport(provider: &str, err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::new(provider, FailureReason::Timeout, err.to_string())
    } else if err.is_decode() {
        ProviderError::new(provider, FailureReason::InvalidResponse, err.to_string())
    } else {
        ProviderError::new(provider, FailureReason::Network, err.to_string())
    }
}

/// Sends `request` and returns the response body of a 2xx answer.
pub(crate) async fn send_for_body(
    provider: &str,
    request: RequestBuilder,
) -> Result<String, ProviderError> {
    let response = request.send().await.map_err(|e| {
        warn!(provider, error = %e, "Provider request failed");
        classify_transport(provider, &e)
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| classify_transport(provider, &e))?;

    if !status.is_success() {
        let err = classify_status(provider, status, &body);
        warn!(provider, status = %status, kind = %err.kind, "Provider returned error status");
        return Err(err);
    }

    Ok(body)
}

/// Decodes a JSON success body.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    provider: &str,
    body: &str,
) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::new(
            provider,
            FailureReason::InvalidResponse,
            format!("failed to parse response: {e}"),
        )
    })
}

/// Runs a liveness probe bounded by [`HEALTH_CHECK_TIMEOUT`].
pub(crate) async fn probe(provider: &str, request: RequestBuilder) -> bool {
    match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, request.send()).await {
        Ok(Ok(response)) => {
            let healthy = response.status().is_success();
            debug!(provider, status = %response.status(), healthy, "Health probe finished");
            healthy
        }
        Ok(Err(e)) => {
            debug!(provider, error = %e, "Health probe failed");
            false
        }
        Err(_) => {
            debug!(provider, "Health probe timed out");
            false
        }
    }
}

fn mentions_language(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("language") || lower.contains("_lang") || lower.contains("not supported")
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{head}...")
    }
}
