//! Shared JSON-over-HTTP client used by every provider.
//!
//! Features:
//! - Per-request timeout from [`ProviderConfig::timeout_secs`].
//! - Optional token-bucket rate limiting via [`governor`].
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - Failure classification: unreachable or timed out, rejected credentials,
//!   and provider-reported failures each map to their own [`StageError`].

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use rf_core::config::ProviderConfig;
use rf_core::StageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// JSON POST client bound to one provider endpoint.
pub struct ApiClient {
    provider: &'static str,
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    rate_limiter: Option<DirectLimiter>,
}

impl ApiClient {
    /// Create a client for `provider` using the endpoint settings in `config`.
    pub fn new(provider: &'static str, config: &ProviderConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(provider, "Failed to build HTTP client with timeout: {e}");
                reqwest::Client::new()
            });

        let rate_limiter = config
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Self {
            provider,
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            timeout,
            rate_limiter,
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Whether an endpoint is configured at all.
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST `body` to `path` and decode the JSON answer.
    ///
    /// `api_key` is sent as a bearer token; when `None`, the key from the
    /// provider config (if any) is used instead.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        api_key: Option<&str>,
    ) -> Result<T, StageError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let api_key = api_key.or(self.api_key.as_deref());
        let mut retries = 0u32;

        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.until_ready().await;
            }

            debug!(provider = self.provider, url = %url, "POST");
            let mut request = self.client.post(&url).json(body);
            if let Some(key) = api_key {
                request = request.bearer_auth(key);
            }
            let resp = request.send().await.map_err(|e| self.transport_error(e))?;
            let status = resp.status();

            if status == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    provider = self.provider,
                    retry = retries,
                    wait_secs = wait,
                    "Provider returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let text = resp.text().await.map_err(|e| self.transport_error(e))?;
            return self.interpret(status, &text);
        }
    }

    fn interpret<T: DeserializeOwned>(&self, status: StatusCode, body: &str) -> Result<T, StageError> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StageError::Credentials(format!(
                "{} rejected the API key (HTTP {})",
                self.provider,
                status.as_u16()
            )));
        }

        let parsed: Option<Value> = serde_json::from_str(body).ok();

        if !status.is_success() {
            let detail = parsed
                .as_ref()
                .and_then(error_message)
                .or_else(|| status.canonical_reason().map(String::from))
                .unwrap_or_else(|| "unknown error".into());
            return Err(StageError::Provider(format!(
                "{} returned HTTP {}: {detail}",
                self.provider,
                status.as_u16()
            )));
        }

        let value = parsed.ok_or_else(|| self.unusable("response is not JSON"))?;
        if let Some(reported @ (Value::String(_) | Value::Object(_))) = value.get("error") {
            let message = error_message(&value).unwrap_or_else(|| reported.to_string());
            return Err(StageError::Provider(message));
        }
        serde_json::from_value(value).map_err(|e| self.unusable(e))
    }

    fn unusable(&self, detail: impl std::fmt::Display) -> StageError {
        StageError::Provider(format!(
            "{} returned an unusable payload: {detail}",
            self.provider
        ))
    }

    fn transport_error(&self, e: reqwest::Error) -> StageError {
        if e.is_timeout() {
            StageError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            StageError::Transport(format!("{} request failed: {e}", self.provider))
        }
    }
}

/// Pull a human-readable message out of `{"error": "..."}`,
/// `{"error": {"message": "..."}}` or `{"message": "..."}`.
fn error_message(value: &Value) -> Option<String> {
    match value.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(String::from),
        _ => value.get("message").and_then(Value::as_str).map(String::from),
    }
}
