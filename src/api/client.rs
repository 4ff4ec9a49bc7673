//! HTTP client with bounded automatic recovery
//!
//! Failure handling, checked in this order per attempt:
//! 1. 401 and not yet replayed: refresh the access token once and replay
//!    the original request; on refresh failure clear both tokens and
//!    surface the original error.
//! 2. Network error, 5xx, or 429: retry with exponential backoff, up to
//!    `max_retries` extra attempts. Retry state is local to each request.
//! 3. Anything else: surface immediately.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{KindredError, Result};
use crate::storage::{self, KeyValueStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// Fixed per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry attempts after the initial one
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Explicitly constructed API client; inject one per service instead of
/// sharing process-wide state.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    refresh_url: String,
    tokens: Arc<dyn KeyValueStore>,
    max_retries: u32,
    backoff_unit: Duration,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    access_token: String,
}

impl ApiClient {
    /// Create a client rooted at `base_url`, with the token refresh
    /// endpoint at `{base_url}/auth/refresh`.
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn KeyValueStore>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(KindredError::Config(
                "API base URL must not be empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(KindredError::Http)?;

        Ok(Self {
            http,
            refresh_url: format!("{}/auth/refresh", base_url),
            base_url,
            tokens,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit: Duration::from_secs(1),
        })
    }

    /// Override the token refresh endpoint (it always lives on the app's
    /// own API, even for clients rooted elsewhere)
    pub fn with_refresh_url(mut self, url: impl Into<String>) -> Self {
        self.refresh_url = url.into();
        self
    }

    /// Backoff unit: delay before retry `n` is `unit * 2^n`. Tests shrink
    /// this to milliseconds.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform an authenticated request and decode the JSON response body
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> Result<T> {
        let url = self.url_for(path);
        let mut refreshed = false;
        let mut retries = 0u32;

        loop {
            match self
                .execute_once(&method, &url, body.as_ref(), headers.as_ref())
                .await
            {
                Ok(value) => return Ok(value),
                Err(KindredError::AuthExpired) if !refreshed => {
                    refreshed = true;
                    match self.refresh_access_token().await {
                        Ok(access) => {
                            self.tokens.set(ACCESS_TOKEN_KEY, &access).await?;
                            tracing::debug!(url = %url, "Access token refreshed, replaying request");
                            // replay the original request exactly once
                        }
                        Err(refresh_err) => {
                            tracing::warn!(error = %refresh_err, "Token refresh failed, logging out");
                            storage::clear_tokens(self.tokens.as_ref()).await?;
                            return Err(KindredError::AuthExpired);
                        }
                    }
                }
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    let delay = self.backoff_unit * 2u32.pow(retries);
                    tracing::debug!(
                        url = %url,
                        attempt = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None, None).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        self.request(Method::POST, path, Some(body), None).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        self.request(Method::PUT, path, Some(body), None).await
    }

    pub async fn patch<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        self.request(Method::PATCH, path, Some(body), None).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::DELETE, path, None, None).await
    }

    /// One attempt: attach bearer token, send, classify the outcome
    async fn execute_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> Result<T> {
        let mut request = self.http.request(method.clone(), url);

        if let Some(token) = self.tokens.get(ACCESS_TOKEN_KEY).await? {
            if !token.is_empty() {
                request = request.bearer_auth(token);
            }
        }
        // caller-supplied headers win, including Authorization overrides
        if let Some(headers) = headers {
            request = request.headers(headers.clone());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            // no response received at all
            Err(e) => return Err(KindredError::Network(e.to_string())),
        };

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| KindredError::Unknown(format!("Failed to decode response: {}", e)));
        }

        let message = Self::error_message(response).await;
        Err(match status.as_u16() {
            401 => KindredError::AuthExpired,
            429 => KindredError::RateLimited {
                status: 429,
                message,
            },
            s if s >= 500 => KindredError::Server { status: s, message },
            s => KindredError::Client { status: s, message },
        })
    }

    /// One refresh attempt against the refresh endpoint, unauthenticated
    async fn refresh_access_token(&self) -> Result<String> {
        let refresh = self
            .tokens
            .get(REFRESH_TOKEN_KEY)
            .await?
            .filter(|t| !t.is_empty())
            .ok_or(KindredError::AuthExpired)?;

        let response = self
            .http
            .post(&self.refresh_url)
            .json(&serde_json::json!({ "refreshToken": refresh }))
            .send()
            .await
            .map_err(|e| KindredError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = Self::error_message(response).await;
            return Err(KindredError::Client {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<RefreshData> = response
            .json()
            .await
            .map_err(|e| KindredError::Unknown(format!("Malformed refresh response: {}", e)))?;

        match envelope {
            ApiEnvelope {
                success: true,
                data: Some(data),
            } if !data.access_token.is_empty() => Ok(data.access_token),
            _ => Err(KindredError::AuthExpired),
        }
    }

    /// Extract a human-readable message from an error response body
    async fn error_message(response: reqwest::Response) -> String {
        let fallback = "An error occurred".to_string();
        match response.text().await {
            Ok(text) => serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or(if text.is_empty() { fallback } else { text }),
            Err(_) => fallback,
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn client() -> ApiClient {
        ApiClient::new("https://api.example.com/", Arc::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn empty_base_url_rejected() {
        let result = ApiClient::new("", Arc::new(MemoryStore::new()));
        assert!(matches!(result, Err(KindredError::Config(_))));
    }

    #[test]
    fn url_joining() {
        let client = client();
        assert_eq!(
            client.url_for("/auth/login"),
            "https://api.example.com/auth/login"
        );
        assert_eq!(
            client.url_for("auth/login"),
            "https://api.example.com/auth/login"
        );
        assert_eq!(
            client.url_for("https://other.example.com/v1/x"),
            "https://other.example.com/v1/x"
        );
    }

    #[test]
    fn refresh_url_derived_from_base() {
        let client = client();
        assert_eq!(client.refresh_url, "https://api.example.com/auth/refresh");
    }

    #[test]
    fn refresh_envelope_parsing() {
        let envelope: ApiEnvelope<RefreshData> =
            serde_json::from_str(r#"{"success":true,"data":{"accessToken":"new-token"}}"#).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap().access_token, "new-token");

        let envelope: ApiEnvelope<RefreshData> =
            serde_json::from_str(r#"{"success":false,"data":null}"#).unwrap();
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
    }
}
