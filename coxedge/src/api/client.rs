use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::common::{ApiErrorDetails, ApiErrorResponse, ApiResponse};
use super::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://portal.coxedge.com/api/v1";
pub const API_KEY_HEADER: &str = "MC-Api-Key";

/// Cox Edge API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry_config: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl RetryConfig {
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(
            self.initial_backoff_ms
                .saturating_mul(factor)
                .min(self.max_backoff_ms),
        )
    }
}

/// Connection pool settings for the shared HTTP transport
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_idle_connections: usize,
    pub idle_timeout: Duration,
    pub connection_timeout: Duration,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_connections: 10,
            idle_timeout: Duration::from_secs(90),
            connection_timeout: Duration::from_secs(10),
            tcp_keepalive: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Clone, Copy)]
enum Envelope {
    /// `{"data": T}`, falling back to a bare `T`
    Wrapped,
    Raw,
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(base_url: &str, api_key: &str, insecure: bool) -> Result<Self, ApiError> {
        Self::with_config(base_url, api_key, insecure, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        base_url: &str,
        api_key: &str,
        insecure: bool,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let http_client = build_http_client(&PoolConfig::default(), &retry_config, insecure)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key: api_key.to_string(),
                retry_config,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.inner.retry_config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let max_retries = self.inner.retry_config.max_retries;
        self.get_with_envelope(path, Envelope::Wrapped, max_retries).await
    }

    /// Execute a GET request and expect no data wrapper
    pub async fn get_raw<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let max_retries = self.inner.retry_config.max_retries;
        self.get_with_envelope(path, Envelope::Raw, max_retries).await
    }

    /// Single GET attempt, no data wrapper. For callers that run their own
    /// retry loop.
    pub async fn get_raw_once<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get_with_envelope(path, Envelope::Raw, 0).await
    }

    async fn get_with_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
        envelope: Envelope,
        max_retries: u32,
    ) -> Result<T, ApiError> {
        let text = self
            .execute(
                || async {
                    let url = self.url(path);
                    tracing::debug!("GET request to: {}", url);

                    self.inner
                        .http_client
                        .get(&url)
                        .header(API_KEY_HEADER, &self.inner.api_key)
                        .send()
                        .await
                },
                path,
                max_retries,
            )
            .await?;

        decode(&text, envelope)
    }

    /// Execute a POST request. Mutations are sent exactly once.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let text = self.send_once(Method::POST, path, Some(body)).await?;
        decode(&text, Envelope::Wrapped)
    }

    /// Execute a PUT request. Mutations are sent exactly once.
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let text = self.send_once(Method::PUT, path, Some(body)).await?;
        decode(&text, Envelope::Wrapped)
    }

    /// Execute a DELETE request. Mutations are sent exactly once.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.send_once::<()>(Method::DELETE, path, None).await?;
        decode(&text, Envelope::Wrapped)
    }

    /// Send a mutating request once and return the undecoded response body.
    pub(crate) async fn send_once<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        self.execute(
            || async {
                let url = self.url(path);
                tracing::debug!("{} request to: {}", method, url);

                let request = self
                    .inner
                    .http_client
                    .request(method.clone(), &url)
                    .header(API_KEY_HEADER, &self.inner.api_key);
                match body {
                    Some(body) => request.json(body).send().await,
                    None => request.send().await,
                }
            },
            path,
            0,
        )
        .await
    }

    /// Send a request, retrying transient failures up to `max_retries` times,
    /// and return the body of the first successful response.
    async fn execute<F, Fut>(
        &self,
        request_fn: F,
        path: &str,
        max_retries: u32,
    ) -> Result<String, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= max_retries {
            if attempt > 0 {
                let backoff = self.inner.retry_config.backoff(attempt);
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff.as_millis(),
                    attempt
                );
                tokio::time::sleep(backoff).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let text = response.text().await?;
                        tracing::debug!("API response body: {}", text);
                        return Ok(text);
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        return Err(ApiError::AuthError);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(error_from_response(response).await);
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() || e.is_request() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }
}

fn build_http_client(
    pool: &PoolConfig,
    retry_config: &RetryConfig,
    insecure: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .danger_accept_invalid_certs(insecure)
        .timeout(Duration::from_secs(retry_config.timeout_seconds))
        .connect_timeout(pool.connection_timeout)
        .pool_idle_timeout(pool.idle_timeout)
        .pool_max_idle_per_host(pool.max_idle_connections);

    if let Some(keepalive) = pool.tcp_keepalive {
        builder = builder.tcp_keepalive(keepalive);
    }

    builder.build()
}

fn decode<T: DeserializeOwned>(text: &str, envelope: Envelope) -> Result<T, ApiError> {
    if let Envelope::Wrapped = envelope {
        if let Ok(wrapper) = serde_json::from_str::<ApiResponse<T>>(text) {
            return Ok(wrapper.data);
        }
    }

    serde_json::from_str::<T>(text).map_err(|e| {
        tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
        ApiError::ParseError(format!("Failed to parse response: {}", e))
    })
}

async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let details = serde_json::from_str::<ApiErrorResponse>(&text)
        .ok()
        .map(|err_resp| {
            Box::new(ApiErrorDetails {
                errors: err_resp.errors,
                message: err_resp.message,
            })
        });

    ApiError::ApiError {
        status,
        message: text,
        details,
    }
}
