//! JSON REST client for Worklane business entities.
//!
//! All non-realtime data (conversations, messages, projects, quotes,
//! payments, notifications) goes through this generic verb surface. The
//! realtime transport never calls it.

use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::{retry_async, RetryPolicy};

const ERROR_BODY_SNIPPET_LEN: usize = 220;
/// Production REST base URL.
pub const API_BASE_URL: &str = "https://api.worklane.io/v1";
/// Local development REST base URL.
pub const LOCAL_API_BASE_URL: &str = "http://localhost:8080/v1";
/// Environment variable overriding the REST base URL.
pub const API_BASE_URL_ENV: &str = "WORKLANE_API_URL";

/// Timeout and retry settings for [`ApiClient`].
#[derive(Clone, Debug)]
pub struct ApiClientOptions {
    pub connect_timeout: Duration,
    pub attempt_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(10),
            retry_policy: RetryPolicy::api_default(),
        }
    }
}

/// Generic JSON client over the Worklane REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    token: Option<SecretString>,
    base_url: String,
    attempt_timeout: Duration,
    retry_policy: RetryPolicy,
}

impl ApiClient {
    /// Unauthenticated client against the production base URL.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_options(None, ApiClientOptions::default())
    }

    /// Authenticated client against the production base URL.
    pub fn with_token(token: SecretString) -> Result<Self, ApiError> {
        Self::with_options(Some(token), ApiClientOptions::default())
    }

    pub fn with_options(
        token: Option<SecretString>,
        options: ApiClientOptions,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .no_proxy()
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            http,
            token,
            base_url: API_BASE_URL.to_string(),
            attempt_timeout: options.attempt_timeout,
            retry_policy: options.retry_policy,
        })
    }

    /// Client configured from `WORKLANE_API_URL` and `WORKLANE_API_TOKEN`.
    pub fn from_env() -> Result<Self, ApiError> {
        let token = std::env::var("WORKLANE_API_TOKEN").ok().map(SecretString::new);
        let mut client = Self::with_options(token, ApiClientOptions::default())?;
        if let Ok(base_url) = std::env::var(API_BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                client = client.with_base_url(base_url);
            }
        }
        Ok(client)
    }

    /// Sets an explicit base URL, overriding the production default.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a resource. Retried per the configured policy.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None::<&()>, true).await
    }

    /// POST a resource. Not retried; creation is not idempotent.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body), false).await
    }

    /// PUT a resource. Retried per the configured policy.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, Some(body), true).await
    }

    /// PATCH a resource. Not retried.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PATCH, path, Some(body), false).await
    }

    /// DELETE a resource. Retried per the configured policy; the response
    /// body, if any, is discarded.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let _ = self
            .execute_with_retry(Method::DELETE, path, None::<&()>, true)
            .await?;
        Ok(())
    }

    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        idempotent: bool,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let raw = self.execute_with_retry(method, path, body, idempotent).await?;
        serde_json::from_str(&raw).map_err(|err| ApiError::Parse(err.to_string()))
    }

    async fn execute_with_retry<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        idempotent: bool,
    ) -> Result<String, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let endpoint = format!("{}{}", self.base_url, path);

        if !idempotent {
            return self.send_attempt(method, &endpoint, body).await;
        }

        let policy = self.retry_policy.clone();
        retry_async(
            &policy,
            |_| {
                let method = method.clone();
                let endpoint = endpoint.clone();
                async move { self.send_attempt(method, &endpoint, body).await }
            },
            ApiError::is_retryable,
        )
        .await
    }

    async fn send_attempt<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<String, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut builder = self
            .http
            .request(method, endpoint)
            .timeout(self.attempt_timeout);

        if let Some(token) = self.token.as_ref() {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            );
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ApiError::Transport)?;
        let status = response.status();
        let text = response.text().await.map_err(ApiError::Transport)?;

        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                status,
                body: summarize_error_body(&text),
            });
        }

        Ok(text)
    }
}

/// Errors produced by the REST client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS, or timeout failure before a response arrived.
    #[error("request failed: {0}")]
    Transport(reqwest::Error),

    /// Non-success HTTP status with a summarized body.
    #[error("http status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    /// Response body did not decode as the expected JSON shape.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_timeout() || err.is_connect(),
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Parse(_) => false,
        }
    }
}

fn summarize_error_body(body: &str) -> String {
    #[derive(Debug, Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.error.or(parsed.message) {
            return message;
        }
    }

    body.chars().take(ERROR_BODY_SNIPPET_LEN).collect()
}
