//! Retrying GET executor.
//!
//! # Retry Logic
//!
//! A call makes at most [`MAX_ATTEMPTS`] transport calls (one initial call and
//! [`MAX_RETRIES`] retries). Only connection-class failures are retried, with
//! no delay between attempts:
//! - transport error whose type name contains "connect": warn and retry
//! - any other transport error: fail immediately with `FreshError::Transport`
//! - six connection failures in a row: `FreshError::ConnectionExhausted`
//!
//! HTTP status codes are never retried.

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::FreshError;
use crate::transport::{Credentials, Headers, Transport, TransportError, TransportResponse};

/// Number of retries after the initial attempt.
pub const MAX_RETRIES: u32 = 5;

/// Total number of transport calls a single request may make.
pub const MAX_ATTEMPTS: u32 = MAX_RETRIES + 1;

/// Content type sent with every request unless overridden.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Maximum length for HTTP error response bodies kept in errors.
const MAX_ERROR_BODY_LEN: usize = 500;

/// Returns the headers sent when the caller supplies none.
pub fn default_headers() -> Headers {
    let mut headers = Headers::new();
    headers.insert("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string());
    headers
}

/// Everything needed to issue one GET.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    base_url: String,
    path: String,
    headers: Headers,
    decode_json: bool,
}

impl RequestSpec {
    /// Creates a spec for `base_url + path` with default headers and JSON decoding.
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            headers: default_headers(),
            decode_json: true,
        }
    }

    /// Replaces the header set.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Adds or overrides a single header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns the raw response instead of decoded JSON.
    pub fn raw(mut self) -> Self {
        self.decode_json = false;
        self
    }

    /// The full request URL.
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }

    /// The resource path relative to the base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Headers to send.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Whether the body is decoded as JSON.
    pub fn decode_json(&self) -> bool {
        self.decode_json
    }
}

/// How the retry loop treats a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Connection-level failure; try again.
    Transient,
    /// Anything else; give up now.
    Fatal,
}

/// Classifies a transport failure by its type name.
///
/// A name containing "connect" (any case) is transient. This is the only
/// place the rule lives.
pub fn classify_failure(error: &TransportError) -> FailureClass {
    if error.kind().to_ascii_lowercase().contains("connect") {
        FailureClass::Transient
    } else {
        FailureClass::Fatal
    }
}

/// Progress of a single call through the retry loop.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
    last_error: Option<TransportError>,
}

impl RetryState {
    /// A fresh state with no failed attempts.
    pub fn new() -> Self {
        Self {
            attempt: 0,
            max_attempts: MAX_ATTEMPTS,
            last_error: None,
        }
    }

    /// Number of transient failures recorded so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Upper bound on transport calls.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The most recent transient failure.
    pub fn last_error(&self) -> Option<&TransportError> {
        self.last_error.as_ref()
    }

    /// Returns the state after one more transient failure.
    #[must_use]
    pub fn record_transient(self, error: TransportError) -> Self {
        Self {
            attempt: self.attempt + 1,
            last_error: Some(error),
            ..self
        }
    }

    /// True once every allowed attempt has failed.
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a successful call.
#[derive(Debug, Clone)]
pub enum ApiResponse {
    /// Decoded JSON body.
    Json(Value),
    /// The untouched response.
    Raw(TransportResponse),
}

impl ApiResponse {
    /// Returns the decoded body, if this is a JSON response.
    pub fn into_json(self) -> Option<Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            ApiResponse::Raw(_) => None,
        }
    }

    /// Returns the raw response, if decoding was disabled.
    pub fn into_raw(self) -> Option<TransportResponse> {
        match self {
            ApiResponse::Json(_) => None,
            ApiResponse::Raw(response) => Some(response),
        }
    }
}

/// Executes GET requests through a [`Transport`], retrying connection failures.
#[derive(Debug, Clone)]
pub struct RetryingRequester<T> {
    transport: T,
    credentials: Credentials,
}

impl<T: Transport> RetryingRequester<T> {
    /// Creates a requester that authenticates every call with `credentials`.
    pub fn new(transport: T, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    /// The transport in use.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs the request described by `spec`.
    ///
    /// # Errors
    ///
    /// - `FreshError::Transport` for a non-connection transport failure
    /// - `FreshError::ConnectionExhausted` after six connection failures
    /// - `FreshError::Decode` if JSON decoding is requested and the body is not JSON
    /// - `FreshError::Authentication`, `FreshError::NotFound` or
    ///   `FreshError::HttpStatus` for non-2xx responses when decoding
    pub async fn execute(&self, spec: &RequestSpec) -> Result<ApiResponse, FreshError> {
        if spec.decode_json() {
            self.get_json(spec).await.map(ApiResponse::Json)
        } else {
            self.get_raw(spec).await.map(ApiResponse::Raw)
        }
    }

    /// Runs the request and returns the decoded JSON body, whatever `spec.decode_json()` says.
    pub async fn get_json(&self, spec: &RequestSpec) -> Result<Value, FreshError> {
        let response = self.send_with_retries(spec).await?;
        self.decode(spec, response)
    }

    /// Runs the request and returns the response untouched, whatever its status.
    pub async fn get_raw(&self, spec: &RequestSpec) -> Result<TransportResponse, FreshError> {
        self.send_with_retries(spec).await
    }

    /// Sends the GET until it succeeds, fails fatally, or runs out of attempts.
    async fn send_with_retries(&self, spec: &RequestSpec) -> Result<TransportResponse, FreshError> {
        let url = spec.url();
        let mut state = RetryState::new();

        tracing::debug!(method = "GET", path = %spec.path(), "Making Freshservice API request");

        loop {
            let error = match self
                .transport
                .get(&url, spec.headers(), &self.credentials)
                .await
            {
                Ok(response) => {
                    tracing::debug!(
                        path = %spec.path(),
                        status = %response.status(),
                        failed_attempts = state.attempt(),
                        "Freshservice API responded"
                    );
                    return Ok(response);
                }
                Err(error) => error,
            };

            match classify_failure(&error) {
                FailureClass::Fatal => {
                    tracing::debug!(
                        path = %spec.path(),
                        kind = %error.kind(),
                        "Transport failure is not retryable"
                    );
                    return Err(FreshError::transport(self.sanitize(error)));
                }
                FailureClass::Transient => {
                    tracing::warn!(
                        "The GET request failed with the following exception: {}: {} (Attempt {} of {})",
                        error.kind(),
                        self.sanitize_text(error.message()),
                        state.attempt(),
                        MAX_RETRIES
                    );

                    state = state.record_transient(error);

                    if state.is_exhausted() {
                        tracing::debug!(
                            path = %spec.path(),
                            attempts = state.attempt(),
                            "All retry attempts exhausted"
                        );
                        return Err(FreshError::ConnectionExhausted {
                            attempts: state.attempt(),
                        });
                    }
                }
            }
        }
    }

    /// Decodes a response body, mapping error statuses first.
    fn decode(&self, spec: &RequestSpec, response: TransportResponse) -> Result<Value, FreshError> {
        let status = response.status();

        if !status.is_success() {
            return Err(self.status_error(spec, status, response.text()));
        }

        tracing::trace!(body = %response.text(), "Freshservice API response");

        Ok(response.json()?)
    }

    /// Converts a non-2xx response into an error.
    fn status_error(&self, spec: &RequestSpec, status: StatusCode, body: &str) -> FreshError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FreshError::Authentication,
            StatusCode::NOT_FOUND => FreshError::not_found(spec.path()),
            _ => {
                let body = self.sanitize_text(body);
                let body = if body.chars().count() > MAX_ERROR_BODY_LEN {
                    let truncated: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
                    format!("{}...[truncated]", truncated)
                } else {
                    body
                };
                tracing::warn!(status = %status, path = %spec.path(), "Freshservice API returned an error status");
                FreshError::HttpStatus { status, body }
            }
        }
    }

    fn sanitize_text(&self, text: &str) -> String {
        FreshError::sanitize_message(text, self.credentials.username())
    }

    fn sanitize(&self, error: TransportError) -> TransportError {
        let message = self.sanitize_text(error.message());
        TransportError::new(error.kind(), message)
    }
}
