//! HTTP transport used by the retrying requester.
//!
//! The requester never talks to `reqwest` directly. It calls a [`Transport`],
//! which performs exactly one GET and reports failures as a [`TransportError`]
//! with an inspectable type name. Tests swap in scripted transports; the
//! binary uses [`ReqwestTransport`].

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::FreshError;

/// Request or response headers, ordered by name.
pub type Headers = BTreeMap<String, String>;

/// Password sent alongside the API key; Freshservice ignores its value.
pub const AUTH_PLACEHOLDER: &str = "X";

/// Basic-auth credentials for the Freshservice API.
///
/// The API key is the username and [`AUTH_PLACEHOLDER`] the password.
#[derive(Clone)]
pub struct Credentials {
    /// SECURITY: Never log this value!
    api_key: String,
}

impl Credentials {
    /// Creates credentials for the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// The basic-auth username (the API key).
    pub fn username(&self) -> &str {
        &self.api_key
    }

    /// The basic-auth password.
    pub fn password(&self) -> &str {
        AUTH_PLACEHOLDER
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// A failed transport call.
///
/// `kind` names the failure the way an exception type would
/// (`ConnectError`, `TimeoutError`, ...). The retry loop classifies on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    kind: String,
    message: String,
}

impl TransportError {
    /// Creates a transport error with a type name and message.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// The type name of the failure.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Splits the error into its type name and message.
    pub fn into_parts(self) -> (String, String) {
        (self.kind, self.message)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        TransportError::new(reqwest_error_kind(&error), error.to_string())
    }
}

/// Names a reqwest failure. Connect timeouts report as `ConnectError`, and a
/// connection the server dropped before answering as `ConnectionAbortedError`.
fn reqwest_error_kind(error: &reqwest::Error) -> &'static str {
    if error.is_connect() {
        "ConnectError"
    } else if is_connection_abort(error) {
        "ConnectionAbortedError"
    } else if error.is_timeout() {
        "TimeoutError"
    } else if error.is_redirect() {
        "RedirectError"
    } else if error.is_builder() {
        "BuilderError"
    } else if error.is_body() || error.is_decode() {
        "BodyError"
    } else {
        "RequestError"
    }
}

/// True when the error chain shows the peer closed or reset the connection.
fn is_connection_abort(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);

    while let Some(err) = source {
        if let Some(hyper_err) = err.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() {
                return true;
            }
        }
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = err.source();
    }

    false
}

/// A completed HTTP response, whatever its status.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    status: StatusCode,
    headers: Headers,
    body: String,
}

impl TransportResponse {
    /// Creates a response with the given status and body and no headers.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Adds a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// All response headers (names are lower-case when produced by reqwest).
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Looks up a header by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The raw response body.
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Capability to perform a single authenticated GET.
///
/// Implementations must not retry; retrying is the requester's job.
pub trait Transport: Send + Sync {
    /// Sends a GET to `url` with the given headers and basic-auth credentials.
    fn get(
        &self,
        url: &str,
        headers: &Headers,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// The underlying HTTP client (cloning is cheap).
    http: Client,
}

impl ReqwestTransport {
    /// Builds a transport with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `FreshError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(timeout: Duration, verify_ssl: bool) -> Result<Self, FreshError> {
        let http = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_ssl)
            .build()
            .map_err(FreshError::HttpClient)?;

        if !verify_ssl {
            tracing::warn!("TLS certificate verification is disabled");
        }

        Ok(Self { http })
    }
}

impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        headers: &Headers,
        credentials: &Credentials,
    ) -> Result<TransportResponse, TransportError> {
        let mut req = self
            .http
            .get(url)
            .basic_auth(credentials.username(), Some(credentials.password()));

        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let response = req.send().await?;
        let status = response.status();

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
