//! Error types for the Fresco client and MCP server.
//!
//! This module defines `FreshError`, the unified error type used throughout
//! the crate. Validation errors are raised before any network call is made;
//! transport errors carry the failing error's type name so they can be
//! classified by the retry loop.
//!
//! # Security
//!
//! The API key travels as a basic-auth username and can end up in transport
//! error text. Use `sanitized_display()` before showing an error to a user.

use reqwest::StatusCode;
use thiserror::Error;

use crate::transport::TransportError;

/// Unified error type for all Fresco operations.
#[derive(Error, Debug)]
pub enum FreshError {
    /// Configuration error - missing or invalid environment variables.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// A transport call failed with a non-connection error and was not retried.
    #[error("the GET request failed with {kind}: {message}")]
    Transport {
        /// Type name of the underlying transport error.
        kind: String,
        /// Message of the underlying transport error.
        message: String,
    },

    /// Every attempt failed with a connection error.
    #[error(
        "the API query could not be completed after {attempts} attempts due to connection \
         aborts and/or timeouts - retry the operation or contact support if the problem persists"
    )]
    ConnectionExhausted {
        /// Number of transport calls made before giving up.
        attempts: u32,
    },

    /// HTTP response returned a non-success status code.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code returned.
        status: StatusCode,
        /// The response body, potentially containing error details.
        body: String,
    },

    /// Authentication failed - likely an invalid API key.
    #[error("authentication failed - check FRESHSERVICE_API_KEY")]
    Authentication,

    /// The response body was not valid JSON.
    #[error("failed to decode JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Requested resource was not found (404 or an empty lookup result).
    #[error("not found: {resource}")]
    NotFound {
        /// Description of the resource that was looked up.
        resource: String,
    },

    /// A predefined ticket filter outside the supported set was supplied.
    #[error("the provided filter '{value}' is not a valid predefined filter")]
    InvalidPredefinedFilter {
        /// The rejected filter name.
        value: String,
    },

    /// A filter logic operator other than AND/OR was supplied.
    #[error("the filter logic operator '{value}' is invalid")]
    InvalidFilterLogic {
        /// The rejected operator.
        value: String,
    },

    /// A lookup value was neither an email address nor a numeric ID.
    #[error("the field '{value}' is invalid")]
    InvalidField {
        /// The rejected lookup value.
        value: String,
    },

    /// Mutually exclusive filter flags were combined.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Input validation failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Connection test failed.
    #[error("connection test failed: {message}")]
    ConnectionTest {
        /// Details about why the connection test failed.
        message: String,
    },
}

impl FreshError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        FreshError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        FreshError::Config(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        FreshError::Validation(message.into())
    }

    /// Creates a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        FreshError::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a connection test error.
    pub fn connection_test(message: impl Into<String>) -> Self {
        FreshError::ConnectionTest {
            message: message.into(),
        }
    }

    /// Wraps a transport error that will not be retried.
    pub fn transport(error: TransportError) -> Self {
        let (kind, message) = error.into_parts();
        FreshError::Transport { kind, message }
    }

    /// Returns true if the caller may retry the operation later.
    ///
    /// Only exhausted connection retries qualify. Status, validation and
    /// decode errors will fail the same way again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, FreshError::ConnectionExhausted { .. })
    }

    /// Returns true for errors raised from caller input before any request was sent.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FreshError::InvalidPredefinedFilter { .. }
                | FreshError::InvalidFilterLogic { .. }
                | FreshError::InvalidField { .. }
                | FreshError::InvalidFilter(_)
                | FreshError::Validation(_)
        )
    }

    /// Replaces any occurrence of the API key in `message` with `[REDACTED]`.
    #[must_use]
    pub fn sanitize_message(message: &str, api_key: &str) -> String {
        if api_key.is_empty() {
            return message.to_string();
        }
        message.replace(api_key, "[REDACTED]")
    }

    /// Creates a sanitized version of this error's display message.
    #[must_use]
    pub fn sanitized_display(&self, api_key: &str) -> String {
        Self::sanitize_message(&self.to_string(), api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_error() {
        let err = FreshError::missing_env("FRESHSERVICE_API_KEY");
        assert!(err.to_string().contains("FRESHSERVICE_API_KEY"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_not_found_error() {
        let err = FreshError::not_found("agent with email a@b.com");
        assert_eq!(err.to_string(), "not found: agent with email a@b.com");
    }

    #[test]
    fn test_transport_error_keeps_kind_and_message() {
        let err = FreshError::transport(TransportError::new("RedirectError", "too many redirects"));
        assert!(matches!(
            &err,
            FreshError::Transport { kind, message }
                if kind == "RedirectError" && message == "too many redirects"
        ));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_exhaustion_message_suggests_remediation() {
        let err = FreshError::ConnectionExhausted { attempts: 6 };
        let msg = err.to_string();
        assert!(msg.contains("6 attempts"));
        assert!(msg.contains("retry the operation or contact support"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_invalid_predefined_filter_names_value() {
        let err = FreshError::InvalidPredefinedFilter {
            value: "mine".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "the provided filter 'mine' is not a valid predefined filter"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_invalid_filter_logic_names_value() {
        let err = FreshError::InvalidFilterLogic {
            value: "XOR".to_string(),
        };
        assert!(err.to_string().contains("'XOR'"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_not_found_is_not_validation() {
        assert!(!FreshError::not_found("ticket 1").is_validation());
        assert!(!FreshError::Authentication.is_validation());
    }

    #[test]
    fn test_sanitize_message_removes_api_key() {
        let api_key = "super_secret_key_12345";
        let message = format!("error sending request for url (https://{}:X@x.io)", api_key);
        let sanitized = FreshError::sanitize_message(&message, api_key);
        assert!(!sanitized.contains(api_key));
        assert!(sanitized.contains("[REDACTED]"));
    }

    #[test]
    fn test_sanitize_message_empty_key() {
        let message = "Some error message";
        assert_eq!(FreshError::sanitize_message(message, ""), message);
    }

    #[test]
    fn test_sanitized_display() {
        let err = FreshError::Transport {
            kind: "RequestError".to_string(),
            message: "bad key abc123".to_string(),
        };
        let shown = err.sanitized_display("abc123");
        assert_eq!(shown, "the GET request failed with RequestError: bad key [REDACTED]");
    }
}
