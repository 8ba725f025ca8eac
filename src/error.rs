//! Application error types.
//!
//! These errors are serializable so a host UI can render them directly, and
//! they carry enough context to be folded into the `ApiResult` envelope.

use serde::Serialize;
use thiserror::Error;

/// Status code reported for failures that never produced an HTTP response.
pub const NO_STATUS: i32 = -1;

/// Application-level errors.
///
/// All variants serialize to a structured JSON object for frontend consumption.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// GitLab API request was rejected by the server.
    #[error("GitLab API error: {message}")]
    GitLabApi {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },

    /// Network request failed before a response arrived (DNS, TLS, refused).
    #[error("Network error: {message}")]
    Network { message: String },

    /// Invalid input provided; no request was made.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// A bounded operation did not finish in time.
    #[error("Timed out: {message}")]
    Timeout { message: String },

    /// Operation was cancelled by the caller.
    #[error("Cancelled")]
    Cancelled,

    /// Reading or writing persisted configuration failed.
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Internal application error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a GitLab API error.
    pub fn gitlab_api(message: impl Into<String>) -> Self {
        Self::GitLabApi {
            message: message.into(),
            status_code: None,
            endpoint: None,
        }
    }

    /// Create a GitLab API error with status code and endpoint.
    pub fn gitlab_api_full(
        message: impl Into<String>,
        status_code: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::GitLabApi {
            message: message.into(),
            status_code: Some(status_code),
            endpoint: Some(endpoint.into()),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field name.
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The message without the category prefix used by `Display`.
    ///
    /// This is the text that ends up in `ApiResult::error`.
    pub fn message(&self) -> String {
        match self {
            Self::GitLabApi { message, .. }
            | Self::Network { message }
            | Self::InvalidInput { message, .. }
            | Self::Timeout { message }
            | Self::Persistence { message }
            | Self::Internal { message } => message.clone(),
            Self::Cancelled => "Cancelled".to_string(),
        }
    }

    /// HTTP status of a remote rejection, or `NO_STATUS` for local failures.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::GitLabApi {
                status_code: Some(code),
                ..
            } => i32::from(*code),
            _ => NO_STATUS,
        }
    }

    /// Check if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let cause = if err.is_timeout() {
            "Request timed out".to_string()
        } else if err.is_connect() {
            "Failed to connect to server".to_string()
        } else {
            err.to_string()
        };
        Self::network(transport_guidance(&cause))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("Invalid JSON: {}", err))
    }
}

/// Build the message shown when a request never reached the server.
pub fn transport_guidance(cause: &str) -> String {
    format!(
        "Connection failed: {}\n\
         Please check:\n\
         1. Server URL is correct\n\
         2. Access Token is valid and has 'api' scope\n\
         3. Network connection is working\n\
         4. SSL certificate is trusted (for self-hosted GitLab)",
        cause
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gitlab_api_error_full() {
        let err = AppError::gitlab_api_full("Not Found", 404, "/projects/1/merge_requests");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"type\":\"GitLabApi\""));
        assert!(json.contains("\"status_code\":404"));
        assert!(json.contains("/projects/1/merge_requests"));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_optional_fields_not_serialized() {
        let err = AppError::invalid_input("title is required");
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("field"));
    }

    #[test]
    fn test_local_errors_have_no_status() {
        assert_eq!(AppError::network("down").status_code(), NO_STATUS);
        assert_eq!(AppError::invalid_input("bad").status_code(), NO_STATUS);
        assert_eq!(AppError::timeout("slow").status_code(), NO_STATUS);
        assert_eq!(AppError::gitlab_api("no code").status_code(), NO_STATUS);
    }

    #[test]
    fn test_message_strips_category() {
        let err = AppError::gitlab_api_full("403 Forbidden", 403, "/user");
        assert_eq!(err.message(), "403 Forbidden");
        assert_eq!(err.to_string(), "GitLab API error: 403 Forbidden");
    }

    #[test]
    fn test_transport_guidance_mentions_checks() {
        let text = transport_guidance("dns failure");
        assert!(text.contains("dns failure"));
        assert!(text.contains("Server URL"));
        assert!(text.contains("'api' scope"));
        assert!(text.contains("Network connection"));
        assert!(text.contains("SSL certificate"));
    }
}
