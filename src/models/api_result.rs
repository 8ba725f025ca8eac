//! Uniform result envelope returned by every API client operation.

use crate::error::{AppError, NO_STATUS};
use serde::Serialize;

/// Outcome of an API client operation.
///
/// Invariant: `success == data.is_some() == error.is_none()`. The fields are
/// private so the invariant holds by construction; use [`ApiResult::ok`] and
/// [`ApiResult::failure`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult<T> {
    data: Option<T>,
    success: bool,
    error: Option<String>,
    status_code: i32,
}

impl<T> ApiResult<T> {
    /// A successful result carrying `data`.
    pub fn ok(data: T, status_code: i32) -> Self {
        Self {
            data: Some(data),
            success: true,
            error: None,
            status_code,
        }
    }

    /// A failed result carrying an error message.
    pub fn failure(error: impl Into<String>, status_code: i32) -> Self {
        Self {
            data: None,
            success: false,
            error: Some(error.into()),
            status_code,
        }
    }

    /// A failure that happened before any network call.
    pub fn local_failure(error: impl Into<String>) -> Self {
        Self::failure(error, NO_STATUS)
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// HTTP status of the final response, or `-1` if none was received.
    pub fn status_code(&self) -> i32 {
        self.status_code
    }

    /// Take the payload out, discarding error details.
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Transform the payload, keeping status and error untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        ApiResult {
            data: self.data.map(f),
            success: self.success,
            error: self.error,
            status_code: self.status_code,
        }
    }

    /// Convert into a `Result`, rebuilding an [`AppError`] from the envelope.
    pub fn into_result(self) -> Result<T, AppError> {
        match self.data {
            Some(data) => Ok(data),
            None => {
                let message = self.error.unwrap_or_else(|| "Unknown error".to_string());
                match u16::try_from(self.status_code) {
                    Ok(code) => Err(AppError::GitLabApi {
                        message,
                        status_code: Some(code),
                        endpoint: None,
                    }),
                    Err(_) => Err(AppError::network(message)),
                }
            }
        }
    }
}

impl<T> From<Result<(T, u16), AppError>> for ApiResult<T> {
    fn from(result: Result<(T, u16), AppError>) -> Self {
        match result {
            Ok((data, status)) => Self::ok(data, i32::from(status)),
            Err(err) => Self::failure(err.message(), err.status_code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_invariant() {
        let result = ApiResult::ok(5, 200);
        assert!(result.success());
        assert_eq!(result.data(), Some(&5));
        assert!(result.error().is_none());
        assert_eq!(result.status_code(), 200);
    }

    #[test]
    fn test_failure_invariant() {
        let result: ApiResult<i32> = ApiResult::failure("boom", 500);
        assert!(!result.success());
        assert!(result.data().is_none());
        assert_eq!(result.error(), Some("boom"));
    }

    #[test]
    fn test_from_app_error() {
        let err: Result<(i32, u16), AppError> =
            Err(AppError::gitlab_api_full("404 Project Not Found", 404, "/projects/x"));
        let result = ApiResult::from(err);
        assert_eq!(result.error(), Some("404 Project Not Found"));
        assert_eq!(result.status_code(), 404);

        let local: Result<(i32, u16), AppError> = Err(AppError::invalid_input("no path"));
        let result = ApiResult::from(local);
        assert_eq!(result.status_code(), -1);
    }

    #[test]
    fn test_into_result_round_trip() {
        let failed: ApiResult<()> = ApiResult::failure("denied", 403);
        let err = failed.into_result().unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.message(), "denied");

        let local: ApiResult<()> = ApiResult::local_failure("offline");
        assert!(matches!(local.into_result(), Err(AppError::Network { .. })));
    }

    #[test]
    fn test_map_keeps_status() {
        let result = ApiResult::ok(2, 201).map(|n| n * 10);
        assert_eq!(result.data(), Some(&20));
        assert_eq!(result.status_code(), 201);
    }
}
