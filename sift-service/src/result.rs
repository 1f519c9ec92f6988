//! Service-layer result envelope
//!
//! [`ServiceResult`] is what service operations hand back to transport code:
//! either a value plus a status hint, or a classified [`Error`]. The hint
//! maps one-to-one onto an HTTP status but stays transport-neutral, so the
//! same envelope serves handlers, background jobs, and tests.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::Serialize;

use crate::error::Error;

/// Transport-neutral status classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusHint {
    /// Operation succeeded (200)
    Ok,
    /// A new record was created (201)
    Created,
    /// Operation succeeded with nothing to return (204)
    NoContent,
    /// The request itself was malformed (400)
    BadRequest,
    /// The target record does not exist (404)
    NotFound,
    /// A mutation failed an existence precondition (409)
    Conflict,
    /// Query clauses failed validation (422)
    Unprocessable,
    /// Unexpected failure (500)
    Internal,
}

impl StatusHint {
    /// The HTTP status this hint maps onto
    #[must_use]
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::Ok => StatusCode::OK,
            Self::Created => StatusCode::CREATED,
            Self::NoContent => StatusCode::NO_CONTENT,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Outcome of one service operation
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceResult<T> {
    /// The operation produced a value
    Success {
        /// The operation's result
        value: T,
        /// Status classification for transport code
        status: StatusHint,
    },
    /// The operation failed with a classified error
    Failure {
        /// The classified error
        error: Error,
    },
}

impl<T> ServiceResult<T> {
    /// A plain success (status [`StatusHint::Ok`])
    #[must_use]
    pub fn success(value: T) -> Self {
        Self::Success {
            value,
            status: StatusHint::Ok,
        }
    }

    /// A success with an explicit status hint, e.g. [`StatusHint::Created`]
    #[must_use]
    pub fn success_with(value: T, status: StatusHint) -> Self {
        Self::Success { value, status }
    }

    /// A failure carrying a classified error
    #[must_use]
    pub fn failure(error: Error) -> Self {
        Self::Failure { error }
    }

    /// Whether the operation succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Status classification of this outcome
    ///
    /// For failures the hint is derived from the error variant.
    #[must_use]
    pub fn status(&self) -> StatusHint {
        match self {
            Self::Success { status, .. } => *status,
            Self::Failure { error } => match error {
                Error::Validation(_) => StatusHint::Unprocessable,
                Error::NotFound(_) => StatusHint::NotFound,
                Error::Conflict(_) => StatusHint::Conflict,
                Error::Storage(_) | Error::Config(_) | Error::Internal(_) => StatusHint::Internal,
            },
        }
    }

    /// The value, when the operation succeeded
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value, .. } => Some(value),
            Self::Failure { .. } => None,
        }
    }

    /// The error, when the operation failed
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }

    /// Convert into a plain `Result`, discarding the status hint
    pub fn into_result(self) -> crate::error::Result<T> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Failure { error } => Err(error),
        }
    }
}

impl<T> From<crate::error::Result<T>> for ServiceResult<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(error) => Self::failure(error),
        }
    }
}

impl<T: Serialize> IntoResponse for ServiceResult<T> {
    fn into_response(self) -> Response {
        match self {
            Self::Success { value, status } => {
                (status.status_code(), Json(value)).into_response()
            }
            Self::Failure { error } => error.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_defaults_to_ok() {
        let result = ServiceResult::success(7);
        assert!(result.is_success());
        assert_eq!(result.status(), StatusHint::Ok);
        assert_eq!(result.value(), Some(&7));
        assert!(result.error().is_none());
    }

    #[test]
    fn test_success_with_created_hint() {
        let result = ServiceResult::success_with("row", StatusHint::Created);
        assert_eq!(result.status(), StatusHint::Created);
        assert_eq!(result.status().status_code(), StatusCode::CREATED);
    }

    #[test]
    fn test_failure_status_follows_error_variant() {
        let not_found = ServiceResult::<()>::failure(Error::NotFound("Student 9".into()));
        assert_eq!(not_found.status(), StatusHint::NotFound);

        let invalid = ServiceResult::<()>::failure(Error::validation("x==", "bad"));
        assert_eq!(invalid.status(), StatusHint::Unprocessable);

        let internal = ServiceResult::<()>::failure(Error::Internal("detail".into()));
        assert_eq!(internal.status(), StatusHint::Internal);
    }

    #[test]
    fn test_round_trip_with_result() {
        let ok: ServiceResult<i32> = Ok(3).into();
        assert_eq!(ok.into_result().unwrap(), 3);

        let err: ServiceResult<i32> = Err(Error::Conflict("dup".into())).into();
        assert!(err.into_result().is_err());
    }

    #[test]
    fn test_into_response_statuses() {
        let resp = ServiceResult::success(serde_json::json!({"id": 1})).into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = ServiceResult::<serde_json::Value>::failure(Error::NotFound("gone".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
