//! Error types and HTTP response conversion

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Structured Storage Errors
// ============================================================================

/// Storage operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOperation {
    /// Finding a single entity by ID
    FindById,
    /// Reading the full sequence for an entity type
    FindAll,
    /// Counting entities
    Count,
    /// Checking if an entity exists
    Exists,
    /// Staging a new entity
    Add,
    /// Staging an update to an existing entity
    Update,
    /// Staging a delete
    Delete,
    /// Committing staged mutations
    Save,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindById => write!(f, "find_by_id"),
            Self::FindAll => write!(f, "find_all"),
            Self::Count => write!(f, "count"),
            Self::Exists => write!(f, "exists"),
            Self::Add => write!(f, "add"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Save => write!(f, "save"),
        }
    }
}

/// Structured storage error with operation context
///
/// # Example
///
/// ```rust
/// use sift_service::error::{StorageError, StorageOperation};
///
/// let error = StorageError::new(StorageOperation::Save, "commit interrupted")
///     .with_entity("Student", "7");
/// assert!(format!("{}", error).contains("[Student: 7]"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    /// The operation being performed when the error occurred
    pub operation: StorageOperation,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Student")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
}

impl StorageError {
    /// Create a new storage error
    pub fn new(operation: StorageOperation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Storage error during {}: {}", self.operation, self.message)?;
        if let (Some(ref entity_type), Some(ref entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {}

// ============================================================================
// Validation Failures
// ============================================================================

/// One rejected query clause with the reason it was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseIssue {
    /// The offending clause as it appeared in the request
    pub clause: String,
    /// Why the clause was rejected
    pub reason: String,
}

impl ClauseIssue {
    /// Create a new clause issue
    pub fn new(clause: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            clause: clause.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ClauseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`: {}", self.clause, self.reason)
    }
}

/// A validation failure enumerating every offending clause
///
/// Resolution reports all problems at once rather than stopping at the first,
/// so a caller can fix the whole request in one round trip.
///
/// # Example
///
/// ```rust
/// use sift_service::error::{ClauseIssue, ValidationFailure};
///
/// let mut failure = ValidationFailure::new();
/// failure.push(ClauseIssue::new("xyz==1", "unknown property `xyz`"));
/// assert_eq!(failure.issues.len(), 1);
/// assert!(failure.has_issues());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// All rejected clauses, in request order
    pub issues: Vec<ClauseIssue>,
}

impl ValidationFailure {
    /// Create an empty failure to accumulate issues into
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one rejected clause
    pub fn push(&mut self, issue: ClauseIssue) {
        self.issues.push(issue);
    }

    /// Whether any clause was rejected
    #[must_use]
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid clause(s): ", self.issues.len())?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Crate Error
// ============================================================================

/// Error taxonomy for every core operation
///
/// Deliberate errors ([`Error::Validation`], [`Error::NotFound`],
/// [`Error::Conflict`]) carry messages naming the offending input.
/// Unexpected collaborator failures are caught at the service boundary,
/// logged with a correlation id, and surfaced as [`Error::Internal`] with a
/// generic message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Malformed or rejected query input (422)
    #[error("Validation error: {0}")]
    Validation(ValidationFailure),

    /// Operation targets an identity absent from storage (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Mutation failed an existence precondition (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Underlying storage call failed (500)
    #[error("{0}")]
    Storage(StorageError),

    /// Startup configuration error, e.g. a repository type with no
    /// registered factory or a custom method name that was never registered
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything unanticipated (500); message never leaks internal detail
    #[error("Internal server error")]
    Internal(String),
}

impl Error {
    /// Shorthand for a single-issue validation error
    pub fn validation(clause: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut failure = ValidationFailure::new();
        failure.push(ClauseIssue::new(clause, reason));
        Self::Validation(failure)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ValidationFailure> for Error {
    fn from(f: ValidationFailure) -> Self {
        Self::Validation(f)
    }
}

// ============================================================================
// HTTP response conversion
// ============================================================================

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Optional error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// HTTP status code
    pub status: u16,

    /// Per-clause validation issues, when applicable
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub issues: Vec<ClauseIssue>,
}

impl ErrorResponse {
    /// Create error response with a code
    pub fn with_code(
        status: StatusCode,
        code: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
            status: status.as_u16(),
            issues: Vec::new(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Error::Validation(failure) => {
                let mut body = ErrorResponse::with_code(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "VALIDATION_ERROR",
                    failure.to_string(),
                );
                body.issues = failure.issues;
                (StatusCode::UNPROCESSABLE_ENTITY, body)
            }

            Error::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::with_code(StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ),

            Error::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse::with_code(StatusCode::CONFLICT, "CONFLICT", msg),
            ),

            Error::Storage(ref e) => {
                tracing::error!(operation = %e.operation, "Storage error: {}", e.message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_code(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "STORAGE_ERROR",
                        "Storage operation failed",
                    ),
                )
            }

            Error::Config(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::with_code(StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", e),
            ),

            Error::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_code(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "Internal server error",
                    ),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_operation_display() {
        assert_eq!(format!("{}", StorageOperation::FindById), "find_by_id");
        assert_eq!(format!("{}", StorageOperation::Save), "save");
        assert_eq!(format!("{}", StorageOperation::Delete), "delete");
    }

    #[test]
    fn test_storage_error_display_with_entity() {
        let error = StorageError::new(StorageOperation::Update, "row vanished")
            .with_entity("Student", "12");
        let display = format!("{}", error);
        assert!(display.contains("update"));
        assert!(display.contains("row vanished"));
        assert!(display.contains("[Student: 12]"));
    }

    #[test]
    fn test_validation_failure_accumulates() {
        let mut failure = ValidationFailure::new();
        assert!(!failure.has_issues());
        failure.push(ClauseIssue::new("a==x", "bad"));
        failure.push(ClauseIssue::new("b==y", "worse"));
        assert_eq!(failure.issues.len(), 2);
        let display = format!("{}", failure);
        assert!(display.contains("2 invalid clause(s)"));
        assert!(display.contains("a==x"));
        assert!(display.contains("b==y"));
    }

    #[test]
    fn test_error_validation_shorthand() {
        let error = Error::validation("xyz==1", "unknown property `xyz`");
        match error {
            Error::Validation(f) => {
                assert_eq!(f.issues.len(), 1);
                assert_eq!(f.issues[0].clause, "xyz==1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_into_response_status_codes() {
        let resp = Error::validation("x", "y").into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = Error::NotFound("Student 9".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = Error::Conflict("already exists".into()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = Error::Internal("boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = Error::Config("no factory".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_error_message_is_generic() {
        let error = Error::Internal("stack trace and secrets".into());
        assert_eq!(error.to_string(), "Internal server error");
    }
}
