use thiserror::Error;

use crate::model::RequestStatus;

/// Top-level error type returned by the pawhome core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A lifecycle move was attempted from a state that forbids it.
    #[error("illegal transition '{attempted}' from state '{from}' on request '{request_id}'")]
    IllegalTransition {
        request_id: String,
        from: RequestStatus,
        attempted: &'static str,
    },

    /// A lifecycle operation referenced an id absent from the store.
    #[error("entity not found: '{entity_id}'")]
    NotFound { entity_id: String },

    /// Validation failed for one or more fields of a filter/sort/page spec.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Invalid input supplied to a core operation.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl CoreError {
    /// Convenience constructor for [`CoreError::InvalidRequest`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}

/// Collection of validation issues encountered while checking a request spec.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Detailed validation failure for a single field or logical path.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Result alias used throughout the core.
pub type CoreResult<T> = Result<T, CoreError>;
