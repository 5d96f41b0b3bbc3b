//! Application error types.
//!
//! Every error carries a stable symbolic [`ErrorCode`] so callers can tell
//! "already merged" from "no candidate" from "not found" without parsing
//! the message text. Errors serialize to a structured JSON object for the
//! HTTP layer.

use serde::Serialize;
use thiserror::Error;

/// Stable symbolic error codes exposed to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TeamExists,
    PrExists,
    PrMerged,
    NotAssigned,
    NoCandidate,
    NotFound,
    InvalidInput,
    StoreFailure,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TeamExists => "TEAM_EXISTS",
            Self::PrExists => "PR_EXISTS",
            Self::PrMerged => "PR_MERGED",
            Self::NotAssigned => "NOT_ASSIGNED",
            Self::NoCandidate => "NO_CANDIDATE",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidInput => "INVALID_INPUT",
            Self::StoreFailure => "STORE_FAILURE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-level errors returned by services and stores.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// Requested team, user or pull request does not exist.
    #[error("Not found: {resource}")]
    NotFound {
        resource: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// A team or pull request with the same identifier already exists.
    #[error("Already exists: {message}")]
    AlreadyExists { code: ErrorCode, message: String },

    /// The operation is not legal in the entity's current lifecycle state.
    #[error("Invalid state: {message}")]
    InvalidState { code: ErrorCode, message: String },

    /// A precondition of the operation does not hold.
    #[error("Precondition failed: {message}")]
    PreconditionFailed { code: ErrorCode, message: String },

    /// Underlying persistence error.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
    },

    /// Invalid input provided.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// Internal application error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Symbolic code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::AlreadyExists { code, .. }
            | Self::InvalidState { code, .. }
            | Self::PreconditionFailed { code, .. } => *code,
            Self::Database { .. } => ErrorCode::StoreFailure,
            Self::InvalidInput { .. } => ErrorCode::InvalidInput,
            Self::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// Create a database error with optional operation context.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: None,
        }
    }

    /// Create a database error with operation context.
    pub fn database_with_op(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: Some(operation.into()),
        }
    }

    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: None,
        }
    }

    /// Create a not found error with ID.
    pub fn not_found_with_id(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    pub fn team_exists(team_name: &str) -> Self {
        Self::AlreadyExists {
            code: ErrorCode::TeamExists,
            message: format!("team {} already exists", team_name),
        }
    }

    pub fn pr_exists(pr_id: &str) -> Self {
        Self::AlreadyExists {
            code: ErrorCode::PrExists,
            message: format!("pull request {} already exists", pr_id),
        }
    }

    pub fn pr_merged(pr_id: &str) -> Self {
        Self::InvalidState {
            code: ErrorCode::PrMerged,
            message: format!("cannot reassign reviewers for merged pull request {}", pr_id),
        }
    }

    pub fn not_assigned(pr_id: &str, reviewer_id: &str) -> Self {
        Self::PreconditionFailed {
            code: ErrorCode::NotAssigned,
            message: format!("{} is not assigned to pull request {}", reviewer_id, pr_id),
        }
    }

    pub fn no_candidate(pr_id: &str) -> Self {
        Self::PreconditionFailed {
            code: ErrorCode::NoCandidate,
            message: format!("no available candidate for reassignment on {}", pr_id),
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

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Attach operation context to a store error.
///
/// Used as `.map_err(store_err("insert pull request"))`.
pub fn store_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |err| AppError::database_with_op(err.to_string(), operation)
}

// Conversions from common error types

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::database(err.to_string())
    }
}

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        Self::database(err.to_string())
    }
}
