//! Error types for the core library

use thiserror::Error;

/// Coarse classification used at the HTTP boundary and by the board
/// reconciler to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    ReferentialIntegrity,
    Unexpected,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote end answered, but reported a failure in its envelope.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl Error {
    /// Create a Validation error for the given field
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::TaskNotFound(_) | Self::CategoryNotFound(_) => ErrorKind::NotFound,
            Self::ReferentialIntegrity(_) => ErrorKind::ReferentialIntegrity,
            Self::Rejected { status: 400, .. } => ErrorKind::Validation,
            Self::Rejected { status: 404, .. } => ErrorKind::NotFound,
            Self::Database(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Transport(_)
            | Self::Rejected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Whether the caller may retry the request once.
    ///
    /// Only failures where the request may never have reached the store
    /// qualify; validation and integrity failures are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Translate constraint violations reported by the store into domain errors.
///
/// Unique violations only occur on `category.name`; foreign-key violations
/// only on `task_category_link`.
pub(crate) fn map_constraint(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::validation("name", "duplicate category name");
        }
        if db_err.is_foreign_key_violation() {
            return Error::ReferentialIntegrity(db_err.message().to_string());
        }
    }
    Error::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::validation("title", "Title cannot be empty").kind(),
            ErrorKind::Validation
        );
        assert_eq!(Error::TaskNotFound(3).kind(), ErrorKind::NotFound);
        assert_eq!(Error::CategoryNotFound(3).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::ReferentialIntegrity("category 9".into()).kind(),
            ErrorKind::ReferentialIntegrity
        );
        assert_eq!(
            Error::Transport("connection refused".into()).kind(),
            ErrorKind::Unexpected
        );
        assert_eq!(
            Error::Rejected {
                status: 404,
                message: "Task not found".into()
            }
            .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(Error::Transport("timeout".into()).is_retryable());
        assert!(!Error::validation("title", "empty").is_retryable());
        assert!(!Error::ReferentialIntegrity("x".into()).is_retryable());
        assert!(!Error::Rejected {
            status: 500,
            message: "boom".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = Error::validation("name", "Name is required");
        assert_eq!(err.to_string(), "Invalid name: Name is required");
    }
}
