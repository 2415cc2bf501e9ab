//! Error types for rolodex.

use thiserror::Error;

/// Result type alias using rolodex's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for rolodex operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Contact not found (or not owned by the caller)
    #[error("Contact not found: {0}")]
    ContactNotFound(uuid::Uuid),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication failed or session missing/expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the underlying cause is a unique-constraint violation.
    ///
    /// Used at the API boundary to turn duplicate-email registration into
    /// a 409 instead of a 500.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("group 42".to_string());
        assert_eq!(err.to_string(), "Not found: group 42");
    }

    #[test]
    fn test_error_display_contact_not_found() {
        let id = Uuid::nil();
        let err = Error::ContactNotFound(id);
        assert_eq!(err.to_string(), format!("Contact not found: {}", id));
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("name must not be blank".to_string());
        assert_eq!(err.to_string(), "Invalid input: name must not be blank");
    }

    #[test]
    fn test_error_display_unauthorized() {
        let err = Error::Unauthorized("session expired".to_string());
        assert_eq!(err.to_string(), "Unauthorized: session expired");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_plain_errors_are_not_unique_violations() {
        assert!(!Error::NotFound("x".into()).is_unique_violation());
        assert!(!Error::Database(sqlx::Error::RowNotFound).is_unique_violation());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
