use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from reading documents or writing saves.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The loaded document is not a well-formed tree of JSON objects.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Saving the edited document failed.
    #[error("Save failed: {0}")]
    PersistenceFailure(String),

    /// Logging could not be initialized.
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidDocument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn terminal_error_display() {
        let err = AppError::Terminal("failed to enter raw mode".into());
        assert_eq!(err.to_string(), "Terminal error: failed to enter raw mode");
    }

    #[test]
    fn json_error_becomes_invalid_document() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let app_err: AppError = json_err.into();
        assert!(matches!(app_err, AppError::InvalidDocument(_)));
        assert!(app_err.to_string().starts_with("Invalid document:"));
    }

    #[test]
    fn persistence_failure_display() {
        let err = AppError::PersistenceFailure("endpoint unreachable".into());
        assert_eq!(err.to_string(), "Save failed: endpoint unreachable");
    }
}
