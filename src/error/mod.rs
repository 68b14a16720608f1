use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Navigation history errors
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Malformed snapshot: {message}")]
    MalformedSnapshot { message: String },

    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedSnapshotVersion { found: u64, expected: u32 },

    #[error("Failed to encode snapshot: {message}")]
    Encode { message: String },
}

/// Snapshot storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Snapshot not found: {key}")]
    SnapshotNotFound { key: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Stdio protocol errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid parameters for {method}: {message}")]
    InvalidParams { method: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServerError {
    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            ServerError::InvalidParams { .. } => -32602,
            ServerError::Io(_) | ServerError::Json(_) => -32603,
        }
    }
}

impl AppError {
    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            AppError::History(HistoryError::Encode { .. }) => -32603,
            AppError::History(_) => -32602,
            AppError::Server(e) => e.code(),
            AppError::Storage(_) => -32603,
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for server operations
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err: AppError = ServerError::InvalidParams {
            method: "event".to_string(),
            message: "missing field `name`".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Server error: Invalid parameters for event: missing field `name`"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let err: ServerError =
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed").into();
        assert!(matches!(err, ServerError::Io(_)));
        assert_eq!(err.code(), -32603);
    }

    #[test]
    fn test_history_error_display() {
        let err = HistoryError::MalformedSnapshot {
            message: "expected value".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed snapshot: expected value");

        let err = HistoryError::UnsupportedSnapshotVersion {
            found: 7,
            expected: 1,
        };
        assert_eq!(err.to_string(), "Unsupported snapshot version 7 (expected 1)");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Connection {
            message: "failed to connect".to_string(),
        };
        assert_eq!(err.to_string(), "Database connection failed: failed to connect");

        let err = StorageError::SnapshotNotFound {
            key: "default".to_string(),
        };
        assert_eq!(err.to_string(), "Snapshot not found: default");

        let err = StorageError::Migration {
            message: "version mismatch".to_string(),
        };
        assert_eq!(err.to_string(), "Migration failed: version mismatch");
    }

    #[test]
    fn test_server_error_display() {
        let err = ServerError::InvalidParams {
            method: "flow/end".to_string(),
            message: "missing field `id`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameters for flow/end: missing field `id`"
        );
        assert_eq!(err.code(), -32602);
    }

    #[test]
    fn test_history_error_conversion_to_app_error() {
        let err: AppError = HistoryError::MalformedSnapshot {
            message: "bad".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::History(_)));
        assert_eq!(err.code(), -32602);
    }

    #[test]
    fn test_storage_error_conversion_to_app_error() {
        let err: AppError = StorageError::SnapshotNotFound {
            key: "k".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(err.code(), -32603);
    }
}
