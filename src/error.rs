use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, ExplorerError>;

/// Explorer error types.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// I/O errors at the filesystem boundary (copy/move/delete/create).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One directory entry could not be read. Listing continues without it.
    #[error("cannot read {}: {reason}", path.display())]
    ListEntry { path: PathBuf, reason: String },

    /// The target path already exists.
    #[error("already exists: {}", .0.display())]
    Conflict(PathBuf),

    /// No node matches the given path.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A file name is empty or otherwise unusable.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// The user cancelled (prompt dismissed or batch aborted).
    #[error("operation cancelled")]
    Cancelled,

    /// Dispatch of an action name that was never registered.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// An action definition was rejected at registration time.
    #[error("invalid action {name}: {reason}")]
    InvalidAction { name: String, reason: String },

    /// An action was dispatched with an argument it does not accept.
    #[error("invalid argument for {action}: {value}")]
    InvalidArgument { action: String, value: String },

    /// The text surface failed to read or write.
    #[error("surface error: {0}")]
    Surface(String),

    /// A configuration value could not be used.
    #[error("config error: {0}")]
    Config(String),

    /// Expand-state persistence failed.
    #[error("state error: {0}")]
    State(String),
}

impl ExplorerError {
    /// Whether this error represents a user cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExplorerError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ExplorerError = io_err.into();
        assert!(matches!(err, ExplorerError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn conflict_names_the_path() {
        let err = ExplorerError::Conflict(PathBuf::from("/tmp/x.txt"));
        assert_eq!(err.to_string(), "already exists: /tmp/x.txt");
    }

    #[test]
    fn list_entry_display() {
        let err = ExplorerError::ListEntry {
            path: PathBuf::from("/tmp/broken"),
            reason: "permission denied".into(),
        };
        assert_eq!(err.to_string(), "cannot read /tmp/broken: permission denied");
    }

    #[test]
    fn invalid_action_display() {
        let err = ExplorerError::InvalidAction {
            name: "expand".into(),
            reason: "duplicate name".into(),
        };
        assert_eq!(err.to_string(), "invalid action expand: duplicate name");
    }

    #[test]
    fn cancelled_is_detected() {
        assert!(ExplorerError::Cancelled.is_cancelled());
        assert!(!ExplorerError::UnknownAction("x".into()).is_cancelled());
    }
}
