//! Error types for plant operations.

use std::fmt;
use std::io;

/// All possible plant errors.
#[derive(Debug)]
pub enum PlantError {
    /// An I/O error occurred.
    Io(io::Error),
    /// JSON serialization/deserialization failed.
    Json(serde_json::Error),
    /// A git operation failed.
    Git(git2::Error),
    /// Could not acquire the session lock within the timeout.
    LockTimeout,
    /// The repository has no configured committer identity (user.email).
    MissingIdentity,
    /// The locker repository has no working tree (bare clone).
    NoWorkTree,
    /// The credentials file is unreadable or missing required entries.
    Credentials(String),
    /// The planting or git configuration is malformed.
    Config(String),
    /// The evidence record is malformed.
    Evidence(String),
    /// The session has already been finalized.
    SessionClosed,
}

impl fmt::Display for PlantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlantError::Io(e) => write!(f, "I/O error: {e}"),
            PlantError::Json(e) => write!(f, "JSON error: {e}"),
            PlantError::Git(e) => write!(f, "git error: {e}"),
            PlantError::LockTimeout => {
                write!(f, "could not acquire session lock within timeout")
            }
            PlantError::MissingIdentity => {
                write!(f, "no committer identity (set user.email in the git config)")
            }
            PlantError::NoWorkTree => {
                write!(f, "locker repository has no working tree")
            }
            PlantError::Credentials(msg) => write!(f, "credentials: {msg}"),
            PlantError::Config(msg) => write!(f, "configuration: {msg}"),
            PlantError::Evidence(msg) => write!(f, "evidence: {msg}"),
            PlantError::SessionClosed => {
                write!(f, "planting session is closed")
            }
        }
    }
}

impl std::error::Error for PlantError {}

impl From<io::Error> for PlantError {
    fn from(e: io::Error) -> Self {
        PlantError::Io(e)
    }
}

impl From<serde_json::Error> for PlantError {
    fn from(e: serde_json::Error) -> Self {
        PlantError::Json(e)
    }
}

impl From<git2::Error> for PlantError {
    fn from(e: git2::Error) -> Self {
        PlantError::Git(e)
    }
}

/// Convenience alias for Results in plant.
pub type PlantResult<T> = Result<T, PlantError>;
