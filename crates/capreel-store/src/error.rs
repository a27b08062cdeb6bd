use std::fmt;

/// Result type for capreel-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the store layer
#[derive(Debug)]
pub enum Error {
    /// Database operation failed
    Database(rusqlite::Error),

    /// Row payload could not be encoded/decoded
    Serialization(serde_json::Error),

    /// No session with the given identifier
    SessionNotFound(String),

    /// A session with the given identifier already exists
    DuplicateSession(String),

    /// Stored data violates the expected shape (bad timestamp, ...)
    Corrupt(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => write!(f, "Database error: {}", err),
            Error::Serialization(err) => write!(f, "Serialization error: {}", err),
            Error::SessionNotFound(id) => write!(f, "Session not found: {}", id),
            Error::DuplicateSession(id) => write!(f, "Session already exists: {}", id),
            Error::Corrupt(msg) => write!(f, "Corrupt store data: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Serialization(err) => Some(err),
            Error::SessionNotFound(_) | Error::DuplicateSession(_) | Error::Corrupt(_) => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err)
    }
}
