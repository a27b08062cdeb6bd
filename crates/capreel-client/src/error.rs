use std::fmt;

/// Result type for capreel-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the client layer
#[derive(Debug)]
pub enum Error {
    /// Network or store unreachable. Recoverable: events stay buffered and
    /// delivery is retried on the next flush trigger.
    Transport(String),

    /// The server has no session with this identifier
    SessionNotFound(String),

    /// The server rejected the request
    Server { status: u16, message: String },

    /// Wire payload could not be encoded/decoded
    Serialization(serde_json::Error),

    /// The batcher was already stopped
    Stopped,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(msg) => write!(f, "Transport error: {}", msg),
            Error::SessionNotFound(id) => write!(f, "Session not found: {}", id),
            Error::Server { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            Error::Serialization(err) => write!(f, "Serialization error: {}", err),
            Error::Stopped => write!(f, "Batcher already stopped"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err)
    }
}
