use std::fmt;
use std::time::Duration;

/// Result type for capreel-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the engine layer
#[derive(Debug)]
pub enum Error {
    /// Attempted to replay or export a recording with zero events
    EmptyRecording,

    /// Operation not valid in the driver's current state
    InvalidTransition(String),

    /// Renderer failed to materialize an event
    Render(String),

    /// Renderer did not confirm a completed paint within the settle budget
    SettleTimeout(Duration),

    /// Video assembly failed
    Encode(String),

    /// IO operation failed (frame staging, artifact output)
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyRecording => write!(f, "Recording contains no events"),
            Error::InvalidTransition(msg) => write!(f, "Invalid playback transition: {}", msg),
            Error::Render(msg) => write!(f, "Render error: {}", msg),
            Error::SettleTimeout(budget) => {
                write!(f, "Renderer did not settle within {:?}", budget)
            }
            Error::Encode(msg) => write!(f, "Encode error: {}", msg),
            Error::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
