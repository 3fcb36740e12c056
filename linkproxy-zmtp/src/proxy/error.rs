//! Error types for the generalized message proxy.

use std::io;
use thiserror::Error;

/// Error type for proxy construction and polling operations.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Construction-time precondition failure (asymmetric pair vectors,
    /// strict-mode checks, an empty topology).
    #[error("invalid proxy argument: {0}")]
    InvalidArgument(String),

    /// The requested topology exceeds the configured `chain_max`.
    #[error("proxy capacity exceeded: requested {requested}, max {max}")]
    CapacityExceeded { max: usize, requested: usize },

    /// Underlying socket send/recv/poll failure.
    #[error("proxy transport error: {0}")]
    Transport(#[from] io::Error),

    /// A control frame carried a continuation or could not be read. This is
    /// a distinct case from an unrecognized command payload, which is a
    /// fatal assertion rather than a recoverable error.
    #[error("malformed control frame: {0}")]
    MalformedControl(String),

    /// A hook rejected a frame; carries the hook's reported code.
    #[error("hook rejected frame with code {0}")]
    HookReject(i32),
}

/// Result type alias for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

impl From<ProxyError> for io::Error {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Transport(e) => e,
            other => io::Error::other(other.to_string()),
        }
    }
}
