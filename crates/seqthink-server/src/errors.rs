//! Server error types.

use thiserror::Error;

/// Errors raised while starting or running a transport.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not bind its address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// I/O failure on an open transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}
