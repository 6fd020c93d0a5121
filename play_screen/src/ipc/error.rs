//! Error types for the control socket channel

use std::{io, path::PathBuf, time::Duration};
use thiserror::Error;

/// Transport-level failures of a single request/response exchange
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The socket could not be dialed
    #[error("failed to connect to IPC socket {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The exchange did not finish in time
    #[error("IPC exchange on {} timed out after {timeout:?}", path.display())]
    Timeout { path: PathBuf, timeout: Duration },

    #[error("failed to send command: {0}")]
    Write(#[source] io::Error),

    #[error("failed to read response: {0}")]
    Read(#[source] io::Error),

    /// The player closed the connection without answering
    #[error("connection closed before a response arrived")]
    Closed,

    #[error("response exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
}
