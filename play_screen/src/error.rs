//! Error types for the player supervisor

use crate::ipc::ChannelError;
use std::{path::PathBuf, process::ExitStatus, time::Duration};
use thiserror::Error;

/// Errors returned by supervisor operations
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Screen number outside 1..=4
    #[error("invalid screen {0} (expected 1-{max})", max = crate::screen::MAX_SCREENS)]
    InvalidScreen(u32),

    /// Screen argument that is not a number
    #[error("invalid screen {0:?}")]
    InvalidScreenName(String),

    /// Play was asked to start an empty source
    #[error("source must not be empty")]
    EmptySource,

    /// The player process could not be started
    #[error("failed to start {}: {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The control socket never became dialable
    #[error("control socket {} not ready after {timeout:?}", socket.display())]
    ReadinessTimeout { socket: PathBuf, timeout: Duration },

    /// The caller cancelled Play
    #[error("cancelled while starting the player")]
    Cancelled,

    /// The player exited before its control socket became dialable
    #[error("player exited during startup ({status})")]
    ExitedDuringStartup { status: ExitStatus },

    /// Dial, write or read failure on the control socket
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The player answered with an error string other than "success"
    #[error("{0}")]
    Protocol(String),
}

pub type Result<T, E = PlayerError> = std::result::Result<T, E>;
