//! JSON IPC with running players
//!
//! The player listens on a Unix domain socket and accepts newline-delimited
//! JSON commands of the form `{"command": [verb, args...]}`, answering each
//! with `{"data": ..., "error": "success" | message}`.

pub mod channel;
pub mod error;
pub mod protocol;

pub use error::ChannelError;
pub use protocol::{Command, Request, Response, SeekMode};
