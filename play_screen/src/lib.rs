//! Supervise one `mpv` player per screen and drive each through its JSON IPC
//! control socket.
//!
//! [`PlayerSupervisor`] starts players, keeps at most one per [`Screen`] and
//! sends one-shot commands built by [`ipc::Command`]. [`info::snapshot`]
//! reads a fixed set of properties into a best-effort [`PlaybackInfo`].

pub mod config;
pub mod error;
pub mod info;
pub mod ipc;
pub mod process;
pub mod screen;
pub mod supervisor;

pub use config::{load_config, Config};
pub use error::{PlayerError, Result};
pub use info::{PlaybackInfo, Reading};
pub use screen::Screen;
pub use supervisor::{PlayerInstance, PlayerState, PlayerSupervisor, Shutdown, StoppedPlayer};
