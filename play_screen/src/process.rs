use crate::{config::Config, error::PlayerError, screen::Screen};
use itertools::{chain, Itertools};
use std::{
    io,
    path::PathBuf,
    process::{ExitStatus, Stdio},
    time::Duration,
};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// The command line that starts a player on one screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl PlayerCommandLine {
    /// Build `{binary} --profile=.. --input-ipc-server=.. --volume=.. {extra_args} -- {source}`.
    pub fn new(config: &Config, screen: Screen, source: &str) -> Self {
        let socket_path = config.socket_path(screen);

        let args = chain!(
            [
                format!("--profile={}", config.profile(screen)),
                format!("--input-ipc-server={}", socket_path.display()),
                format!("--volume={}", config.default_volume.clamp(0, 100)),
            ],
            config.extra_args.iter().cloned(),
            ["--".to_string(), source.to_string()],
        )
        .collect();

        Self {
            program: config.player_binary.clone(),
            args,
        }
    }

    pub fn to_cmdline(&self) -> Vec<String> {
        chain!(
            [self.program.to_string_lossy().into_owned()],
            self.args.iter().cloned()
        )
        .collect()
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        // Players are long-lived and may outlive the process that started them.
        command.kill_on_drop(false);
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
        command.stderr(Stdio::inherit());
        command
    }

    /// Generate the shell command line.
    pub fn to_shell(&self) -> Vec<u8> {
        Itertools::intersperse(
            self.to_cmdline()
                .into_iter()
                .map(|arg| shell_quote::Sh::quote_vec(&arg)),
            vec![b' '],
        )
        .flatten()
        .collect()
    }
}

/// An owned player process. Only the supervisor entry holding it may signal it.
#[derive(Debug)]
pub struct PlayerProcess {
    child: Child,
    pid: u32,
}

impl PlayerProcess {
    pub fn start(cmdline: &PlayerCommandLine) -> Result<Self, PlayerError> {
        let spawn_error = |source| PlayerError::Spawn {
            binary: cmdline.program.clone(),
            source,
        };

        let child = cmdline.to_command().spawn().map_err(spawn_error)?;
        let Some(pid) = child.id() else {
            return Err(spawn_error(io::Error::other(
                "process exited before its pid was read",
            )));
        };

        debug!("started {} with pid {pid}", cmdline.program.display());
        Ok(Self { child, pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit status if the process has already exited.
    pub fn try_exit_status(&mut self) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(status) => status,
            Err(err) => {
                warn!("unable to poll player pid {}: {err}", self.pid);
                None
            }
        }
    }

    /// Wait up to `grace` for the process to exit on its own.
    pub async fn wait_exit(&mut self, grace: Duration) -> bool {
        matches!(
            tokio::time::timeout(grace, self.child.wait()).await,
            Ok(Ok(_))
        )
    }

    /// Kill the process and reap it.
    pub async fn kill(&mut self) {
        if let Err(err) = self.child.kill().await {
            warn!("player pid {} is not able to be killed: {err}", self.pid);
        }
    }

    /// Send the kill signal without waiting; used where no runtime is available.
    pub fn start_kill(&mut self) {
        if let Err(err) = self.child.start_kill() {
            warn!("player pid {} is not able to be killed: {err}", self.pid);
        }
    }
}
