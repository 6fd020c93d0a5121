//! Per-screen player processes and the commands sent to them
//!
//! The supervisor keeps at most one player per screen. Starting a player
//! replaces whatever runs on that screen, spawns the process and waits for its
//! control socket to accept connections before the call returns. A failed or
//! cancelled start leaves nothing registered.
//!
//! Play, Stop and StopAll are serialized by one lifecycle lock that is held for
//! the whole operation, readiness wait included. The screen map itself is only
//! locked for short sections, so readers observe a player in the `Starting`
//! state while its handshake is running.

use crate::{
    config::Config,
    error::{PlayerError, Result},
    info::{self, PlaybackInfo, PropertySource},
    ipc::{channel, Command},
    process::{PlayerCommandLine, PlayerProcess},
    screen::Screen,
};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::HashMap,
    future::Future,
    path::{Path, PathBuf},
    process::ExitStatus,
    sync::Arc,
    time::{Duration, SystemTime},
};
use tokio::{
    runtime::Handle,
    sync::{Mutex, RwLock},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timeout of a single readiness connect attempt
const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    /// Spawned, control socket not dialable yet
    Starting,
    /// Control socket accepted a connection
    Ready,
    /// Torn down; only seen in values returned by stop
    Stopped,
}

/// Snapshot of a registered player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerInstance {
    pub screen: Screen,
    pub pid: u32,
    pub socket_path: PathBuf,
    pub source: String,
    pub started_at: SystemTime,
    pub state: PlayerState,
}

/// How a stopped player went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shutdown {
    /// Exited within the grace period after "quit"
    Graceful,
    /// Killed after the grace period
    Forced,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoppedPlayer {
    pub instance: PlayerInstance,
    pub shutdown: Shutdown,
}

struct PlayerEntry {
    instance: PlayerInstance,
    process: Mutex<PlayerProcess>,
}

type PlayerMap = Arc<RwLock<HashMap<Screen, PlayerEntry>>>;

/// Rolls back a registration whose `play` call was dropped before the
/// player became ready.
struct StartGuard {
    players: PlayerMap,
    screen: Screen,
    pid: u32,
    armed: bool,
}

impl StartGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StartGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let (screen, pid) = (self.screen, self.pid);
        warn!("{screen}: start of pid {pid} abandoned");

        match Handle::try_current() {
            Ok(handle) => {
                let players = self.players.clone();
                handle.spawn(async move {
                    if let Some(entry) = remove_starting(&players, screen, pid).await {
                        entry.process.into_inner().kill().await;
                    }
                });
            }
            Err(_) => {
                let Ok(mut players) = self.players.try_write() else {
                    return;
                };
                if players
                    .get(&screen)
                    .is_some_and(|entry| entry.instance.pid == pid)
                {
                    if let Some(entry) = players.remove(&screen) {
                        entry.process.into_inner().start_kill();
                    }
                }
            }
        }
    }
}

/// Remove the entry of `screen` if it still belongs to `pid`.
async fn remove_starting(players: &PlayerMap, screen: Screen, pid: u32) -> Option<PlayerEntry> {
    let mut players = players.write().await;
    if players.get(&screen)?.instance.pid != pid {
        return None;
    }
    players.remove(&screen)
}

pub struct PlayerSupervisor {
    config: Config,
    players: PlayerMap,
    lifecycle: Mutex<()>,
}

impl PlayerSupervisor {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            players: Arc::new(RwLock::new(HashMap::new())),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start playing `source` on `screen`, replacing any player already there.
    ///
    /// Returns once the new player's control socket accepts connections. On
    /// spawn failure, readiness timeout, early exit or cancellation the new
    /// process is killed and the screen is left without a player. Dropping the
    /// returned future before it completes rolls the start back as well.
    pub async fn play(
        &self,
        cancel: &CancellationToken,
        source: &str,
        screen: Screen,
    ) -> Result<PlayerInstance> {
        if source.is_empty() {
            return Err(PlayerError::EmptySource);
        }

        let _lifecycle = self.lifecycle.lock().await;

        // The screen is cleared even when the call is already cancelled.
        let socket_path = self.config.socket_path(screen);
        match self.teardown(screen).await {
            Some(stopped) => info!(
                "{screen}: replaced pid {} ({:?} shutdown)",
                stopped.instance.pid, stopped.shutdown
            ),
            None => self.quit_unmanaged(screen, &socket_path).await,
        }

        if cancel.is_cancelled() {
            return Err(PlayerError::Cancelled);
        }

        let cmdline = PlayerCommandLine::new(&self.config, screen, source);
        info!(
            "{screen}: starting {}",
            String::from_utf8_lossy(&cmdline.to_shell())
        );

        // No await point between spawning and arming the guard.
        let mut players = self.players.write().await;
        let process = PlayerProcess::start(&cmdline)?;

        let instance = PlayerInstance {
            screen,
            pid: process.pid(),
            socket_path,
            source: source.to_string(),
            started_at: SystemTime::now(),
            state: PlayerState::Starting,
        };
        players.insert(
            screen,
            PlayerEntry {
                instance: instance.clone(),
                process: Mutex::new(process),
            },
        );
        drop(players);
        let guard = StartGuard {
            players: self.players.clone(),
            screen,
            pid: instance.pid,
            armed: true,
        };

        if let Err(err) = self.wait_until_ready(cancel, screen, &instance.socket_path).await {
            warn!("{screen}: pid {} failed to start: {err}", instance.pid);
            if let Some(entry) = remove_starting(&self.players, screen, instance.pid).await {
                entry.process.into_inner().kill().await;
            }
            guard.disarm();
            return Err(err);
        }

        let mut instance = instance;
        instance.state = PlayerState::Ready;
        if let Some(entry) = self.players.write().await.get_mut(&screen) {
            entry.instance.state = PlayerState::Ready;
        }
        guard.disarm();
        info!("{screen}: pid {} ready", instance.pid);
        Ok(instance)
    }

    /// Stop the player on `screen`. Returns `None` when nothing was registered.
    pub async fn stop(&self, screen: Screen) -> Result<Option<StoppedPlayer>> {
        let _lifecycle = self.lifecycle.lock().await;
        Ok(self.teardown(screen).await)
    }

    /// Stop every registered player.
    pub async fn stop_all(&self) -> Vec<StoppedPlayer> {
        let _lifecycle = self.lifecycle.lock().await;

        let entries: Vec<_> = self
            .players
            .write()
            .await
            .drain()
            .map(|(_, entry)| entry)
            .collect();

        let mut stopped =
            futures::future::join_all(entries.into_iter().map(|entry| self.shut_down(entry)))
                .await;
        stopped.sort_by_key(|stopped| stopped.instance.screen);
        stopped
    }

    pub async fn list_players(&self) -> Vec<PlayerInstance> {
        let players = self.players.read().await;
        let mut instances: Vec<_> = players
            .values()
            .map(|entry| entry.instance.clone())
            .collect();
        instances.sort_by_key(|instance| instance.screen);
        instances
    }

    pub async fn get_player(&self, screen: Screen) -> Option<PlayerInstance> {
        let players = self.players.read().await;
        players.get(&screen).map(|entry| entry.instance.clone())
    }

    /// Whether a player is registered on `screen`, starting or ready.
    pub async fn is_playing(&self, screen: Screen) -> bool {
        self.players.read().await.contains_key(&screen)
    }

    /// Send one command and return the response data.
    pub async fn command(&self, screen: Screen, command: &Command) -> Result<Value> {
        let socket_path = self.socket_path_for(screen).await;
        debug!("{screen}: {command:?}");

        let response = channel::send(
            &socket_path,
            &command.to_request(),
            self.config.ipc_timeout(),
        )
        .await?;
        response.into_result()
    }

    pub async fn play_pause(&self, screen: Screen) -> Result<()> {
        self.command(screen, &Command::TogglePause).await?;
        Ok(())
    }

    pub async fn pause(&self, screen: Screen) -> Result<()> {
        self.command(screen, &Command::SetPause(true)).await?;
        Ok(())
    }

    pub async fn resume(&self, screen: Screen) -> Result<()> {
        self.command(screen, &Command::SetPause(false)).await?;
        Ok(())
    }

    pub async fn next(&self, screen: Screen) -> Result<()> {
        self.command(screen, &Command::PlaylistNext).await?;
        Ok(())
    }

    pub async fn prev(&self, screen: Screen) -> Result<()> {
        self.command(screen, &Command::PlaylistPrev).await?;
        Ok(())
    }

    /// Ask the player to exit without touching the registration.
    pub async fn quit(&self, screen: Screen) -> Result<()> {
        self.command(screen, &Command::Quit).await?;
        Ok(())
    }

    /// Set the volume, clamped to 0-100.
    pub async fn set_volume(&self, screen: Screen, volume: i64) -> Result<()> {
        self.command(screen, &Command::set_volume(volume)).await?;
        Ok(())
    }

    /// Seek to `offset` seconds, or by `offset` seconds when `relative`.
    pub async fn seek(&self, screen: Screen, offset: f64, relative: bool) -> Result<()> {
        self.command(screen, &Command::seek(offset, relative)).await?;
        Ok(())
    }

    pub async fn fullscreen(&self, screen: Screen) -> Result<()> {
        self.command(screen, &Command::ToggleFullscreen).await?;
        Ok(())
    }

    pub async fn get_property(&self, screen: Screen, name: &str) -> Result<Value> {
        self.command(screen, &Command::get_property(name)).await
    }

    pub async fn playback_info(&self, screen: Screen) -> PlaybackInfo {
        info::snapshot(self, screen).await
    }

    /// Registered socket path, or the screen's configured path when nothing is
    /// registered so players started elsewhere can still be driven.
    async fn socket_path_for(&self, screen: Screen) -> PathBuf {
        let players = self.players.read().await;
        match players.get(&screen) {
            Some(entry) => entry.instance.socket_path.clone(),
            None => self.config.socket_path(screen),
        }
    }

    async fn wait_until_ready(
        &self,
        cancel: &CancellationToken,
        screen: Screen,
        socket_path: &Path,
    ) -> Result<()> {
        let timeout = self.config.readiness_timeout();
        let poll_interval = self.config.readiness_poll_interval();
        let deadline = Instant::now() + timeout;

        loop {
            if cancel.is_cancelled() {
                return Err(PlayerError::Cancelled);
            }

            if channel::probe(socket_path, PROBE_TIMEOUT).await {
                return Ok(());
            }

            if let Some(status) = self.exit_status(screen).await {
                return Err(PlayerError::ExitedDuringStartup { status });
            }

            if Instant::now() >= deadline {
                return Err(PlayerError::ReadinessTimeout {
                    socket: socket_path.to_path_buf(),
                    timeout,
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(PlayerError::Cancelled),
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }

    async fn exit_status(&self, screen: Screen) -> Option<ExitStatus> {
        let players = self.players.read().await;
        let mut process = players.get(&screen)?.process.lock().await;
        process.try_exit_status()
    }

    /// Remove the entry of `screen` and shut its process down.
    async fn teardown(&self, screen: Screen) -> Option<StoppedPlayer> {
        let entry = self.players.write().await.remove(&screen)?;
        Some(self.shut_down(entry).await)
    }

    async fn shut_down(&self, entry: PlayerEntry) -> StoppedPlayer {
        let PlayerEntry {
            mut instance,
            process,
        } = entry;
        let mut process = process.into_inner();
        let screen = instance.screen;

        let quit = Command::Quit.to_request();
        if let Err(err) =
            channel::send(&instance.socket_path, &quit, self.config.ipc_timeout()).await
        {
            debug!("{screen}: quit was not acknowledged: {err}");
        }

        let shutdown = if process.wait_exit(self.config.stop_grace()).await {
            info!("{screen}: pid {} exited", instance.pid);
            Shutdown::Graceful
        } else {
            warn!(
                "{screen}: pid {} still running after {:?}. Killing the process.",
                instance.pid,
                self.config.stop_grace()
            );
            process.kill().await;
            Shutdown::Forced
        };

        instance.state = PlayerState::Stopped;
        StoppedPlayer { instance, shutdown }
    }

    /// A player this supervisor did not start may still serve the screen's
    /// socket, e.g. one left behind by an earlier run. Ask it to quit so the
    /// readiness probe cannot mistake it for the new player.
    async fn quit_unmanaged(&self, screen: Screen, socket_path: &Path) {
        if !channel::probe(socket_path, PROBE_TIMEOUT).await {
            return;
        }

        info!(
            "{screen}: asking unmanaged player on {} to quit",
            socket_path.display()
        );
        let quit = Command::Quit.to_request();
        if let Err(err) = channel::send(socket_path, &quit, self.config.ipc_timeout()).await {
            debug!("{screen}: quit was not acknowledged: {err}");
        }

        let deadline = Instant::now() + self.config.stop_grace();
        while Instant::now() < deadline && channel::probe(socket_path, PROBE_TIMEOUT).await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl PropertySource for PlayerSupervisor {
    fn fetch_property(
        &self,
        screen: Screen,
        name: &str,
    ) -> impl Future<Output = Result<Value>> + Send {
        self.get_property(screen, name)
    }
}
