use crate::screen::Screen;
use eyre::{Result, WrapErr};
use serde::Deserialize;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

/// Runtime configuration for the player supervisor
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Player executable, resolved through PATH when relative (default: mpv)
    #[serde(default = "default_player_binary")]
    pub player_binary: PathBuf,

    /// Directory holding the per-screen control sockets (default: /tmp)
    #[serde(default)]
    pub socket_dir: Option<PathBuf>,

    /// Volume passed to newly spawned players, clamped to 0-100 (default: 80)
    #[serde(default = "default_volume")]
    pub default_volume: i64,

    /// Timeout for one control socket exchange (milliseconds)
    #[serde(default = "default_ipc_timeout_ms")]
    pub ipc_timeout_ms: u64,

    /// Deadline for the control socket to become dialable after spawn (milliseconds)
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,

    /// Interval between readiness probes (milliseconds)
    #[serde(default = "default_readiness_poll_interval_ms")]
    pub readiness_poll_interval_ms: u64,

    /// Time a player gets to exit after "quit" before it is killed (milliseconds)
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    /// Per-screen profile overrides, keyed by 1-based screen number
    #[serde(default)]
    pub profiles: HashMap<u32, String>,

    /// Extra arguments placed before the source on every player command line
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player_binary: default_player_binary(),
            socket_dir: None,
            default_volume: default_volume(),
            ipc_timeout_ms: default_ipc_timeout_ms(),
            readiness_timeout_ms: default_readiness_timeout_ms(),
            readiness_poll_interval_ms: default_readiness_poll_interval_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            profiles: HashMap::new(),
            extra_args: Vec::new(),
        }
    }
}

fn default_player_binary() -> PathBuf {
    PathBuf::from("mpv")
}
fn default_volume() -> i64 {
    80
}
fn default_ipc_timeout_ms() -> u64 {
    5000
}
fn default_readiness_timeout_ms() -> u64 {
    5000
}
fn default_readiness_poll_interval_ms() -> u64 {
    100
}
fn default_stop_grace_ms() -> u64 {
    100
}

impl Config {
    pub fn socket_path(&self, screen: Screen) -> PathBuf {
        match &self.socket_dir {
            Some(dir) => screen.socket_path_in(dir),
            None => screen.socket_path(),
        }
    }

    /// Profile for `screen`: the configured override or `screen{n}`.
    pub fn profile(&self, screen: Screen) -> String {
        self.profiles
            .get(&screen.number())
            .cloned()
            .unwrap_or_else(|| screen.profile_name())
    }

    pub fn ipc_timeout(&self) -> Duration {
        Duration::from_millis(self.ipc_timeout_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn readiness_poll_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_interval_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    fn validate(&mut self) -> Result<()> {
        self.default_volume = self.default_volume.clamp(0, 100);

        for &number in self.profiles.keys() {
            Screen::from_number(number)
                .wrap_err_with(|| format!("profile override for screen {number}"))?;
        }

        if self.readiness_poll_interval_ms == 0 {
            return Err(eyre::eyre!("readiness_poll_interval_ms must be positive"));
        }

        Ok(())
    }
}

/// Load the configuration file, or fall back to defaults when no path is given.
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let mut config = if let Some(path) = config_path {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str::<Config>(&content)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?
    } else {
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.player_binary, PathBuf::from("mpv"));
        assert_eq!(config.default_volume, 80);
        assert_eq!(config.ipc_timeout(), Duration::from_secs(5));
        assert_eq!(config.readiness_timeout(), Duration::from_secs(5));
        assert_eq!(config.readiness_poll_interval(), Duration::from_millis(100));
        assert_eq!(config.stop_grace(), Duration::from_millis(100));
        assert_eq!(
            config.socket_path(Screen::TWO),
            PathBuf::from("/tmp/mpv-screen2")
        );
        assert!(load_config(None).is_ok());
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "player_binary: /usr/local/bin/mpv\n\
             socket_dir: /run/play_screen\n\
             default_volume: 150\n\
             profiles:\n  2: left-monitor\n\
             extra_args: [\"--no-terminal\"]"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.player_binary, PathBuf::from("/usr/local/bin/mpv"));
        assert_eq!(config.default_volume, 100);
        assert_eq!(config.profile(Screen::TWO), "left-monitor");
        assert_eq!(config.profile(Screen::ONE), "screen1");
        assert_eq!(
            config.socket_path(Screen::ONE),
            PathBuf::from("/run/play_screen/mpv-screen1")
        );
        assert_eq!(config.extra_args, vec!["--no-terminal".to_string()]);
        assert_eq!(config.ipc_timeout_ms, 5000);
    }

    #[test]
    fn test_out_of_range_volume_is_clamped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_volume: 300").unwrap();
        assert_eq!(load_config(Some(file.path())).unwrap().default_volume, 100);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_volume: -10").unwrap();
        assert_eq!(load_config(Some(file.path())).unwrap().default_volume, 0);
    }

    #[test]
    fn test_reject_unknown_screen_profile() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "profiles:\n  7: nowhere").unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }
}
