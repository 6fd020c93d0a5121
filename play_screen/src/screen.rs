use crate::error::PlayerError;
use serde::{Serialize, Serializer};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Number of screens a supervisor can drive.
pub const MAX_SCREENS: u8 = 4;

/// Directory holding the control sockets unless the configuration relocates them.
pub const DEFAULT_SOCKET_DIR: &str = "/tmp";

/// A logical display target, stored as a 0-based ordinal and shown 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Screen(u8);

impl Screen {
    pub const ONE: Screen = Screen(0);
    pub const TWO: Screen = Screen(1);
    pub const THREE: Screen = Screen(2);
    pub const FOUR: Screen = Screen(3);

    /// Build from a 0-based index.
    pub fn new(index: u8) -> Result<Self, PlayerError> {
        if index < MAX_SCREENS {
            Ok(Self(index))
        } else {
            Err(PlayerError::InvalidScreen(u32::from(index) + 1))
        }
    }

    /// Build from the 1-based number users see.
    pub fn from_number(number: u32) -> Result<Self, PlayerError> {
        if (1..=u32::from(MAX_SCREENS)).contains(&number) {
            Ok(Self((number - 1) as u8))
        } else {
            Err(PlayerError::InvalidScreen(number))
        }
    }

    pub fn all() -> impl Iterator<Item = Screen> {
        (0..MAX_SCREENS).map(Screen)
    }

    pub fn number(self) -> u32 {
        u32::from(self.0) + 1
    }

    /// Control socket under the default socket directory, e.g. `/tmp/mpv-screen1`.
    pub fn socket_path(self) -> PathBuf {
        self.socket_path_in(Path::new(DEFAULT_SOCKET_DIR))
    }

    pub fn socket_path_in(self, dir: &Path) -> PathBuf {
        dir.join(format!("mpv-screen{}", self.number()))
    }

    /// Player profile selecting the screen-specific configuration, e.g. `screen1`.
    pub fn profile_name(self) -> String {
        format!("screen{}", self.number())
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "screen {}", self.number())
    }
}

impl FromStr for Screen {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number: u32 = s
            .trim()
            .parse()
            .map_err(|_| PlayerError::InvalidScreenName(s.to_string()))?;
        Self::from_number(number)
    }
}

impl Serialize for Screen {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_paths() {
        let paths: Vec<_> = Screen::all().map(Screen::socket_path).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/tmp/mpv-screen1"),
                PathBuf::from("/tmp/mpv-screen2"),
                PathBuf::from("/tmp/mpv-screen3"),
                PathBuf::from("/tmp/mpv-screen4"),
            ]
        );
    }

    #[test]
    fn test_profile_names() {
        assert_eq!(Screen::ONE.profile_name(), "screen1");
        assert_eq!(Screen::FOUR.profile_name(), "screen4");
    }

    #[test]
    fn test_socket_path_in_custom_dir() {
        let path = Screen::THREE.socket_path_in(Path::new("/run/user/1000"));
        assert_eq!(path, PathBuf::from("/run/user/1000/mpv-screen3"));
    }

    #[test]
    fn test_screen_range() {
        assert!(Screen::new(3).is_ok());
        assert!(matches!(
            Screen::new(4),
            Err(PlayerError::InvalidScreen(5))
        ));
        assert!(Screen::from_number(0).is_err());
        assert_eq!(Screen::from_number(2).unwrap(), Screen::TWO);
    }

    #[test]
    fn test_parse_screen() {
        assert_eq!("1".parse::<Screen>().unwrap(), Screen::ONE);
        assert_eq!(" 4 ".parse::<Screen>().unwrap(), Screen::FOUR);
        assert!("five".parse::<Screen>().is_err());
        assert!("9".parse::<Screen>().is_err());
    }

    #[test]
    fn test_serializes_one_based() {
        assert_eq!(serde_json::to_string(&Screen::TWO).unwrap(), "2");
    }
}
