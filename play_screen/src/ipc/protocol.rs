//! Command vocabulary and wire messages of the player's JSON IPC

use crate::error::PlayerError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Error value the player returns for a successful command
pub const SUCCESS: &str = "success";

/// Request line written to the control socket: `{"command": [verb, args...]}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub command: Vec<Value>,
}

/// Response line read from the control socket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    #[serde(default)]
    pub data: Option<Value>,
    pub error: String,
}

impl Response {
    pub fn success(data: impl Into<Option<Value>>) -> Self {
        Self {
            data: data.into(),
            error: SUCCESS.to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error == SUCCESS
    }

    /// Surface the `data` field, or the player's error string as a protocol failure.
    pub fn into_result(self) -> Result<Value, PlayerError> {
        if self.is_success() {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(PlayerError::Protocol(self.error))
        }
    }
}

/// Direction of a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekMode {
    Absolute,
    Relative,
}

impl SeekMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeekMode::Absolute => "absolute",
            SeekMode::Relative => "relative",
        }
    }
}

/// Player commands understood by the supervisor
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    TogglePause,
    SetPause(bool),
    PlaylistNext,
    PlaylistPrev,
    Quit,
    /// Volume level; anything above 100 is sent as 100
    SetVolume(u8),
    Seek { offset: f64, mode: SeekMode },
    ToggleFullscreen,
    GetProperty(String),
}

impl Command {
    /// Volume command with the level clamped to 0..=100.
    pub fn set_volume(volume: i64) -> Self {
        Command::SetVolume(volume.clamp(0, 100) as u8)
    }

    pub fn seek(offset: f64, relative: bool) -> Self {
        let mode = if relative {
            SeekMode::Relative
        } else {
            SeekMode::Absolute
        };
        Command::Seek { offset, mode }
    }

    pub fn get_property(name: impl Into<String>) -> Self {
        Command::GetProperty(name.into())
    }

    pub fn to_request(&self) -> Request {
        let command = match self {
            Command::TogglePause => vec![json!("cycle"), json!("pause")],
            Command::SetPause(paused) => vec![json!("set_property"), json!("pause"), json!(paused)],
            Command::PlaylistNext => vec![json!("playlist-next"), json!("weak")],
            Command::PlaylistPrev => vec![json!("playlist-prev"), json!("weak")],
            Command::Quit => vec![json!("quit")],
            Command::SetVolume(volume) => {
                vec![
                    json!("set_property"),
                    json!("volume"),
                    json!((*volume).min(100)),
                ]
            }
            Command::Seek { offset, mode } => {
                vec![json!("seek"), json!(offset), json!(mode.as_str())]
            }
            Command::ToggleFullscreen => vec![json!("cycle"), json!("fullscreen")],
            Command::GetProperty(name) => vec![json!("get_property"), json!(name)],
        };
        Request { command }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(command: Command) -> String {
        serde_json::to_string(&command.to_request()).unwrap()
    }

    #[test]
    fn test_encode_control_verbs() {
        assert_eq!(wire(Command::TogglePause), r#"{"command":["cycle","pause"]}"#);
        assert_eq!(
            wire(Command::SetPause(true)),
            r#"{"command":["set_property","pause",true]}"#
        );
        assert_eq!(
            wire(Command::PlaylistPrev),
            r#"{"command":["playlist-prev","weak"]}"#
        );
        assert_eq!(wire(Command::Quit), r#"{"command":["quit"]}"#);
        assert_eq!(
            wire(Command::get_property("media-title")),
            r#"{"command":["get_property","media-title"]}"#
        );
    }

    #[test]
    fn test_volume_is_clamped() {
        assert_eq!(Command::set_volume(-20), Command::SetVolume(0));
        assert_eq!(Command::set_volume(250), Command::SetVolume(100));
        assert_eq!(Command::set_volume(42), Command::SetVolume(42));
        assert_eq!(
            wire(Command::set_volume(101)),
            r#"{"command":["set_property","volume",100]}"#
        );
        assert_eq!(
            wire(Command::SetVolume(200)),
            r#"{"command":["set_property","volume",100]}"#
        );
    }

    #[test]
    fn test_seek_modes() {
        let absolute = Command::seek(90.5, false).to_request();
        assert_eq!(absolute.command[2], json!("absolute"));
        assert_eq!(absolute.command[1], json!(90.5));

        let relative = Command::seek(-30.0, true).to_request();
        assert_eq!(relative.command[2], json!("relative"));
    }

    #[test]
    fn test_response_success() {
        let response: Response =
            serde_json::from_str(r#"{"data":42.5,"error":"success"}"#).unwrap();
        assert_eq!(response.into_result().unwrap(), json!(42.5));

        let response: Response = serde_json::from_str(r#"{"error":"success"}"#).unwrap();
        assert_eq!(response.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn test_response_error_message() {
        let response: Response =
            serde_json::from_str(r#"{"data":null,"error":"property unavailable"}"#).unwrap();
        match response.into_result() {
            Err(PlayerError::Protocol(message)) => assert_eq!(message, "property unavailable"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
