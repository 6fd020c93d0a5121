//! Best-effort playback snapshots assembled from individual property reads

use crate::{error::PlayerError, screen::Screen};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::future::Future;
use tracing::debug;

/// Anything that can read a named player property on a screen.
pub trait PropertySource {
    fn fetch_property(
        &self,
        screen: Screen,
        name: &str,
    ) -> impl Future<Output = Result<Value, PlayerError>> + Send;
}

/// Properties read for a snapshot, in fetch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Pause,
    TimePos,
    Duration,
    Volume,
    Filename,
    MediaTitle,
    Fullscreen,
    PercentPos,
}

impl Property {
    pub fn name(self) -> &'static str {
        match self {
            Property::Pause => "pause",
            Property::TimePos => "time-pos",
            Property::Duration => "duration",
            Property::Volume => "volume",
            Property::Filename => "filename",
            Property::MediaTitle => "media-title",
            Property::Fullscreen => "fullscreen",
            Property::PercentPos => "percent-pos",
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Property::Pause | Property::Fullscreen => "bool",
            Property::TimePos | Property::Duration | Property::Volume | Property::PercentPos => {
                "number"
            }
            Property::Filename | Property::MediaTitle => "string",
        }
    }
}

/// Why a snapshot field has no value.
#[derive(Debug, Clone, PartialEq)]
pub enum Absence {
    /// The read failed; carries the error message.
    Unavailable(String),
    /// The player answered with a value of another JSON type (often `null`).
    Mismatch { expected: &'static str },
}

/// One field of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading<T> {
    Present(T),
    Missing(Absence),
}

impl<T> Reading<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Reading::Present(value) => Some(value),
            Reading::Missing(_) => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Reading::Present(_))
    }

    pub fn absence(&self) -> Option<&Absence> {
        match self {
            Reading::Present(_) => None,
            Reading::Missing(absence) => Some(absence),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Reading::Present(value) => Reading::Present(f(value)),
            Reading::Missing(absence) => Reading::Missing(absence),
        }
    }
}

impl<T: Copy> Reading<T> {
    pub fn get(&self) -> Option<T> {
        self.value().copied()
    }
}

impl<T: Serialize> Serialize for Reading<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reading::Present(value) => value.serialize(serializer),
            Reading::Missing(_) => serializer.serialize_none(),
        }
    }
}

/// Playback state of one screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackInfo {
    pub screen: Screen,
    pub playing: Reading<bool>,
    pub paused: Reading<bool>,
    pub position: Reading<f64>,
    pub duration: Reading<f64>,
    pub volume: Reading<f64>,
    pub filename: Reading<String>,
    pub media_title: Reading<String>,
    pub fullscreen: Reading<bool>,
    pub percent_pos: Reading<f64>,
}

/// Read every snapshot property of `screen`. Failed reads are recorded, never returned.
pub async fn snapshot<S: PropertySource>(source: &S, screen: Screen) -> PlaybackInfo {
    let paused = fetch(source, screen, Property::Pause, Value::as_bool).await;
    let position = fetch(source, screen, Property::TimePos, Value::as_f64).await;
    let duration = fetch(source, screen, Property::Duration, Value::as_f64).await;
    let volume = fetch(source, screen, Property::Volume, Value::as_f64).await;
    let filename = fetch(source, screen, Property::Filename, as_string).await;
    let media_title = fetch(source, screen, Property::MediaTitle, as_string).await;
    let fullscreen = fetch(source, screen, Property::Fullscreen, Value::as_bool).await;
    let percent_pos = fetch(source, screen, Property::PercentPos, Value::as_f64).await;

    PlaybackInfo {
        screen,
        playing: paused.clone().map(|paused| !paused),
        paused,
        position,
        duration,
        volume,
        filename,
        media_title,
        fullscreen,
        percent_pos,
    }
}

async fn fetch<S, T>(
    source: &S,
    screen: Screen,
    property: Property,
    decode: fn(&Value) -> Option<T>,
) -> Reading<T>
where
    S: PropertySource,
{
    match source.fetch_property(screen, property.name()).await {
        Ok(value) => match decode(&value) {
            Some(value) => Reading::Present(value),
            None => Reading::Missing(Absence::Mismatch {
                expected: property.expected(),
            }),
        },
        Err(err) => {
            debug!("{screen}: property {} unavailable: {err}", property.name());
            Reading::Missing(Absence::Unavailable(err.to_string()))
        }
    }
}

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::{collections::HashMap, sync::Mutex};

    struct FakeSource {
        values: HashMap<&'static str, Value>,
        failing: &'static str,
        requested: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(failing: &'static str) -> Self {
            let values = HashMap::from([
                ("pause", json!(false)),
                ("time-pos", json!(12.5)),
                ("duration", json!(300.0)),
                ("volume", json!(80.0)),
                ("filename", json!("clip.mkv")),
                ("media-title", json!("A Clip")),
                ("fullscreen", json!(true)),
                ("percent-pos", json!(4.1)),
            ]);
            Self {
                values,
                failing,
                requested: Mutex::new(vec![]),
            }
        }
    }

    impl PropertySource for FakeSource {
        async fn fetch_property(&self, _screen: Screen, name: &str) -> Result<Value, PlayerError> {
            self.requested.lock().unwrap().push(name.to_string());
            if name == self.failing {
                return Err(PlayerError::Protocol("property unavailable".to_string()));
            }
            Ok(self.values.get(name).cloned().unwrap_or(Value::Null))
        }
    }

    #[tokio::test]
    async fn test_snapshot_fetches_properties_in_order() {
        let source = FakeSource::new("");
        let info = snapshot(&source, Screen::ONE).await;

        assert_eq!(
            *source.requested.lock().unwrap(),
            vec![
                "pause",
                "time-pos",
                "duration",
                "volume",
                "filename",
                "media-title",
                "fullscreen",
                "percent-pos"
            ]
        );
        assert_eq!(info.playing.get(), Some(true));
        assert_eq!(info.paused.get(), Some(false));
        assert_eq!(info.position.get(), Some(12.5));
        assert_eq!(info.filename.value().map(String::as_str), Some("clip.mkv"));
        assert_eq!(info.fullscreen.get(), Some(true));
    }

    #[tokio::test]
    async fn test_snapshot_tolerates_one_failed_property() {
        let source = FakeSource::new("duration");
        let info = snapshot(&source, Screen::TWO).await;

        assert_eq!(
            info.duration,
            Reading::Missing(Absence::Unavailable("property unavailable".to_string()))
        );
        assert_eq!(info.screen, Screen::TWO);
        assert_eq!(info.paused.get(), Some(false));
        assert_eq!(info.position.get(), Some(12.5));
        assert_eq!(info.volume.get(), Some(80.0));
        assert_eq!(info.media_title.value().map(String::as_str), Some("A Clip"));
        assert_eq!(info.percent_pos.get(), Some(4.1));
    }

    #[tokio::test]
    async fn test_snapshot_flags_type_mismatch() {
        let mut source = FakeSource::new("");
        source.values.insert("duration", Value::Null);
        source.values.insert("pause", json!("yes"));

        let info = snapshot(&source, Screen::ONE).await;
        assert_eq!(
            info.duration.absence(),
            Some(&Absence::Mismatch { expected: "number" })
        );
        assert!(!info.paused.is_present());
        assert!(!info.playing.is_present());
    }

    #[tokio::test]
    async fn test_snapshot_serializes_missing_as_null() {
        let source = FakeSource::new("media-title");
        let info = snapshot(&source, Screen::ONE).await;
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["screen"], json!(1));
        assert_eq!(json["media_title"], Value::Null);
        assert_eq!(json["volume"], json!(80.0));
        assert_eq!(json["playing"], json!(true));
    }
}
