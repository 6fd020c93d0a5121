//! In-memory property table answering player IPC commands

use play_screen::ipc::{Request, Response};
use serde_json::{json, Map, Value};

pub enum Outcome {
    Continue,
    Quit,
}

pub struct MockPlayer {
    properties: Map<String, Value>,
    fail_property: Option<String>,
    ignore_quit: bool,
}

impl MockPlayer {
    pub fn new(
        source: &str,
        volume: f64,
        fail_property: Option<String>,
        ignore_quit: bool,
    ) -> Self {
        let filename = source
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(source)
            .to_string();

        let mut properties = Map::new();
        properties.insert("path".into(), json!(source));
        properties.insert("filename".into(), json!(filename));
        properties.insert("media-title".into(), json!(filename));
        properties.insert("pause".into(), json!(false));
        properties.insert("time-pos".into(), json!(0.0));
        properties.insert("duration".into(), json!(600.0));
        properties.insert("percent-pos".into(), json!(0.0));
        properties.insert("volume".into(), json!(volume));
        properties.insert("fullscreen".into(), json!(false));
        properties.insert("playlist-pos".into(), json!(0));
        properties.insert("pid".into(), json!(std::process::id()));

        Self {
            properties,
            fail_property,
            ignore_quit,
        }
    }

    pub fn handle(&mut self, request: &Request) -> (Response, Outcome) {
        let Some((verb, args)) = request.command.split_first() else {
            return (Response::failure("invalid parameter"), Outcome::Continue);
        };

        let response = match (verb.as_str(), args) {
            (Some("get_property"), [Value::String(name)]) => self.get(name),
            (Some("set_property"), [Value::String(name), value]) => self.set(name, value.clone()),
            (Some("cycle"), [Value::String(name)]) => self.cycle(name),
            (Some("seek"), [offset, mode]) => self.seek(offset, mode),
            (Some("playlist-next" | "playlist-prev"), _) => Response::success(None),
            (Some("quit"), _) => {
                if self.ignore_quit {
                    return (Response::success(None), Outcome::Continue);
                }
                return (Response::success(None), Outcome::Quit);
            }
            _ => Response::failure("invalid parameter"),
        };

        (response, Outcome::Continue)
    }

    fn get(&self, name: &str) -> Response {
        if self.fail_property.as_deref() == Some(name) {
            return Response::failure("property unavailable");
        }
        match self.properties.get(name) {
            Some(value) => Response::success(value.clone()),
            None => Response::failure("property not found"),
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Response {
        match self.properties.get_mut(name) {
            Some(slot) => {
                *slot = match (name, value.as_f64()) {
                    ("volume", Some(volume)) => json!(volume),
                    _ => value,
                };
                Response::success(None)
            }
            None => Response::failure("property not found"),
        }
    }

    fn cycle(&mut self, name: &str) -> Response {
        match self.properties.get_mut(name) {
            Some(Value::Bool(flag)) => {
                *flag = !*flag;
                Response::success(None)
            }
            Some(_) => Response::failure("unsupported format for accessing property"),
            None => Response::failure("property not found"),
        }
    }

    fn seek(&mut self, offset: &Value, mode: &Value) -> Response {
        let Some(offset) = offset.as_f64() else {
            return Response::failure("invalid parameter");
        };
        let current = self.number("time-pos");
        let duration = self.number("duration");

        let target = match mode.as_str() {
            Some("absolute") => offset,
            Some("relative") => current + offset,
            _ => return Response::failure("invalid parameter"),
        };
        let target = target.clamp(0.0, duration);

        self.properties.insert("time-pos".into(), json!(target));
        self.properties
            .insert("percent-pos".into(), json!(target / duration * 100.0));
        Response::success(None)
    }

    fn number(&self, name: &str) -> f64 {
        self.properties
            .get(name)
            .and_then(Value::as_f64)
            .unwrap_or_default()
    }
}
