//! Inbound requests from the control surface.
//!
//! One JSON object per request, tagged by `cmd`:
//!
//! ```text
//! {"cmd": "control-light", "light": 2, "action": "on"}
//! {"cmd": "control-light", "light": 3, "value": 128}
//! {"cmd": "turn-all-lights", "action": "off"}
//! {"cmd": "set-behavior", "behavior": "marquee"}
//! {"cmd": "set-minimum-on-time", "time": 1.5}
//! {"cmd": "set-speed", "percent": 40}
//! {"cmd": "set-intensity-bounds", "min": 10, "max": 200}
//! {"cmd": "get-state"}
//! ```
//!
//! Lights are numbered from 1 on the wire and from 0 inside the engine.
//! Everything malformed is rejected here, before the engine is called.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ChangeNotifier, OutputSink};
use crate::behavior::BehaviorKind;
use crate::channels::{CHANNEL_COUNT, Intensity};
use crate::engine::{BehaviorEngine, EngineSnapshot};
use crate::error::{Error, InputError, Result};

// ───────────────────────────────────────────────────────────────
// Wire format
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    On,
    Off,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "kebab-case")]
enum Request {
    ControlLight {
        light: usize,
        action: Option<Action>,
        value: Option<Intensity>,
    },
    TurnAllLights {
        action: Option<Action>,
        value: Option<Intensity>,
    },
    SetBehavior {
        behavior: String,
    },
    SetMinimumOnTime {
        time: f32,
    },
    SetSpeed {
        percent: i32,
    },
    SetIntensityBounds {
        min: Intensity,
        max: Intensity,
    },
    GetState,
}

// ───────────────────────────────────────────────────────────────
// Commands
// ───────────────────────────────────────────────────────────────

/// Requested brightness, resolved against the live maximum at execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    On,
    Off,
    Value(Intensity),
}

impl Level {
    fn from_parts(action: Option<Action>, value: Option<Intensity>) -> Result<Self> {
        match (value, action) {
            (Some(v), _) => Ok(Self::Value(v)),
            (None, Some(Action::On)) => Ok(Self::On),
            (None, Some(Action::Off)) => Ok(Self::Off),
            (None, None) => Err(InputError::MissingLevel.into()),
        }
    }

    pub fn resolve(self, max: Intensity) -> Intensity {
        match self {
            Self::On => max,
            Self::Off => 0,
            Self::Value(v) => v,
        }
    }
}

/// A validated request, addressed in engine terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightCommand {
    /// `index` is 0-based.
    SetChannel { index: usize, level: Level },
    SetAll(Level),
    SetBehavior(BehaviorKind),
    SetMinimumOnTime(f32),
    SetSpeed(i32),
    SetIntensityBounds { min: Intensity, max: Intensity },
    GetState,
}

impl LightCommand {
    /// Decode one JSON request.
    pub fn parse(json: &str) -> Result<Self> {
        let request: Request =
            serde_json::from_str(json).map_err(|_| Error::from(InputError::MalformedRequest))?;

        Ok(match request {
            Request::ControlLight {
                light,
                action,
                value,
            } => {
                if light == 0 || light > CHANNEL_COUNT {
                    return Err(InputError::ChannelOutOfRange(light).into());
                }
                Self::SetChannel {
                    index: light - 1,
                    level: Level::from_parts(action, value)?,
                }
            }
            Request::TurnAllLights { action, value } => {
                Self::SetAll(Level::from_parts(action, value)?)
            }
            Request::SetBehavior { behavior } => Self::SetBehavior(behavior.parse()?),
            Request::SetMinimumOnTime { time } => Self::SetMinimumOnTime(time),
            Request::SetSpeed { percent } => Self::SetSpeed(percent),
            Request::SetIntensityBounds { min, max } => Self::SetIntensityBounds { min, max },
            Request::GetState => Self::GetState,
        })
    }

    /// Run the command and return the resulting state.
    pub fn execute<S, N>(self, engine: &BehaviorEngine<S, N>) -> Result<EngineSnapshot>
    where
        S: OutputSink,
        N: ChangeNotifier,
    {
        debug!("executing {:?}", self);
        match self {
            Self::SetChannel { index, level } => {
                engine.set_channel(index, level.resolve(engine.max_intensity()))?;
            }
            Self::SetAll(level) => {
                engine.set_all_channels(level.resolve(engine.max_intensity()))?;
            }
            Self::SetBehavior(kind) => {
                engine.set_behavior_kind(kind)?;
            }
            Self::SetMinimumOnTime(secs) => {
                engine.set_minimum_on_time(secs);
            }
            Self::SetSpeed(percent) => {
                engine.set_speed_adjustment(percent);
            }
            Self::SetIntensityBounds { min, max } => {
                engine.set_intensity_bounds(min, max)?;
            }
            Self::GetState => {}
        }
        Ok(engine.snapshot())
    }
}

// ───────────────────────────────────────────────────────────────
// Replies
// ───────────────────────────────────────────────────────────────

/// What goes back over the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    State(EngineSnapshot),
    Error { error: String },
}

impl Reply {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| String::from(r#"{"error":"reply encoding failed"}"#))
    }
}

impl From<Result<EngineSnapshot>> for Reply {
    fn from(result: Result<EngineSnapshot>) -> Self {
        match result {
            Ok(snapshot) => Self::State(snapshot),
            Err(err) => Self::Error {
                error: err.to_string(),
            },
        }
    }
}

/// Parse, execute and answer one request line.
pub fn handle_request<S, N>(engine: &BehaviorEngine<S, N>, line: &str) -> Reply
where
    S: OutputSink,
    N: ChangeNotifier,
{
    let result = LightCommand::parse(line).and_then(|cmd| cmd.execute(engine));
    if let Err(err) = &result {
        warn!("request rejected: {err}");
    }
    Reply::from(result)
}
