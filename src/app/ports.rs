//! Port traits: the boundary between the behavior engine and the outside
//! world.
//!
//! ```text
//!   BehaviorEngine ──▶ OutputSink      (relays, PWM, simulation)
//!                  ──▶ ChangeNotifier  (log, observer queues, push)
//! ```
//!
//! Adapters in [`crate::adapters`] implement these traits.  The
//! [`BehaviorEngine`](crate::engine::BehaviorEngine) is generic over them,
//! so the engine never touches hardware directly and tests run against
//! recording mocks.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::channels::ChannelState;
use crate::engine::EngineSnapshot;
use crate::error::{Error, OutputError};

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: engine → hardware)
// ───────────────────────────────────────────────────────────────

/// How finely an output can express intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// On/off relays: only `0` and `max_intensity` are meaningful.
    Binary,
    /// 8-bit duty cycle; behaviors fade between levels.
    #[default]
    Pwm,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::Pwm => write!(f, "pwm"),
        }
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" | "relay" => Ok(Self::Binary),
            "pwm" => Ok(Self::Pwm),
            _ => Err(Error::Config("resolution must be `binary` or `pwm`")),
        }
    }
}

/// Write-side port: applies a full channel frame to the physical lights.
///
/// Called once per tick while a behavior runs and once per manual write.
/// Implementations make a single attempt; the engine never retries.
pub trait OutputSink: Send + 'static {
    /// Drive every channel to the given intensities.
    fn apply(&mut self, frame: &ChannelState) -> Result<(), OutputError>;

    /// Capability used to pick fading or toggle-only behavior paths.
    fn resolution(&self) -> Resolution;
}

impl OutputSink for Box<dyn OutputSink> {
    fn apply(&mut self, frame: &ChannelState) -> Result<(), OutputError> {
        (**self).apply(frame)
    }

    fn resolution(&self) -> Resolution {
        (**self).resolution()
    }
}

// ───────────────────────────────────────────────────────────────
// Notification port (driven adapter: engine → observers)
// ───────────────────────────────────────────────────────────────

/// Identifies one attached observer (a browser tab, a serial console).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u32);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Publishes channel frames to whoever is watching.
///
/// The engine only calls [`publish`](Self::publish) when the frame differs
/// from the last one published, so implementations can forward blindly.
pub trait ChangeNotifier: Send + 'static {
    /// Broadcast a changed frame to every observer.
    fn publish(&mut self, frame: &ChannelState);

    /// Send the full engine state to a single, newly attached observer.
    fn publish_initial(&mut self, observer: ObserverId, snapshot: &EngineSnapshot);
}

impl ChangeNotifier for Box<dyn ChangeNotifier> {
    fn publish(&mut self, frame: &ChannelState) {
        (**self).publish(frame);
    }

    fn publish_initial(&mut self, observer: ObserverId, snapshot: &EngineSnapshot) {
        (**self).publish_initial(observer, snapshot);
    }
}
