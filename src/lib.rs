//! Four-channel light controller.
//!
//! A [`BehaviorEngine`](engine::BehaviorEngine) owns the channel bank and at
//! most one running behavior session.  Commands come in through
//! [`app::commands`]; frames go out through the
//! [`OutputSink`](app::ports::OutputSink) and
//! [`ChangeNotifier`](app::ports::ChangeNotifier) ports.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod behavior;
pub mod channels;
pub mod config;
pub mod engine;
pub mod error;
pub mod timing;

pub use app::ports::{ChangeNotifier, ObserverId, OutputSink, Resolution};
pub use behavior::BehaviorKind;
pub use channels::{CHANNEL_COUNT, ChannelState, Intensity};
pub use config::LightConfig;
pub use engine::{BehaviorEngine, EngineSnapshot};
pub use error::{Error, Result};
