//! Log-based change notifier.
//!
//! Implements [`ChangeNotifier`] by writing frames to the logger.  Used by
//! the host binary where the "observers" are whoever tails the console.

use log::{debug, info};

use crate::app::ports::{ChangeNotifier, ObserverId};
use crate::channels::ChannelState;
use crate::engine::EngineSnapshot;

/// Adapter that logs every published frame.
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier for LogNotifier {
    fn publish(&mut self, frame: &ChannelState) {
        debug!("LIGHTS | {:?}", frame.as_array());
    }

    fn publish_initial(&mut self, observer: ObserverId, snapshot: &EngineSnapshot) {
        info!(
            "ATTACH | {} | lights={:?} behavior={} phase={:.2}s speed={}% bounds={}..={} all_lights={}",
            observer,
            snapshot.lights.as_array(),
            snapshot.behavior,
            snapshot.timing.minimum_on_time,
            snapshot.timing.speed_adjustment,
            snapshot.timing.min_intensity,
            snapshot.timing.max_intensity,
            snapshot.all_lights,
        );
    }
}
