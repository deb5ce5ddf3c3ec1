//! Simulated output: the development-machine stand-in for relays and PWM.
//!
//! Logs what the hardware would have done and remembers the last frame.

use log::{debug, info};

use crate::app::ports::{OutputSink, Resolution};
use crate::channels::{CHANNEL_COUNT, ChannelState};
use crate::error::OutputError;

pub struct SimulatedOutput {
    resolution: Resolution,
    current: ChannelState,
    applied: u64,
}

impl SimulatedOutput {
    pub fn new(resolution: Resolution) -> Self {
        info!("Simulated {} output: no hardware will be driven", resolution);
        Self {
            resolution,
            current: ChannelState::dark(),
            applied: 0,
        }
    }

    pub fn current(&self) -> ChannelState {
        self.current
    }

    /// Frames applied so far.
    pub fn applied(&self) -> u64 {
        self.applied
    }
}

impl OutputSink for SimulatedOutput {
    fn apply(&mut self, frame: &ChannelState) -> Result<(), OutputError> {
        for idx in 0..CHANNEL_COUNT {
            let (was, now) = (self.current[idx], frame[idx]);
            if was == now {
                continue;
            }
            // Lights are numbered from 1 for humans.
            match self.resolution {
                Resolution::Binary => {
                    info!("Light {} {}", idx + 1, if now > 0 { "ON" } else { "OFF" });
                }
                Resolution::Pwm => debug!("Light {} -> {}", idx + 1, now),
            }
        }
        self.current = *frame;
        self.applied += 1;
        Ok(())
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }
}
