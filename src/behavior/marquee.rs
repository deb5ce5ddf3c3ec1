//! Marquee chase: one channel at a time hands its light to the next.
//!
//! PWM outputs cross-fade: the current channel dims over the whole phase
//! while its successor brightens during the final quarter.  On/off outputs
//! simply light one channel per phase.

use core::time::Duration;

use crate::app::ports::Resolution;
use crate::channels::{CHANNEL_COUNT, ChannelState};
use crate::timing::IntensityBounds;

use super::fade::{delayed_progress, lerp, progress};
use super::{Behavior, BehaviorKind};

/// Fraction of a phase that passes before the successor starts to rise.
pub const OVERLAP_RATIO: f32 = 0.75;

pub struct Marquee {
    resolution: Resolution,
}

impl Marquee {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution }
    }
}

impl Behavior for Marquee {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Marquee
    }

    fn phase_count(&self) -> usize {
        CHANNEL_COUNT
    }

    fn render(
        &self,
        phase: usize,
        elapsed: Duration,
        period: Duration,
        bounds: IntensityBounds,
        frame: &mut ChannelState,
    ) {
        let current = phase % CHANNEL_COUNT;
        let next = (current + 1) % CHANNEL_COUNT;
        match self.resolution {
            Resolution::Pwm => {
                let p = progress(elapsed, period);
                frame[current] = lerp(bounds.max, bounds.min, p);
                frame[next] = lerp(bounds.min, bounds.max, delayed_progress(p, OVERLAP_RATIO));
            }
            Resolution::Binary => {
                frame.fill(0);
                frame[current] = bounds.max;
            }
        }
    }
}
