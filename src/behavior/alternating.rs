//! Alternating blink: even and odd channels swap places every phase.

use core::time::Duration;

use crate::app::ports::Resolution;
use crate::channels::{CHANNEL_COUNT, ChannelState};
use crate::timing::IntensityBounds;

use super::fade::{lerp, progress};
use super::{Behavior, BehaviorKind};

pub struct Alternating {
    resolution: Resolution,
}

impl Alternating {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution }
    }
}

impl Behavior for Alternating {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Alternating
    }

    fn phase_count(&self) -> usize {
        2
    }

    fn render(
        &self,
        phase: usize,
        elapsed: Duration,
        period: Duration,
        bounds: IntensityBounds,
        frame: &mut ChannelState,
    ) {
        // Phase A dims the even group, phase B the odd group.
        let swapped = phase % 2 == 1;
        let p = progress(elapsed, period);
        for idx in 0..CHANNEL_COUNT {
            let leading = (idx % 2 == 0) != swapped;
            frame[idx] = match (self.resolution, leading) {
                (Resolution::Pwm, true) => lerp(bounds.max, bounds.min, p),
                (Resolution::Pwm, false) => lerp(bounds.min, bounds.max, p),
                (Resolution::Binary, true) => bounds.max,
                (Resolution::Binary, false) => 0,
            };
        }
    }
}
