//! Behavior algorithms: pure functions from (phase, elapsed time, timing)
//! to a channel frame.
//!
//! | Behavior    | Phases | PWM output                      | On/off output             |
//! |-------------|--------|---------------------------------|---------------------------|
//! | Default     | -      | passive, manual writes only     | passive                   |
//! | Marquee     | 4      | cross-fade channel i → i+1      | one channel lit per phase |
//! | Alternating | 2      | even/odd groups fade in and out | even/odd groups toggle    |
//!
//! Behaviors hold no clock of their own.  The session loop owns a
//! [`PhaseClock`] and asks the behavior to render the current phase each
//! tick, so a phase-length change made mid-phase takes effect immediately.

pub mod alternating;
pub mod fade;
pub mod marquee;

use core::fmt;
use core::str::FromStr;
use core::time::Duration;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::app::ports::Resolution;
use crate::channels::ChannelState;
use crate::error::InputError;
use crate::timing::IntensityBounds;

pub use alternating::Alternating;
pub use marquee::{Marquee, OVERLAP_RATIO};

/// The pattern currently driving the lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorKind {
    /// No timed changes; channels follow manual writes.
    #[default]
    Default,
    Marquee,
    Alternating,
}

impl BehaviorKind {
    pub const ALL: [Self; 3] = [Self::Default, Self::Marquee, Self::Alternating];

    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Marquee => "marquee",
            Self::Alternating => "alternating",
        }
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BehaviorKind {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or(InputError::UnknownBehavior)
    }
}

/// A timed pattern.
pub trait Behavior: Send {
    fn kind(&self) -> BehaviorKind;

    /// Number of phases in one full cycle.
    fn phase_count(&self) -> usize;

    /// Write the channels this phase controls for the moment `elapsed`
    /// into a phase of length `period`.  Channels the phase does not own
    /// are left as they are.
    fn render(
        &self,
        phase: usize,
        elapsed: Duration,
        period: Duration,
        bounds: IntensityBounds,
        frame: &mut ChannelState,
    );
}

/// Build the behavior for `kind`.  `Default` is passive and has none.
pub fn for_kind(kind: BehaviorKind, resolution: Resolution) -> Option<Box<dyn Behavior>> {
    match kind {
        BehaviorKind::Default => None,
        BehaviorKind::Marquee => Some(Box::new(Marquee::new(resolution))),
        BehaviorKind::Alternating => Some(Box::new(Alternating::new(resolution))),
    }
}

/// Tracks which phase a running behavior is in and when it began.
#[derive(Debug, Clone)]
pub struct PhaseClock {
    phase: usize,
    phase_start: Instant,
    phases: usize,
}

impl PhaseClock {
    pub fn new(start: Instant, phases: usize) -> Self {
        Self {
            phase: 0,
            phase_start: start,
            phases: phases.max(1),
        }
    }

    pub fn phase(&self) -> usize {
        self.phase
    }

    /// Render the frame for `now`.
    ///
    /// Every phase that ended since the last call is rendered at its final
    /// state before the clock advances, so fades always land exactly on
    /// their end levels.  After a long stall (more than one full cycle
    /// behind) the clock resynchronises to `now` instead of replaying.
    pub fn render(
        &mut self,
        behavior: &dyn Behavior,
        now: Instant,
        period: Duration,
        bounds: IntensityBounds,
        frame: &mut ChannelState,
    ) {
        let mut elapsed = now.saturating_duration_since(self.phase_start);
        let mut completed = 0;
        while elapsed >= period {
            behavior.render(self.phase, period, period, bounds, frame);
            self.phase = (self.phase + 1) % self.phases;
            completed += 1;
            if completed >= self.phases || period.is_zero() {
                self.phase_start = now;
                elapsed = Duration::ZERO;
                break;
            }
            self.phase_start += period;
            elapsed -= period;
        }
        behavior.render(self.phase, elapsed, period, bounds, frame);
    }
}
