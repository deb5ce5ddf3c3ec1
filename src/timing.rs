//! Live-tunable timing knobs shared between the control surface and the
//! running behavior session.
//!
//! Every field is an independent atomic scalar.  Writers store, the session
//! loads on each tick; there is no cross-field snapshot and none is needed,
//! a frame computed from a field a few milliseconds stale is harmless.

use core::sync::atomic::{AtomicI8, AtomicU8, AtomicU32, Ordering};
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::Resolution;
use crate::channels::Intensity;
use crate::error::InputError;

/// Shortest phase any behavior will run.
pub const MIN_ADJUSTED_SECS: f32 = 0.1;

/// Floor for `minimum_on_time` on PWM outputs.
pub const MIN_ON_TIME_PWM_SECS: f32 = 0.1;

/// Upper clamp for `minimum_on_time` (keeps `Duration` conversion finite).
pub const MAX_ON_TIME_SECS: f32 = 3600.0;

/// Smallest divisor applied by the speed adjustment.  Caps how far a
/// negative speed can stretch a phase (at -100 % a phase is 10x longer).
const MIN_SPEED_DIVISOR: f32 = 0.1;

/// Effective phase length after applying `speed_adjustment` (percent) to
/// `minimum_on_time` (seconds).
///
/// Positive speed shortens phases, negative speed lengthens them.  The
/// result never drops below [`MIN_ADJUSTED_SECS`].
pub fn adjusted_duration(minimum_on_time: f32, speed_adjustment: i8) -> Duration {
    let speed = f32::from(speed_adjustment.clamp(-100, 100));
    let divisor = (1.0 + speed / 100.0).max(MIN_SPEED_DIVISOR);
    let on_time = minimum_on_time.clamp(0.0, MAX_ON_TIME_SECS);
    Duration::from_secs_f32((on_time / divisor).max(MIN_ADJUSTED_SECS))
}

/// Dim and bright limits used by the fading behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntensityBounds {
    pub min: Intensity,
    pub max: Intensity,
}

impl IntensityBounds {
    pub const FULL: Self = Self { min: 0, max: 255 };

    pub fn new(min: Intensity, max: Intensity) -> Result<Self, InputError> {
        if min > max || max == 0 {
            return Err(InputError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }
}

/// Copy of every timing field at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingSnapshot {
    pub minimum_on_time: f32,
    pub speed_adjustment: i8,
    pub min_intensity: Intensity,
    pub max_intensity: Intensity,
}

impl TimingSnapshot {
    pub fn adjusted_duration(&self) -> Duration {
        adjusted_duration(self.minimum_on_time, self.speed_adjustment)
    }
}

/// Shared timing configuration.
pub struct TimingConfig {
    minimum_on_time_bits: AtomicU32,
    speed_adjustment: AtomicI8,
    min_intensity: AtomicU8,
    max_intensity: AtomicU8,
    on_time_floor: f32,
}

impl TimingConfig {
    /// Build from initial values.  Out-of-range inputs are clamped the same
    /// way the setters clamp them.
    pub fn new(
        resolution: Resolution,
        minimum_on_time: f32,
        speed_adjustment: i8,
        bounds: IntensityBounds,
    ) -> Self {
        let on_time_floor = match resolution {
            Resolution::Binary => 0.0,
            Resolution::Pwm => MIN_ON_TIME_PWM_SECS,
        };
        let timing = Self {
            minimum_on_time_bits: AtomicU32::new(0),
            speed_adjustment: AtomicI8::new(0),
            min_intensity: AtomicU8::new(bounds.min),
            max_intensity: AtomicU8::new(bounds.max),
            on_time_floor,
        };
        timing.set_minimum_on_time(minimum_on_time);
        timing.set_speed_adjustment(i32::from(speed_adjustment));
        timing
    }

    /// Store a new minimum on-time, clamped to the resolution's floor.
    /// Returns the value actually stored.
    pub fn set_minimum_on_time(&self, secs: f32) -> f32 {
        // f32::max discards NaN, so a NaN request lands on the floor.
        let stored = secs.max(self.on_time_floor).min(MAX_ON_TIME_SECS);
        self.minimum_on_time_bits
            .store(stored.to_bits(), Ordering::Relaxed);
        stored
    }

    /// Store a new speed adjustment, clamped to [-100, 100] percent.
    pub fn set_speed_adjustment(&self, percent: i32) -> i8 {
        let stored = percent.clamp(-100, 100) as i8;
        self.speed_adjustment.store(stored, Ordering::Relaxed);
        stored
    }

    pub fn set_bounds(&self, bounds: IntensityBounds) {
        self.max_intensity.store(bounds.max, Ordering::Relaxed);
        self.min_intensity.store(bounds.min, Ordering::Relaxed);
    }

    pub fn minimum_on_time(&self) -> f32 {
        f32::from_bits(self.minimum_on_time_bits.load(Ordering::Relaxed))
    }

    pub fn speed_adjustment(&self) -> i8 {
        self.speed_adjustment.load(Ordering::Relaxed)
    }

    pub fn max_intensity(&self) -> Intensity {
        self.max_intensity.load(Ordering::Relaxed)
    }

    /// Current bounds.  A reader racing `set_bounds` may observe a torn pair;
    /// `min` is capped at `max` so the pair stays usable.
    pub fn bounds(&self) -> IntensityBounds {
        let max = self.max_intensity.load(Ordering::Relaxed);
        let min = self.min_intensity.load(Ordering::Relaxed).min(max);
        IntensityBounds { min, max }
    }

    /// Phase length for the next tick.
    pub fn adjusted_duration(&self) -> Duration {
        adjusted_duration(self.minimum_on_time(), self.speed_adjustment())
    }

    pub fn snapshot(&self) -> TimingSnapshot {
        let bounds = self.bounds();
        TimingSnapshot {
            minimum_on_time: self.minimum_on_time(),
            speed_adjustment: self.speed_adjustment(),
            min_intensity: bounds.min,
            max_intensity: bounds.max,
        }
    }
}
