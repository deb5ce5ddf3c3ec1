//! Channel state: the fixed bank of four light intensities.

use core::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::app::ports::Resolution;
use crate::error::InputError;

/// Number of light channels driven by the controller.
pub const CHANNEL_COUNT: usize = 4;

/// Brightness level / duty cycle of one channel.
pub type Intensity = u8;

/// Ordered intensities of every channel.
///
/// The engine owns exactly one of these; every other holder sees a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelState([Intensity; CHANNEL_COUNT]);

impl ChannelState {
    /// All channels off.
    pub const fn dark() -> Self {
        Self([0; CHANNEL_COUNT])
    }

    pub const fn from_array(values: [Intensity; CHANNEL_COUNT]) -> Self {
        Self(values)
    }

    /// Every channel at `value`.
    pub const fn uniform(value: Intensity) -> Self {
        Self([value; CHANNEL_COUNT])
    }

    pub fn fill(&mut self, value: Intensity) {
        self.0 = [value; CHANNEL_COUNT];
    }

    pub fn as_array(&self) -> &[Intensity; CHANNEL_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Intensity> + '_ {
        self.0.iter().copied()
    }

    /// `true` when every channel holds `value`.
    pub fn is_uniform(&self, value: Intensity) -> bool {
        self.0.iter().all(|&v| v == value)
    }

    /// Bring every channel back inside `[0, max]`.  On-off outputs map any
    /// lit channel to `max`.  Returns `true` if anything changed.
    pub fn conform(&mut self, max: Intensity, resolution: Resolution) -> bool {
        let before = self.0;
        for v in &mut self.0 {
            *v = match resolution {
                Resolution::Pwm => (*v).min(max),
                Resolution::Binary if *v > 0 => max,
                Resolution::Binary => 0,
            };
        }
        before != self.0
    }
}

impl Index<usize> for ChannelState {
    type Output = Intensity;

    fn index(&self, idx: usize) -> &Intensity {
        &self.0[idx]
    }
}

impl IndexMut<usize> for ChannelState {
    fn index_mut(&mut self, idx: usize) -> &mut Intensity {
        &mut self.0[idx]
    }
}

/// Reject a channel index outside the bank.
pub fn check_index(index: usize) -> Result<usize, InputError> {
    if index < CHANNEL_COUNT {
        Ok(index)
    } else {
        Err(InputError::ChannelOutOfRange(index))
    }
}

/// Validate a manually requested level against the live maximum.
///
/// Zero is always accepted.  On-off outputs only take `0` or `max`.
pub fn check_level(
    value: Intensity,
    max: Intensity,
    resolution: Resolution,
) -> Result<Intensity, InputError> {
    if value > max {
        return Err(InputError::IntensityOutOfRange { value, max });
    }
    if resolution == Resolution::Binary && value != 0 && value != max {
        return Err(InputError::NotBinaryLevel(value));
    }
    Ok(value)
}
