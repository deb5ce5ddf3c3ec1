//! Hardware outputs over `embedded-hal` 1.0 traits.
//!
//! | Sink        | Trait               | Resolution | Level mapping            |
//! |-------------|---------------------|------------|--------------------------|
//! | `RelayBank` | `digital::OutputPin`| Binary     | `0` → low, else high     |
//! | `PwmBank`   | `pwm::SetDutyCycle` | PWM        | `v / 255` of full duty   |
//!
//! Each frame writes every channel once.  A failing channel does not stop
//! the others; the first error is returned to the engine, which logs it and
//! carries on with the next tick.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use crate::app::ports::{OutputSink, Resolution};
use crate::channels::{CHANNEL_COUNT, ChannelState, Intensity};
use crate::error::OutputError;

// ───────────────────────────────────────────────────────────────
// Relay bank
// ───────────────────────────────────────────────────────────────

/// Four relays on GPIO pins, active high.
pub struct RelayBank<P> {
    pins: [P; CHANNEL_COUNT],
}

impl<P: OutputPin> RelayBank<P> {
    /// Take ownership of the pins and switch every relay off.
    pub fn new(mut pins: [P; CHANNEL_COUNT]) -> Result<Self, OutputError> {
        for pin in &mut pins {
            pin.set_low().map_err(|_| OutputError::GpioWriteFailed)?;
        }
        Ok(Self { pins })
    }

    pub fn release(self) -> [P; CHANNEL_COUNT] {
        self.pins
    }
}

impl<P: OutputPin + Send + 'static> OutputSink for RelayBank<P> {
    fn apply(&mut self, frame: &ChannelState) -> Result<(), OutputError> {
        let mut result = Ok(());
        for (idx, (pin, level)) in self.pins.iter_mut().zip(frame.iter()).enumerate() {
            let written = if level > 0 { pin.set_high() } else { pin.set_low() };
            if let Err(e) = written {
                debug!("relay {}: {:?}", idx + 1, e);
                result = result.and(Err(OutputError::GpioWriteFailed));
            }
        }
        result
    }

    fn resolution(&self) -> Resolution {
        Resolution::Binary
    }
}

// ───────────────────────────────────────────────────────────────
// PWM bank
// ───────────────────────────────────────────────────────────────

/// Four dimmable channels (LEDC, PCA9685, a serial PWM bridge, ...).
pub struct PwmBank<P> {
    channels: [P; CHANNEL_COUNT],
}

impl<P: SetDutyCycle> PwmBank<P> {
    /// Take ownership of the channels and switch every output off.
    pub fn new(mut channels: [P; CHANNEL_COUNT]) -> Result<Self, OutputError> {
        for ch in &mut channels {
            ch.set_duty_cycle_fully_off()
                .map_err(|_| OutputError::PwmWriteFailed)?;
        }
        Ok(Self { channels })
    }

    pub fn release(self) -> [P; CHANNEL_COUNT] {
        self.channels
    }
}

impl<P: SetDutyCycle + Send + 'static> OutputSink for PwmBank<P> {
    fn apply(&mut self, frame: &ChannelState) -> Result<(), OutputError> {
        let mut result = Ok(());
        for (idx, (ch, level)) in self.channels.iter_mut().zip(frame.iter()).enumerate() {
            let written = ch.set_duty_cycle_fraction(u16::from(level), u16::from(Intensity::MAX));
            if let Err(e) = written {
                debug!("pwm {}: {:?}", idx + 1, e);
                result = result.and(Err(OutputError::PwmWriteFailed));
            }
        }
        result
    }

    fn resolution(&self) -> Resolution {
        Resolution::Pwm
    }
}
