//! Unified error types for the light controller.
//!
//! A single `Error` enum that every subsystem converts into, so the control
//! surface and the host binary handle failures uniformly.  All variants are
//! `Copy` so they pass through the engine and the request codec without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A request was rejected before any state was touched.
    Input(InputError),
    /// The output sink could not apply a frame.
    Output(OutputError),
    /// A behavior session could not be started.
    Session(SessionError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(e) => write!(f, "input: {e}"),
            Self::Output(e) => write!(f, "output: {e}"),
            Self::Session(e) => write!(f, "session: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// Channel index is outside `[0, CHANNEL_COUNT)`.
    ChannelOutOfRange(usize),
    /// Intensity exceeds the configured maximum.
    IntensityOutOfRange { value: u8, max: u8 },
    /// Binary sinks accept only fully off or fully on.
    NotBinaryLevel(u8),
    /// `min_intensity > max_intensity`, or `max_intensity == 0`.
    InvalidBounds { min: u8, max: u8 },
    /// Behavior name not recognised.
    UnknownBehavior,
    /// Request payload could not be decoded.
    MalformedRequest,
    /// Request carried neither an `action` nor a `value`.
    MissingLevel,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelOutOfRange(idx) => write!(f, "channel {idx} out of range"),
            Self::IntensityOutOfRange { value, max } => {
                write!(f, "intensity {value} above maximum {max}")
            }
            Self::NotBinaryLevel(value) => {
                write!(f, "intensity {value} not supported by an on/off output")
            }
            Self::InvalidBounds { min, max } => {
                write!(f, "invalid intensity bounds {min}..={max}")
            }
            Self::UnknownBehavior => write!(f, "unknown behavior"),
            Self::MalformedRequest => write!(f, "malformed request"),
            Self::MissingLevel => write!(f, "request needs an action or a value"),
        }
    }
}

impl From<InputError> for Error {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

// ---------------------------------------------------------------------------
// Output errors
// ---------------------------------------------------------------------------

/// Failures reported by an [`OutputSink`](crate::app::ports::OutputSink).
///
/// These never stop a running behavior: the session logs them and tries
/// again on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    /// A relay GPIO could not be driven.
    GpioWriteFailed,
    /// A PWM duty-cycle write failed.
    PwmWriteFailed,
    /// The output device is gone (unplugged serial bridge, closed handle).
    Disconnected,
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::Disconnected => write!(f, "output disconnected"),
        }
    }
}

impl From<OutputError> for Error {
    fn from(e: OutputError) -> Self {
        Self::Output(e)
    }
}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The OS refused to create the session thread.
    SpawnFailed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnFailed => write!(f, "behavior thread could not be spawned"),
        }
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
