//! Linear fade math shared by the fading behaviors.

use core::time::Duration;

use crate::channels::Intensity;

/// Fraction of `period` covered by `elapsed`, clamped to `[0, 1]`.
/// A zero-length period counts as already complete.
pub fn progress(elapsed: Duration, period: Duration) -> f32 {
    if period.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / period.as_secs_f32()).clamp(0.0, 1.0)
}

/// Progress of a fade that only starts once `progress` passes `delay`,
/// rescaled over the remaining `1 - delay` of the phase.
pub fn delayed_progress(progress: f32, delay: f32) -> f32 {
    if progress <= delay || delay >= 1.0 {
        return 0.0;
    }
    ((progress - delay) / (1.0 - delay)).min(1.0)
}

/// Linear interpolation between two intensities; `t` is clamped to `[0, 1]`.
///
/// Exact at both ends and monotonic in `t`.
pub fn lerp(from: Intensity, to: Intensity, t: f32) -> Intensity {
    let t = t.clamp(0.0, 1.0);
    let from_f = f32::from(from);
    let value = from_f + (f32::from(to) - from_f) * t;
    value.round().clamp(0.0, 255.0) as Intensity
}
