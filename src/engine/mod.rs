//! Behavior engine: owner of the channel bank and the single running
//! behavior session.
//!
//! ```text
//!  control surface ──▶ ┌──────────────────────────────┐ ──▶ OutputSink
//!                      │        BehaviorEngine         │
//!                      │  Control: kind · session ·    │ ──▶ ChangeNotifier
//!                      │           all-lights flag     │
//!                      │  Shared:  channels · timing   │
//!                      └──────────────┬───────────────┘
//!                                     │ spawn / cancel+join
//!                                     ▼
//!                              BehaviorSession thread
//! ```
//!
//! ## Ownership
//!
//! Channel values are written either by the live session thread or, when no
//! session runs, by the caller of an engine operation.  Every operation that
//! writes channels first cancels and joins the session, so the two writers
//! never overlap.
//!
//! ## Lock order
//!
//! `control` before `output`.  The session thread only ever takes `output`,
//! which lets the control thread hold `control` while it joins.

pub mod session;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ChangeNotifier, ObserverId, OutputSink, Resolution};
use crate::behavior::{self, Behavior, BehaviorKind};
use crate::channels::{self, ChannelState, Intensity};
use crate::config::LightConfig;
use crate::error::{OutputError, Result, SessionError};
use crate::timing::{IntensityBounds, TimingConfig, TimingSnapshot};

pub use session::{BehaviorSession, CancelToken};

// ───────────────────────────────────────────────────────────────
// Snapshot
// ───────────────────────────────────────────────────────────────

/// Immutable copy of everything an observer needs to render the lights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub lights: ChannelState,
    pub behavior: BehaviorKind,
    pub timing: TimingSnapshot,
    pub all_lights: bool,
    pub resolution: Resolution,
}

// ───────────────────────────────────────────────────────────────
// Shared state (engine ↔ session thread)
// ───────────────────────────────────────────────────────────────

/// Channel bank plus the ports it is flushed to.
pub(crate) struct OutputStage<S, N> {
    pub(crate) channels: ChannelState,
    published: Option<ChannelState>,
    sink: S,
    notifier: N,
    fault: Option<OutputError>,
}

impl<S: OutputSink, N: ChangeNotifier> OutputStage<S, N> {
    /// Apply the current channels to the sink (single attempt) and publish
    /// them if they differ from the last published frame.
    pub(crate) fn flush(&mut self) {
        match self.sink.apply(&self.channels) {
            Ok(()) => {
                if let Some(err) = self.fault.take() {
                    info!("output recovered ({err} cleared)");
                }
            }
            Err(err) => {
                if self.fault.is_none() {
                    warn!("output write failed: {err}; continuing from in-memory state");
                }
                self.fault = Some(err);
            }
        }

        if self.published != Some(self.channels) {
            self.notifier.publish(&self.channels);
            self.published = Some(self.channels);
        }
    }
}

pub(crate) struct Shared<S, N> {
    output: Mutex<OutputStage<S, N>>,
    pub(crate) timing: TimingConfig,
    pub(crate) resolution: Resolution,
    pub(crate) tick: Duration,
}

impl<S, N> Shared<S, N> {
    pub(crate) fn lock_output(&self) -> MutexGuard<'_, OutputStage<S, N>> {
        // The stage is a plain array plus ports; a panic mid-frame leaves it
        // usable.
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ───────────────────────────────────────────────────────────────
// Control state (engine only)
// ───────────────────────────────────────────────────────────────

struct Control {
    kind: BehaviorKind,
    session: Option<BehaviorSession>,
    /// Last bulk write set every channel to max.
    all_lights: bool,
    next_session_id: u64,
}

// ───────────────────────────────────────────────────────────────
// BehaviorEngine
// ───────────────────────────────────────────────────────────────

/// The exclusive, cancellable state machine that drives the lights.
///
/// Every operation takes `&self`; share the engine with the control surface
/// through an `Arc`.  Concurrent callers are serialised, last write wins.
pub struct BehaviorEngine<S: OutputSink, N: ChangeNotifier> {
    shared: Arc<Shared<S, N>>,
    control: Mutex<Control>,
}

impl<S: OutputSink, N: ChangeNotifier> BehaviorEngine<S, N> {
    /// Build the engine in `Default` with every channel off, and push that
    /// dark frame to the sink.
    ///
    /// The sink's own [`Resolution`] wins over `config.resolution`.
    pub fn new(config: &LightConfig, sink: S, notifier: N) -> Result<Self> {
        config.validate()?;

        let resolution = sink.resolution();
        if resolution != config.resolution {
            warn!(
                "config asks for {} output but the sink is {}; using {}",
                config.resolution, resolution, resolution
            );
        }

        let timing = TimingConfig::new(
            resolution,
            config.minimum_on_time_secs,
            config.speed_adjustment_percent,
            config.bounds(),
        );

        let shared = Arc::new(Shared {
            output: Mutex::new(OutputStage {
                channels: ChannelState::dark(),
                published: None,
                sink,
                notifier,
                fault: None,
            }),
            timing,
            resolution,
            tick: config.tick_interval(),
        });
        shared.lock_output().flush();

        info!(
            "engine ready: {} output, tick {:?}, phase {:?}",
            resolution,
            shared.tick,
            shared.timing.adjusted_duration()
        );

        Ok(Self {
            shared,
            control: Mutex::new(Control {
                kind: BehaviorKind::Default,
                session: None,
                all_lights: false,
                next_session_id: 1,
            }),
        })
    }

    // ── Manual control ────────────────────────────────────────

    /// Set one channel.  Stops any running behavior first; manual control
    /// always wins over a pattern.
    pub fn set_channel(&self, index: usize, value: Intensity) -> Result<()> {
        let index = channels::check_index(index)?;
        let value = channels::check_level(
            value,
            self.shared.timing.max_intensity(),
            self.shared.resolution,
        )?;

        let mut control = self.lock_control();
        self.stop_session(&mut control);

        let mut stage = self.shared.lock_output();
        stage.channels[index] = value;
        stage.flush();
        debug!("channel {index} = {value}");
        Ok(())
    }

    /// Set every channel to `value` and remember whether that was "all on".
    pub fn set_all_channels(&self, value: Intensity) -> Result<()> {
        let max = self.shared.timing.max_intensity();
        let value = channels::check_level(value, max, self.shared.resolution)?;

        let mut control = self.lock_control();
        self.stop_session(&mut control);
        control.all_lights = value == max;

        let mut stage = self.shared.lock_output();
        stage.channels.fill(value);
        stage.flush();
        debug!("all channels = {value} (all_lights={})", control.all_lights);
        Ok(())
    }

    // ── Behavior transitions ──────────────────────────────────

    /// Switch to `kind`.  Same kind is a no-op.
    ///
    /// The running session is cancelled and joined before anything else
    /// happens.  Entering a timed behavior zeroes every channel first;
    /// entering `Default` restores all-max or all-off from the all-lights
    /// flag.
    pub fn set_behavior_kind(&self, kind: BehaviorKind) -> Result<BehaviorKind> {
        let mut control = self.lock_control();
        if control.kind == kind {
            debug!("behavior already {kind}");
            return Ok(kind);
        }

        let previous = control.kind;
        self.stop_session(&mut control);

        match behavior::for_kind(kind, self.shared.resolution) {
            None => {
                let level = if control.all_lights {
                    self.shared.timing.max_intensity()
                } else {
                    0
                };
                let mut stage = self.shared.lock_output();
                stage.channels.fill(level);
                stage.flush();
            }
            Some(behavior) => {
                {
                    let mut stage = self.shared.lock_output();
                    stage.channels.fill(0);
                    stage.flush();
                }
                self.start_session(&mut control, behavior)?;
            }
        }

        info!("behavior {previous} -> {kind}");
        Ok(kind)
    }

    // ── Timing ────────────────────────────────────────────────

    /// Returns the stored (clamped) percentage.
    pub fn set_speed_adjustment(&self, percent: i32) -> i8 {
        let stored = self.shared.timing.set_speed_adjustment(percent);
        info!(
            "speed adjustment {stored}% (phase {:?})",
            self.shared.timing.adjusted_duration()
        );
        stored
    }

    /// Returns the stored (clamped) on-time in seconds.
    pub fn set_minimum_on_time(&self, secs: f32) -> f32 {
        let stored = self.shared.timing.set_minimum_on_time(secs);
        info!(
            "minimum on-time {stored:.2}s (phase {:?})",
            self.shared.timing.adjusted_duration()
        );
        stored
    }

    /// Change the fade bounds.  Channels above the new maximum are pulled
    /// down to it (on-off outputs: every lit channel moves to the new
    /// maximum) and the result is flushed.  A running session keeps going
    /// and picks the bounds up on its next tick.
    pub fn set_intensity_bounds(&self, min: Intensity, max: Intensity) -> Result<IntensityBounds> {
        let bounds = IntensityBounds::new(min, max)?;

        let _control = self.lock_control();
        let mut stage = self.shared.lock_output();
        self.shared.timing.set_bounds(bounds);
        if stage.channels.conform(max, self.shared.resolution) {
            debug!("channels conformed to new maximum: {:?}", stage.channels.as_array());
            stage.flush();
        }
        info!("intensity bounds {min}..={max}");
        Ok(bounds)
    }

    // ── Observers ─────────────────────────────────────────────

    /// Send the current state to a newly attached observer.
    ///
    /// The snapshot is taken and delivered under the output lock, so no
    /// frame can be published between the two.
    pub fn attach_observer(&self, observer: ObserverId) {
        let control = self.lock_control();
        let mut stage = self.shared.lock_output();
        let snapshot = self.build_snapshot(&control, stage.channels);
        stage.notifier.publish_initial(observer, &snapshot);
        debug!("{observer} attached");
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn snapshot(&self) -> EngineSnapshot {
        let control = self.lock_control();
        let channels = self.shared.lock_output().channels;
        self.build_snapshot(&control, channels)
    }

    pub fn current_kind(&self) -> BehaviorKind {
        self.lock_control().kind
    }

    /// `true` while a session thread is alive.  A session whose thread has
    /// died (panicked) counts as inactive even before it is joined.
    pub fn is_session_active(&self) -> bool {
        self.lock_control()
            .session
            .as_ref()
            .is_some_and(|session| !session.is_finished())
    }

    /// Id of the live session, if any.  Ids grow with every start.
    pub fn session_id(&self) -> Option<u64> {
        self.lock_control().session.as_ref().map(BehaviorSession::id)
    }

    /// Live full-brightness level, as used to resolve "on".
    pub fn max_intensity(&self) -> Intensity {
        self.shared.timing.max_intensity()
    }

    pub fn resolution(&self) -> Resolution {
        self.shared.resolution
    }

    pub fn tick_interval(&self) -> Duration {
        self.shared.tick
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Cancel and join any live session.  The engine stays usable; the
    /// kind drops back to `Default` without touching the channels.
    pub fn shutdown(&self) {
        let mut control = self.lock_control();
        if control.session.is_some() {
            info!("shutting down {} session", control.kind);
        }
        self.stop_session(&mut control);
    }

    // ── Internal ──────────────────────────────────────────────

    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build_snapshot(&self, control: &Control, channels: ChannelState) -> EngineSnapshot {
        EngineSnapshot {
            lights: channels,
            behavior: control.kind,
            timing: self.shared.timing.snapshot(),
            all_lights: control.all_lights,
            resolution: self.shared.resolution,
        }
    }

    /// Cancel + join the live session, if any, and fall back to `Default`.
    fn stop_session(&self, control: &mut Control) {
        if let Some(session) = control.session.take() {
            let kind = session.kind();
            session.cancel_and_join();
            info!("{kind} stopped");
        }
        control.kind = BehaviorKind::Default;
    }

    fn start_session(&self, control: &mut Control, behavior: Box<dyn Behavior>) -> Result<()> {
        // A live session here means the cancel-and-join discipline was
        // broken somewhere above.
        debug_assert!(
            control.session.is_none(),
            "concurrency violation: session started before the previous one was joined"
        );
        if let Some(stale) = control.session.take() {
            error!(
                "concurrency violation: {} session #{} still live; joining it",
                stale.kind(),
                stale.id()
            );
            stale.cancel_and_join();
        }

        let kind = behavior.kind();
        let id = control.next_session_id;
        control.next_session_id += 1;

        match BehaviorSession::spawn(id, behavior, Arc::clone(&self.shared)) {
            Ok(session) => {
                info!("{kind} session #{id} started");
                control.session = Some(session);
                control.kind = kind;
                Ok(())
            }
            Err(err) => {
                error!("could not start {kind} session: {err}");
                Err(SessionError::SpawnFailed.into())
            }
        }
    }
}

impl<S: OutputSink, N: ChangeNotifier> Drop for BehaviorEngine<S, N> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
