//! Behavior sessions: one background thread per running pattern.
//!
//! ```text
//!  control thread                      session thread
//!  ──────────────                      ──────────────
//!  spawn ───────────────────────────▶  loop {
//!                                        cancelled? ─▶ exit
//!                                        lock output
//!                                        cancelled? ─▶ exit
//!                                        render · apply · publish
//!                                        park(tick)
//!  cancel_and_join ── flag + unpark ─▶  }
//!        └──────────── join ◀────────── exit
//! ```
//!
//! The flag is checked again after the output lock is taken, so once
//! `cancel_and_join` returns no frame from the session can reach the sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, error};

use crate::app::ports::{ChangeNotifier, OutputSink};
use crate::behavior::{Behavior, BehaviorKind, PhaseClock};

use super::Shared;

/// Cooperative cancellation flag shared with one session thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle to a running behavior.  Dropping it without
/// [`cancel_and_join`](Self::cancel_and_join) would leak the thread, so the
/// engine always joins explicitly.
pub struct BehaviorSession {
    id: u64,
    kind: BehaviorKind,
    started: Instant,
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

impl BehaviorSession {
    pub(super) fn spawn<S, N>(
        id: u64,
        behavior: Box<dyn Behavior>,
        shared: Arc<Shared<S, N>>,
    ) -> std::io::Result<Self>
    where
        S: OutputSink,
        N: ChangeNotifier,
    {
        let kind = behavior.kind();
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let started = Instant::now();
        let handle = thread::Builder::new()
            .name(format!("behavior-{kind}"))
            .spawn(move || run(id, behavior.as_ref(), &shared, &token, started))?;
        Ok(Self {
            id,
            kind,
            started,
            cancel,
            handle,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> BehaviorKind {
        self.kind
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// `true` once the thread has exited, cancelled or not.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the session to stop and block until its thread has exited.
    /// Worst-case latency is one tick interval.
    pub fn cancel_and_join(self) {
        self.cancel.cancel();
        self.handle.thread().unpark();
        if self.handle.join().is_err() {
            error!("{} session #{} panicked", self.kind, self.id);
        } else {
            debug!(
                "{} session #{} joined after {:?}",
                self.kind,
                self.id,
                self.started.elapsed()
            );
        }
    }
}

fn run<S, N>(
    id: u64,
    behavior: &dyn Behavior,
    shared: &Shared<S, N>,
    cancel: &CancelToken,
    started: Instant,
) where
    S: OutputSink,
    N: ChangeNotifier,
{
    let mut clock = PhaseClock::new(started, behavior.phase_count());
    let mut frames: u64 = 0;

    while !cancel.is_cancelled() {
        {
            let mut stage = shared.lock_output();
            if cancel.is_cancelled() {
                break;
            }
            // Timing is re-read every tick, under the output lock that
            // `set_intensity_bounds` holds while it conforms the channels.
            let period = shared.timing.adjusted_duration();
            let bounds = shared.timing.bounds();
            let mut frame = stage.channels;
            clock.render(behavior, Instant::now(), period, bounds, &mut frame);
            stage.channels = frame;
            stage.flush();
        }
        frames += 1;
        thread::park_timeout(shared.tick);
    }

    debug!("{} session #{id} exiting after {frames} frames", behavior.kind());
}
