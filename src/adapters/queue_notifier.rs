//! Queue-backed change notifier.
//!
//! Each attached observer owns a bounded `embassy-sync` channel.  The engine
//! side fans frames out with `try_send`; a full queue drops that frame for
//! that observer only, which is harmless because the next change carries
//! the complete state again.
//!
//! ```text
//!                     ┌──▶ [queue 0] ──▶ observer 0 (try_recv)
//!  engine ─ publish ──┼──▶ [queue 1] ──▶ observer 1
//!                     └──▶ [queue 2] ──▶ observer 2
//! ```

use core::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use log::{debug, warn};

use crate::app::ports::{ChangeNotifier, ObserverId};
use crate::channels::ChannelState;
use crate::engine::EngineSnapshot;

/// Messages queued per observer.
const QUEUE_DEPTH: usize = 8;

/// Maximum simultaneously attached observers.
pub const MAX_OBSERVERS: usize = 8;

/// What an observer receives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObserverMessage {
    /// Full state, sent once right after attaching.
    Initial(EngineSnapshot),
    /// A changed frame.
    Frame(ChannelState),
}

type ObserverQueue = Channel<CriticalSectionRawMutex, ObserverMessage, QUEUE_DEPTH>;

struct Slot {
    id: ObserverId,
    queue: Arc<ObserverQueue>,
}

struct Hub {
    slots: BlockingMutex<CriticalSectionRawMutex, RefCell<Vec<Slot, MAX_OBSERVERS>>>,
    next_id: AtomicU32,
    dropped: AtomicU64,
}

/// Receiving end held by one observer.
pub struct ObserverHandle {
    id: ObserverId,
    queue: Arc<ObserverQueue>,
}

impl ObserverHandle {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Next queued message, if any.
    pub fn try_recv(&self) -> Option<ObserverMessage> {
        self.queue.try_receive().ok()
    }

    /// Drain everything queued so far.
    pub fn drain(&self) -> std::vec::Vec<ObserverMessage> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Cloneable notifier: hand one clone to the engine, keep another to
/// subscribe observers.
#[derive(Clone)]
pub struct QueueNotifier {
    hub: Arc<Hub>,
}

impl QueueNotifier {
    pub fn new() -> Self {
        Self {
            hub: Arc::new(Hub {
                slots: BlockingMutex::new(RefCell::new(Vec::new())),
                next_id: AtomicU32::new(1),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new observer.  `None` when the table is full.
    ///
    /// Call [`BehaviorEngine::attach_observer`](crate::engine::BehaviorEngine::attach_observer)
    /// with the returned id to deliver its initial snapshot.
    pub fn subscribe(&self) -> Option<ObserverHandle> {
        let id = ObserverId(self.hub.next_id.fetch_add(1, Ordering::Relaxed));
        let queue = Arc::new(ObserverQueue::new());
        let slot = Slot {
            id,
            queue: Arc::clone(&queue),
        };
        let pushed = self
            .hub
            .slots
            .lock(|slots| slots.borrow_mut().push(slot).is_ok());
        if !pushed {
            warn!("observer table full ({MAX_OBSERVERS}); rejecting subscriber");
            return None;
        }
        debug!("{id} subscribed");
        Some(ObserverHandle { id, queue })
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        self.hub.slots.lock(|slots| {
            slots.borrow_mut().retain(|slot| slot.id != id);
        });
        debug!("{id} unsubscribed");
    }

    pub fn observer_count(&self) -> usize {
        self.hub.slots.lock(|slots| slots.borrow().len())
    }

    /// Messages dropped because an observer's queue was full.
    pub fn dropped(&self) -> u64 {
        self.hub.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, slot: &Slot, msg: ObserverMessage) {
        if slot.queue.try_send(msg).is_err() {
            self.hub.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Default for QueueNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier for QueueNotifier {
    fn publish(&mut self, frame: &ChannelState) {
        self.hub.slots.lock(|slots| {
            for slot in slots.borrow().iter() {
                self.send(slot, ObserverMessage::Frame(*frame));
            }
        });
    }

    fn publish_initial(&mut self, observer: ObserverId, snapshot: &EngineSnapshot) {
        self.hub.slots.lock(|slots| {
            match slots.borrow().iter().find(|slot| slot.id == observer) {
                Some(slot) => self.send(slot, ObserverMessage::Initial(*snapshot)),
                None => warn!("{observer} is not subscribed; initial snapshot dropped"),
            }
        });
    }
}
