use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use crate::Event;

/// A bounded mpmc queue with a drop-oldest overflow policy (spec.md §4.9,
/// §5): a full queue never blocks the producer — instead the oldest queued
/// event is discarded to make room and `dropped_count` is incremented.
///
/// Built on `crossbeam_channel`'s bounded channel rather than a plain
/// blocking send: the channel itself only gives us blocking or
/// immediately-failing sends, so the drop-oldest behavior is layered on top
/// by popping one entry on `TrySendError::Full` before retrying.
#[derive(Clone)]
pub struct BoundedQueue {
    sender: Sender<Event>,
    receiver: Receiver<Event>,
    dropped: Arc<AtomicU64>,
}

impl BoundedQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        Self { sender, receiver, dropped: Arc::new(AtomicU64::new(0)) }
    }

    /// Total events dropped due to overflow since creation (the
    /// `event_dropped` counter the display contract surfaces in the status
    /// line).
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Pushes an event, never blocking. On overflow, discards the oldest
    /// queued event and retries once; if the queue was drained concurrently
    /// and a second race still fails, the event itself is dropped instead
    /// (this can only happen under pathological contention with multiple
    /// producers, which the router never has).
    pub fn push(&self, event: Event) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                let _ = self.receiver.try_recv();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                if let Err(TrySendError::Full(_)) = self.sender.try_send(event) {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Blocks until an event is available or every sender has been dropped.
    pub fn blocking_pop(&self) -> Option<Event> {
        self.receiver.recv().ok()
    }

    /// Non-blocking pop, used by the router's drain loop so it can also
    /// observe a shutdown signal between events.
    pub fn try_pop(&self) -> Option<Event> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}
