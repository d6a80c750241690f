use cc_dump_event_router::SubscriberHandle;

use crate::state::TranscriptState;

/// Drains the display subscriber's own queue directly — no watch-channel
/// hop, since `SubscriberHandle` is already a plain synchronous queue the
/// UI thread can poll without blocking the router or the proxy.
pub struct Poller {
    handle: SubscriberHandle,
}

impl Poller {
    pub fn new(handle: SubscriberHandle) -> Self {
        Self { handle }
    }

    /// Applies every event currently queued, returning whether anything
    /// changed. Never blocks: an empty queue returns immediately.
    pub fn poll(&mut self, state: &mut TranscriptState) -> bool {
        let mut dirty = false;
        while let Some(event) = self.handle.try_recv() {
            state.apply(&event);
            dirty = true;
        }
        dirty
    }
}
