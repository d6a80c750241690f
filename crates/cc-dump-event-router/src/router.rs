use std::panic::{self, AssertUnwindSafe};

use crate::queue::BoundedQueue;
use crate::Event;

/// The default capacity for the router's own input queue and for any
/// queued subscriber created via [`EventRouter::add_queued_subscriber`].
/// Sized well above the burst in end-to-end scenario 5 (10,000 rapid
/// `content_block_delta` events) so ordinary streaming never overflows it.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16_384;

/// A subscriber invoked inline on the router's own thread. Per the direct
/// composition mode (spec.md §4.8), it must not block — anything that would
/// block (writing to disk, rendering a frame) belongs behind
/// [`EventRouter::add_queued_subscriber`] instead.
pub trait Subscriber: Send {
    fn on_event(&mut self, event: &Event);
}

enum Subscription {
    Direct(Box<dyn Subscriber>),
    Queued { name: &'static str, queue: BoundedQueue },
}

/// Fan-out event router (C8). Accepts an ordered stream of events on its
/// input queue and delivers each, in arrival order, to every registered
/// subscriber — direct subscribers synchronously and inline, queued
/// subscribers by pushing onto their own bounded queue for an independent
/// consumer thread to drain.
///
/// A panic from a direct subscriber is caught and logged; it never halts
/// delivery to the remaining subscribers (spec.md §4.8's "router survives
/// subscriber crashes").
pub struct EventRouter {
    input: BoundedQueue,
    subscriptions: Vec<Subscription>,
}

/// A cloneable handle producers use to emit events into the router's input
/// queue. Cloning and sending never blocks the caller (spec.md's proxy
/// invariant: "a downstream subscriber failure cannot stall the proxy
/// thread").
#[derive(Clone)]
pub struct EventSender {
    queue: BoundedQueue,
}

impl EventSender {
    pub fn send(&self, event: Event) {
        self.queue.push(event);
    }

    /// Events dropped so far because the router's input queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.queue.dropped_count()
    }
}

impl EventRouter {
    pub fn new(capacity: usize) -> (Self, EventSender) {
        let input = BoundedQueue::new(capacity);
        let sender = EventSender { queue: input.clone() };
        (Self { input, subscriptions: Vec::new() }, sender)
    }

    /// Registers a subscriber invoked inline, on the router's thread, for
    /// every event. Must not block.
    pub fn add_direct_subscriber(&mut self, subscriber: Box<dyn Subscriber>) {
        self.subscriptions.push(Subscription::Direct(subscriber));
    }

    /// Registers a queued subscriber and returns the receiving side of its
    /// private bounded queue for the caller to drain on its own thread. The
    /// router pushes with the same drop-oldest overflow policy as its own
    /// input queue.
    pub fn add_queued_subscriber(&mut self, name: &'static str, capacity: usize) -> SubscriberHandle {
        let queue = BoundedQueue::new(capacity);
        self.subscriptions.push(Subscription::Queued { name, queue: queue.clone() });
        SubscriberHandle { name, queue }
    }

    /// Dispatches a single event to every subscriber. Exposed directly so
    /// callers that already own an event loop (the replayer, tests) can
    /// drive dispatch without spinning up the router's own thread.
    pub fn dispatch(&mut self, event: &Event) {
        for subscription in &mut self.subscriptions {
            match subscription {
                Subscription::Direct(subscriber) => {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_event(event)));
                    if let Err(payload) = result {
                        let message = panic_message(&payload);
                        log::error!("direct subscriber panicked on {} event: {message}", event.kind());
                    }
                }
                Subscription::Queued { name, queue } => {
                    queue.push(event.clone());
                    let _ = name;
                }
            }
        }
    }

    /// Drains the input queue until it is disconnected (every `EventSender`
    /// dropped), dispatching each event to every subscriber in arrival
    /// order. Intended to run on the router's own dedicated thread, per
    /// spec.md §5's three-thread model.
    pub fn run(mut self) {
        while let Some(event) = self.input.blocking_pop() {
            self.dispatch(&event);
        }
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// The consumer-side handle for a queued subscriber, returned by
/// [`EventRouter::add_queued_subscriber`]. The subscriber owns this and
/// drains it on its own thread via [`SubscriberHandle::recv`].
pub struct SubscriberHandle {
    pub name: &'static str,
    queue: BoundedQueue,
}

impl SubscriberHandle {
    pub fn recv(&self) -> Option<Event> {
        self.queue.blocking_pop()
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.queue.try_pop()
    }
}
