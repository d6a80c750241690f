//! Fan-out event router (C8): delivers the typed [`Event`] stream C9 (or
//! C11 in replay) produces to every registered subscriber, in arrival
//! order, regardless of how many subscribers are registered or whether one
//! of them panics.

mod event;
mod queue;
mod router;

pub use event::{Event, Header};
pub use router::{EventRouter, EventSender, Subscriber, SubscriberHandle, DEFAULT_QUEUE_CAPACITY};
