//! Session replayer (C11): reads an archive file and emits the event
//! sequence a live proxy would have produced for the same exchanges, so a
//! recorded session can be re-run through the exact same display/recorder
//! pipeline as a live one (spec.md §4.11's replay fidelity invariant).

mod error;
mod replayer;
mod synth;

pub use error::ReplayError;
pub use replayer::replay;
pub use synth::synthesize_response_events;
