use serde::{Deserialize, Serialize};

/// High-level visibility grouping a block belongs to. Drives which
/// [`VisState`](https://docs.rs/cc-dump-visibility) applies to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Metadata,
    System,
    User,
    Assistant,
    Tools,
    Thinking,
    Budget,
    Headers,
    /// Errors and other content that ignores category filters entirely.
    AlwaysVisible,
}
