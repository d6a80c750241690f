//! Content tracker: assigns stable tag ids to repeated content sections
//! (system prompts, tool definitions, any >500 byte first-message text) and
//! produces unified diffs when a previously seen section changes.
//!
//! State is process/session-lifetime mutable, owned by the session and
//! passed by reference into the formatter — not a hidden global.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of entries in the rotating color palette used to assign
/// `color_idx` to freshly seen sections. The palette's actual colors are a
/// display-host concern; this crate only hands out stable indices into it.
pub const PALETTE_SIZE: u32 = 16;

/// A `(message_index, section_index)` pair identifying a section's position
/// within a request, independent of its content.
pub type PositionalKey = (usize, usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PositionalEntry {
    hash: String,
    text: String,
}

/// Process-lifetime mutable tracker state. Mutated only by [`track`]; never
/// touched from the rendering side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentTrackerState {
    /// SHA-256 hex digest of section text -> stable tag id.
    known_hashes: HashMap<String, u64>,
    /// Positional key -> last-known hash and text, for diffing on change.
    positional: HashMap<PositionalKey, PositionalEntry>,
    next_tag_id: u64,
    color_counter: u32,
}

/// Result of tracking one section.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    /// First time this exact content has been seen anywhere.
    New { tag_id: u64, color_idx: u32 },
    /// Exact content already seen before (possibly at a different position).
    Ref { tag_id: u64 },
    /// Same positional key, different content: carries a unified diff
    /// against the previous text at that position.
    Changed { tag_id: u64, unified_diff: String },
}

impl ContentTrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_tag_id(&mut self) -> u64 {
        self.next_tag_id += 1;
        self.next_tag_id
    }

    fn alloc_color_idx(&mut self) -> u32 {
        let idx = self.color_counter % PALETTE_SIZE;
        self.color_counter += 1;
        idx
    }

    /// Tracks one section of text at a stable positional key.
    ///
    /// Hashing is the single source of truth for identity: the same bytes
    /// anywhere in the session always yield the same `tag_id` (invariant a),
    /// a `tag_id` never changes color (invariant b), and diff output depends
    /// only on the two texts being compared, not on traversal order
    /// (invariant c).
    pub fn track(&mut self, section_text: &str, positional_key: PositionalKey) -> TrackOutcome {
        let trimmed = section_text.trim();
        let hash = hex_sha256(trimmed);

        if let Some(&tag_id) = self.known_hashes.get(&hash) {
            self.positional.insert(
                positional_key,
                PositionalEntry { hash: hash.clone(), text: trimmed.to_string() },
            );
            return TrackOutcome::Ref { tag_id };
        }

        if let Some(prev) = self.positional.get(&positional_key).cloned() {
            if prev.hash != hash {
                // Reusing the prior position's tag id: content changed but identity
                // (the thing at this slot) didn't.
                let tag_id = self
                    .known_hashes
                    .iter()
                    .find_map(|(h, id)| if *h == prev.hash { Some(*id) } else { None })
                    .unwrap_or_else(|| self.alloc_tag_id());

                self.known_hashes.remove(&prev.hash);
                self.known_hashes.insert(hash.clone(), tag_id);
                self.positional.insert(
                    positional_key,
                    PositionalEntry { hash, text: trimmed.to_string() },
                );

                let diff = unified_diff(&prev.text, trimmed);
                return TrackOutcome::Changed { tag_id, unified_diff: diff };
            }
        }

        let tag_id = self.alloc_tag_id();
        let color_idx = self.alloc_color_idx();
        self.known_hashes.insert(hash.clone(), tag_id);
        self.positional.insert(
            positional_key,
            PositionalEntry { hash, text: trimmed.to_string() },
        );
        TrackOutcome::New { tag_id, color_idx }
    }
}

fn hex_sha256(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Unified diff with three lines of context, matching the contract in
/// spec §4.2.
fn unified_diff(old: &str, new: &str) -> String {
    similar::TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header("before", "after")
        .to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn first_sighting_is_new_with_increasing_color() {
        let mut state = ContentTrackerState::new();
        let out1 = state.track("system prompt text", (0, 0));
        assert!(matches!(out1, TrackOutcome::New { color_idx: 0, .. }));
        let out2 = state.track("a different prompt", (1, 0));
        assert!(matches!(out2, TrackOutcome::New { color_idx: 1, .. }));
    }

    #[test]
    fn unchanged_section_on_later_turn_is_ref_with_same_tag() {
        let mut state = ContentTrackerState::new();
        let TrackOutcome::New { tag_id, .. } = state.track("S", (0, 0)) else {
            panic!("expected New")
        };
        let out = state.track("S", (1, 0));
        assert_eq!(out, TrackOutcome::Ref { tag_id });
    }

    #[test]
    fn changed_section_reuses_tag_id_and_produces_diff() {
        let mut state = ContentTrackerState::new();
        let TrackOutcome::New { tag_id, .. } = state.track("line one\nline two\n", (0, 0)) else {
            panic!("expected New")
        };
        let out = state.track("line one\nline three\n", (0, 0));
        match out {
            TrackOutcome::Changed { tag_id: changed_id, unified_diff } => {
                assert_eq!(changed_id, tag_id);
                assert!(unified_diff.contains("line three"));
            }
            other => panic!("expected Changed, got {other:?}"),
        }
    }

    #[test]
    fn successive_identical_tracks_are_new_then_ref() {
        // IDR3: same positional key, same text, twice -> New then Ref, same tag_id.
        let mut state = ContentTrackerState::new();
        let TrackOutcome::New { tag_id, .. } = state.track("S", (0, 0)) else {
            panic!("expected New")
        };
        let out = state.track("S", (0, 0));
        assert_eq!(out, TrackOutcome::Ref { tag_id });
    }

    #[test]
    fn diff_is_deterministic_regardless_of_call_order() {
        let mut a = ContentTrackerState::new();
        a.track("x", (5, 0));
        a.track("y", (0, 0));
        let diff_a = match a.track("z", (0, 0)) {
            TrackOutcome::Changed { unified_diff, .. } => unified_diff,
            other => panic!("expected Changed, got {other:?}"),
        };

        let mut b = ContentTrackerState::new();
        b.track("y", (0, 0));
        b.track("x", (5, 0));
        let diff_b = match b.track("z", (0, 0)) {
            TrackOutcome::Changed { unified_diff, .. } => unified_diff,
            other => panic!("expected Changed, got {other:?}"),
        };

        assert_eq!(diff_a, diff_b);
    }
}
