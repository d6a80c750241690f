//! Block intermediate representation: tagged-variant types for every
//! semantic unit that can appear in a turn, plus the catalog that maps each
//! variant to its fixed category and renderer-dispatch key.
//!
//! Blocks are immutable domain data once formatted (invariant a); all
//! view-dependent state lives in the view-override store keyed by
//! `block_id`, never here.

mod category;
mod payload;
pub mod region;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub use category::Category;
pub use payload::{BlockPayload, TrackStatus};
pub use region::{detect_regions, ContentRegion, RegionKind};

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates the next monotonic `block_id`. Unique and strictly increasing
/// within a process lifetime (invariant b); never reused even across
/// sessions replayed in the same process.
pub fn new_block_id() -> u64 {
    NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed)
}

impl Category {
    /// The category a polymorphic block (role, message, text) takes from its
    /// parent message's role. Any role other than `user`/`assistant` is
    /// treated as metadata rather than guessed at.
    pub fn from_role(role: &str) -> Category {
        match role {
            "user" => Category::User,
            "assistant" => Category::Assistant,
            _ => Category::Metadata,
        }
    }
}

/// A single semantic unit of turn content. Construction never fails:
/// unrecognized API content is represented by `BlockPayload::UnknownTypeBlock`
/// rather than rejected, so no data is ever silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedBlock {
    pub block_id: u64,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_regions: Option<Vec<ContentRegion>>,
    pub payload: BlockPayload,
}

impl FormattedBlock {
    /// Constructs a block whose category is fixed by its variant. Polymorphic
    /// variants (role/message/text) have no fixed category; calling this with
    /// one is a programmer error — debug builds catch it immediately, release
    /// builds fall back to `Category::Metadata` rather than panic, since
    /// construction of the IR must never fail (see module docs). Use
    /// [`FormattedBlock::with_category`] for polymorphic variants.
    pub fn new(payload: BlockPayload) -> Self {
        debug_assert!(payload.fixed_category().is_some(), "{} has no fixed category; use with_category", payload.renderer_key());
        let category = payload.fixed_category().unwrap_or(Category::Metadata);
        Self {
            block_id: new_block_id(),
            category,
            content_regions: None,
            payload,
        }
    }

    /// Constructs a block with an explicitly supplied category, for
    /// polymorphic variants (role/message/text) whose category is set
    /// exactly once at format time from parent context (invariant c).
    pub fn with_category(payload: BlockPayload, category: Category) -> Self {
        Self {
            block_id: new_block_id(),
            category,
            content_regions: None,
            payload,
        }
    }

    pub fn with_regions(mut self, regions: Vec<ContentRegion>) -> Self {
        self.content_regions = Some(regions);
        self
    }

    pub fn renderer_key(&self) -> &'static str {
        self.payload.renderer_key()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn block_ids_are_monotonic() {
        let a = FormattedBlock::new(BlockPayload::SeparatorBlock);
        let b = FormattedBlock::new(BlockPayload::NewlineBlock);
        assert!(b.block_id > a.block_id);
    }

    #[test]
    fn fixed_category_variants_assign_expected_category() {
        let header = FormattedBlock::new(BlockPayload::HeaderBlock { timestamp: "t".into() });
        assert_eq!(header.category, Category::Headers);
    }

    #[test]
    fn role_driven_category_is_explicit() {
        let block = FormattedBlock::with_category(
            BlockPayload::TextContentBlock { text: "hi".into(), role: "user".into() },
            Category::from_role("user"),
        );
        assert_eq!(block.category, Category::User);
        assert_eq!(block.renderer_key(), "text_content_block");
    }

    #[test]
    #[should_panic(expected = "has no fixed category")]
    fn polymorphic_variant_requires_explicit_category() {
        let _ = FormattedBlock::new(BlockPayload::TextContentBlock { text: "hi".into(), role: "user".into() });
    }
}
