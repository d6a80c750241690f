//! Line rasterizer: turns a block plus its resolved visibility state into a
//! finite sequence of styled terminal lines (strips), with a per-block-id
//! memoized cache so unchanged blocks never re-render.

mod render;
mod strip;

use std::collections::HashMap;

use cc_dump_block_ir::FormattedBlock;
use cc_dump_view_overrides::BlockOverride;
use cc_dump_visibility::VisState;

pub use render::{apply_truncation, default_region_expanded, render, render_regions, render_with_regions, CODE_FENCE_AUTO_EXPAND_LINES};
pub use strip::{Strip, StyleTag, TextRun};

type CacheKey = (u64, VisStateKey, u64, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum VisStateKey {
    Hidden,
    SummaryCollapsed,
    SummaryExpanded,
    FullCollapsed,
    FullExpanded,
}

impl From<VisState> for VisStateKey {
    fn from(value: VisState) -> Self {
        match value {
            VisState::Hidden => VisStateKey::Hidden,
            VisState::SummaryCollapsed => VisStateKey::SummaryCollapsed,
            VisState::SummaryExpanded => VisStateKey::SummaryExpanded,
            VisState::FullCollapsed => VisStateKey::FullCollapsed,
            VisState::FullExpanded => VisStateKey::FullExpanded,
        }
    }
}

/// Hashes only the override fields that affect rendering (expanded,
/// force_visible), so unrelated override churn (e.g. strip_range bookkeeping
/// from a previous render pass) never invalidates the cache.
fn overrides_fingerprint(overrides: &BlockOverride) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    overrides.expanded.hash(&mut hasher);
    match overrides.force_visible {
        Some(VisState::Hidden) => 1u8.hash(&mut hasher),
        Some(VisState::SummaryCollapsed) => 2u8.hash(&mut hasher),
        Some(VisState::SummaryExpanded) => 3u8.hash(&mut hasher),
        Some(VisState::FullCollapsed) => 4u8.hash(&mut hasher),
        Some(VisState::FullExpanded) => 5u8.hash(&mut hasher),
        None => 0u8.hash(&mut hasher),
    }
    hasher.finish()
}

/// Per-block-id memoized rasterizer. One instance per Turn Store, scoped to
/// its lifetime: the cache is bounded by `#blocks × #visible-vis-states × 1
/// width` and dropped with the turn that owns it.
#[derive(Debug, Default)]
pub struct Rasterizer {
    cache: HashMap<CacheKey, (Vec<Strip>, bool)>,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders a block at the given visibility state, applying the
    /// truncation contract, and returns `(strips, expandable)`. Repeated
    /// calls with the same `(block_id, vis_state, overrides, width)` return
    /// the cached result without re-invoking the renderer (IDR2:
    /// determinism lets this be a pure memoization, never a staleness risk).
    pub fn render_block(&mut self, block: &FormattedBlock, vis_state: VisState, overrides: &BlockOverride, width: usize) -> (Vec<Strip>, bool) {
        let key: CacheKey = (block.block_id, vis_state.into(), overrides_fingerprint(overrides), width);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let raw = render::render(block, vis_state);
        let result = apply_truncation(raw, vis_state);
        self.cache.insert(key, result.clone());
        result
    }

    /// Invalidates every cached entry for a block, used when its overrides
    /// change in a way the fingerprint wouldn't otherwise capture (e.g. the
    /// block's own text mutated — which shouldn't happen since blocks are
    /// immutable, but streaming replaces the block wholesale instead).
    pub fn invalidate(&mut self, block_id: u64) {
        self.cache.retain(|(id, ..), _| *id != block_id);
    }
}

#[cfg(test)]
mod tests {
    use cc_dump_block_ir::{BlockPayload, Category, FormattedBlock};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn rendering_is_deterministic() {
        let block = FormattedBlock::with_category(
            BlockPayload::TextContentBlock { text: "hello\nworld".into(), role: "user".into() },
            Category::User,
        );
        let first = render::render(&block, VisState::FullExpanded);
        let second = render::render(&block, VisState::FullExpanded);
        assert_eq!(first, second);
    }

    #[test]
    fn summary_and_full_differ() {
        let block = FormattedBlock::with_category(
            BlockPayload::TextContentBlock { text: "hello\nworld\nmore".into(), role: "user".into() },
            Category::User,
        );
        let summary = render::render(&block, VisState::SummaryCollapsed);
        let full = render::render(&block, VisState::FullExpanded);
        assert_ne!(summary, full);
        assert_eq!(summary.len(), 1);
    }

    #[test]
    fn hidden_produces_no_strips() {
        let block = FormattedBlock::new(BlockPayload::SeparatorBlock);
        assert_eq!(render::render(&block, VisState::Hidden).len(), 0);
    }

    #[test]
    fn truncation_replaces_tail_with_indicator() {
        let text = (0..20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let block = FormattedBlock::with_category(BlockPayload::TextContentBlock { text, role: "user".into() }, Category::User);
        let raw = render::render(&block, VisState::FullCollapsed);
        let (capped, expandable) = apply_truncation(raw, VisState::FullCollapsed);
        assert!(expandable);
        assert_eq!(capped.len(), 5);
        assert!(capped.last().unwrap().runs[0].text.contains("more lines"));
    }

    #[test]
    fn cache_returns_identical_result_without_rerendering() {
        let mut rasterizer = Rasterizer::new();
        let block = FormattedBlock::new(BlockPayload::SeparatorBlock);
        let overrides = BlockOverride::default();
        let first = rasterizer.render_block(&block, VisState::FullExpanded, &overrides, 80);
        let second = rasterizer.render_block(&block, VisState::FullExpanded, &overrides, 80);
        assert_eq!(first, second);
    }
}
