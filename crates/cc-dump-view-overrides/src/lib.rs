//! View override store: per-block and per-region mutable view state, kept
//! separate from the immutable block IR (spec §9's replacement for
//! monkey-patched view attributes on IR objects).
//!
//! Owned one instance per conversation view by the turn store; never read
//! from outside the rasterizer/visibility/turn-store layers, and never
//! touched by the formatter.

use std::collections::HashMap;

use cc_dump_visibility::VisState;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

pub type RegionKey = (u64, usize);

/// Per-block mutable view state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockOverride {
    /// Explicit collapsed/expanded override within the block's current level.
    pub expanded: Option<bool>,
    /// Set by the search subsystem to force a specific state regardless of
    /// category level.
    pub force_visible: Option<VisState>,
    /// Renderer-computed hint: whether this block has more content than its
    /// current limit allows, i.e. whether toggling `expanded` would change
    /// anything.
    pub expandable: bool,
    /// Renderer-computed: the strip index range this block occupies in its
    /// turn, for click hit-testing.
    pub strip_range: Option<(usize, usize)>,
}

/// Per-region mutable view state, keyed by `(block_id, region_index)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionOverride {
    pub expanded: Option<bool>,
    pub strip_range: Option<(usize, usize)>,
}

/// A serializable snapshot of the whole store, for hot-reload survival.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewOverridesSnapshot {
    blocks: HashMap<u64, BlockOverride>,
    regions: HashMap<(u64, usize), RegionOverride>,
}

#[derive(Debug, Default)]
pub struct ViewOverrides {
    blocks: HashMap<u64, BlockOverride>,
    regions: HashMap<RegionKey, RegionOverride>,
    /// Block ids the search subsystem has forced visible, so a bulk clear on
    /// search-cancel only touches what search itself set.
    search_forced: IndexSet<u64>,
}

impl ViewOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_default(&mut self, block_id: u64) -> &BlockOverride {
        self.blocks.entry(block_id).or_default()
    }

    pub fn get(&self, block_id: u64) -> Option<&BlockOverride> {
        self.blocks.get(&block_id)
    }

    pub fn get_mut_or_default(&mut self, block_id: u64) -> &mut BlockOverride {
        self.blocks.entry(block_id).or_default()
    }

    pub fn region_get_or_default(&mut self, key: RegionKey) -> &RegionOverride {
        self.regions.entry(key).or_default()
    }

    pub fn region_get_mut_or_default(&mut self, key: RegionKey) -> &mut RegionOverride {
        self.regions.entry(key).or_default()
    }

    /// Flips a block's `expanded` override within its current level's
    /// collapsed/expanded pair.
    pub fn toggle_block(&mut self, block_id: u64) {
        let entry = self.blocks.entry(block_id).or_default();
        entry.expanded = Some(!entry.expanded.unwrap_or(false));
    }

    /// Flips a region's `expanded` override, independent of its parent
    /// block's own collapse state (spec §4.5: regions collapse/expand on
    /// their own).
    pub fn toggle_region(&mut self, key: RegionKey, default_expanded: bool) {
        let entry = self.regions.entry(key).or_default();
        entry.expanded = Some(!entry.expanded.unwrap_or(default_expanded));
    }

    /// Clears per-block overrides for every block in `block_ids` whose
    /// category equals the cycled category (IDR5). The caller determines
    /// category membership since this crate has no knowledge of the IR.
    pub fn clear_for_blocks(&mut self, block_ids: impl IntoIterator<Item = u64>) {
        for id in block_ids {
            self.blocks.remove(&id);
        }
    }

    /// Marks a block force-visible for search, recording it so `clear_search`
    /// can undo exactly these and nothing else.
    pub fn force_visible_for_search(&mut self, block_id: u64) {
        self.blocks.entry(block_id).or_default().force_visible = Some(VisState::FullExpanded);
        self.search_forced.insert(block_id);
    }

    /// Bulk-clears every `force_visible` override the search subsystem set.
    pub fn clear_search(&mut self) {
        for block_id in self.search_forced.drain(..) {
            if let Some(entry) = self.blocks.get_mut(&block_id) {
                entry.force_visible = None;
            }
        }
    }

    /// The region (if any) whose recorded `strip_range` contains line `y`,
    /// for click hit-testing region headers distinct from their parent block.
    pub fn region_at_line(&self, y: usize) -> Option<RegionKey> {
        self.regions.iter().find(|(_, r)| r.strip_range.is_some_and(|(start, end)| y >= start && y < end)).map(|(key, _)| *key)
    }

    pub fn snapshot(&self) -> ViewOverridesSnapshot {
        ViewOverridesSnapshot {
            blocks: self.blocks.clone(),
            regions: self.regions.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: ViewOverridesSnapshot) {
        self.blocks = snapshot.blocks;
        self.regions = snapshot.regions;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn toggle_block_flips_expanded() {
        let mut overrides = ViewOverrides::new();
        overrides.toggle_block(1);
        assert_eq!(overrides.get(1).unwrap().expanded, Some(true));
        overrides.toggle_block(1);
        assert_eq!(overrides.get(1).unwrap().expanded, Some(false));
    }

    #[test]
    fn clear_search_only_touches_search_forced_blocks() {
        let mut overrides = ViewOverrides::new();
        overrides.get_mut_or_default(1).expanded = Some(true);
        overrides.force_visible_for_search(2);

        overrides.clear_search();

        assert_eq!(overrides.get(1).unwrap().expanded, Some(true));
        assert_eq!(overrides.get(2).unwrap().force_visible, None);
    }

    #[test]
    fn toggle_region_flips_relative_to_supplied_default() {
        let mut overrides = ViewOverrides::new();
        overrides.toggle_region((1, 0), true);
        assert_eq!(overrides.region_get_or_default((1, 0)).expanded, Some(false));
        overrides.toggle_region((1, 0), true);
        assert_eq!(overrides.region_get_or_default((1, 0)).expanded, Some(true));
    }

    #[test]
    fn region_at_line_finds_the_containing_range() {
        let mut overrides = ViewOverrides::new();
        overrides.region_get_mut_or_default((3, 0)).strip_range = Some((2, 5));
        assert_eq!(overrides.region_at_line(3), Some((3, 0)));
        assert_eq!(overrides.region_at_line(5), None, "range end is exclusive");
        assert_eq!(overrides.region_at_line(1), None);
    }

    #[test]
    fn snapshot_round_trips() {
        let mut overrides = ViewOverrides::new();
        overrides.toggle_block(7);
        overrides.region_get_mut_or_default((7, 0)).expanded = Some(true);

        let snapshot = overrides.snapshot();
        let mut restored = ViewOverrides::new();
        restored.restore(snapshot);

        assert_eq!(restored.get(7), overrides.get(7));
    }
}
