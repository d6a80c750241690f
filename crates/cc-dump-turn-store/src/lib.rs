//! Turn store and virtual scroll: owns the ordered sequence of turns, their
//! rasterized strips, and the cumulative line-offset table that lets
//! `render_line` answer any viewport row in O(log turns) without
//! rasterizing the whole transcript.
//!
//! Also owns the [`ViewOverrides`] store, since per-block expand/collapse
//! state is meaningless without the turns it annotates.

mod turn;

use cc_dump_block_ir::{Category, FormattedBlock};
use cc_dump_rasterizer::Strip;
use cc_dump_view_overrides::ViewOverrides;
use cc_dump_visibility::VisibilityEngine;

pub use turn::Turn;

/// Opaque handle to a streaming turn, returned by
/// [`TurnStore::begin_streaming_turn`]. Any other method taking a handle
/// panics if it does not name the store's current streaming turn — at most
/// one is ever open at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnHandle(usize);

/// A saved viewport position, keyed by the identity of the turn under the
/// viewport's top row rather than a raw line number, so it survives
/// insertions/re-rasterization elsewhere in the transcript.
#[derive(Debug, Clone, Copy)]
pub struct ViewportAnchor {
    turn_identity_block_id: Option<u64>,
    intra_turn_offset: usize,
}

pub struct TurnStore {
    turns: Vec<Turn>,
    /// turns[i].line_offset cache, rebuilt incrementally whenever a turn's
    /// line_count changes.
    offsets: Vec<usize>,
    total_lines: usize,
    width: usize,
    visibility: VisibilityEngine,
    overrides: ViewOverrides,
    streaming_index: Option<usize>,
}

impl TurnStore {
    pub fn new(width: usize) -> Self {
        Self {
            turns: Vec::new(),
            offsets: Vec::new(),
            total_lines: 0,
            width,
            visibility: VisibilityEngine::new(),
            overrides: ViewOverrides::new(),
            streaming_index: None,
        }
    }

    pub fn visibility(&self) -> &VisibilityEngine {
        &self.visibility
    }

    pub fn overrides(&self) -> &ViewOverrides {
        &self.overrides
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn widest_strip(&self) -> usize {
        self.turns.iter().map(|t| t.widest_strip).max().unwrap_or(0)
    }

    /// Recomputes `line_offset` for every turn from `from` onward and the
    /// cumulative total. Called after any operation that changes a turn's
    /// line count. Invariant (a): turns are laid out contiguously and in
    /// order, offset[i] == sum of line counts of turns[0..i].
    fn reflow_offsets(&mut self, from: usize) {
        let mut offset = if from == 0 { 0 } else { self.turns[from - 1].line_offset + self.turns[from - 1].line_count() };
        for turn in self.turns.iter_mut().skip(from) {
            turn.line_offset = offset;
            offset += turn.line_count();
        }
        self.total_lines = offset;
        self.offsets = self.turns.iter().map(|t| t.line_offset).collect();
    }

    /// Appends a fully formatted, already-complete turn (a non-streaming
    /// request/response pair, or a replayed one).
    pub fn append_completed_turn(&mut self, blocks: Vec<FormattedBlock>) -> usize {
        let turn = Turn::new_completed(blocks, &self.visibility, &mut self.overrides, self.width);
        self.turns.push(turn);
        let index = self.turns.len() - 1;
        self.reflow_offsets(index);
        index
    }

    /// Opens a new streaming turn and returns a handle to it. Panics if a
    /// streaming turn is already open — the proxy serializes requests, so
    /// at most one can be in flight against the display at a time.
    pub fn begin_streaming_turn(&mut self) -> TurnHandle {
        assert!(self.streaming_index.is_none(), "a streaming turn is already open");
        self.turns.push(Turn::new_streaming());
        let index = self.turns.len() - 1;
        self.streaming_index = Some(index);
        self.reflow_offsets(index);
        TurnHandle(index)
    }

    fn streaming_turn_mut(&mut self, handle: TurnHandle) -> &mut Turn {
        assert_eq!(self.streaming_index, Some(handle.0), "handle does not name the open streaming turn");
        &mut self.turns[handle.0]
    }

    /// Appends one block to the streaming turn. Only strips at or above
    /// that turn's `stable_strip_count` may change as a result (invariant
    /// c / IDR7); the offset of every other turn is untouched.
    pub fn append_streaming_block(&mut self, handle: TurnHandle, block: FormattedBlock) {
        let index = handle.0;
        assert_eq!(self.streaming_index, Some(index), "handle does not name the open streaming turn");
        let visibility = self.visibility.clone();
        self.turns[index].append_streaming(block, &visibility, &mut self.overrides, self.width);
        self.reflow_offsets(index);
    }

    /// Consolidates the streaming turn's buffered deltas, fully
    /// re-rasterizes it, and closes the handle.
    pub fn finalize_streaming_turn(&mut self, handle: TurnHandle) {
        let index = handle.0;
        assert_eq!(self.streaming_index, Some(index), "handle does not name the open streaming turn");
        let visibility = self.visibility.clone();
        self.turns[index].finalize(&visibility, &mut self.overrides, self.width);
        self.reflow_offsets(index);
        self.streaming_index = None;
    }

    /// Binary searches the offset table for the turn owning absolute line
    /// `y`, then indexes directly into its strips (IDR6: equivalent to a
    /// flat linear scan over every turn's strips, just without materializing
    /// the flattened vector).
    pub fn render_line(&self, y: usize) -> Option<&Strip> {
        if y >= self.total_lines {
            return None;
        }
        let turn_index = match self.offsets.binary_search(&y) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let turn = &self.turns[turn_index];
        turn.strips.get(y - turn.line_offset)
    }

    /// Cycles a category's visibility level and clears the per-block
    /// `expanded` override for every block currently in that category
    /// (IDR5), then fully re-rasterizes every affected turn.
    pub fn cycle_category(&mut self, category: Category) {
        self.visibility.cycle(category);
        let affected: Vec<u64> = self
            .turns
            .iter()
            .flat_map(|t| t.blocks.iter())
            .filter(|b| b.category == category)
            .map(|b| b.block_id)
            .collect();
        self.overrides.clear_for_blocks(affected);
        self.rerasterize_all();
    }

    pub fn toggle_block(&mut self, block_id: u64) {
        self.overrides.toggle_block(block_id);
        self.rerasterize_all();
    }

    /// Flips one region's collapse state independent of its parent block
    /// (spec §4.5). No-op if `block_id`/`region_index` don't name a region
    /// that currently exists.
    pub fn toggle_region(&mut self, block_id: u64, region_index: usize) {
        let Some(block) = self.turns.iter().flat_map(|t| t.blocks.iter()).find(|b| b.block_id == block_id) else {
            return;
        };
        let Some(region) = block.content_regions.as_ref().and_then(|regions| regions.get(region_index)) else {
            return;
        };
        let default_expanded = block.payload.searchable_text().map(|text| cc_dump_rasterizer::default_region_expanded(region, text)).unwrap_or(true);
        self.overrides.toggle_region((block_id, region_index), default_expanded);
        self.rerasterize_all();
    }

    /// Finds the `block_id` occupying absolute line `y`, for click/cursor
    /// driven toggling. `None` past the end of the transcript.
    pub fn block_at_line(&self, y: usize) -> Option<u64> {
        if y >= self.total_lines {
            return None;
        }
        let turn_index = match self.offsets.binary_search(&y) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let turn = &self.turns[turn_index];
        let intra = y - turn.line_offset;
        turn.block_strip_map.iter().filter(|(_, &start)| start <= intra).max_by_key(|(_, &start)| start).map(|(id, _)| *id)
    }

    /// `(block_id, region_index)` occupying absolute line `y`, if that line
    /// falls inside a recorded region range, for click-driven region
    /// toggling distinct from whole-block toggling.
    pub fn region_at_line(&self, y: usize) -> Option<(u64, usize)> {
        self.overrides.region_at_line(y)
    }

    /// Re-rasterizes every turn against the current visibility/override
    /// state. Used after any change whose effect on line counts can't be
    /// localized to one turn (category cycle, global filter change).
    pub fn rerasterize_all(&mut self) {
        for turn in self.turns.iter_mut() {
            if !turn.is_streaming {
                turn.rerasterize(&self.visibility, &mut self.overrides, self.width);
            }
        }
        self.reflow_offsets(0);
    }

    /// Applies a change in terminal width, which invalidates every turn's
    /// wrapping and must re-rasterize everything.
    pub fn set_width(&mut self, width: usize) {
        if width != self.width {
            self.width = width;
            self.rerasterize_all();
        }
    }

    /// Captures the turn under absolute line `y` as a stable anchor, usable
    /// after category cycles or appends shift every following turn's offset.
    pub fn find_viewport_anchor(&self, y: usize) -> ViewportAnchor {
        let turn_index = match self.offsets.binary_search(&y) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        match self.turns.get(turn_index) {
            Some(turn) => ViewportAnchor {
                turn_identity_block_id: turn.identity_block_id(),
                intra_turn_offset: y.saturating_sub(turn.line_offset),
            },
            None => ViewportAnchor { turn_identity_block_id: None, intra_turn_offset: 0 },
        }
    }

    /// Resolves a previously captured anchor back to an absolute line,
    /// re-finding its turn by identity rather than index since turns never
    /// move but indices could if earlier turns were ever pruned.
    pub fn restore_anchor(&self, anchor: ViewportAnchor) -> usize {
        let Some(target_id) = anchor.turn_identity_block_id else {
            return 0;
        };
        match self.turns.iter().find(|t| t.identity_block_id() == Some(target_id)) {
            Some(turn) => turn.line_offset + anchor.intra_turn_offset.min(turn.line_count().saturating_sub(1)),
            None => 0,
        }
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Absolute line a block's first strip starts at, for jumping the
    /// viewport to a search hit.
    fn line_of_block(&self, block_id: u64) -> Option<usize> {
        self.turns.iter().find_map(|turn| turn.block_strip_map.get(&block_id).map(|&start| turn.line_offset + start))
    }

    /// Scans every block's searchable text for a case-insensitive substring
    /// match, force-visibilities each hit (spec §4.7's search override) and
    /// re-rasterizes. Returns a [`SearchSession`] positioned on the first
    /// match, or an empty one if the query is blank or nothing matched.
    pub fn search(&mut self, query: &str) -> SearchSession {
        self.overrides.clear_search();
        let query = query.trim();
        let mut matches = Vec::new();
        if !query.is_empty() {
            let needle = query.to_lowercase();
            for turn in &self.turns {
                for block in &turn.blocks {
                    if let Some(text) = block.payload.searchable_text() {
                        if text.to_lowercase().contains(&needle) {
                            matches.push(block.block_id);
                        }
                    }
                }
            }
            for &block_id in &matches {
                self.overrides.force_visible_for_search(block_id);
            }
        }
        self.rerasterize_all();
        SearchSession { query: query.to_string(), matches, current: 0 }
    }

    /// Clears every force-visible override the last [`Self::search`] call
    /// set and re-rasterizes back to the prevailing category/override state.
    pub fn clear_search(&mut self) {
        self.overrides.clear_search();
        self.rerasterize_all();
    }

    /// Absolute line of the session's current match, advancing `current`
    /// first when `advance` is true (used for repeated "next match" presses).
    pub fn search_goto(&self, session: &mut SearchSession, advance: bool) -> Option<usize> {
        if session.matches.is_empty() {
            return None;
        }
        if advance {
            session.current = (session.current + 1) % session.matches.len();
        }
        self.line_of_block(session.matches[session.current])
    }
}

/// A live search's match set and cursor position within it, returned by
/// [`TurnStore::search`] per spec §6's `post_search(query, options) ->
/// SearchSession`.
#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    pub query: String,
    pub matches: Vec<u64>,
    pub current: usize,
}

impl SearchSession {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

#[cfg(test)]
mod tests {
    use cc_dump_block_ir::{BlockPayload, Category, FormattedBlock};
    use pretty_assertions::assert_eq;

    use super::*;

    fn text_block(text: &str, category: Category) -> FormattedBlock {
        FormattedBlock::with_category(BlockPayload::TextContentBlock { text: text.into(), role: "user".into() }, category)
    }

    #[test]
    fn offsets_are_contiguous_and_consistent_with_line_counts() {
        let mut store = TurnStore::new(80);
        store.append_completed_turn(vec![text_block("a\nb", Category::User)]);
        store.append_completed_turn(vec![text_block("c\nd\ne", Category::User)]);

        assert_eq!(store.turns[0].line_offset, 0);
        assert_eq!(store.turns[1].line_offset, store.turns[0].line_count());
        assert_eq!(store.total_lines(), store.turns[0].line_count() + store.turns[1].line_count());
    }

    #[test]
    fn render_line_matches_flattened_scan() {
        let mut store = TurnStore::new(80);
        store.append_completed_turn(vec![text_block("a\nb\nc", Category::User)]);
        store.append_completed_turn(vec![text_block("d\ne", Category::User)]);

        let mut flattened = Vec::new();
        for turn in &store.turns {
            flattened.extend(turn.strips.clone());
        }
        for (y, expected) in flattened.iter().enumerate() {
            assert_eq!(store.render_line(y).unwrap(), expected);
        }
        assert!(store.render_line(flattened.len()).is_none());
    }

    #[test]
    fn streaming_appends_only_change_tail_above_stable_count() {
        let mut store = TurnStore::new(80);
        store.append_completed_turn(vec![text_block("earlier turn", Category::User)]);
        let stable_line = store.render_line(0).cloned();

        let handle = store.begin_streaming_turn();
        store.append_streaming_block(
            handle,
            FormattedBlock::with_category(BlockPayload::TextDeltaBlock { text: "hello ".into(), content_index: 0 }, Category::Assistant),
        );
        store.append_streaming_block(
            handle,
            FormattedBlock::with_category(BlockPayload::TextDeltaBlock { text: "world".into(), content_index: 0 }, Category::Assistant),
        );

        assert_eq!(store.render_line(0).cloned(), stable_line, "earlier completed turn's line must not move");

        store.finalize_streaming_turn(handle);
        let streaming_turn = &store.turns[handle.0];
        assert!(!streaming_turn.is_streaming);
        assert_eq!(streaming_turn.blocks.len(), 1);
        match &streaming_turn.blocks[0].payload {
            BlockPayload::TextContentBlock { text, .. } => assert_eq!(text, "hello world"),
            other => panic!("expected consolidated TextContentBlock, got {other:?}"),
        }
    }

    #[test]
    fn category_cycle_clears_overrides_and_rerasterizes() {
        let mut store = TurnStore::new(80);
        let blocks = vec![text_block("short text that would wrap across several lines of output", Category::Tools)];
        store.append_completed_turn(blocks);
        let block_id = store.turns[0].blocks[0].block_id;

        let collapsed_lines = store.turns[0].line_count();
        store.toggle_block(block_id);
        let expanded_lines = store.turns[0].line_count();
        assert_ne!(collapsed_lines, expanded_lines);

        store.cycle_category(Category::Tools);
        assert!(store.overrides().get(block_id).is_none() || store.overrides().get(block_id).unwrap().expanded.is_none());
    }

    #[test]
    fn viewport_anchor_survives_later_turn_changes() {
        let mut store = TurnStore::new(80);
        store.append_completed_turn(vec![text_block("first turn content", Category::User)]);
        let anchor = store.find_viewport_anchor(0);

        store.append_completed_turn(vec![text_block("second turn content\nwith more lines", Category::User)]);

        assert_eq!(store.restore_anchor(anchor), 0);
    }

    #[test]
    fn search_force_visibilities_matching_blocks_even_when_category_is_hidden() {
        let mut store = TurnStore::new(80);
        store.append_completed_turn(vec![text_block("needle in a haystack", Category::Tools)]);
        store.cycle_category(Category::Tools); // Summary -> Full
        store.cycle_category(Category::Tools); // Full -> Existence (hidden)
        assert_eq!(store.total_lines(), 0, "hidden category renders no lines before search");

        let session = store.search("needle");
        assert_eq!(session.match_count(), 1);
        assert!(store.total_lines() > 0, "a force-visible match must render despite the hidden category");
    }

    #[test]
    fn search_is_case_insensitive_and_clear_search_restores_prior_visibility() {
        let mut store = TurnStore::new(80);
        store.append_completed_turn(vec![text_block("Needle", Category::Tools)]);
        store.cycle_category(Category::Tools);
        store.cycle_category(Category::Tools);

        let session = store.search("needle");
        assert_eq!(session.match_count(), 1);

        store.clear_search();
        assert_eq!(store.total_lines(), 0, "clearing search restores the hidden category state");
    }

    #[test]
    fn search_goto_cycles_through_matches() {
        let mut store = TurnStore::new(80);
        store.append_completed_turn(vec![text_block("alpha needle", Category::User)]);
        store.append_completed_turn(vec![text_block("beta needle", Category::User)]);

        let mut session = store.search("needle");
        assert_eq!(session.match_count(), 2);

        let first = store.search_goto(&mut session, false);
        let second = store.search_goto(&mut session, true);
        assert_ne!(first, second);
        let third = store.search_goto(&mut session, true);
        assert_eq!(first, third, "cycling past the last match wraps to the first");
    }

    #[test]
    fn blank_query_clears_matches_without_panicking() {
        let mut store = TurnStore::new(80);
        store.append_completed_turn(vec![text_block("anything", Category::User)]);
        let session = store.search("   ");
        assert!(session.is_empty());
    }
}
