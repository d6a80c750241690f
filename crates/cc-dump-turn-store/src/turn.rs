use cc_dump_block_ir::FormattedBlock;
use cc_dump_rasterizer::{apply_truncation, render_with_regions, Rasterizer, Strip};
use cc_dump_view_overrides::ViewOverrides;
use cc_dump_visibility::VisibilityEngine;

/// One completed or in-progress request/response pair's worth of blocks and
/// pre-rasterized lines.
pub struct Turn {
    pub blocks: Vec<FormattedBlock>,
    pub strips: Vec<Strip>,
    /// block_id -> starting line index within `strips`.
    pub block_strip_map: std::collections::HashMap<u64, usize>,
    pub line_offset: usize,
    pub widest_strip: usize,
    pub is_streaming: bool,
    /// Strips at or above this index are stable; a streaming turn's tail may
    /// still change until finalization.
    pub stable_strip_count: usize,
    rasterizer: Rasterizer,
    streaming_buffer_index: Option<usize>,
}

impl Turn {
    pub fn line_count(&self) -> usize {
        self.strips.len()
    }

    /// `block_id` of the first block in the turn, used as a stable identity
    /// for viewport-anchor preservation across filter/data changes.
    pub fn identity_block_id(&self) -> Option<u64> {
        self.blocks.first().map(|b| b.block_id)
    }

    /// Rasterizes one block, returning `(strips, expandable, region_ranges)`
    /// where `region_ranges` (within-block strip indices, empty unless the
    /// block carries `content_regions` and is shown in a full vis state) is
    /// for the caller to offset by the block's turn-absolute start and write
    /// into the region override store.
    fn rasterize_block(&mut self, block: &FormattedBlock, visibility: &VisibilityEngine, overrides: &mut ViewOverrides, width: usize) -> (Vec<Strip>, bool, Vec<(usize, usize)>) {
        let block_override = overrides.get(block.block_id).cloned().unwrap_or_default();
        let force_visible = block_override.force_visible;
        let vis_state = visibility.resolve(block.category, block_override.expanded, force_visible);

        if let Some(region_count) = block.content_regions.as_ref().map(|r| r.len()) {
            let region_expanded: Vec<Option<bool>> =
                (0..region_count).map(|idx| overrides.region_get_or_default((block.block_id, idx)).expanded).collect();
            if let Some((strips, ranges)) = render_with_regions(block, vis_state, |idx| region_expanded[idx]) {
                let (strips, expandable) = apply_truncation(strips, vis_state);
                return (strips, expandable, ranges);
            }
        }

        let (strips, expandable) = self.rasterizer.render_block(block, vis_state, &block_override, width);
        (strips, expandable, Vec::new())
    }

    fn record_region_ranges(overrides: &mut ViewOverrides, block_id: u64, start: usize, ranges: &[(usize, usize)]) {
        for (idx, (region_start, region_end)) in ranges.iter().enumerate() {
            overrides.region_get_mut_or_default((block_id, idx)).strip_range = Some((start + region_start, start + region_end));
        }
    }

    /// Rebuilds every strip from scratch, recomputing the block-strip map
    /// and widest strip. Used for completed turns and on finalize.
    fn rerasterize_all(&mut self, visibility: &VisibilityEngine, overrides: &mut ViewOverrides, width: usize) {
        let mut strips = Vec::new();
        let mut map = std::collections::HashMap::new();
        let blocks = self.blocks.clone();
        for block in &blocks {
            let start = strips.len();
            let (block_strips, expandable, region_ranges) = self.rasterize_block(block, visibility, overrides, width);
            let range = (start, start + block_strips.len());
            let entry = overrides.get_mut_or_default(block.block_id);
            entry.expandable = expandable;
            entry.strip_range = Some(range);
            Self::record_region_ranges(overrides, block.block_id, start, &region_ranges);
            map.insert(block.block_id, start);
            strips.extend(block_strips);
        }
        self.widest_strip = strips.iter().map(|s| s.cell_width).max().unwrap_or(0);
        self.strips = strips;
        self.block_strip_map = map;
        self.stable_strip_count = self.strips.len();
    }

    pub fn new_completed(blocks: Vec<FormattedBlock>, visibility: &VisibilityEngine, overrides: &mut ViewOverrides, width: usize) -> Self {
        let mut turn = Turn {
            blocks,
            strips: Vec::new(),
            block_strip_map: std::collections::HashMap::new(),
            line_offset: 0,
            widest_strip: 0,
            is_streaming: false,
            stable_strip_count: 0,
            rasterizer: Rasterizer::new(),
            streaming_buffer_index: None,
        };
        turn.rerasterize_all(visibility, overrides, width);
        turn
    }

    pub fn new_streaming() -> Self {
        Turn {
            blocks: Vec::new(),
            strips: Vec::new(),
            block_strip_map: std::collections::HashMap::new(),
            line_offset: 0,
            widest_strip: 0,
            is_streaming: true,
            stable_strip_count: 0,
            rasterizer: Rasterizer::new(),
            streaming_buffer_index: None,
        }
    }

    /// Appends one block during streaming. `TextDeltaBlock`s accumulate into
    /// a single buffered block whose tail strips are replaced each call;
    /// every other block kind is appended and becomes stable immediately.
    pub fn append_streaming(&mut self, block: FormattedBlock, visibility: &VisibilityEngine, overrides: &mut ViewOverrides, width: usize) {
        use cc_dump_block_ir::BlockPayload;

        let is_delta = matches!(block.payload, BlockPayload::TextDeltaBlock { .. });

        if is_delta {
            if let Some(idx) = self.streaming_buffer_index {
                let BlockPayload::TextDeltaBlock { text: new_text, .. } = &block.payload else {
                    unreachable!()
                };
                if let BlockPayload::TextDeltaBlock { text, .. } = &mut self.blocks[idx].payload {
                    text.push_str(new_text);
                }
                self.rasterizer.invalidate(self.blocks[idx].block_id);
                self.strips.truncate(self.stable_strip_count);
                let block_clone = self.blocks[idx].clone();
                let (tail_strips, expandable, region_ranges) = self.rasterize_block(&block_clone, visibility, overrides, width);
                let start = self.stable_strip_count;
                let entry = overrides.get_mut_or_default(block_clone.block_id);
                entry.expandable = expandable;
                entry.strip_range = Some((start, start + tail_strips.len()));
                Self::record_region_ranges(overrides, block_clone.block_id, start, &region_ranges);
                self.block_strip_map.insert(block_clone.block_id, start);
                self.strips.extend(tail_strips);
            } else {
                self.blocks.push(block.clone());
                self.streaming_buffer_index = Some(self.blocks.len() - 1);
                let (tail_strips, expandable, region_ranges) = self.rasterize_block(&block, visibility, overrides, width);
                let start = self.strips.len();
                let entry = overrides.get_mut_or_default(block.block_id);
                entry.expandable = expandable;
                entry.strip_range = Some((start, start + tail_strips.len()));
                Self::record_region_ranges(overrides, block.block_id, start, &region_ranges);
                self.block_strip_map.insert(block.block_id, start);
                self.strips.extend(tail_strips);
            }
        } else {
            self.blocks.push(block.clone());
            let (block_strips, expandable, region_ranges) = self.rasterize_block(&block, visibility, overrides, width);
            let start = self.strips.len();
            let entry = overrides.get_mut_or_default(block.block_id);
            entry.expandable = expandable;
            entry.strip_range = Some((start, start + block_strips.len()));
            Self::record_region_ranges(overrides, block.block_id, start, &region_ranges);
            self.block_strip_map.insert(block.block_id, start);
            self.strips.extend(block_strips);
            self.stable_strip_count = self.strips.len();
        }

        self.widest_strip = self.widest_strip.max(self.strips.iter().map(|s| s.cell_width).max().unwrap_or(0));
    }

    /// Consolidates the buffered delta text into one `TextContentBlock`,
    /// fully re-rasterizes, and clears `is_streaming`.
    pub fn finalize(&mut self, visibility: &VisibilityEngine, overrides: &mut ViewOverrides, width: usize) {
        use cc_dump_block_ir::BlockPayload;

        if let Some(idx) = self.streaming_buffer_index.take() {
            if let BlockPayload::TextDeltaBlock { text, .. } = &self.blocks[idx].payload {
                let consolidated_text = text.clone();
                let role = if self.blocks[idx].category == cc_dump_block_ir::Category::Assistant {
                    "assistant".to_string()
                } else {
                    "user".to_string()
                };
                self.blocks[idx] = cc_dump_block_ir::FormattedBlock::with_category(
                    BlockPayload::TextContentBlock { text: consolidated_text, role },
                    self.blocks[idx].category,
                );
            }
        }
        self.is_streaming = false;
        self.rerasterize_all(visibility, overrides, width);
    }

    pub fn rerasterize(&mut self, visibility: &VisibilityEngine, overrides: &mut ViewOverrides, width: usize) {
        self.rerasterize_all(visibility, overrides, width);
    }
}
