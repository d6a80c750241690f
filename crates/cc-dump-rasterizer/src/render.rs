use cc_dump_block_ir::{BlockPayload, ContentRegion, FormattedBlock, RegionKind, TrackStatus};
use cc_dump_visibility::VisState;

use crate::strip::{Strip, StyleTag};

/// Lines a code fence region is rendered expanded by default, below which
/// collapsing would save no vertical space worth the extra keystroke.
pub const CODE_FENCE_AUTO_EXPAND_LINES: usize = 12;

fn wrap_plain(text: &str, style: StyleTag) -> Vec<Strip> {
    text.lines().map(|line| Strip::styled(line.to_string(), style)).collect()
}

fn summary_line(text: &str, style: StyleTag) -> Strip {
    let first_line = text.lines().next().unwrap_or("").to_string();
    Strip::styled(first_line, style)
}

fn region_label(kind: &RegionKind) -> String {
    match kind {
        RegionKind::CodeFence { lang: Some(lang) } => format!("code ({lang})"),
        RegionKind::CodeFence { lang: None } => "code".to_string(),
        RegionKind::XmlSection { tag } => format!("<{tag}>"),
        RegionKind::MarkdownFence => "block".to_string(),
    }
}

/// Whether a region should render expanded absent any explicit override,
/// per spec.md §4.5's auto-expand threshold: short regions aren't worth
/// collapsing, long ones default closed.
pub fn default_region_expanded(region: &ContentRegion, text: &str) -> bool {
    region.line_count(text) <= CODE_FENCE_AUTO_EXPAND_LINES
}

/// Renders a block's text with its `content_regions` segmented out: each
/// region becomes a toggleable header line, expanded inline or collapsed to
/// a one-line summary depending on `region_expanded(index)` (falling back to
/// [`default_region_expanded`] when no explicit override exists). Plain text
/// outside any region renders unchanged. Returns `(strips, region_ranges)`
/// where `region_ranges[i]` is the strip index range `(start, end)` that
/// region `i` occupied, for the caller to record into overrides.
pub fn render_regions(
    text: &str,
    regions: &[ContentRegion],
    style: StyleTag,
    region_expanded: impl Fn(usize) -> Option<bool>,
) -> (Vec<Strip>, Vec<(usize, usize)>) {
    let mut strips = Vec::new();
    let mut ranges = Vec::with_capacity(regions.len());
    let mut cursor = 0;

    for (index, region) in regions.iter().enumerate() {
        if region.start > cursor {
            strips.extend(wrap_plain(&text[cursor..region.start], style));
        }

        let expanded = region_expanded(index).unwrap_or_else(|| default_region_expanded(region, text));
        let region_start = strips.len();
        let label = region_label(&region.kind);
        let body = text.get(region.start..region.end).unwrap_or("");
        let line_count = region.line_count(text);

        if expanded {
            strips.push(Strip::styled(format!("▾ {label}"), StyleTag::Dim));
            strips.extend(wrap_plain(body, style));
        } else {
            strips.push(Strip::styled(format!("▸ {label} ({line_count} lines)"), StyleTag::Dim));
        }
        ranges.push((region_start, strips.len()));

        cursor = region.end;
    }

    if cursor < text.len() {
        strips.extend(wrap_plain(&text[cursor..], style));
    }

    (strips, ranges)
}

/// Renders one block at one resolved [`VisState`], ignoring width-dependent
/// wrapping (left to the display host, which knows the terminal's real
/// column count at render_line time).
///
/// Summary and full renderers never share output: a summary render always
/// returns a first-line projection, never a line-capped full render.
pub fn render(block: &FormattedBlock, vis_state: VisState) -> Vec<Strip> {
    if vis_state == VisState::Hidden {
        return Vec::new();
    }

    let full = matches!(vis_state, VisState::FullCollapsed | VisState::FullExpanded);

    match &block.payload {
        BlockPayload::SeparatorBlock => vec![Strip::styled("─".repeat(40), StyleTag::Dim)],
        BlockPayload::HeaderBlock { timestamp } => vec![Strip::styled(format!("── {timestamp} ──"), StyleTag::Dim)],
        BlockPayload::RoleBlock { role } => vec![Strip::styled(role.clone(), StyleTag::Bold)],
        BlockPayload::NewlineBlock => vec![Strip::empty()],
        BlockPayload::NewSessionBlock => vec![Strip::styled("── new session ──", StyleTag::Accent)],
        BlockPayload::MessageBlock { role, message_index } => {
            let style = role_style(role);
            vec![Strip::styled(format!("[{message_index}] {role}"), style)]
        }
        BlockPayload::MetadataSection => vec![Strip::styled("metadata", StyleTag::Muted)],
        BlockPayload::SystemSection => vec![Strip::styled("system", StyleTag::Muted)],
        BlockPayload::ToolDefsSection => vec![Strip::styled("tools", StyleTag::Muted)],
        BlockPayload::ResponseMetadataSection => vec![Strip::styled("response", StyleTag::Muted)],
        BlockPayload::ResponseMessageBlock { role } => vec![Strip::styled(role.clone(), role_style(role))],
        BlockPayload::TextContentBlock { text, role } => {
            if full {
                wrap_plain(text, role_style(role))
            } else {
                vec![summary_line(text, role_style(role))]
            }
        }
        BlockPayload::TextDeltaBlock { text, .. } => wrap_plain(text, StyleTag::RoleAssistant),
        BlockPayload::ImageBlock { media_type } => vec![Strip::styled(format!("[image: {media_type}]"), StyleTag::Muted)],
        BlockPayload::ThinkingBlock { text, .. } => {
            if full {
                wrap_plain(text, StyleTag::Dim)
            } else {
                vec![summary_line(text, StyleTag::Dim)]
            }
        }
        BlockPayload::TrackedContentBlock { tag_id, status, text, color_idx } => {
            render_tracked(*tag_id, status, text, *color_idx, full)
        }
        BlockPayload::ConfigContentBlock { text } => {
            if full {
                wrap_plain(text, StyleTag::Plain)
            } else {
                vec![summary_line(text, StyleTag::Plain)]
            }
        }
        BlockPayload::HookOutputBlock { text } => {
            if full {
                wrap_plain(text, StyleTag::Muted)
            } else {
                vec![summary_line(text, StyleTag::Muted)]
            }
        }
        BlockPayload::MetadataBlock { model, stream, .. } => {
            vec![Strip::styled(format!("model={model} stream={stream}"), StyleTag::Muted)]
        }
        BlockPayload::HttpHeadersBlock { headers } => {
            if full {
                headers.iter().map(|(k, v)| Strip::styled(format!("{k}: {v}"), StyleTag::Dim)).collect()
            } else {
                vec![Strip::styled(format!("{} headers", headers.len()), StyleTag::Dim)]
            }
        }
        BlockPayload::TurnBudgetBlock { budget_tokens } => match budget_tokens {
            Some(tokens) => vec![Strip::styled(format!("budget: {tokens} tokens"), StyleTag::Muted)],
            None => vec![Strip::styled("budget: n/a", StyleTag::Muted)],
        },
        BlockPayload::StopReasonBlock { reason } => vec![Strip::styled(format!("stop_reason={reason}"), StyleTag::Muted)],
        BlockPayload::StreamInfoBlock { stream } => vec![Strip::styled(format!("stream={stream}"), StyleTag::Muted)],
        BlockPayload::SystemLabelBlock { label } => vec![Strip::styled(label.clone(), StyleTag::Muted)],
        BlockPayload::ToolDefinitionsBlock { count } => vec![Strip::styled(format!("{count} tool definitions"), StyleTag::Muted)],
        BlockPayload::ToolDefBlock { name, description } => {
            let desc = description.as_deref().unwrap_or("");
            if full {
                vec![Strip::styled(format!("{name}: {desc}"), StyleTag::Plain)]
            } else {
                vec![Strip::styled(name.clone(), StyleTag::Plain)]
            }
        }
        BlockPayload::SkillDefChild { name } => vec![Strip::styled(format!("  skill: {name}"), StyleTag::Dim)],
        BlockPayload::AgentDefChild { name } => vec![Strip::styled(format!("  agent: {name}"), StyleTag::Dim)],
        BlockPayload::ToolUseBlock { id, name, input, color_idx } => {
            let style = StyleTag::TagColor(*color_idx);
            if full {
                let mut lines = vec![Strip::styled(format!("tool_use {name} ({id})"), style)];
                lines.extend(wrap_plain(&input.to_string(), StyleTag::Dim));
                lines
            } else {
                vec![Strip::styled(format!("tool_use {name}"), style)]
            }
        }
        BlockPayload::ToolResultBlock { name, content, is_error, color_idx, incomplete, .. } => {
            let label = name.clone().unwrap_or_else(|| "<unmatched>".to_string());
            let style = if *is_error {
                StyleTag::Error
            } else {
                color_idx.map(StyleTag::TagColor).unwrap_or(StyleTag::Plain)
            };
            let mut lines = if full {
                wrap_plain(content, style)
            } else {
                vec![summary_line(content, style)]
            };
            if *incomplete {
                lines.insert(0, Strip::styled(format!("tool_result {label} (unmatched)"), StyleTag::Error));
            } else {
                lines.insert(0, Strip::styled(format!("tool_result {label}"), style));
            }
            lines
        }
        BlockPayload::ToolUseSummaryBlock { count } => vec![Strip::styled(format!("{count} tool calls"), StyleTag::Muted)],
        BlockPayload::StreamToolUseBlock { name, partial_json, .. } => {
            let label = name.clone().unwrap_or_default();
            vec![Strip::styled(format!("tool_use(streaming) {label} {partial_json}"), StyleTag::Dim)]
        }
        BlockPayload::ErrorBlock { code, reason } => {
            let label = code.map(|c| format!("[{c}] {reason}")).unwrap_or_else(|| reason.clone());
            vec![Strip::styled(label, StyleTag::Error)]
        }
        BlockPayload::ProxyErrorBlock { description } => vec![Strip::styled(description.clone(), StyleTag::Error)],
        BlockPayload::UnknownTypeBlock { type_tag, .. } => vec![Strip::styled(format!("<unknown: {type_tag}>"), StyleTag::Muted)],
    }
}

fn render_tracked(tag_id: u64, status: &TrackStatus, text: &str, color_idx: u32, full: bool) -> Vec<Strip> {
    let style = StyleTag::TagColor(color_idx);
    let mut lines = match status {
        TrackStatus::New => vec![Strip::styled(format!("[tag {tag_id}] (new)"), style)],
        TrackStatus::Ref => vec![Strip::styled(format!("[tag {tag_id}] (unchanged)"), style)],
        TrackStatus::Changed { unified_diff } => {
            let mut out = vec![Strip::styled(format!("[tag {tag_id}] (changed)"), style)];
            out.extend(wrap_plain(unified_diff, StyleTag::Dim));
            out
        }
    };
    if full {
        lines.extend(wrap_plain(text, StyleTag::Plain));
    }
    lines
}

fn role_style(role: &str) -> StyleTag {
    match role {
        "user" => StyleTag::RoleUser,
        "assistant" => StyleTag::RoleAssistant,
        _ => StyleTag::Plain,
    }
}

/// The text and style a region-bearing block renders its regions against.
/// Only the handful of free-form-text variants the formatter ever attaches
/// `content_regions` to are covered; anything else returns `None` and the
/// caller falls back to the block's ordinary (non-region) render.
fn block_region_source(block: &FormattedBlock) -> Option<(&str, StyleTag)> {
    match &block.payload {
        BlockPayload::TextContentBlock { text, role } => Some((text.as_str(), role_style(role))),
        BlockPayload::ToolResultBlock { content, is_error, color_idx, .. } => {
            let style = if *is_error { StyleTag::Error } else { color_idx.map(StyleTag::TagColor).unwrap_or(StyleTag::Plain) };
            Some((content.as_str(), style))
        }
        BlockPayload::TrackedContentBlock { text, color_idx, .. } => Some((text.as_str(), StyleTag::TagColor(*color_idx))),
        _ => None,
    }
}

/// Renders a block through its `content_regions`, interleaving region
/// headers with the surrounding plain text, when the block is both
/// region-bearing and shown in a full (non-summary) vis state. Returns
/// `None` when regions don't apply, so the caller can fall back to
/// [`render`]'s ordinary per-block-id cached path.
pub fn render_with_regions(
    block: &FormattedBlock,
    vis_state: VisState,
    region_expanded: impl Fn(usize) -> Option<bool>,
) -> Option<(Vec<Strip>, Vec<(usize, usize)>)> {
    if !matches!(vis_state, VisState::FullCollapsed | VisState::FullExpanded) {
        return None;
    }
    let regions = block.content_regions.as_deref()?;
    if regions.is_empty() {
        return None;
    }
    let (text, style) = block_region_source(block)?;
    Some(render_regions(text, regions, style, region_expanded))
}

/// Applies the rasterizer's truncation contract: caps output at the vis
/// state's global line limit, replacing the last visible strip with a
/// "…N more lines" indicator when content was cut, and reports whether the
/// block turned out to be expandable (had more content than its limit).
pub fn apply_truncation(mut strips: Vec<Strip>, vis_state: VisState) -> (Vec<Strip>, bool) {
    let Some(limit) = vis_state.line_limit() else {
        return (strips, false);
    };
    if strips.len() <= limit {
        return (strips, false);
    }
    let hidden = strips.len() - limit.saturating_sub(1);
    if limit == 0 {
        return (Vec::new(), true);
    }
    strips.truncate(limit.saturating_sub(1));
    strips.push(Strip::styled(format!("… {hidden} more lines"), StyleTag::Dim));
    (strips, true)
}

#[cfg(test)]
mod tests {
    use cc_dump_block_ir::{detect_regions, Category};
    use pretty_assertions::assert_eq;

    use super::*;

    fn fenced_text() -> String {
        format!("intro line\n```rust\n{}\n```\nafter the fence", (0..20).map(|i| format!("l{i}")).collect::<Vec<_>>().join("\n"))
    }

    #[test]
    fn long_region_defaults_collapsed_short_region_defaults_expanded() {
        let text = fenced_text();
        let regions = detect_regions(&text);
        let (strips, ranges) = render_regions(&text, &regions, StyleTag::Plain, |_| None);
        assert_eq!(ranges.len(), 1);
        assert!(strips[ranges[0].0].runs[0].text.starts_with('▸'), "20-line fence exceeds the auto-expand threshold");

        let short = "intro\n```\na\nb\n```\ndone";
        let short_regions = detect_regions(short);
        let (short_strips, short_ranges) = render_regions(short, &short_regions, StyleTag::Plain, |_| None);
        assert!(short_strips[short_ranges[0].0].runs[0].text.starts_with('▾'));
    }

    #[test]
    fn explicit_override_wins_over_default() {
        let text = "intro\n```\na\nb\n```\ndone";
        let regions = detect_regions(text);
        let (strips, ranges) = render_regions(text, &regions, StyleTag::Plain, |_| Some(false));
        assert!(strips[ranges[0].0].runs[0].text.starts_with('▸'));
    }

    #[test]
    fn render_with_regions_ignores_summary_states() {
        let text = fenced_text();
        let block = FormattedBlock::with_category(BlockPayload::TextContentBlock { text: text.clone(), role: "user".into() }, Category::User)
            .with_regions(detect_regions(&text));
        assert!(render_with_regions(&block, VisState::SummaryExpanded, |_| None).is_none());
        assert!(render_with_regions(&block, VisState::FullExpanded, |_| None).is_some());
    }

    #[test]
    fn render_with_regions_is_none_for_regionless_blocks() {
        let block = FormattedBlock::with_category(BlockPayload::TextContentBlock { text: "short".into(), role: "user".into() }, Category::User);
        assert!(render_with_regions(&block, VisState::FullExpanded, |_| None).is_none());
    }
}
