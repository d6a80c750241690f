//! Rendering layer: a single scrolling transcript pane plus a status/help
//! line, adapted from the teacher's tabbed dashboard but collapsed to the
//! one view this tool needs.

use cc_dump_block_ir::Category;
use cc_dump_rasterizer::StyleTag;
use cc_dump_turn_store::SearchSession;
use cc_dump_visibility::CategoryLevel;
use ratatui::prelude::{Alignment, Color, Constraint, Direction, Layout, Line, Modifier, Rect, Span, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::logger::LogLine;
use crate::state::TranscriptState;

pub(crate) const PANEL_BACKGROUND: Color = Color::Rgb(0, 0, 0);
pub(crate) const PANEL_BORDER_DIM: Color = Color::Rgb(73, 84, 105);
pub(crate) const PANEL_BORDER_ACTIVE: Color = Color::Rgb(139, 168, 255);
pub(crate) const TEXT_PRIMARY: Color = Color::Rgb(210, 222, 255);
pub(crate) const TEXT_MUTED: Color = Color::Rgb(150, 160, 185);
pub(crate) const TEXT_ACCENT: Color = Color::Rgb(189, 208, 255);
pub(crate) const TEXT_ERROR: Color = Color::Rgb(255, 120, 120);
pub(crate) const ROLE_USER_COLOR: Color = Color::Rgb(255, 163, 102);
pub(crate) const ROLE_ASSISTANT_COLOR: Color = Color::Rgb(108, 220, 255);

/// Resolves a rasterizer [`StyleTag`] to a concrete ratatui style. The
/// rasterizer only ever hands back semantic names; this is the one place
/// that picks colors, matching the display output contract.
fn resolve_style(tag: StyleTag) -> Style {
    match tag {
        StyleTag::Plain => Style::default().fg(TEXT_PRIMARY),
        StyleTag::Bold => Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD),
        StyleTag::Dim => Style::default().fg(TEXT_MUTED).add_modifier(Modifier::DIM),
        StyleTag::Muted => Style::default().fg(TEXT_MUTED),
        StyleTag::Accent => Style::default().fg(TEXT_ACCENT),
        StyleTag::Error => Style::default().fg(TEXT_ERROR),
        StyleTag::RoleUser => Style::default().fg(ROLE_USER_COLOR),
        StyleTag::RoleAssistant => Style::default().fg(ROLE_ASSISTANT_COLOR),
        StyleTag::TagColor(rgb) => Style::default().fg(Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)),
    }
    .bg(PANEL_BACKGROUND)
}

#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub(crate) enum ExitOverlay {
    #[default]
    Hidden,
    Prompt,
    ShuttingDown,
}

/// Search bar state: either not engaged, mid-edit of the query string (no
/// overrides applied yet), or showing a committed [`SearchSession`]'s match
/// count and position.
#[derive(Default)]
pub(crate) enum SearchMode {
    #[default]
    Inactive,
    Editing(String),
    Active(SearchSession),
}

const CYCLABLE_CATEGORIES: [(char, Category); 8] = [
    ('h', Category::Headers),
    ('u', Category::User),
    ('a', Category::Assistant),
    ('t', Category::Tools),
    ('y', Category::System),
    ('m', Category::Metadata),
    ('b', Category::Budget),
    ('k', Category::Thinking),
];

fn level_label(level: CategoryLevel) -> &'static str {
    match level {
        CategoryLevel::Existence => "off",
        CategoryLevel::Summary => "sum",
        CategoryLevel::Full => "full",
    }
}

/// Owns everything the render pass needs beyond the transcript store itself:
/// scroll position, the exit confirmation overlay, and the latest log line
/// surfaced from the logging channel.
pub(crate) struct Ui {
    scroll: usize,
    follow_tail: bool,
    exit_overlay: ExitOverlay,
    last_log: Option<LogLine>,
    viewport_lines: usize,
    content_top: u16,
    pub(crate) search: SearchMode,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            scroll: 0,
            follow_tail: true,
            exit_overlay: ExitOverlay::Hidden,
            last_log: None,
            viewport_lines: 0,
            content_top: 0,
            search: SearchMode::Inactive,
        }
    }
}

impl Ui {
    pub(crate) fn render(&mut self, state: &TranscriptState, frame: &mut Frame<'_>) {
        let size = frame.area();
        let search_row_height = if matches!(self.search, SearchMode::Inactive) { 0 } else { 1 };
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(search_row_height), Constraint::Length(1)])
            .split(size);

        self.render_transcript(state, frame, layout[0]);
        if search_row_height > 0 {
            self.render_search_bar(frame, layout[1]);
        }
        self.render_status(state, frame, layout[2]);

        match self.exit_overlay {
            ExitOverlay::Prompt => self.render_exit_prompt(frame, size),
            ExitOverlay::ShuttingDown => self.render_shutdown_notice(frame, size),
            ExitOverlay::Hidden => {}
        }
    }

    fn render_search_bar(&self, frame: &mut Frame<'_>, area: Rect) {
        let line = match &self.search {
            SearchMode::Inactive => Line::from(""),
            SearchMode::Editing(query) => {
                Line::from(vec![Span::styled(" /", Style::default().fg(TEXT_ACCENT)), Span::styled(query.clone(), Style::default().fg(TEXT_PRIMARY))])
            }
            SearchMode::Active(session) if session.is_empty() => {
                Line::from(Span::styled(format!(" /{}  no matches", session.query), Style::default().fg(TEXT_ERROR)))
            }
            SearchMode::Active(session) => Line::from(Span::styled(
                format!(" /{}  match {}/{}", session.query, session.current + 1, session.match_count()),
                Style::default().fg(TEXT_ACCENT),
            )),
        };
        frame.render_widget(Paragraph::new(line).style(Style::default().bg(PANEL_BACKGROUND)), area);
    }

    fn render_transcript(&mut self, state: &TranscriptState, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(PANEL_BORDER_ACTIVE))
            .title("cc-dump")
            .title_style(Style::default().fg(TEXT_ACCENT))
            .style(Style::default().bg(PANEL_BACKGROUND));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        self.viewport_lines = inner.height as usize;
        self.content_top = inner.y;
        let total = state.turns.total_lines();
        if self.follow_tail {
            self.scroll = total.saturating_sub(self.viewport_lines);
        } else {
            self.scroll = self.scroll.min(total.saturating_sub(1));
        }

        let lines: Vec<Line<'_>> = (0..self.viewport_lines)
            .map(|row| {
                let y = self.scroll + row;
                match state.turns.render_line(y) {
                    Some(strip) => {
                        Line::from(strip.runs.iter().map(|run| Span::styled(run.text.clone(), resolve_style(run.style))).collect::<Vec<_>>())
                    }
                    None => Line::from(""),
                }
            })
            .collect();

        let paragraph = Paragraph::new(lines).style(Style::default().fg(TEXT_PRIMARY).bg(PANEL_BACKGROUND));
        frame.render_widget(paragraph, inner);
    }

    fn render_status(&self, state: &TranscriptState, frame: &mut Frame<'_>, area: Rect) {
        let levels = CYCLABLE_CATEGORIES
            .iter()
            .map(|(key, category)| format!("{key}:{}", level_label(state.turns.visibility().level_of(*category))))
            .collect::<Vec<_>>()
            .join(" ");

        let mut spans = vec![
            Span::styled(format!(" exchanges:{} ", state.status.exchange_count), Style::default().fg(TEXT_ACCENT)),
            Span::styled(levels, Style::default().fg(TEXT_MUTED)),
        ];

        if let Some(dropped) = (state.status.dropped_events > 0).then_some(state.status.dropped_events) {
            spans.push(Span::styled(format!("  dropped:{dropped}"), Style::default().fg(TEXT_ERROR)));
        }

        if let Some(log) = &self.last_log {
            let style = if log.level <= log::Level::Warn { Style::default().fg(TEXT_ERROR) } else { Style::default().fg(TEXT_MUTED) };
            spans.push(Span::styled(format!("  {}", log.message), style));
        }

        let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(PANEL_BACKGROUND));
        frame.render_widget(paragraph, area);
    }

    fn render_exit_prompt(&self, frame: &mut Frame<'_>, area: Rect) {
        let popup = centered_popup(area, 46, 5);
        let Some(popup) = popup else { return };
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(PANEL_BORDER_ACTIVE))
            .title("Confirm exit")
            .title_alignment(Alignment::Center)
            .style(Style::default().bg(PANEL_BACKGROUND));

        let text = vec![Line::from("Stop the proxy and quit?"), Line::from("Press y to confirm, n to stay")];
        let paragraph =
            Paragraph::new(text).alignment(Alignment::Center).style(Style::default().fg(TEXT_PRIMARY).bg(PANEL_BACKGROUND)).block(block);
        frame.render_widget(paragraph, popup);
    }

    fn render_shutdown_notice(&self, frame: &mut Frame<'_>, area: Rect) {
        let popup = centered_popup(area, 46, 5);
        let Some(popup) = popup else { return };
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(PANEL_BORDER_DIM))
            .title("Shutting down")
            .title_alignment(Alignment::Center)
            .style(Style::default().bg(PANEL_BACKGROUND));

        let paragraph = Paragraph::new("Closing the proxy listener…")
            .alignment(Alignment::Center)
            .style(Style::default().fg(TEXT_PRIMARY).bg(PANEL_BACKGROUND))
            .block(block);
        frame.render_widget(paragraph, popup);
    }

    pub(crate) fn exit_prompt_visible(&self) -> bool {
        self.exit_overlay == ExitOverlay::Prompt
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.exit_overlay == ExitOverlay::ShuttingDown
    }

    pub(crate) fn show_exit_prompt(&mut self) -> bool {
        if self.exit_overlay == ExitOverlay::Prompt {
            false
        } else {
            self.exit_overlay = ExitOverlay::Prompt;
            true
        }
    }

    pub(crate) fn hide_exit_prompt(&mut self) -> bool {
        if self.exit_overlay == ExitOverlay::Prompt {
            self.exit_overlay = ExitOverlay::Hidden;
            true
        } else {
            false
        }
    }

    pub(crate) fn begin_shutdown(&mut self) -> bool {
        if self.exit_overlay == ExitOverlay::ShuttingDown {
            false
        } else {
            self.exit_overlay = ExitOverlay::ShuttingDown;
            true
        }
    }

    pub(crate) fn scroll_by(&mut self, delta: isize) {
        self.follow_tail = false;
        if delta < 0 {
            self.scroll = self.scroll.saturating_sub(delta.unsigned_abs());
        } else {
            self.scroll = self.scroll.saturating_add(delta as usize);
        }
    }

    pub(crate) fn jump_to_tail(&mut self) {
        self.follow_tail = true;
    }

    pub(crate) fn viewport_lines(&self) -> usize {
        self.viewport_lines
    }

    pub(crate) fn scroll_offset(&self) -> usize {
        self.scroll
    }

    /// Maps a clicked terminal row to an absolute virtual line, accounting
    /// for the transcript pane's top border. `None` when the click landed
    /// outside the transcript pane (the border or the status line).
    pub(crate) fn line_for_click(&self, row: u16) -> Option<usize> {
        if row < self.content_top {
            return None;
        }
        let offset = (row - self.content_top) as usize;
        (offset < self.viewport_lines).then(|| self.scroll_offset() + offset)
    }

    pub(crate) fn record_log(&mut self, log: LogLine) {
        self.last_log = Some(log);
    }

    pub(crate) fn begin_search_edit(&mut self) {
        self.search = SearchMode::Editing(String::new());
    }

    pub(crate) fn is_editing_search(&self) -> bool {
        matches!(self.search, SearchMode::Editing(_))
    }

    pub(crate) fn push_search_char(&mut self, c: char) {
        if let SearchMode::Editing(query) = &mut self.search {
            query.push(c);
        }
    }

    pub(crate) fn pop_search_char(&mut self) {
        if let SearchMode::Editing(query) = &mut self.search {
            query.pop();
        }
    }

    pub(crate) fn search_query_draft(&self) -> Option<&str> {
        match &self.search {
            SearchMode::Editing(query) => Some(query),
            _ => None,
        }
    }

    pub(crate) fn commit_search(&mut self, session: SearchSession) {
        self.search = SearchMode::Active(session);
    }

    pub(crate) fn cancel_search(&mut self) {
        self.search = SearchMode::Inactive;
    }

    pub(crate) fn jump_to_line(&mut self, y: usize) {
        self.follow_tail = false;
        self.scroll = y;
    }
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Option<Rect> {
    if area.width == 0 || area.height == 0 {
        return None;
    }
    let width = width.min(area.width);
    let height = height.min(area.height);
    if width == 0 || height == 0 {
        return None;
    }
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Some(Rect::new(x, y, width, height))
}

pub(crate) fn category_for_key(c: char) -> Option<Category> {
    CYCLABLE_CATEGORIES.iter().find(|(key, _)| *key == c).map(|(_, category)| *category)
}
