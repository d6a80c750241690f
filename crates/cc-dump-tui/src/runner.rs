use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use crossterm::event::{self, Event, KeyCode, KeyModifiers, MouseButton, MouseEventKind};
use ratatui::prelude::Backend;
use ratatui::Terminal;
use tokio_util::sync::CancellationToken;

use crate::logger::LogLine;
use crate::poll::Poller;
use crate::state::TranscriptState;
use crate::ui::{category_for_key, SearchMode, Ui};

/// Minimum time between redraws when nothing new arrives.
const REFRESH_INTERVAL: Duration = Duration::from_millis(250);
/// Polling cadence for keyboard and mouse events.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Drives the event loop: pulls proxy events into the transcript, renders
/// frames, and reacts to user input. Mirrors the teacher's runner, minus the
/// tab strip this tool has no use for.
pub struct Runner {
    pub poller: Poller,
    pub log_rx: Receiver<LogLine>,
    pub shutdown: CancellationToken,
}

impl Runner {
    /// Returns `true` when the user explicitly asked to quit.
    pub fn run<B: Backend>(mut self, terminal: &mut Terminal<B>, width: usize) -> anyhow::Result<bool> {
        let mut ui = Ui::default();
        let mut state = TranscriptState::new(width);
        let mut loop_state = EventLoopState::new();

        loop {
            self.update_and_render(&mut ui, &mut state, &mut loop_state, terminal)?;

            if loop_state.exit_requested {
                break;
            }

            self.handle_terminal_events(&mut ui, &mut loop_state)?;
            self.apply_pending_actions(&mut ui, &mut state, &mut loop_state);
            self.check_shutdown_completion(&mut loop_state);
        }

        terminal.draw(|frame| ui.render(&state, frame))?;
        Ok(loop_state.exit_requested)
    }

    fn update_and_render<B: Backend>(
        &mut self,
        ui: &mut Ui,
        state: &mut TranscriptState,
        loop_state: &mut EventLoopState,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        loop_state.dirty |= self.poller.poll(state);
        while let Ok(log) = self.log_rx.try_recv() {
            ui.record_log(log);
            loop_state.dirty = true;
        }

        let should_render = loop_state.dirty || loop_state.last_render.elapsed() >= REFRESH_INTERVAL;
        if should_render {
            terminal.draw(|frame| ui.render(state, frame))?;
            loop_state.last_render = Instant::now();
            loop_state.dirty = false;
        }

        Ok(())
    }

    fn handle_terminal_events(&mut self, ui: &mut Ui, loop_state: &mut EventLoopState) -> anyhow::Result<()> {
        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) => self.handle_key_event(key, ui, loop_state),
                Event::Resize(_, _) => self.handle_resize_event(loop_state),
                Event::Mouse(mouse) => self.handle_mouse_event(mouse, ui, loop_state),
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: event::KeyEvent, ui: &mut Ui, loop_state: &mut EventLoopState) {
        let is_ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'));

        if ui.exit_prompt_visible() {
            self.handle_exit_prompt_keys(key, is_ctrl_c, ui, loop_state);
            return;
        }

        if ui.is_shutting_down() {
            if is_ctrl_c {
                loop_state.exit_requested = true;
            }
            return;
        }

        if ui.is_editing_search() {
            self.handle_search_edit_keys(key, is_ctrl_c, ui, loop_state);
            return;
        }

        self.handle_normal_keys(key, is_ctrl_c, ui, loop_state);
    }

    /// Keys while the search bar has focus (after `/`, before the query is
    /// committed with Enter). Everything but Enter/Esc/Backspace is treated
    /// as query text, matching the teacher's modal-prompt convention.
    fn handle_search_edit_keys(&mut self, key: event::KeyEvent, is_ctrl_c: bool, ui: &mut Ui, loop_state: &mut EventLoopState) {
        if is_ctrl_c {
            loop_state.exit_requested = true;
            return;
        }
        match key.code {
            KeyCode::Enter => {
                if let Some(query) = ui.search_query_draft() {
                    loop_state.search_commit = Some(query.to_string());
                }
            }
            KeyCode::Esc => {
                ui.cancel_search();
                loop_state.search_cancelled = true;
            }
            KeyCode::Backspace => ui.pop_search_char(),
            KeyCode::Char(c) => ui.push_search_char(c),
            _ => {}
        }
        loop_state.dirty = true;
    }

    fn handle_exit_prompt_keys(&mut self, key: event::KeyEvent, is_ctrl_c: bool, ui: &mut Ui, loop_state: &mut EventLoopState) {
        if is_ctrl_c {
            loop_state.exit_requested = true;
            return;
        }

        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                _ = ui.begin_shutdown();
                if !loop_state.shutdown_initiated {
                    self.shutdown.cancel();
                    loop_state.shutdown_initiated = true;
                }
                loop_state.dirty = true;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                _ = ui.hide_exit_prompt();
                loop_state.dirty = true;
            }
            _ => {}
        }
    }

    fn handle_normal_keys(&mut self, key: event::KeyEvent, is_ctrl_c: bool, ui: &mut Ui, loop_state: &mut EventLoopState) {
        match key.code {
            KeyCode::Esc if matches!(ui.search, SearchMode::Active(_)) => {
                ui.cancel_search();
                loop_state.search_cancelled = true;
                loop_state.dirty = true;
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                loop_state.dirty |= ui.show_exit_prompt();
            }
            KeyCode::Char('c') if is_ctrl_c => loop_state.exit_requested = true,
            KeyCode::Char('/') => {
                ui.begin_search_edit();
                loop_state.dirty = true;
            }
            KeyCode::Char('n') if matches!(ui.search, SearchMode::Active(_)) => {
                loop_state.search_advance = true;
                loop_state.dirty = true;
            }
            KeyCode::Up => {
                ui.scroll_by(-1);
                loop_state.dirty = true;
            }
            KeyCode::Down => {
                ui.scroll_by(1);
                loop_state.dirty = true;
            }
            KeyCode::PageUp => {
                ui.scroll_by(-(ui.viewport_lines() as isize));
                loop_state.dirty = true;
            }
            KeyCode::PageDown => {
                ui.scroll_by(ui.viewport_lines() as isize);
                loop_state.dirty = true;
            }
            KeyCode::End => {
                ui.jump_to_tail();
                loop_state.dirty = true;
            }
            KeyCode::Char(c) => {
                if let Some(category) = category_for_key(c) {
                    loop_state.cycle_category = Some(category);
                    loop_state.dirty = true;
                }
            }
            _ => {}
        }
    }

    fn handle_resize_event(&self, loop_state: &mut EventLoopState) {
        loop_state.dirty = true;
        let now = Instant::now();
        loop_state.last_render = now.checked_sub(REFRESH_INTERVAL).unwrap_or(now);
    }

    fn handle_mouse_event(&self, mouse: event::MouseEvent, ui: &mut Ui, loop_state: &mut EventLoopState) {
        let is_left_click = matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Up(MouseButton::Left));
        if is_left_click {
            loop_state.clicked_row = Some((mouse.column, mouse.row));
            let _ = ui;
        }
    }

    /// Applies a pending category cycle and/or click hit-test queued by
    /// [`Self::handle_normal_keys`]/[`Self::handle_mouse_event`], mutating
    /// the turn store's visibility/override state and marking the frame
    /// dirty when either actually changed something.
    fn apply_pending_actions(&mut self, ui: &mut Ui, state: &mut TranscriptState, loop_state: &mut EventLoopState) {
        if let Some(category) = loop_state.cycle_category.take() {
            state.turns.cycle_category(category);
            loop_state.dirty = true;
        }

        if let Some((_column, row)) = loop_state.clicked_row.take() {
            if let Some(y) = ui.line_for_click(row) {
                if let Some((block_id, region_index)) = state.turns.region_at_line(y) {
                    state.turns.toggle_region(block_id, region_index);
                    loop_state.dirty = true;
                } else if let Some(block_id) = state.turns.block_at_line(y) {
                    state.turns.toggle_block(block_id);
                    loop_state.dirty = true;
                }
            }
        }

        if loop_state.search_cancelled {
            loop_state.search_cancelled = false;
            state.turns.clear_search();
            loop_state.dirty = true;
        }

        if let Some(query) = loop_state.search_commit.take() {
            let mut session = state.turns.search(&query);
            if let Some(y) = state.turns.search_goto(&mut session, false) {
                let target = y.saturating_sub(ui.viewport_lines() / 2);
                ui.jump_to_line(target);
            }
            ui.commit_search(session);
            loop_state.dirty = true;
        }

        if loop_state.search_advance {
            loop_state.search_advance = false;
            if let SearchMode::Active(session) = &mut ui.search {
                if let Some(y) = state.turns.search_goto(session, true) {
                    let target = y.saturating_sub(ui.viewport_lines() / 2);
                    ui.jump_to_line(target);
                }
            }
            loop_state.dirty = true;
        }
    }

    fn check_shutdown_completion(&self, loop_state: &mut EventLoopState) {
        if loop_state.shutdown_initiated && self.shutdown.is_cancelled() {
            loop_state.exit_requested = true;
        }
    }
}

struct EventLoopState {
    last_render: Instant,
    exit_requested: bool,
    shutdown_initiated: bool,
    dirty: bool,
    cycle_category: Option<cc_dump_block_ir::Category>,
    clicked_row: Option<(u16, u16)>,
    search_commit: Option<String>,
    search_cancelled: bool,
    search_advance: bool,
}

impl EventLoopState {
    fn new() -> Self {
        Self {
            last_render: Instant::now(),
            exit_requested: false,
            shutdown_initiated: false,
            dirty: true,
            cycle_category: None,
            clicked_row: None,
            search_commit: None,
            search_cancelled: false,
            search_advance: false,
        }
    }
}
