//! Display host (the UI thread of spec.md §5): owns terminal setup and
//! teardown, the transcript state that turns router events into Turns, and
//! the ratatui render loop. Structured the way the teacher's `tui` crate
//! bridges its async proxy runtime to a blocking ratatui loop, collapsed
//! from its four-module split (`runner`/`poller`/`orchestrator`/`ui`) to
//! three, since spec.md §5 has the UI thread mutate C6 state directly
//! rather than publish through an orchestrator's watch channels.

mod logger;
mod poll;
mod runner;
mod state;
mod ui;

use std::io;

use cc_dump_event_router::SubscriberHandle;
use crossbeam_channel::Receiver;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio_util::sync::CancellationToken;

pub use logger::{init as init_logger, LogLine};
pub use poll::Poller;
pub use runner::Runner;
pub use state::{TranscriptState, TranscriptStatus};

/// Runs the TUI on a blocking task so it never stalls the proxy's async
/// runtime, and coordinates shutdown both ways: the returned `true` means
/// the user asked to quit from inside the UI (the caller should cancel
/// `shutdown` itself), while an external cancellation of `shutdown` (e.g.
/// the proxy listener failing to bind) unblocks the UI loop from its side.
pub async fn spawn(display: SubscriberHandle, log_rx: Receiver<LogLine>, shutdown: CancellationToken) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || run_blocking(display, log_rx, shutdown)).await?
}

fn run_blocking(display: SubscriberHandle, log_rx: Receiver<LogLine>, shutdown: CancellationToken) -> anyhow::Result<bool> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let width = terminal.size().map(|size| size.width as usize).unwrap_or(80).max(1);
    let runner = Runner { poller: Poller::new(display), log_rx, shutdown };
    let result = runner.run(&mut terminal, width);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}
