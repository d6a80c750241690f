//! Logging while the TUI holds the terminal: stderr is unusable once raw
//! mode and the alternate screen are active, so log records are routed onto
//! a bounded channel the runner drains each tick and surfaces as the most
//! recent line in the status bar, adapted from the teacher's UTC-timestamped
//! layout and channel appender.

use std::sync::Once;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use jiff::tz::TimeZone;
use jiff::Zoned;
use logforth::append::Append;
use logforth::filter::EnvFilter;
use std::str::FromStr;

static INIT: Once = Once::new();

/// One formatted log line plus its level, for the status bar to colorize.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: String,
    pub level: log::Level,
    pub message: String,
}

/// Initializes the global logger to route every record through a bounded
/// channel instead of stderr. Guarded by `Once` so a second call (e.g. from
/// a test harness) is a no-op rather than a panic.
pub fn init(filter: &str) -> Receiver<LogLine> {
    let (tx, rx) = crossbeam_channel::bounded(256);
    let filter = filter.to_string();
    INIT.call_once(move || {
        logforth::builder()
            .dispatch(move |d| {
                let env_filter = EnvFilter::from_str(&filter).unwrap_or_else(|_| EnvFilter::from_str("info").expect("default filter is valid"));
                d.filter(env_filter).append(ChannelAppender::new(tx))
            })
            .apply();
    });
    rx
}

#[derive(Debug)]
struct ChannelAppender {
    sender: Sender<LogLine>,
}

impl ChannelAppender {
    fn new(sender: Sender<LogLine>) -> Self {
        Self { sender }
    }
}

impl Append for ChannelAppender {
    fn append(&self, record: &log::Record<'_>, _diagnostics: &[Box<dyn logforth::diagnostic::Diagnostic>]) -> anyhow::Result<()> {
        let timestamp = Zoned::now().with_time_zone(TimeZone::UTC).strftime("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let line = LogLine { timestamp, level: record.level(), message: record.args().to_string() };
        if let Err(TrySendError::Full(_)) = self.sender.try_send(line) {
            // Status bar only ever shows the latest line; an overflowing
            // channel just means nobody read the previous one in time.
        }
        Ok(())
    }
}
