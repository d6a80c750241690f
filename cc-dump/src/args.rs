use std::path::PathBuf;

use clap::Parser;

/// cc-dump: a transparent HTTP/SSE proxy for the Anthropic Messages API
/// that renders every request and response live in a terminal UI and
/// records each session for later replay.
///
/// Authored fresh against spec.md §6 — the retrieval pack's `nexus` binary
/// carries no `args.rs` of its own to adapt.
#[derive(Debug, Parser)]
#[command(name = "cc-dump", version, about, long_about = None)]
pub struct Args {
    /// Port to listen on. Defaults to an OS-assigned ephemeral port.
    #[arg(long, default_value_t = 0)]
    pub port: u16,

    /// Fixed upstream base URL (reverse-proxy mode). Leave unset to run as
    /// a forward proxy that derives the target from each request's `Host`
    /// header instead (spec.md §4.9's two proxy modes).
    #[arg(long, env = "ANTHROPIC_BASE_URL")]
    pub upstream: Option<url::Url>,

    /// Path to write this session's recording to. Defaults to a
    /// timestamped file under the recordings directory (see `--list`).
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Disables recording for this session.
    #[arg(long)]
    pub no_record: bool,

    /// Replays a previously recorded archive instead of listening live.
    #[arg(long, conflicts_with_all = ["list", "continue_latest", "upstream"])]
    pub replay: Option<PathBuf>,

    /// Lists recorded sessions under the recordings directory and exits.
    #[arg(long, conflicts_with_all = ["replay", "continue_latest"])]
    pub list: bool,

    /// Replays the most recently recorded session, then continues live
    /// on the same correlation-id sequence (spec.md §6's `--continue`).
    #[arg(long = "continue", conflicts_with_all = ["replay", "list"])]
    pub continue_latest: bool,

    /// Upstream connect/read timeout, in seconds.
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    /// Log level filter, passed straight to the env-filter the same way
    /// `RUST_LOG` would be.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// The directory recordings are discovered in and, absent `--record`,
    /// written to: `{data_dir}/cc-dump/recordings` (SPEC_FULL.md §C's
    /// archive discovery convention — this filename/location scheme is
    /// introduced here since spec.md specifies the archive format but not
    /// where files live).
    pub fn recordings_dir() -> PathBuf {
        dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("cc-dump").join("recordings")
    }
}
