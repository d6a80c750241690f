//! CLI surface (spec.md §6, external to the core): parses arguments, wires
//! the proxy (C9) -> router (C8) -> {display, recorder} subscribers, and
//! drives the replay/continue/list flows SPEC_FULL.md §C supplements.
//!
//! Authored fresh against spec.md §6 and SPEC_FULL.md §C: the retrieval
//! pack's `nexus` binary ships no `args.rs`/real `main.rs` logic to adapt,
//! only a `logger.rs`-and-stub skeleton (see DESIGN.md).

mod args;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use args::Args;
use cc_dump_event_router::{EventRouter, SubscriberHandle, DEFAULT_QUEUE_CAPACITY};
use cc_dump_proxy::{router, ProxyState, UpstreamMode};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Exit codes per spec.md §6: 0 normal, 2 arg error (handled by `clap`
/// itself before `main` ever runs), 3 bind failure.
const EXIT_OK: i32 = 0;
const EXIT_BIND_FAILURE: i32 = 3;

/// HAR files this binary writes and discovers, per SPEC_FULL.md §C's
/// archive discovery convention (spec.md defines the format, not a
/// filename scheme).
const ARCHIVE_SUFFIX: &str = ".cc-dump.har";

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.list {
        return list_recordings();
    }

    let log_rx = cc_dump_tui::init_logger(&args.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let exit_code = runtime.block_on(run(args, log_rx))?;
    std::process::exit(exit_code);
}

/// `--list`: scans the recordings directory and prints each archive's
/// entry count, size, and start time. Reads each file in full (HAR archives
/// from a single cc-dump session are small enough that this is simpler than
/// maintaining a separate lightweight index).
fn list_recordings() -> anyhow::Result<()> {
    let dir = Args::recordings_dir();
    let files = discover_archives(&dir);

    if files.is_empty() {
        println!("no recordings found under {}", dir.display());
        return Ok(());
    }

    for path in &files {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        match cc_dump_archive::read_entries(path) {
            Ok(entries) => {
                let started = entries.first().map(|e| e.started_date_time.as_str()).unwrap_or("-");
                println!("{}\t{} entries\t{size} bytes\tstarted {started}", path.display(), entries.len());
            }
            Err(err) => println!("{}\t<unreadable: {err}>", path.display()),
        }
    }
    Ok(())
}

/// Every `*.cc-dump.har` file directly under `dir`, oldest first.
fn discover_archives(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.to_string_lossy().ends_with(ARCHIVE_SUFFIX))
        .collect();
    files.sort_by_key(|path| std::fs::metadata(path).and_then(|m| m.modified()).ok());
    files
}

fn latest_recording(dir: &Path) -> Option<PathBuf> {
    discover_archives(dir).into_iter().next_back()
}

fn default_record_path() -> PathBuf {
    let dir = Args::recordings_dir();
    let timestamp = jiff::Zoned::now().with_time_zone(jiff::tz::TimeZone::UTC).strftime("%Y%m%dT%H%M%SZ");
    dir.join(format!("{timestamp}{ARCHIVE_SUFFIX}"))
}

/// Drains a recorder's queued events and writes archive entries until told
/// to stop via `stop`. `stop` is deliberately a *separate* token from the
/// session's overall `shutdown`: it must only fire once the caller has
/// confirmed the router has finished dispatching every event (i.e. after
/// joining the router thread), or the final drain below could race a
/// still-in-flight event and silently drop it from the recording.
fn run_recorder(handle: SubscriberHandle, path: PathBuf, stop: CancellationToken) {
    let mut recorder = match cc_dump_recorder::SessionRecorder::create(&path) {
        Ok(recorder) => recorder,
        Err(err) => {
            log::error!("recording disabled: failed to create archive at {}: {err}", path.display());
            return;
        }
    };
    log::info!("recording session to {}", path.display());

    loop {
        match handle.try_recv() {
            Some(event) => recorder.handle(&event),
            None if stop.is_cancelled() => break,
            None => std::thread::sleep(Duration::from_millis(50)),
        }
    }
    while let Some(event) = handle.try_recv() {
        recorder.handle(&event);
    }
    if let Err(err) = recorder.finalize() {
        log::error!("failed to finalize recording at {}: {err}", path.display());
    }
}

async fn run(args: Args, log_rx: crossbeam_channel::Receiver<cc_dump_tui::LogLine>) -> anyhow::Result<i32> {
    let shutdown = CancellationToken::new();
    let recorder_stop = CancellationToken::new();

    let (event_router, sender) = EventRouter::new(DEFAULT_QUEUE_CAPACITY);
    let display = event_router.add_queued_subscriber("display", DEFAULT_QUEUE_CAPACITY);

    let recording_enabled = !args.no_record && args.replay.is_none();
    let recorder_thread = recording_enabled.then(|| {
        let handle = event_router.add_queued_subscriber("recorder", DEFAULT_QUEUE_CAPACITY);
        let path = args.record.clone().unwrap_or_else(default_record_path);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let stop = recorder_stop.clone();
        std::thread::spawn(move || run_recorder(handle, path, stop))
    });

    let router_thread = std::thread::spawn(move || event_router.run());

    // Replay happens before any live traffic: a plain `--replay` session
    // never opens the listener at all, while `--continue` replays first and
    // then hands the sequence counter on to the live proxy so correlation
    // ids never collide (spec.md §4.11, SPEC_FULL.md §C).
    let mut next_sequence = 1u64;
    if let Some(replay_path) = &args.replay {
        next_sequence = cc_dump_replayer::replay(replay_path, next_sequence, &sender)?;
    } else if args.continue_latest {
        match latest_recording(&Args::recordings_dir()) {
            Some(path) => {
                log::info!("replaying {} before continuing live", path.display());
                next_sequence = cc_dump_replayer::replay(&path, next_sequence, &sender)?;
            }
            None => log::warn!("--continue requested but no prior recordings were found"),
        }
    }

    let live = args.replay.is_none();
    let proxy_task = if live {
        let listener = match TcpListener::bind(("0.0.0.0", args.port)).await {
            Ok(listener) => listener,
            Err(err) => {
                log::error!("failed to bind listener on port {}: {err}", args.port);
                shutdown.cancel();
                drop(sender);
                let _ = router_thread.join();
                recorder_stop.cancel();
                if let Some(handle) = recorder_thread {
                    let _ = handle.join();
                }
                return Ok(EXIT_BIND_FAILURE);
            }
        };
        let local_addr = listener.local_addr()?;
        log::info!("listening on {local_addr}");

        let mode = match args.upstream.clone() {
            Some(url) => UpstreamMode::Reverse(url),
            None => UpstreamMode::Forward,
        };
        let state = Arc::new(ProxyState::with_starting_sequence(mode, sender.clone(), Duration::from_secs(args.timeout_secs), next_sequence));
        let app = router(state);
        let shutdown_for_serve = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).with_graceful_shutdown(async move { shutdown_for_serve.cancelled().await }).await {
                log::error!("proxy server error: {err}");
            }
        }))
    } else {
        None
    };

    // Our own sender handle is no longer needed: the proxy (if any) holds
    // the one remaining live producer clone, so the router's input queue
    // closes on its own once the proxy task finishes.
    drop(sender);

    let user_quit = cc_dump_tui::spawn(display, log_rx, shutdown.clone()).await?;
    if user_quit {
        shutdown.cancel();
    }

    if let Some(task) = proxy_task {
        let _ = task.await;
    }

    let _ = router_thread.join();
    recorder_stop.cancel();
    if let Some(handle) = recorder_thread {
        let _ = handle.join();
    }

    Ok(EXIT_OK)
}
