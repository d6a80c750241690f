use std::io::Write;
use std::path::Path;

use crate::entry::Entry;
use crate::error::ArchiveError;

const CREATOR_NAME: &str = "cc-dump";
const CREATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Writes entries to an HTTP Archive 1.2 file incrementally: each
/// `append_entry` call serializes and flushes one entry immediately, so a
/// process killed mid-session leaves a file with every prior entry durable
/// plus, at worst, one partially written trailing entry (spec.md §6's
/// "files are append-safe").
///
/// This never holds the whole archive in memory or rewrites earlier bytes —
/// the top-level `{"log":{...,"entries":[` preamble is written once, each
/// entry is appended as its own JSON object, and [`HarWriter::finalize`]
/// closes the brackets to leave a strictly valid HAR document. A file that
/// was never finalized (or whose process crashed mid-entry) is still
/// readable by [`crate::reader::read_entries`], which tolerates a missing
/// closing bracket and a truncated last entry.
pub struct HarWriter {
    file: std::fs::File,
    entry_count: usize,
}

impl HarWriter {
    /// Creates a new archive file at `path`, truncating any existing file,
    /// and writes the HAR preamble.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let mut file = std::fs::File::create(path)?;
        write!(
            file,
            r#"{{"log":{{"version":"1.2","creator":{{"name":"{CREATOR_NAME}","version":"{CREATOR_VERSION}"}},"entries":["#
        )?;
        file.flush()?;
        Ok(Self { file, entry_count: 0 })
    }

    /// Appends one entry, flushing it to disk before returning. A failure
    /// here is the recorder's cue to disable further recording for the
    /// session (spec.md's archive-write failure policy) rather than retry.
    pub fn append_entry(&mut self, entry: &Entry) -> Result<(), ArchiveError> {
        if self.entry_count > 0 {
            write!(self.file, ",\n")?;
        }
        serde_json::to_writer(&mut self.file, entry)?;
        self.file.flush()?;
        self.entry_count += 1;
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Closes the entries array and the top-level object, leaving a file any
    /// standard HAR viewer accepts. Safe to skip on crash; the reader
    /// tolerates an unfinalized file either way.
    pub fn finalize(mut self) -> Result<(), ArchiveError> {
        write!(self.file, "\n]}}}}")?;
        self.file.flush()?;
        Ok(())
    }
}
