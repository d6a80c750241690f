//! HTTP Archive (HAR) 1.2 reader/writer shared by the session recorder (C10)
//! and session replayer (C11). Not a teacher analogue — HAR is new to this
//! exercise — but structured the way the workspace's other wire-format
//! crates mirror an external schema: small `#[serde(rename_all =
//! "camelCase")]` structs, one per HAR object kind.

mod entry;
mod error;
mod reader;
mod writer;

pub use entry::{Content, Entry, HarRequest, HarResponse, NameValue, PostData};
pub use error::ArchiveError;
pub use reader::{read_entries, read_entries_str};
pub use writer::HarWriter;

/// Returns the current UTC instant formatted as HAR's `startedDateTime`
/// (ISO 8601 with fractional seconds), used by the recorder when assembling
/// each entry.
pub fn started_date_time() -> String {
    jiff::Zoned::now().with_time_zone(jiff::tz::TimeZone::UTC).strftime("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile_like_helper::TempPath;

    use super::*;

    mod tempfile_like_helper {
        use std::path::PathBuf;

        /// A minimal self-cleaning temp file path, since the workspace
        /// doesn't carry a `tempfile` dependency for this one test module.
        pub struct TempPath(pub PathBuf);

        impl TempPath {
            pub fn new(name: &str) -> Self {
                let mut path = std::env::temp_dir();
                path.push(format!("cc-dump-archive-test-{}-{}.har", std::process::id(), name));
                Self(path)
            }
        }

        impl Drop for TempPath {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }
    }

    fn sample_entry(path: &str) -> Entry {
        Entry {
            started_date_time: started_date_time(),
            time: 12.5,
            request: HarRequest::json(
                "POST",
                format!("https://api.anthropic.com/v1/messages#{path}"),
                vec![NameValue::new("content-type", "application/json")],
                &serde_json::json!({"model": "claude-x", "stream": false}),
            ),
            response: HarResponse::json(
                200,
                vec![NameValue::new("content-type", "application/json")],
                &serde_json::json!({"id": "msg_1", "type": "message"}),
            ),
        }
    }

    #[test]
    fn round_trip_preserves_all_entries() {
        let temp = TempPath::new("round-trip");
        let mut writer = HarWriter::create(&temp.0).unwrap();
        writer.append_entry(&sample_entry("one")).unwrap();
        writer.append_entry(&sample_entry("two")).unwrap();
        writer.finalize().unwrap();

        let entries = read_entries(&temp.0).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], sample_entry("one"));
        assert_eq!(entries[1], sample_entry("two"));
    }

    #[test]
    fn tolerates_unfinalized_file_with_truncated_trailing_entry() {
        let temp = TempPath::new("truncated");
        let mut writer = HarWriter::create(&temp.0).unwrap();
        writer.append_entry(&sample_entry("one")).unwrap();
        // Simulate a crash mid-write of the second entry: append a partial
        // JSON object directly instead of calling append_entry.
        {
            use std::io::Write as _;
            let mut file = std::fs::OpenOptions::new().append(true).open(&temp.0).unwrap();
            write!(file, ",\n{{\"startedDateTime\":\"2026-01-01").unwrap();
        }

        let entries = read_entries(&temp.0).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], sample_entry("one"));
    }
}
