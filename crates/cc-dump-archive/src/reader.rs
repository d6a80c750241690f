use std::path::Path;

use crate::entry::Entry;
use crate::error::ArchiveError;

/// Reads every complete entry from an HAR file written by [`crate::HarWriter`].
///
/// Entries are located by scanning for top-level `{...}` objects after the
/// `"entries":[` marker rather than parsing the file as one JSON document —
/// this is what lets a reader tolerate both a properly finalized file (with
/// its closing `]}}`) and one left open by a crashed recorder, with at most
/// one trailing truncated entry silently dropped (spec.md §6).
pub fn read_entries(path: impl AsRef<Path>) -> Result<Vec<Entry>, ArchiveError> {
    let raw = std::fs::read_to_string(path)?;
    read_entries_str(&raw)
}

pub fn read_entries_str(raw: &str) -> Result<Vec<Entry>, ArchiveError> {
    let marker = "\"entries\":[";
    let start = raw
        .find(marker)
        .ok_or_else(|| ArchiveError::Malformed("no \"entries\" array found".to_string()))?
        + marker.len();

    let mut entries = Vec::new();
    for object in top_level_objects(&raw[start..]) {
        match serde_json::from_str::<Entry>(object) {
            Ok(entry) => entries.push(entry),
            Err(_) => break, // trailing truncated entry from an interrupted write
        }
    }
    Ok(entries)
}

/// Splits a string of comma-separated `{...}` objects (optionally followed
/// by the HAR document's closing `]}}`) into the raw slice of each top-level
/// object, tracking brace depth and string-escape state so commas and
/// braces inside string values never confuse the split.
fn top_level_objects(text: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut object_start: Option<usize> = None;

    while i < bytes.len() {
        let byte = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
        } else {
            match byte {
                b'"' => in_string = true,
                b'{' => {
                    if depth == 0 {
                        object_start = Some(i);
                    }
                    depth += 1;
                }
                b'}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        if let Some(start) = object_start.take() {
                            objects.push(&text[start..=i]);
                        }
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    objects
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn splits_adjacent_objects_ignoring_braces_in_strings() {
        let text = r#"{"a":"contains } brace","b":1},{"c":2}"#;
        let objects = top_level_objects(text);
        assert_eq!(objects, vec![r#"{"a":"contains } brace","b":1}"#, r#"{"c":2}"#]);
    }

    #[test]
    fn ignores_trailing_closing_brackets() {
        let text = r#"{"a":1}
]}}"#;
        assert_eq!(top_level_objects(text), vec![r#"{"a":1}"#]);
    }
}
