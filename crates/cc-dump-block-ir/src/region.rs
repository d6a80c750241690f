use serde::{Deserialize, Serialize};

/// What kind of segmented sub-range a [`ContentRegion`] delimits within a
/// block's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionKind {
    CodeFence { lang: Option<String> },
    XmlSection { tag: String },
    MarkdownFence,
}

/// A segmented sub-range of a block's text (a code fence, an XML section, a
/// markdown fence), each with its own collapse state independent of the
/// parent block's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRegion {
    pub kind: RegionKind,
    /// Byte offsets into the block's primary text field.
    pub start: usize,
    pub end: usize,
}

impl ContentRegion {
    pub fn line_count(&self, text: &str) -> usize {
        text.get(self.start..self.end).map(|s| s.lines().count()).unwrap_or(0)
    }
}

/// Segments a block's free-form text into the regions spec.md §3's
/// `content_regions` field names: fenced code blocks (` ``` `/`~~~`, with an
/// optional language tag) and XML-style sections (`<tag>...</tag>`).
/// Regions never nest or overlap; an unterminated fence or tag runs to the
/// end of the text rather than being dropped.
pub fn detect_regions(text: &str) -> Vec<ContentRegion> {
    let mut regions = Vec::new();
    let mut cursor = 0;
    while cursor < text.len() {
        match next_region(text, cursor) {
            Some(region) => {
                cursor = region.end.max(cursor + 1);
                regions.push(region);
            }
            None => break,
        }
    }
    regions
}

fn next_region(text: &str, from: usize) -> Option<ContentRegion> {
    let fence = find_fence(text, from);
    let xml = find_xml_section(text, from);
    match (fence, xml) {
        (Some(f), Some(x)) => Some(if f.start <= x.start { f } else { x }),
        (Some(f), None) => Some(f),
        (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

fn find_fence(text: &str, from: usize) -> Option<ContentRegion> {
    let rest = &text[from..];
    let (delim_offset, delim) = ["```", "~~~"].iter().filter_map(|d| rest.find(d).map(|i| (i, *d))).min_by_key(|(i, _)| *i)?;
    let start = from + delim_offset;
    let line_end = text[start..].find('\n').map(|i| start + i).unwrap_or(text.len());
    let lang = text[start + delim.len()..line_end].trim();
    let lang = (!lang.is_empty()).then(|| lang.to_string());
    let body_start = (line_end + 1).min(text.len());
    let end = match text[body_start..].find(delim) {
        Some(i) => {
            let close_start = body_start + i;
            text[close_start..].find('\n').map(|j| close_start + j).unwrap_or(text.len())
        }
        None => text.len(),
    };
    let kind = if delim == "```" { RegionKind::CodeFence { lang } } else { RegionKind::MarkdownFence };
    Some(ContentRegion { kind, start, end })
}

/// A conservative, non-nesting `<tag>...</tag>` scan: only matches a tag name
/// made of ascii letters/digits/underscore/hyphen, to avoid misidentifying
/// angle brackets used as comparison operators in code fences (those are
/// segmented separately as code regions first since fences are checked in
/// the same left-to-right sweep).
fn find_xml_section(text: &str, from: usize) -> Option<ContentRegion> {
    let rest = &text[from..];
    let open_start = rest.find('<')?;
    let after_lt = &rest[open_start + 1..];
    let tag_len = after_lt.chars().take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-').count();
    if tag_len == 0 {
        return find_xml_section(text, from + open_start + 1);
    }
    let tag = &after_lt[..tag_len];
    if !after_lt[tag_len..].starts_with('>') {
        return find_xml_section(text, from + open_start + 1);
    }
    let start = from + open_start;
    let close_tag = format!("</{tag}>");
    let body_start = start + 1 + tag_len + 1;
    let end = match text[body_start..].find(&close_tag) {
        Some(i) => body_start + i + close_tag.len(),
        None => text.len(),
    };
    Some(ContentRegion { kind: RegionKind::XmlSection { tag: tag.to_string() }, start, end })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn detects_a_single_code_fence_with_language() {
        let text = "before\n```rust\nfn main() {}\n```\nafter";
        let regions = detect_regions(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, RegionKind::CodeFence { lang: Some("rust".into()) });
        assert_eq!(&text[regions[0].start..regions[0].end], "```rust\nfn main() {}\n```");
    }

    #[test]
    fn detects_an_xml_section() {
        let text = "<thinking>reasoning here</thinking> done";
        let regions = detect_regions(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, RegionKind::XmlSection { tag: "thinking".into() });
    }

    #[test]
    fn plain_text_has_no_regions() {
        assert!(detect_regions("just some ordinary text, no fences or tags").is_empty());
    }

    #[test]
    fn multiple_fences_are_each_segmented() {
        let text = "a\n```\none\n```\nb\n```\ntwo\n```\nc";
        let regions = detect_regions(text);
        assert_eq!(regions.len(), 2);
        assert!(regions[0].end <= regions[1].start);
    }
}
