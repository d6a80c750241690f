/// A semantic style tag, resolved against a palette by the display host —
/// the rasterizer never produces concrete colors, only these names, per the
/// display output contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleTag {
    Plain,
    Bold,
    Dim,
    Muted,
    Accent,
    Error,
    RoleUser,
    RoleAssistant,
    TagColor(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub style: StyleTag,
}

impl TextRun {
    pub fn new(text: impl Into<String>, style: StyleTag) -> Self {
        Self { text: text.into(), style }
    }
}

/// One fully rasterized terminal line: an ordered sequence of styled text
/// runs plus a cached cell width. Strips are value types, cheap to clone and
/// share across turns.
#[derive(Debug, Clone, PartialEq)]
pub struct Strip {
    pub runs: Vec<TextRun>,
    pub cell_width: usize,
}

impl Strip {
    pub fn new(runs: Vec<TextRun>) -> Self {
        let cell_width = runs.iter().map(|r| r.text.chars().count()).sum();
        Self { runs, cell_width }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![TextRun::new(text, StyleTag::Plain)])
    }

    pub fn styled(text: impl Into<String>, style: StyleTag) -> Self {
        Self::new(vec![TextRun::new(text, style)])
    }

    pub fn empty() -> Self {
        Self { runs: Vec::new(), cell_width: 0 }
    }
}
