//! Span-anchored text edits.

/// A single replacement of a byte range with new text.
#[derive(Debug, Clone)]
pub struct Edit {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Replacement text.
    pub text: String,
}

impl Edit {
    /// Creates a replacement edit.
    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Applies a set of edits to `src`.
///
/// Edits are sorted by start offset; an edit contained in (or overlapping)
/// an earlier one is dropped, so a whole-statement replacement wins over
/// rewrites recorded inside it.
pub fn apply_edits(src: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    let mut out = String::with_capacity(src.len());
    let mut cursor = 0usize;
    for edit in edits {
        if edit.start < cursor || edit.end > src.len() {
            continue;
        }
        out.push_str(&src[cursor..edit.start]);
        out.push_str(&edit.text);
        cursor = edit.end;
    }
    out.push_str(&src[cursor..]);
    out
}
