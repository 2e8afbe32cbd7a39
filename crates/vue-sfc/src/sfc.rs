//! Component document splitting.

use indexmap::IndexMap;

/// The value of a section attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// A bare flag, e.g. `scoped`.
    True,
    /// A `key=value` attribute.
    Text(String),
}

impl AttrValue {
    /// Returns the textual value, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(text) => Some(text),
            AttrValue::True => None,
        }
    }
}

/// One tagged section of a component document.
#[derive(Debug, Clone, Default)]
pub struct Section {
    /// The raw content between the open and close tags.
    pub content: String,
    /// Parsed attributes of the open tag.
    pub attrs: IndexMap<String, AttrValue>,
}

impl Section {
    /// Whether the section carries the given attribute.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// The textual value of an attribute, if present.
    pub fn attr_text(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(AttrValue::as_text)
    }
}

/// A split component document. All three sections are always present;
/// a section missing from the source is an empty placeholder.
#[derive(Debug, Clone, Default)]
pub struct SfcDocument {
    pub template: Section,
    pub script: Section,
    pub style: Section,
}

/// Splits a component document into its sections.
///
/// Matching pairs the first `<tag ...>` with the last `</tag>`, so nested
/// `<template>` elements inside the template section survive. This never
/// fails: a section without a match is returned empty.
pub fn parse_document(src: &str) -> SfcDocument {
    SfcDocument {
        template: extract_section(src, "template"),
        script: extract_section(src, "script"),
        style: extract_section(src, "style"),
    }
}

fn extract_section(src: &str, tag: &str) -> Section {
    let open_marker = format!("<{}", tag);
    let close_marker = format!("</{}>", tag);

    let mut search_from = 0usize;
    let (attrs_start, content_start) = loop {
        let Some(found) = src[search_from..].find(&open_marker) else {
            return Section::default();
        };
        let open_at = search_from + found;
        let after_name = open_at + open_marker.len();
        // Reject a longer tag name sharing the prefix, e.g. `<templates>`.
        let boundary_ok = src[after_name..]
            .chars()
            .next()
            .is_some_and(|c| c.is_whitespace() || c == '>');
        if !boundary_ok {
            search_from = after_name;
            continue;
        }
        let Some(gt) = src[after_name..].find('>') else {
            return Section::default();
        };
        break (after_name, after_name + gt + 1);
    };

    let Some(close_rel) = src[content_start..].rfind(&close_marker) else {
        return Section::default();
    };
    let content_end = content_start + close_rel;

    Section {
        content: src[content_start..content_end].to_string(),
        attrs: parse_attrs(src[attrs_start..content_start - 1].trim()),
    }
}

/// Parses an attribute fragment. Accepts bare flags and
/// `key="v"` / `key='v'` / `key=v` forms; anything unparseable is skipped.
fn parse_attrs(attrs: &str) -> IndexMap<String, AttrValue> {
    let mut out = IndexMap::new();
    let bytes = attrs.as_bytes();
    let mut i = 0usize;

    let is_name_char =
        |b: u8| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':' || b == b'@';

    while i < bytes.len() {
        if !is_name_char(bytes[i]) {
            i += 1;
            continue;
        }
        let name_start = i;
        while i < bytes.len() && is_name_char(bytes[i]) {
            i += 1;
        }
        let name = attrs[name_start..i].to_string();

        // Look ahead past whitespace for `=`.
        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b'=' {
            j += 1;
            while j < bytes.len() && (bytes[j].is_ascii_whitespace() || bytes[j] == b'"' || bytes[j] == b'\'') {
                j += 1;
            }
            let value_start = j;
            while j < bytes.len()
                && !bytes[j].is_ascii_whitespace()
                && bytes[j] != b'"'
                && bytes[j] != b'\''
            {
                j += 1;
            }
            out.insert(name, AttrValue::Text(attrs[value_start..j].to_string()));
            // Skip a closing quote if present.
            if j < bytes.len() && (bytes[j] == b'"' || bytes[j] == b'\'') {
                j += 1;
            }
            i = j;
        } else {
            out.insert(name, AttrValue::True);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_all_three_sections() {
        let doc = parse_document(
            "<template><div/></template>\n<script>export default {}</script>\n<style>.a {}</style>",
        );
        assert_eq!(doc.template.content, "<div/>");
        assert_eq!(doc.script.content, "export default {}");
        assert_eq!(doc.style.content, ".a {}");
    }

    #[test]
    fn missing_section_is_empty_not_an_error() {
        let doc = parse_document("<template><div/></template>");
        assert_eq!(doc.script.content, "");
        assert!(doc.script.attrs.is_empty());
        assert_eq!(doc.style.content, "");
        assert!(doc.style.attrs.is_empty());
    }

    #[test]
    fn empty_document_yields_empty_sections() {
        let doc = parse_document("");
        assert_eq!(doc.template.content, "");
        assert_eq!(doc.script.content, "");
        assert_eq!(doc.style.content, "");
    }

    #[test]
    fn nested_template_elements_survive() {
        let doc = parse_document(
            "<template><div><template v-if=\"a\">x</template></div></template>",
        );
        assert_eq!(
            doc.template.content,
            "<div><template v-if=\"a\">x</template></div>"
        );
    }

    #[test]
    fn parses_flag_and_value_attributes() {
        let doc = parse_document(
            "<template functional><p/></template><style scoped module=\"css\">.a{}</style><script lang=ts>x</script>",
        );
        assert!(doc.template.has_attr("functional"));
        assert!(doc.style.has_attr("scoped"));
        assert_eq!(doc.style.attr_text("module"), Some("css"));
        assert_eq!(doc.script.attr_text("lang"), Some("ts"));
    }

    #[test]
    fn single_quoted_values_are_accepted() {
        let doc = parse_document("<script lang='ts'>x</script>");
        assert_eq!(doc.script.attr_text("lang"), Some("ts"));
    }

    #[test]
    fn garbage_attribute_fragments_are_skipped() {
        let doc = parse_document("<script === lang=\"ts\" !!>x</script>");
        assert_eq!(doc.script.attr_text("lang"), Some("ts"));
    }

    #[test]
    fn longer_tag_names_are_not_confused() {
        let doc = parse_document("<templates>no</templates><template>yes</template>");
        assert_eq!(doc.template.content, "yes");
    }
}
