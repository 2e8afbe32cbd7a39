//! Single-file component parsing.
//!
//! Two layers live here: the document splitter, which extracts the
//! `template`/`script`/`style` sections with their attributes, and the
//! template parser, which turns the template section into a node tree with
//! conditional chains grouped and loop directives decoded.
//!
//! # Example
//!
//! ```
//! use vue_sfc::parse_document;
//!
//! let doc = parse_document(
//!     "<template><p>{{ greeting }}</p></template>\n<script>export default {}</script>",
//! );
//! assert_eq!(doc.template.content, "<p>{{ greeting }}</p>");
//! assert!(doc.style.content.is_empty());
//! ```

mod ast;
mod error;
mod parser;
mod sfc;

pub use ast::{
    Attribute, Element, ElseArm, Fragment, Interpolation, InterpolationToken, TemplateNode, Text,
    VFor,
};
pub use error::ParseError;
pub use sfc::{parse_document, AttrValue, Section, SfcDocument};

/// Parses a template section into a node tree.
pub fn parse_template(source: &str) -> Result<Fragment, ParseError> {
    parser::Parser::new(source).parse()
}

/// Whether a tag is a void element, emitted without a closing tag.
pub fn is_void_tag(tag: &str) -> bool {
    parser::is_void_tag(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_element() {
        let fragment = parse_template("<div>hello</div>").unwrap();
        assert_eq!(fragment.nodes.len(), 1);
    }

    #[test]
    fn document_and_template_compose() {
        let doc = parse_document("<template><div :title=\"name\">{{ name }}</div></template>");
        let fragment = parse_template(&doc.template.content).unwrap();
        let TemplateNode::Element(el) = &fragment.nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(el.tag, "div");
        assert_eq!(el.attrs.len(), 1);
    }
}
