//! Recursive-descent parser for the template section.

use crate::ast::{
    Attribute, Element, ElseArm, Fragment, Interpolation, InterpolationToken, TemplateNode, Text,
    VFor,
};
use crate::error::ParseError;

/// Elements emitted without a closing tag.
pub(crate) fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "isindex"
            | "keygen"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

pub(crate) struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Fragment, ParseError> {
        let mut nodes = Vec::new();
        while self.pos < self.bytes.len() {
            nodes.extend(self.parse_nodes()?);
            // A stray close tag with no matching open element: skip it and
            // keep going rather than failing the whole template.
            if self.rest().starts_with("</") {
                match self.rest().find('>') {
                    Some(gt) => self.pos += gt + 1,
                    None => break,
                }
            }
        }
        Ok(Fragment {
            nodes: group_conditionals(nodes),
        })
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// Parses sibling nodes until a close tag or end of input.
    fn parse_nodes(&mut self) -> Result<Vec<TemplateNode>, ParseError> {
        let mut nodes = Vec::new();
        while self.pos < self.bytes.len() {
            let rest = self.rest();
            if rest.starts_with("</") {
                break;
            }
            if rest.starts_with("<!--") {
                match rest.find("-->") {
                    Some(end) => self.pos += end + 3,
                    None => self.pos = self.bytes.len(),
                }
                continue;
            }
            if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                nodes.push(TemplateNode::Element(self.parse_element()?));
                continue;
            }
            nodes.push(self.parse_text()?);
        }
        Ok(nodes)
    }

    /// Parses a text run up to the next tag, decomposing interpolations.
    fn parse_text(&mut self) -> Result<TemplateNode, ParseError> {
        let start = self.pos;
        // Always consume at least one byte so a lone `<` cannot stall us.
        self.pos += 1;
        while self.pos < self.bytes.len() {
            let rest = self.rest();
            if rest.starts_with("</")
                || rest.starts_with("<!--")
                || (rest.starts_with('<')
                    && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()))
            {
                break;
            }
            self.pos += 1;
        }
        lex_text(&self.src[start..self.pos])
    }

    fn parse_element(&mut self) -> Result<Element, ParseError> {
        self.pos += 1; // consume '<'
        let tag = self.read_while(|c| {
            c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':' || c == '.'
        });

        let mut element = Element {
            tag: tag.clone(),
            ..Element::default()
        };

        // Attributes until '>' or '/>'.
        let self_closed = loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(ParseError::UnexpectedEof(tag));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }
            element.attrs.push(self.parse_attribute(&tag)?);
        };

        if let Some(raw) = take_attr(&mut element, "v-for") {
            element.v_for = parse_v_for(&raw);
        }

        if self_closed || is_void_tag(&tag) {
            return Ok(element);
        }

        element.children = group_conditionals(self.parse_nodes()?);

        let rest = self.rest();
        if rest.is_empty() {
            return Err(ParseError::MissingClose(tag));
        }
        if let Some(after) = rest.strip_prefix("</") {
            let name_len = after
                .find(|c: char| c == '>' || c.is_whitespace())
                .unwrap_or(after.len());
            if after[..name_len].eq_ignore_ascii_case(&tag) {
                match after.find('>') {
                    Some(gt) => self.pos += 2 + gt + 1,
                    None => return Err(ParseError::UnexpectedEof(tag)),
                }
            }
            // A mismatched close tag implicitly closes this element and is
            // left for an ancestor to consume.
        }
        Ok(element)
    }

    fn parse_attribute(&mut self, tag: &str) -> Result<Attribute, ParseError> {
        let name = self.read_while(|c| {
            !c.is_whitespace() && c != '=' && c != '>' && c != '/' && c != '"' && c != '\''
        });
        if name.is_empty() {
            // Unparseable fragment: swallow one byte to guarantee progress.
            self.pos += 1;
            return Ok(Attribute {
                name: String::new(),
                value: None,
            });
        }
        self.skip_whitespace();
        if !self.rest().starts_with('=') {
            return Ok(Attribute { name, value: None });
        }
        self.pos += 1;
        self.skip_whitespace();

        let rest = self.rest();
        let value = if let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
            let inner = &rest[1..];
            let Some(end) = inner.find(quote) else {
                return Err(ParseError::UnexpectedEof(tag.to_string()));
            };
            self.pos += 1 + end + 1;
            inner[..end].to_string()
        } else {
            self.read_while(|c| !c.is_whitespace() && c != '>')
        };
        Ok(Attribute {
            name,
            value: Some(value),
        })
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while let Some(c) = self.rest().chars().next() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.src[start..self.pos].to_string()
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }
}

/// Decomposes a text run into an interpolation token list, or a plain text
/// node when it contains no `{{ ... }}` bindings.
fn lex_text(text: &str) -> Result<TemplateNode, ParseError> {
    if !text.contains("{{") {
        return Ok(TemplateNode::Text(Text {
            text: text.to_string(),
        }));
    }
    let mut tokens = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        if open > 0 {
            tokens.push(InterpolationToken::Text(rest[..open].to_string()));
        }
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            return Err(ParseError::UnterminatedInterpolation);
        };
        tokens.push(InterpolationToken::Binding(after[..close].trim().to_string()));
        rest = &after[close + 2..];
    }
    if !rest.is_empty() {
        tokens.push(InterpolationToken::Text(rest.to_string()));
    }
    Ok(TemplateNode::Interpolation(Interpolation { tokens }))
}

fn take_attr(element: &mut Element, name: &str) -> Option<String> {
    let idx = element.attrs.iter().position(|a| a.name == name)?;
    element.attrs.remove(idx).value
}

/// Groups `v-if` / `v-else-if` / `v-else` sibling chains onto the head
/// element. Whitespace-only text between chained arms is dropped; a
/// dangling `v-else-if`/`v-else` with no preceding `v-if` degrades to a
/// plain element.
fn group_conditionals(nodes: Vec<TemplateNode>) -> Vec<TemplateNode> {
    let mut out: Vec<TemplateNode> = Vec::new();
    let mut pending: std::collections::VecDeque<TemplateNode> = nodes.into();

    while let Some(node) = pending.pop_front() {
        let TemplateNode::Element(mut element) = node else {
            out.push(node);
            continue;
        };
        if let Some(cond) = take_attr(&mut element, "v-if") {
            element.v_if = Some(cond);
            loop {
                // Peek past whitespace-only text for the next chained arm.
                let mut skipped = 0usize;
                while let Some(TemplateNode::Text(text)) = pending.get(skipped) {
                    if !text.text.trim().is_empty() {
                        break;
                    }
                    skipped += 1;
                }
                let Some(TemplateNode::Element(next)) = pending.get(skipped) else {
                    break;
                };
                let is_else_if = next.attr("v-else-if").is_some();
                let is_else = next.attr("v-else").is_some();
                if !is_else_if && !is_else {
                    break;
                }
                for _ in 0..skipped {
                    pending.pop_front();
                }
                let Some(TemplateNode::Element(mut arm)) = pending.pop_front() else {
                    break;
                };
                let condition = if is_else_if {
                    take_attr(&mut arm, "v-else-if")
                } else {
                    take_attr(&mut arm, "v-else");
                    None
                };
                element.else_arms.push(ElseArm {
                    condition,
                    element: arm,
                });
                if is_else {
                    break;
                }
            }
        } else {
            // Dangling arms degrade to plain elements.
            take_attr(&mut element, "v-else-if");
            take_attr(&mut element, "v-else");
        }
        out.push(TemplateNode::Element(element));
    }
    out
}

/// Decodes a `v-for` value: `item in items`, `(item, i) in items`,
/// `{ id } of list`.
fn parse_v_for(raw: &str) -> Option<VFor> {
    let (alias_part, source) = split_for_binding(raw)?;
    let alias_part = alias_part.trim();
    let (alias, iterator) = if alias_part.starts_with('(') && alias_part.ends_with(')') {
        let inner = &alias_part[1..alias_part.len() - 1];
        let mut parts = split_top_level(inner);
        let alias = parts.first().map(|s| s.trim().to_string())?;
        let iterator = parts
            .get_mut(1)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        (alias, iterator)
    } else {
        (alias_part.to_string(), None)
    };
    Some(VFor {
        source: source.trim().to_string(),
        alias,
        iterator,
    })
}

/// Splits `alias in expr` / `alias of expr` at the first top-level keyword.
fn split_for_binding(raw: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let bytes = raw.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b' ' if depth == 0 => {
                let rest = &raw[i + 1..];
                for kw in ["in ", "of "] {
                    if let Some(tail) = rest.strip_prefix(kw) {
                        return Some((&raw[..i], tail));
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn split_top_level(src: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, b) in src.bytes().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b',' if depth == 0 => {
                parts.push(&src[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&src[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> Fragment {
        Parser::new(src).parse().unwrap()
    }

    fn first_element(fragment: &Fragment) -> &Element {
        fragment
            .nodes
            .iter()
            .find_map(|n| match n {
                TemplateNode::Element(el) => Some(el),
                _ => None,
            })
            .expect("no element parsed")
    }

    #[test]
    fn parses_nested_elements_and_text() {
        let fragment = parse("<div><span>hi</span> there</div>");
        let el = first_element(&fragment);
        assert_eq!(el.tag, "div");
        assert_eq!(el.children.len(), 2);
    }

    #[test]
    fn parses_interpolation_tokens() {
        let fragment = parse("<p>count: {{ count }}!</p>");
        let el = first_element(&fragment);
        let TemplateNode::Interpolation(interp) = &el.children[0] else {
            panic!("expected interpolation");
        };
        assert_eq!(
            interp.tokens,
            vec![
                InterpolationToken::Text("count: ".to_string()),
                InterpolationToken::Binding("count".to_string()),
                InterpolationToken::Text("!".to_string()),
            ]
        );
    }

    #[test]
    fn void_and_self_closing_elements_take_no_children() {
        let fragment = parse("<div><br><img src=\"a.png\"><custom-thing /></div>");
        let el = first_element(&fragment);
        assert_eq!(el.children.len(), 3);
    }

    #[test]
    fn comments_are_skipped() {
        let fragment = parse("<div><!-- note --><p>x</p></div>");
        let el = first_element(&fragment);
        assert_eq!(el.children.len(), 1);
    }

    #[test]
    fn groups_a_three_arm_chain() {
        let fragment = parse(
            "<div><p v-if=\"a\">1</p><p v-else-if=\"b\">2</p><p v-else>3</p></div>",
        );
        let el = first_element(&fragment);
        assert_eq!(el.children.len(), 1);
        let TemplateNode::Element(head) = &el.children[0] else {
            panic!("expected element");
        };
        assert_eq!(head.v_if.as_deref(), Some("a"));
        assert_eq!(head.else_arms.len(), 2);
        assert_eq!(head.else_arms[0].condition.as_deref(), Some("b"));
        assert_eq!(head.else_arms[1].condition, None);
    }

    #[test]
    fn whitespace_between_chain_arms_is_dropped() {
        let fragment = parse("<div><p v-if=\"a\">1</p>\n  <p v-else>2</p></div>");
        let el = first_element(&fragment);
        assert_eq!(el.children.len(), 1);
    }

    #[test]
    fn dangling_else_degrades_to_plain_element() {
        let fragment = parse("<div><p v-else>never</p></div>");
        let el = first_element(&fragment);
        let TemplateNode::Element(p) = &el.children[0] else {
            panic!("expected element");
        };
        assert!(p.v_if.is_none());
        assert!(p.attr("v-else").is_none());
    }

    #[test]
    fn decodes_v_for_forms() {
        assert_eq!(
            parse_v_for("item in items"),
            Some(VFor {
                source: "items".to_string(),
                alias: "item".to_string(),
                iterator: None,
            })
        );
        assert_eq!(
            parse_v_for("(item, i) in list.filter(Boolean)"),
            Some(VFor {
                source: "list.filter(Boolean)".to_string(),
                alias: "item".to_string(),
                iterator: Some("i".to_string()),
            })
        );
        assert_eq!(
            parse_v_for("{ id, name } of rows"),
            Some(VFor {
                source: "rows".to_string(),
                alias: "{ id, name }".to_string(),
                iterator: None,
            })
        );
    }

    #[test]
    fn v_for_is_lifted_off_the_attribute_list() {
        let fragment = parse("<li v-for=\"item in items\" :key=\"item.id\">{{ item }}</li>");
        let el = first_element(&fragment);
        assert!(el.v_for.is_some());
        assert!(el.attr("v-for").is_none());
        assert!(el.attr(":key").is_some());
    }

    #[test]
    fn unterminated_interpolation_is_an_error() {
        assert!(Parser::new("<p>{{ broken</p>").parse().is_err());
    }

    #[test]
    fn stray_close_tag_is_skipped() {
        let fragment = Parser::new("</b><div>x</div>").parse().unwrap();
        assert_eq!(fragment.nodes.len(), 1);
    }
}
