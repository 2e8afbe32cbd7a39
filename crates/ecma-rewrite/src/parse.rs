//! swc parsing entry points.

use crate::RewriteError;
use std::sync::Arc;
use swc_common::comments::SingleThreadedComments;
use swc_common::{BytePos, FileName, SourceMap, Span};
use swc_ecma_ast::{Expr, Module};
use swc_ecma_parser::{Parser, StringInput, Syntax, TsSyntax};

/// A parsed module plus everything needed to map its spans back onto the
/// source text it was parsed from.
pub struct ParsedModule {
    /// The parsed swc module.
    pub module: Module,
    /// Comments collected during parsing (used for doc-comment lookup).
    pub comments: SingleThreadedComments,
    source: String,
    base: BytePos,
}

impl ParsedModule {
    /// Parses a script as a TSX module.
    ///
    /// TSX is used unconditionally, matching how the source dialect allows
    /// JSX-producing render functions inside the script section.
    pub fn parse(src: &str) -> Result<Self, RewriteError> {
        let cm: Arc<SourceMap> = Default::default();
        let fm = cm.new_source_file(
            FileName::Custom("component-script".into()).into(),
            src.to_string(),
        );
        let syntax = Syntax::Typescript(TsSyntax {
            tsx: true,
            ..Default::default()
        });
        let comments = SingleThreadedComments::default();
        let mut parser = Parser::new(syntax, StringInput::from(&*fm), Some(&comments));
        let module = parser
            .parse_module()
            .map_err(|e| RewriteError::Parse(format!("{:?}", e)))?;
        Ok(Self {
            module,
            comments,
            source: src.to_string(),
            base: fm.start_pos,
        })
    }

    /// Converts a span position to a byte offset into the source.
    pub fn offset(&self, pos: BytePos) -> usize {
        (pos.0 - self.base.0) as usize
    }

    /// Returns the source text covered by a span.
    pub fn text(&self, span: Span) -> &str {
        &self.source[self.offset(span.lo)..self.offset(span.hi)]
    }

    /// The source this module was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The base position of the parsed file, for rebasing edit offsets.
    pub fn base(&self) -> BytePos {
        self.base
    }
}

/// A parsed standalone expression.
pub struct ParsedExpr {
    /// The parsed expression.
    pub expr: Box<Expr>,
    source: String,
    base: BytePos,
}

impl ParsedExpr {
    /// Parses a single TypeScript expression.
    pub fn parse(src: &str) -> Result<Self, RewriteError> {
        let cm: Arc<SourceMap> = Default::default();
        let fm = cm.new_source_file(
            FileName::Custom("component-expression".into()).into(),
            src.to_string(),
        );
        let syntax = Syntax::Typescript(TsSyntax {
            tsx: false,
            ..Default::default()
        });
        let mut parser = Parser::new(syntax, StringInput::from(&*fm), None);
        let expr = parser
            .parse_expr()
            .map_err(|e| RewriteError::Parse(format!("{:?}", e)))?;
        Ok(Self {
            expr,
            source: src.to_string(),
            base: fm.start_pos,
        })
    }

    /// Converts a span position to a byte offset into the source.
    pub fn offset(&self, pos: BytePos) -> usize {
        (pos.0 - self.base.0) as usize
    }

    /// Returns the source text covered by a span.
    pub fn text(&self, span: Span) -> &str {
        &self.source[self.offset(span.lo)..self.offset(span.hi)]
    }

    /// The base position of the parsed file, for rebasing edit offsets.
    pub fn base(&self) -> BytePos {
        self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_common::Spanned;

    #[test]
    fn module_spans_map_back_to_text() {
        let parsed = ParsedModule::parse("const answer = 42;").unwrap();
        let item = &parsed.module.body[0];
        assert_eq!(parsed.text(item.span()), "const answer = 42;");
    }

    #[test]
    fn expression_parse_accepts_object_literals() {
        let parsed = ParsedExpr::parse("({ a: 1 })").unwrap();
        assert!(matches!(*parsed.expr, Expr::Paren(_)));
    }

    #[test]
    fn parse_failure_is_an_error() {
        assert!(ParsedModule::parse("const = ;;;(").is_err());
    }
}
