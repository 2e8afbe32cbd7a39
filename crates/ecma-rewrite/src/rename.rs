//! Identifier renaming over embedded expressions and statements.

use crate::parse::ParsedModule;
use crate::splice::{apply_edits, Edit};
use swc_common::BytePos;
use swc_ecma_ast::{Expr, Ident, MemberExpr, MemberProp, TsType, TsTypeAnn};
use swc_ecma_visit::{Visit, VisitWith};

/// The outcome of a rename callback for one identifier occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rename {
    /// Leave the identifier untouched.
    Keep,
    /// Replace the identifier with the given text.
    To(String),
    /// Remove the identifier. For a member-access object this drops the
    /// `obj.` prefix and leaves the property as a bare name.
    Drop,
}

/// Rewrites every identifier reference in `src` through `f`.
///
/// `f` receives the identifier name and whether the occurrence is the object
/// of a member access (`true` for the `user` of `user.name`). Non-computed
/// member properties and object-literal keys are not references and are
/// never passed to `f`. Source that fails to parse is returned unchanged,
/// matching the degrade-not-abort contract of the template pipeline.
pub fn rename_identifiers<F>(src: &str, mut f: F) -> String
where
    F: FnMut(&str, bool) -> Rename,
{
    // An object literal at statement position would parse as a block, so it
    // is wrapped in parentheses for the duration of the rewrite.
    let wrapped = src.trim_start().starts_with('{');
    let working = if wrapped {
        format!("({})", src)
    } else {
        src.to_string()
    };

    let Ok(parsed) = ParsedModule::parse(&working) else {
        return src.to_string();
    };

    let mut rewriter = IdentRewriter {
        f: &mut f,
        edits: Vec::new(),
        base: parsed.base(),
    };
    parsed.module.visit_with(&mut rewriter);

    let result = apply_edits(&working, rewriter.edits);
    if wrapped {
        let inner = result
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .unwrap_or(&result);
        inner.to_string()
    } else {
        result
    }
}

struct IdentRewriter<'a, F> {
    f: &'a mut F,
    edits: Vec<Edit>,
    base: BytePos,
}

impl<F> IdentRewriter<'_, F> {
    fn off(&self, pos: BytePos) -> usize {
        (pos.0 - self.base.0) as usize
    }
}

impl<F> Visit for IdentRewriter<'_, F>
where
    F: FnMut(&str, bool) -> Rename,
{
    fn visit_member_expr(&mut self, n: &MemberExpr) {
        if let Expr::Ident(obj) = &*n.obj {
            let prop_lo = match &n.prop {
                MemberProp::Ident(ident) => ident.span.lo,
                MemberProp::PrivateName(name) => name.span.lo,
                MemberProp::Computed(computed) => computed.span.lo,
            };
            match (self.f)(obj.sym.as_ref(), true) {
                Rename::Keep => {}
                Rename::To(text) => self.edits.push(Edit::replace(
                    self.off(obj.span.lo),
                    self.off(obj.span.hi),
                    text,
                )),
                Rename::Drop => {
                    self.edits
                        .push(Edit::replace(self.off(obj.span.lo), self.off(prop_lo), ""))
                }
            }
        } else {
            n.obj.visit_with(self);
        }
        if let MemberProp::Computed(computed) = &n.prop {
            computed.visit_with(self);
        }
    }

    fn visit_ident(&mut self, n: &Ident) {
        match (self.f)(n.sym.as_ref(), false) {
            Rename::Keep => {}
            Rename::To(text) => {
                self.edits
                    .push(Edit::replace(self.off(n.span.lo), self.off(n.span.hi), text))
            }
            Rename::Drop => {
                self.edits
                    .push(Edit::replace(self.off(n.span.lo), self.off(n.span.hi), ""))
            }
        }
    }

    // Type positions are preserved verbatim.
    fn visit_ts_type(&mut self, _: &TsType) {}
    fn visit_ts_type_ann(&mut self, _: &TsTypeAnn) {}
}
