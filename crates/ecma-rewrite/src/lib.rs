//! Parse, traverse and rewrite utilities for the JavaScript/TypeScript
//! embedded in component documents.
//!
//! The transpiler never re-prints an AST. Every rewrite is expressed as a
//! set of span-anchored text edits applied back onto the original source
//! slice, which keeps the author's formatting intact. The swc parser is
//! used for structure only.

mod error;
mod parse;
mod rename;
mod splice;

pub use error::RewriteError;
pub use parse::{ParsedExpr, ParsedModule};
pub use rename::{rename_identifiers, Rename};
pub use splice::{apply_edits, Edit};

use swc_ecma_ast::{Callee, Expr, Ident, Pat};

/// Collects the binding identifiers introduced by a pattern, in source order.
pub fn pat_idents(pat: &Pat, out: &mut Vec<String>) {
    match pat {
        Pat::Ident(ident) => out.push(ident.id.sym.to_string()),
        Pat::Array(arr) => {
            for elem in arr.elems.iter().flatten() {
                pat_idents(elem, out);
            }
        }
        Pat::Object(obj) => {
            for prop in &obj.props {
                match prop {
                    swc_ecma_ast::ObjectPatProp::KeyValue(kv) => pat_idents(&kv.value, out),
                    swc_ecma_ast::ObjectPatProp::Assign(assign) => {
                        out.push(assign.key.sym.to_string())
                    }
                    swc_ecma_ast::ObjectPatProp::Rest(rest) => pat_idents(&rest.arg, out),
                }
            }
        }
        Pat::Rest(rest) => pat_idents(&rest.arg, out),
        Pat::Assign(assign) => pat_idents(&assign.left, out),
        Pat::Invalid(_) | Pat::Expr(_) => {}
    }
}

/// Extracts the binding names from a loop-alias expression such as `item`,
/// `{ id, name }` or `[first, second]`.
///
/// A bare alias is returned as-is; destructuring aliases are parsed as a
/// `const` pattern and their bound identifiers collected.
pub fn alias_idents(alias: &str) -> Vec<String> {
    let trimmed = alias.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if !trimmed.contains('{') && !trimmed.contains('[') {
        return vec![trimmed.to_string()];
    }
    let Ok(parsed) = ParsedModule::parse(&format!("const {} = __v2s;", trimmed)) else {
        return vec![trimmed.to_string()];
    };
    let mut out = Vec::new();
    for item in &parsed.module.body {
        if let swc_ecma_ast::ModuleItem::Stmt(swc_ecma_ast::Stmt::Decl(
            swc_ecma_ast::Decl::Var(var),
        )) = item
        {
            for decl in &var.decls {
                pat_idents(&decl.name, &mut out);
            }
        }
    }
    out
}

/// Finds the first identifier of a member/call chain, e.g. the `Types` of
/// `Types.string.isRequired.def(42)`.
pub fn expression_root<'a>(expr: &'a Expr) -> Option<&'a Ident> {
    match expr {
        Expr::Ident(ident) => Some(ident),
        Expr::Member(member) => expression_root(&member.obj),
        Expr::Call(call) => match &call.callee {
            Callee::Expr(callee) => expression_root(callee),
            _ => None,
        },
        _ => None,
    }
}
