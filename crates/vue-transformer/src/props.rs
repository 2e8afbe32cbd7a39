//! Declared-property extraction.
//!
//! The properties option comes in three shapes: a plain array of names, an
//! object map of per-property descriptors, and a fluent builder chain from
//! a validator library. Each shape decodes to the same normalized
//! descriptor; anything unrecognized degrades to a name-only descriptor
//! rather than failing the component.

use crate::prop_name_str;
use ecma_rewrite::{expression_root, ParsedModule};
use swc_common::comments::{CommentKind, Comments};
use swc_common::Spanned;
use swc_ecma_ast::{
    Callee, Expr, Ident, Lit, MemberExpr, MemberProp, Prop, PropOrSpread,
};
use swc_ecma_visit::{Visit, VisitWith};

/// The declared type of a property, mapped from the source dialect's
/// constructor names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropType {
    String,
    Number,
    Boolean,
    List,
}

impl PropType {
    /// The TypeScript annotation used when the script block is typed.
    pub fn ts(&self) -> &'static str {
        match self {
            PropType::String => "string",
            PropType::Number => "number",
            PropType::Boolean => "boolean",
            PropType::List => "any[]",
        }
    }

    fn from_ctor(name: &str) -> Option<Self> {
        match name {
            "String" => Some(PropType::String),
            "Number" => Some(PropType::Number),
            "Boolean" => Some(PropType::Boolean),
            "Array" => Some(PropType::List),
            _ => None,
        }
    }

    fn from_builder(name: &str) -> Option<Self> {
        match name {
            "string" => Some(PropType::String),
            "number" | "integer" => Some(PropType::Number),
            "bool" => Some(PropType::Boolean),
            "array" => Some(PropType::List),
            _ => None,
        }
    }
}

/// One normalized declared property.
#[derive(Debug, Clone, Default)]
pub struct PropDescriptor {
    pub name: String,
    pub ty: Option<PropType>,
    /// Default-value expression text, taken verbatim from the source.
    pub default: Option<String>,
    /// Leading comment lines attached to the declaration.
    pub doc: Vec<String>,
    pub required: bool,
    /// Identifiers referenced inside the default expression, for
    /// dependency ordering.
    pub used_vars: Vec<String>,
}

impl PropDescriptor {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Decodes the declared-properties option into descriptors, in source
/// order. `builder_alias` is the local name the validator library was
/// imported under, if any. Never fails; unknown shapes yield name-only
/// descriptors.
pub fn collect_props(
    parsed: &ParsedModule,
    option: &Expr,
    builder_alias: Option<&str>,
) -> Vec<PropDescriptor> {
    match option {
        Expr::Array(arr) => arr
            .elems
            .iter()
            .flatten()
            .filter_map(|elem| match &*elem.expr {
                Expr::Lit(Lit::Str(s)) => {
                    Some(PropDescriptor::named(s.value.to_string_lossy().into_owned()))
                }
                _ => None,
            })
            .collect(),
        Expr::Object(obj) => obj
            .props
            .iter()
            .filter_map(|prop| {
                let PropOrSpread::Prop(prop) = prop else {
                    return None;
                };
                let Prop::KeyValue(kv) = &**prop else {
                    return None;
                };
                let name = prop_name_str(&kv.key)?;
                let mut descriptor = decode_value(parsed, &kv.value, builder_alias)
                    .unwrap_or_default();
                descriptor.name = name;
                descriptor.doc = doc_lines(parsed, prop.span().lo);
                Some(descriptor)
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_value(
    parsed: &ParsedModule,
    value: &Expr,
    builder_alias: Option<&str>,
) -> Option<PropDescriptor> {
    if let Expr::Object(obj) = value {
        return Some(decode_object_form(parsed, obj));
    }
    if let Some(alias) = builder_alias {
        if expression_root(value).is_some_and(|root| root.sym.as_ref() == alias) {
            return Some(decode_builder_form(parsed, value, alias));
        }
    }
    None
}

/// Decodes `{ type: ..., default: ..., required: ... }`.
fn decode_object_form(parsed: &ParsedModule, obj: &swc_ecma_ast::ObjectLit) -> PropDescriptor {
    let mut descriptor = PropDescriptor::default();
    for prop in &obj.props {
        let PropOrSpread::Prop(prop) = prop else {
            continue;
        };
        let Prop::KeyValue(kv) = &**prop else {
            continue;
        };
        let Some(key) = prop_name_str(&kv.key) else {
            continue;
        };
        match key.as_str() {
            "type" => descriptor.ty = decode_type(&kv.value),
            "default" => {
                descriptor.default = Some(parsed.text(kv.value.span()).to_string());
                descriptor.used_vars = expr_idents(&kv.value);
            }
            "required" => {
                if let Expr::Lit(Lit::Bool(b)) = &*kv.value {
                    descriptor.required = b.value;
                }
            }
            _ => {}
        }
    }
    descriptor
}

fn decode_type(expr: &Expr) -> Option<PropType> {
    match expr {
        Expr::Ident(ident) => PropType::from_ctor(ident.sym.as_ref()),
        // A multi-type declaration keeps its first entry.
        Expr::Array(arr) => arr
            .elems
            .iter()
            .flatten()
            .next()
            .and_then(|elem| decode_type(&elem.expr)),
        _ => None,
    }
}

/// Decodes a builder chain such as `Types.string.isRequired.def('x')`:
/// the member directly on the alias names the type, `.def(...)` captures
/// the default, `.isRequired` sets the flag.
fn decode_builder_form(parsed: &ParsedModule, expr: &Expr, alias: &str) -> PropDescriptor {
    let mut descriptor = PropDescriptor::default();
    let mut current = expr;
    loop {
        match current {
            Expr::Call(call) => {
                let Callee::Expr(callee) = &call.callee else {
                    break;
                };
                if let Expr::Member(member) = &**callee {
                    if member_prop_is(member, "def") {
                        if let Some(arg) = call.args.first() {
                            descriptor.default =
                                Some(parsed.text(arg.expr.span()).to_string());
                            descriptor.used_vars = expr_idents(&arg.expr);
                        }
                    }
                }
                current = callee;
            }
            Expr::Member(member) => {
                if member_prop_is(member, "isRequired") {
                    descriptor.required = true;
                }
                if let Expr::Ident(obj) = &*member.obj {
                    if obj.sym.as_ref() == alias {
                        if let MemberProp::Ident(prop) = &member.prop {
                            descriptor.ty = PropType::from_builder(prop.sym.as_ref());
                        }
                        break;
                    }
                }
                current = &member.obj;
            }
            _ => break,
        }
    }
    descriptor
}

fn member_prop_is(member: &MemberExpr, name: &str) -> bool {
    matches!(&member.prop, MemberProp::Ident(prop) if prop.sym.as_ref() == name)
}

pub(crate) fn doc_lines(parsed: &ParsedModule, lo: swc_common::BytePos) -> Vec<String> {
    let Some(comments) = parsed.comments.get_leading(lo) else {
        return Vec::new();
    };
    comments
        .iter()
        .map(|c| match c.kind {
            CommentKind::Line => format!("//{}", c.text),
            CommentKind::Block => format!("/*{}*/", c.text),
        })
        .collect()
}

/// Collects the identifiers referenced by an expression: bare names and
/// the roots of member chains, plus anything inside computed accesses.
pub(crate) fn expr_idents(expr: &Expr) -> Vec<String> {
    struct Collector {
        out: Vec<String>,
    }
    impl Visit for Collector {
        fn visit_member_expr(&mut self, n: &MemberExpr) {
            if let Expr::Ident(obj) = &*n.obj {
                self.out.push(obj.sym.to_string());
            } else {
                n.obj.visit_with(self);
            }
            if let MemberProp::Computed(computed) = &n.prop {
                computed.visit_with(self);
            }
        }

        fn visit_ident(&mut self, n: &Ident) {
            self.out.push(n.sym.to_string());
        }
    }
    let mut collector = Collector { out: Vec::new() };
    expr.visit_with(&mut collector);
    collector.out
}
