//! Component transformation.
//!
//! Turns an Options-API component (an exported options object plus a
//! directive-based template) into its reactive-binding equivalent. The
//! template rewriter runs first and records which instance variables the
//! markup consumes; the script rewriter uses that record to decide which
//! bindings to emit and in what order.

mod props;
mod runtime;
mod script;
mod settings;
mod template;

pub use props::{collect_props, PropDescriptor, PropType};
pub use runtime::{helper, RUNTIME_SOURCE};
pub use script::{ScriptError, ScriptInfo, ScriptOutput, ScriptRewriter};
pub use settings::{member, CssModules, MemberAliases, RuntimeModule, TranspileSettings};
pub use template::{TemplateOutput, TemplateRewriter};

use swc_ecma_ast::PropName;

/// The textual name of an object key, for identifier and string keys.
pub(crate) fn prop_name_str(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        PropName::Str(s) => s.value.as_str().map(str::to_string),
        _ => None,
    }
}
