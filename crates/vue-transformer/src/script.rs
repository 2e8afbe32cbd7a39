//! Script-section rewriting.
//!
//! The exported options object is taken apart option by option: `data`
//! keys become plain `let` bindings, methods and helper functions become
//! `const` arrows, computed entries become reactive statements, lifecycle
//! hooks map through a fixed table and watchers wrap in a runtime adapter.
//! Every `this.x` access resolves to a bare name through the shared alias
//! table, and the names each callable reads drive a declare-before-use
//! emission order.
//!
//! Rewrites are span-anchored text edits on the original source, so the
//! author's formatting survives inside every emitted body.

use crate::props::{collect_props, doc_lines};
use crate::runtime::helper;
use crate::settings::{member, TranspileSettings};
use crate::template::TemplateOutput;
use crate::prop_name_str;
use ecma_rewrite::{apply_edits, Edit, ParsedModule, RewriteError};
use indexmap::{IndexMap, IndexSet};
use swc_common::{BytePos, Span, Spanned};
use swc_ecma_ast::{
    ArrowExpr, BlockStmt, BlockStmtOrExpr, Expr, Function, ImportSpecifier, Lit, MemberExpr,
    MemberProp, ModuleDecl, ModuleItem, ObjectLit, ObjectPatProp, Pat, Prop, PropOrSpread, Stmt,
    VarDecl,
};
use swc_ecma_visit::{Visit, VisitWith};
use thiserror::Error;

/// Why a script could not be rewritten. All of these degrade the
/// component to verbatim script passthrough at the orchestrator level.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script parse failed: {0}")]
    Parse(#[from] RewriteError),

    #[error("script has no default export")]
    NoDefaultExport,

    #[error("default export is not an options object")]
    ExportNotObject,
}

/// Facts about the script the orchestrator needs before rewriting.
#[derive(Debug, Clone, Copy)]
pub struct ScriptInfo {
    /// The script renders markup from code; only the script is kept.
    pub has_jsx: bool,
    /// The script reads the root-element member, so the template must
    /// bind the root element.
    pub uses_root_el: bool,
}

/// The rewritten script plus the runtime helpers it (and the template)
/// ended up needing.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub code: String,
    pub runtime_helpers: IndexSet<String>,
}

/// Option keys with fixed meanings that never become helper callables.
const RESERVED_OPTIONS: &[&str] = &[
    "name",
    "components",
    "props",
    "data",
    "methods",
    "computed",
    "watch",
    "mixins",
    "el",
    "functional",
    "filters",
    "directives",
    "provide",
    "inject",
];

enum LifecycleTarget {
    /// Wrapped in a target-dialect lifecycle hook.
    Hook(&'static str),
    /// Runs during component setup, so the body executes inline.
    Inline,
}

fn lifecycle_target(name: &str) -> Option<LifecycleTarget> {
    match name {
        "beforeMount" | "mounted" => Some(LifecycleTarget::Hook("onMount")),
        "beforeUpdate" => Some(LifecycleTarget::Hook("beforeUpdate")),
        "updated" => Some(LifecycleTarget::Hook("afterUpdate")),
        "beforeDestroy" | "destroyed" | "unmounted" => Some(LifecycleTarget::Hook("onDestroy")),
        "beforeCreate" | "created" => Some(LifecycleTarget::Inline),
        _ => None,
    }
}

pub struct ScriptRewriter<'s> {
    settings: &'s TranspileSettings,
    parsed: ParsedModule,
    /// Component file stem, used for the CSS-module sibling import.
    name: String,
    typescript: bool,
    /// Local name of the validator-builder import, if present.
    builder_alias: Option<String>,
}

impl<'s> ScriptRewriter<'s> {
    /// Parses a script section and validates its exported options object.
    pub fn new(
        source: &str,
        name: &str,
        typescript: bool,
        settings: &'s TranspileSettings,
    ) -> Result<Self, ScriptError> {
        let parsed = ParsedModule::parse(source)?;

        let mut export = None;
        let mut builder_alias = None;
        for item in &parsed.module.body {
            match item {
                ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(e)) => {
                    export = Some(&*e.expr);
                }
                ModuleItem::ModuleDecl(ModuleDecl::Import(imp)) => {
                    if imp.src.value.as_str() == Some("vue-types") {
                        for spec in &imp.specifiers {
                            if let ImportSpecifier::Default(d) = spec {
                                builder_alias = Some(d.local.sym.to_string());
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        let export = export.ok_or(ScriptError::NoDefaultExport)?;
        if unwrap_export(export).is_none() {
            return Err(ScriptError::ExportNotObject);
        }

        Ok(Self {
            settings,
            parsed,
            name: name.to_string(),
            typescript,
            builder_alias,
        })
    }

    pub fn info(&self) -> ScriptInfo {
        struct JsxFinder {
            found: bool,
        }
        impl Visit for JsxFinder {
            fn visit_jsx_element(&mut self, _: &swc_ecma_ast::JSXElement) {
                self.found = true;
            }
            fn visit_jsx_fragment(&mut self, _: &swc_ecma_ast::JSXFragment) {
                self.found = true;
            }
        }
        let mut finder = JsxFinder { found: false };
        self.parsed.module.visit_with(&mut finder);
        ScriptInfo {
            has_jsx: finder.found,
            uses_root_el: self.parsed.source().contains(member::EL),
        }
    }

    /// Names registered in the `components` option, so the template knows
    /// which tags dispatch custom events.
    pub fn component_names(&self) -> Vec<String> {
        let Some(options) = self.find_export().and_then(unwrap_export) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for prop_or in &options.props {
            let PropOrSpread::Prop(prop) = prop_or else {
                continue;
            };
            if prop_key(prop).as_deref() != Some("components") {
                continue;
            }
            if let Some(obj) = prop_object(prop) {
                for inner in &obj.props {
                    if let PropOrSpread::Prop(inner) = inner {
                        if let Some(name) = prop_key(inner) {
                            out.push(name);
                        }
                    }
                }
            }
        }
        out
    }

    /// Rewrites the whole script, consuming what the template walk learned.
    pub fn process(&self, template: &TemplateOutput) -> ScriptOutput {
        let mut used: IndexSet<String> = template.used_vars.clone();
        let mut runtime: IndexSet<String> = template.runtime_helpers.clone();
        let mut hooks: IndexSet<&'static str> = IndexSet::new();

        let Some(options) = self
            .find_export()
            .and_then(unwrap_export)
        else {
            // Validated at construction.
            return ScriptOutput {
                code: self.parsed.source().to_string(),
                runtime_helpers: runtime,
            };
        };

        let mut callables: IndexMap<String, Callable> = IndexMap::new();
        let mut lifecycle_out: Vec<String> = Vec::new();
        let mut watchers_out: Vec<String> = Vec::new();
        let mut props_option: Option<&Expr> = None;
        let mut seeds: Vec<String> = vec!["data".to_string()];
        seeds.extend(template.used_vars.iter().cloned());

        for prop_or in &options.props {
            let PropOrSpread::Prop(prop) = prop_or else {
                continue;
            };
            let prop: &Prop = prop;
            let Some(key) = prop_key(prop) else {
                continue;
            };
            match key.as_str() {
                "data" => {
                    if let Some((_, node)) = prop_fn(prop) {
                        if let Some(callable) = self.collect_data(&node, &mut used) {
                            callables.insert("data".to_string(), callable);
                        }
                    }
                }
                "methods" => {
                    if let Some(obj) = prop_object(prop) {
                        self.collect_functions(obj, &mut callables, &mut used, false);
                    }
                }
                "computed" => {
                    if let Some(obj) = prop_object(prop) {
                        self.collect_functions(obj, &mut callables, &mut used, true);
                    }
                }
                "watch" => {
                    if let Some(obj) = prop_object(prop) {
                        self.collect_watchers(obj, &mut used, &mut runtime, &mut watchers_out);
                    }
                }
                "props" => {
                    if let Prop::KeyValue(kv) = prop {
                        props_option = Some(&kv.value);
                    }
                }
                name if lifecycle_target(name).is_some() => {
                    let Some((_, node)) = prop_fn(prop) else {
                        continue;
                    };
                    if fn_is_empty(&node) {
                        continue;
                    }
                    let Some(tf) = self.transform_function(&node, &mut used) else {
                        continue;
                    };
                    let mut comment = doc_lines(&self.parsed, prop.span().lo).join("\n");
                    if comment.is_empty() {
                        comment = format!("// {}", name);
                    }
                    let entry = match lifecycle_target(name) {
                        Some(LifecycleTarget::Hook(hook)) => {
                            hooks.insert(hook);
                            format!("{}\n{}({});", comment, hook, print_fn(&tf))
                        }
                        _ => format!("{}\n({})();", comment, print_fn(&tf)),
                    };
                    lifecycle_out.push(entry);
                }
                name if RESERVED_OPTIONS.contains(&name) => {}
                _ => {
                    // Any remaining function-valued option becomes a
                    // top-level helper.
                    if let Some((name, node)) = prop_fn(prop) {
                        if let Some(tf) = self.transform_function(&node, &mut used) {
                            callables.insert(
                                name.clone(),
                                Callable {
                                    code: format!("const {} = {};", name, print_fn(&tf)),
                                    used_keys: tf.used_keys,
                                },
                            );
                        }
                    }
                }
            }
        }

        let mut props_out: Vec<String> = Vec::new();
        if let Some(option) = props_option {
            let descriptors =
                collect_props(&self.parsed, option, self.builder_alias.as_deref());
            for descriptor in &descriptors {
                used.extend(descriptor.used_vars.iter().cloned());
                seeds.extend(descriptor.used_vars.iter().cloned());
                props_out.extend(descriptor.doc.iter().cloned());
                let mut line = format!("export let {}", descriptor.name);
                if self.typescript {
                    if let Some(ty) = &descriptor.ty {
                        line.push_str(&format!(": {}", ty.ts()));
                    }
                }
                if let Some(default) = &descriptor.default {
                    line.push_str(&format!(" = {}", default));
                }
                line.push(';');
                props_out.push(line);
            }
        }

        if used.contains(member::NEXT_TICK) {
            runtime.insert(helper::NEXT_TICK.to_string());
        }

        let mut sections: Vec<String> = Vec::new();
        let top_level = self.build_top_level();
        if !top_level.is_empty() {
            sections.push(top_level.join("\n"));
        }
        let imports = self.build_imports(&used, &runtime, template.root_ref.as_deref(), &hooks);
        if !imports.is_empty() {
            sections.push(imports.join("\n"));
        }
        if !props_out.is_empty() {
            sections.push(props_out.join("\n"));
        }
        let ordered = build_callables(&callables, &seeds);
        if !ordered.is_empty() {
            sections.push(ordered);
        }
        if !lifecycle_out.is_empty() {
            sections.push(lifecycle_out.join("\n\n"));
        }
        if !watchers_out.is_empty() {
            sections.push(watchers_out.join("\n\n"));
        }

        ScriptOutput {
            code: sections.join("\n\n"),
            runtime_helpers: runtime,
        }
    }

    fn find_export(&self) -> Option<&Expr> {
        self.parsed.module.body.iter().find_map(|item| match item {
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(e)) => Some(&*e.expr),
            _ => None,
        })
    }

    /// Statements kept verbatim, with the partner dialect's own imports
    /// dropped and component imports re-pointed at the target extension.
    fn build_top_level(&self) -> Vec<String> {
        let mut out = Vec::new();
        for item in &self.parsed.module.body {
            match item {
                ModuleItem::ModuleDecl(ModuleDecl::Import(imp)) => {
                    let src = imp.src.value.as_str().unwrap_or("");
                    if src == "vue" || src == "vue-types" {
                        continue;
                    }
                    let text = self.statement_text(imp.span);
                    if src.ends_with(".vue") {
                        out.push(text.replace(".vue", ".svelte"));
                    } else {
                        out.push(text);
                    }
                }
                ModuleItem::ModuleDecl(_) => {}
                ModuleItem::Stmt(stmt) => out.push(self.statement_text(stmt.span())),
            }
        }
        out
    }

    fn statement_text(&self, span: Span) -> String {
        let text = self.parsed.text(span);
        if text.ends_with(';') || text.ends_with('}') {
            text.to_string()
        } else {
            format!("{};", text)
        }
    }

    fn build_imports(
        &self,
        used: &IndexSet<String>,
        runtime: &IndexSet<String>,
        root_ref: Option<&str>,
        hooks: &IndexSet<&'static str>,
    ) -> Vec<String> {
        let aliases = &self.settings.aliases;
        let mut lines = Vec::new();

        let mut svelte: Vec<&str> = hooks.iter().copied().collect();
        if used.contains(member::EMIT) {
            svelte.push("createEventDispatcher");
        }
        if !svelte.is_empty() {
            lines.push(format!("import {{ {} }} from 'svelte';", svelte.join(", ")));
        }

        if used.contains(self.settings.css_modules.source_var.as_str()) {
            lines.push(format!(
                "import {} from './{}.pcss';",
                self.settings.css_modules.target_var, self.name
            ));
        }

        if !runtime.is_empty() {
            let names: Vec<String> = runtime
                .iter()
                .map(|name| {
                    if name == helper::NEXT_TICK && aliases.next_tick != helper::NEXT_TICK {
                        format!("{} as {}", helper::NEXT_TICK, aliases.next_tick)
                    } else {
                        name.clone()
                    }
                })
                .collect();
            lines.push(format!(
                "import {{ {} }} from '{}';",
                names.join(", "),
                self.settings.runtime.alias
            ));
        }

        if used.contains(member::EMIT) {
            lines.push(format!("const {} = createEventDispatcher();", aliases.emit));
        }
        if used.contains(member::REFS) {
            lines.push(format!("let {} = {{}};", aliases.refs));
        }
        if used.contains(member::EL) {
            lines.push(format!("let {};", aliases.el));
            if let Some(accessor) = root_ref {
                lines.push(format!("$: {} = {};", aliases.el, accessor));
            }
        }
        lines
    }

    /// Collects the entries of a `methods` or `computed` object into
    /// callables.
    fn collect_functions(
        &self,
        obj: &ObjectLit,
        callables: &mut IndexMap<String, Callable>,
        used: &mut IndexSet<String>,
        reactive: bool,
    ) {
        for prop_or in &obj.props {
            let PropOrSpread::Prop(prop) = prop_or else {
                continue;
            };
            let Some((name, node)) = prop_fn(prop) else {
                continue;
            };
            let Some(tf) = self.transform_function(&node, used) else {
                continue;
            };
            let code = if reactive {
                match &tf.body {
                    FnBody::Expr(expr) => format!("$: {} = {};", name, expr),
                    FnBody::Block(block) => format!("$: {} = (() => {})();", name, block),
                }
            } else {
                format!("const {} = {};", name, print_fn(&tf))
            };
            callables.insert(
                name,
                Callable {
                    code,
                    used_keys: tf.used_keys,
                },
            );
        }
    }

    /// Turns the data initializer into `let` bindings: one per key of a
    /// single-return object, or a destructured immediate call otherwise.
    fn collect_data(&self, node: &FnNode, used: &mut IndexSet<String>) -> Option<Callable> {
        let body = fn_body(node)?;
        let (edits, keys) = self.rewrite_body(&body, used);

        let returned = match &body {
            Body::Block(block) => single_return_object(block),
            Body::Expr(expr) => object_of(expr),
        };

        let code = if let Some(obj) = returned {
            let mut lines = Vec::new();
            for prop_or in &obj.props {
                let PropOrSpread::Prop(prop) = prop_or else {
                    continue;
                };
                if let Prop::KeyValue(kv) = &**prop {
                    if let Some(name) = prop_name_str(&kv.key) {
                        lines.push(format!(
                            "let {} = {};",
                            name,
                            self.rewritten(kv.value.span(), &edits)
                        ));
                    }
                }
            }
            lines.join("\n")
        } else {
            let Body::Block(block) = &body else {
                return None;
            };
            let mut data_keys: IndexSet<String> = IndexSet::new();
            return_object_keys(&block.stmts, &mut data_keys);
            let block_text = self.rewritten(block.span, &edits);
            if data_keys.is_empty() {
                format!("(() => {})();", block_text)
            } else {
                format!(
                    "let {{ {} }} = (() => {})();",
                    data_keys.iter().cloned().collect::<Vec<_>>().join(", "),
                    block_text
                )
            }
        };

        Some(Callable {
            code,
            used_keys: keys,
        })
    }

    fn collect_watchers(
        &self,
        obj: &ObjectLit,
        used: &mut IndexSet<String>,
        runtime: &mut IndexSet<String>,
        out: &mut Vec<String>,
    ) {
        for prop_or in &obj.props {
            let PropOrSpread::Prop(prop) = prop_or else {
                continue;
            };
            let Some(key) = prop_key(prop) else {
                continue;
            };
            let (node, immediate) = match &**prop {
                Prop::Method(m) => (Some(FnNode::Func(&m.function)), false),
                Prop::KeyValue(kv) => match &*kv.value {
                    Expr::Fn(f) => (Some(FnNode::Func(&f.function)), false),
                    Expr::Arrow(a) => (Some(FnNode::Arrow(a)), false),
                    Expr::Object(spec) => decode_watch_spec(spec),
                    _ => (None, false),
                },
                _ => (None, false),
            };
            let Some(node) = node else {
                continue;
            };
            let Some(tf) = self.transform_function(&node, used) else {
                continue;
            };

            // Deep-path keys watch an expression but need a plain name
            // for the generated adapter binding.
            let binding: String = key
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect();

            let needs_wrapper = !immediate || tf.params.len() > 1;
            if needs_wrapper {
                runtime.insert(helper::MAKE_WATCHER.to_string());
                let immediate_arg = if immediate { ", true" } else { "" };
                out.push(format!(
                    "const {binding}Watcher = {}({}{});\n$: {binding}Watcher({});",
                    helper::MAKE_WATCHER,
                    print_fn(&tf),
                    immediate_arg,
                    key,
                ));
            } else {
                out.push(format!("$: ({})({});", print_fn(&tf), key));
            }
        }
    }

    /// Rewrites one function: parameters kept verbatim, self-member
    /// accesses resolved, destructure-from-self expanded.
    fn transform_function(
        &self,
        node: &FnNode,
        used: &mut IndexSet<String>,
    ) -> Option<TransformedFn> {
        let body = fn_body(node)?;
        let (edits, used_keys) = self.rewrite_body(&body, used);

        let (params, is_async) = match node {
            FnNode::Func(f) => (
                f.params
                    .iter()
                    .map(|p| self.parsed.text(p.pat.span()).to_string())
                    .collect(),
                f.is_async,
            ),
            FnNode::Arrow(a) => (
                a.params
                    .iter()
                    .map(|p| self.parsed.text(p.span()).to_string())
                    .collect(),
                a.is_async,
            ),
        };

        let body = match &body {
            Body::Block(block) => match single_return_arg(block) {
                Some(arg) => FnBody::Expr(self.rewritten(arg.span(), &edits)),
                None => FnBody::Block(self.rewritten(block.span, &edits)),
            },
            Body::Expr(expr) => FnBody::Expr(self.rewritten(expr.span(), &edits)),
        };

        Some(TransformedFn {
            params,
            body,
            is_async,
            used_keys,
        })
    }

    fn rewrite_body(
        &self,
        body: &Body<'_>,
        used: &mut IndexSet<String>,
    ) -> (Vec<Edit>, Vec<String>) {
        let mut rewriter = SelfRewriter {
            settings: self.settings,
            base: self.parsed.base(),
            edits: Vec::new(),
            keys: Vec::new(),
            used,
        };
        match body {
            Body::Block(block) => block.visit_with(&mut rewriter),
            Body::Expr(expr) => expr.visit_with(&mut rewriter),
        }
        (rewriter.edits, rewriter.keys)
    }

    /// Applies the edits that fall inside `span` to its source slice.
    fn rewritten(&self, span: Span, edits: &[Edit]) -> String {
        let lo = self.parsed.offset(span.lo);
        let hi = self.parsed.offset(span.hi);
        let local: Vec<Edit> = edits
            .iter()
            .filter(|e| e.start >= lo && e.end <= hi)
            .map(|e| Edit::replace(e.start - lo, e.end - lo, e.text.clone()))
            .collect();
        apply_edits(&self.parsed.source()[lo..hi], local)
    }
}

/// A named emission unit with the instance keys it reads.
struct Callable {
    code: String,
    used_keys: Vec<String>,
}

/// Depth-first declare-before-use ordering with cycle suppression: a name
/// already on the active stack is skipped rather than recursed into, so a
/// dependency cycle degrades to first-seen order.
fn build_callables(callables: &IndexMap<String, Callable>, seeds: &[String]) -> String {
    fn add(
        name: &str,
        callables: &IndexMap<String, Callable>,
        done: &mut IndexSet<String>,
        stack: &mut Vec<String>,
        order: &mut Vec<String>,
    ) {
        if done.contains(name) || stack.iter().any(|s| s == name) {
            return;
        }
        let Some(callable) = callables.get(name) else {
            return;
        };
        stack.push(name.to_string());
        for dep in &callable.used_keys {
            add(dep, callables, done, stack, order);
        }
        stack.pop();
        if done.insert(name.to_string()) {
            order.push(name.to_string());
        }
    }

    let mut done = IndexSet::new();
    let mut stack = Vec::new();
    let mut order = Vec::new();
    for seed in seeds {
        add(seed, callables, &mut done, &mut stack, &mut order);
    }
    for name in callables.keys() {
        add(name, callables, &mut done, &mut stack, &mut order);
    }
    order
        .iter()
        .map(|name| callables[name].code.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

enum FnNode<'a> {
    Func(&'a Function),
    Arrow(&'a ArrowExpr),
}

enum Body<'a> {
    Block(&'a BlockStmt),
    Expr(&'a Expr),
}

enum FnBody {
    Expr(String),
    Block(String),
}

struct TransformedFn {
    params: Vec<String>,
    body: FnBody,
    is_async: bool,
    used_keys: Vec<String>,
}

fn print_fn(tf: &TransformedFn) -> String {
    let params = if tf.params.len() == 1 && is_simple_param(&tf.params[0]) {
        tf.params[0].clone()
    } else {
        format!("({})", tf.params.join(", "))
    };
    let body = match &tf.body {
        // An object body would parse as a block after the arrow.
        FnBody::Expr(e) if e.trim_start().starts_with('{') => format!("({})", e),
        FnBody::Expr(e) => e.clone(),
        FnBody::Block(b) => b.clone(),
    };
    let prefix = if tf.is_async { "async " } else { "" };
    format!("{}{} => {}", prefix, params, body)
}

fn is_simple_param(param: &str) -> bool {
    !param.is_empty()
        && !param.starts_with(|c: char| c.is_ascii_digit())
        && param
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn prop_key(prop: &Prop) -> Option<String> {
    match prop {
        Prop::Method(m) => prop_name_str(&m.key),
        Prop::KeyValue(kv) => prop_name_str(&kv.key),
        Prop::Shorthand(id) => Some(id.sym.to_string()),
        _ => None,
    }
}

fn prop_fn<'a>(prop: &'a Prop) -> Option<(String, FnNode<'a>)> {
    match prop {
        Prop::Method(m) => Some((prop_name_str(&m.key)?, FnNode::Func(&m.function))),
        Prop::KeyValue(kv) => {
            let name = prop_name_str(&kv.key)?;
            match &*kv.value {
                Expr::Fn(f) => Some((name, FnNode::Func(&f.function))),
                Expr::Arrow(a) => Some((name, FnNode::Arrow(a))),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Decodes `{ handler, immediate }` watch entries.
fn decode_watch_spec(spec: &ObjectLit) -> (Option<FnNode<'_>>, bool) {
    let mut node = None;
    let mut immediate = false;
    for prop_or in &spec.props {
        let PropOrSpread::Prop(prop) = prop_or else {
            continue;
        };
        let Some(key) = prop_key(prop) else {
            continue;
        };
        match key.as_str() {
            "handler" => node = prop_fn(prop).map(|(_, n)| n),
            "immediate" => {
                if let Prop::KeyValue(kv) = &**prop {
                    if let Expr::Lit(Lit::Bool(b)) = &*kv.value {
                        immediate = b.value;
                    }
                }
            }
            _ => {}
        }
    }
    (node, immediate)
}

fn prop_object(prop: &Prop) -> Option<&ObjectLit> {
    match prop {
        Prop::KeyValue(kv) => match &*kv.value {
            Expr::Object(obj) => Some(obj),
            _ => None,
        },
        _ => None,
    }
}

fn fn_body<'a>(node: &FnNode<'a>) -> Option<Body<'a>> {
    match node {
        FnNode::Func(f) => f.body.as_ref().map(Body::Block),
        FnNode::Arrow(a) => Some(match &*a.body {
            BlockStmtOrExpr::BlockStmt(block) => Body::Block(block),
            BlockStmtOrExpr::Expr(expr) => Body::Expr(expr),
        }),
    }
}

fn fn_is_empty(node: &FnNode) -> bool {
    match node {
        FnNode::Func(f) => f.body.as_ref().map_or(true, |b| b.stmts.is_empty()),
        FnNode::Arrow(a) => match &*a.body {
            BlockStmtOrExpr::BlockStmt(block) => block.stmts.is_empty(),
            BlockStmtOrExpr::Expr(_) => false,
        },
    }
}

fn unwrap_parens(expr: &Expr) -> &Expr {
    let mut current = expr;
    while let Expr::Paren(p) = current {
        current = &p.expr;
    }
    current
}

/// Unwraps a default export down to its options object, looking through
/// parentheses, type assertions and a wrapping factory call.
fn unwrap_export(expr: &Expr) -> Option<&ObjectLit> {
    let mut current = expr;
    loop {
        match current {
            Expr::Paren(p) => current = &p.expr,
            Expr::TsAs(a) => current = &a.expr,
            Expr::Call(call) => current = call.args.first().map(|a| &*a.expr)?,
            Expr::Object(obj) => return Some(obj),
            _ => return None,
        }
    }
}

fn object_of(expr: &Expr) -> Option<&ObjectLit> {
    match unwrap_parens(expr) {
        Expr::Object(obj) => Some(obj),
        _ => None,
    }
}

fn single_return_arg(block: &BlockStmt) -> Option<&Expr> {
    match block.stmts.as_slice() {
        [Stmt::Return(ret)] => ret.arg.as_deref(),
        _ => None,
    }
}

fn single_return_object(block: &BlockStmt) -> Option<&ObjectLit> {
    single_return_arg(block).and_then(object_of)
}

/// Gathers the keys of every object literal returned by the statements,
/// without descending into nested functions.
fn return_object_keys(stmts: &[Stmt], out: &mut IndexSet<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::Return(ret) => {
                if let Some(obj) = ret.arg.as_deref().and_then(object_of) {
                    for prop_or in &obj.props {
                        if let PropOrSpread::Prop(prop) = prop_or {
                            if let Some(name) = prop_key(prop) {
                                out.insert(name);
                            }
                        }
                    }
                }
            }
            Stmt::Block(block) => return_object_keys(&block.stmts, out),
            Stmt::If(cond) => {
                return_object_keys(std::slice::from_ref(&cond.cons), out);
                if let Some(alt) = &cond.alt {
                    return_object_keys(std::slice::from_ref(alt), out);
                }
            }
            _ => {}
        }
    }
}

/// Rewrites self-member accesses inside one function body.
struct SelfRewriter<'a, 's> {
    settings: &'s TranspileSettings,
    base: BytePos,
    edits: Vec<Edit>,
    keys: Vec<String>,
    used: &'a mut IndexSet<String>,
}

impl SelfRewriter<'_, '_> {
    fn off(&self, pos: BytePos) -> usize {
        (pos.0 - self.base.0) as usize
    }

    fn record(&mut self, key: &str) {
        self.keys.push(key.to_string());
        self.used.insert(key.to_string());
    }
}

impl Visit for SelfRewriter<'_, '_> {
    fn visit_member_expr(&mut self, n: &MemberExpr) {
        if matches!(&*n.obj, Expr::This(_)) {
            if let MemberProp::Ident(prop) = &n.prop {
                let key = prop.sym.to_string();
                let emitted = self.settings.emitted_name(&key);
                self.record(&key);
                self.edits.push(Edit::replace(
                    self.off(n.span.lo),
                    self.off(n.span.hi),
                    emitted,
                ));
                return;
            }
        }
        n.obj.visit_with(self);
        if let MemberProp::Computed(computed) = &n.prop {
            computed.visit_with(self);
        }
    }

    fn visit_var_decl(&mut self, n: &VarDecl) {
        // `const { a, b: c } = this` expands to individual bindings; plain
        // keys need no binding at all because the bare name is already the
        // reactive declaration.
        if n.decls.len() == 1 {
            let decl = &n.decls[0];
            if let (Pat::Object(pat), Some(Expr::This(_))) = (&decl.name, decl.init.as_deref()) {
                let mut lines = Vec::new();
                for prop in &pat.props {
                    match prop {
                        ObjectPatProp::Assign(assign) => {
                            let key = assign.key.sym.to_string();
                            let emitted = self.settings.emitted_name(&key);
                            self.record(&key);
                            if emitted != key {
                                lines.push(format!("const {} = {};", key, emitted));
                            }
                        }
                        ObjectPatProp::KeyValue(kv) => {
                            let Some(key) = prop_name_str(&kv.key) else {
                                continue;
                            };
                            let Pat::Ident(binding) = &*kv.value else {
                                continue;
                            };
                            let emitted = self.settings.emitted_name(&key);
                            self.record(&key);
                            let binding = binding.id.sym.to_string();
                            if binding != emitted {
                                lines.push(format!("const {} = {};", binding, emitted));
                            }
                        }
                        ObjectPatProp::Rest(_) => {}
                    }
                }
                self.edits.push(Edit::replace(
                    self.off(n.span.lo),
                    self.off(n.span.hi),
                    lines.join("\n"),
                ));
                return;
            }
        }
        n.visit_children_with(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rewriter<'s>(src: &str, settings: &'s TranspileSettings) -> ScriptRewriter<'s> {
        ScriptRewriter::new(src, "Widget", false, settings).unwrap()
    }

    fn run(src: &str) -> String {
        run_with(src, &[])
    }

    fn run_with(src: &str, template_vars: &[&str]) -> String {
        let settings = TranspileSettings::default();
        let rw = rewriter(src, &settings);
        let mut template = TemplateOutput::default();
        for var in template_vars {
            template.used_vars.insert(var.to_string());
        }
        rw.process(&template).code
    }

    #[test]
    fn data_keys_become_let_bindings() {
        let code = run("export default { data() { return { count: 0, step: 1 }; } };");
        assert!(code.contains("let count = 0;"));
        assert!(code.contains("let step = 1;"));
    }

    #[test]
    fn complex_data_body_destructures_an_immediate_call() {
        let code = run(
            "export default { data() { const base = load(); return { items: base, total: base.length }; } };",
        );
        assert!(code.contains("let { items, total } = (() => {"));
        assert!(code.contains("})();"));
    }

    #[test]
    fn methods_resolve_self_references() {
        let code = run(
            "export default { data() { return { count: 0 }; }, methods: { inc() { this.count += 1; } } };",
        );
        assert!(code.contains("const inc = () =>"));
        assert!(code.contains("count += 1"));
        assert!(!code.contains("this."));
    }

    #[test]
    fn data_is_declared_before_methods_that_read_it() {
        let code = run(
            "export default { methods: { inc() { this.count += 1; } }, data() { return { count: 0 }; } };",
        );
        let data_at = code.find("let count = 0;").unwrap();
        let method_at = code.find("const inc").unwrap();
        assert!(data_at < method_at);
    }

    #[test]
    fn dependencies_are_emitted_before_their_dependents() {
        let code = run(
            "export default {\n  methods: { useDouble() { return this.double + 1; } },\n  computed: { double() { return this.count * 2; } },\n};",
        );
        let dep_at = code.find("$: double = count * 2;").unwrap();
        let user_at = code.find("const useDouble").unwrap();
        assert!(dep_at < user_at);
    }

    #[test]
    fn a_two_cycle_terminates_and_emits_each_body_once() {
        let code = run(
            "export default { methods: { a() { return this.b(); }, b() { return this.a(); } } };",
        );
        assert_eq!(code.matches("const a = ").count(), 1);
        assert_eq!(code.matches("const b = ").count(), 1);
    }

    #[test]
    fn computed_single_expressions_become_reactive_statements() {
        let code = run("export default { computed: { total() { return this.count + 1; } } };");
        assert!(code.contains("$: total = count + 1;"));
    }

    #[test]
    fn computed_blocks_become_reactive_immediate_calls() {
        let code = run(
            "export default { computed: { label() { if (this.count) { return 'some'; } return 'none'; } } };",
        );
        assert!(code.contains("$: label = (() => {"));
    }

    #[test]
    fn destructure_from_self_expands_to_alias_bindings() {
        let code = run(
            "export default { data() { return { count: 0 }; }, methods: { save() { const { count, $emit } = this; $emit('save', count); } } };",
        );
        assert!(code.contains("const $emit = emit$;"));
        assert!(!code.contains("= this"));
        assert!(code.contains("import { createEventDispatcher } from 'svelte';"));
        assert!(code.contains("const emit$ = createEventDispatcher();"));
    }

    #[test]
    fn alias_table_rewrites_emit_references() {
        let settings = TranspileSettings::default();
        let rw = rewriter(
            "export default { methods: { close() { this.$emit('close'); } } };",
            &settings,
        );
        let out = rw.process(&TemplateOutput::default());
        assert!(out.code.contains("emit$('close')"));
        assert!(!out.code.contains("this.$emit"));
    }

    #[test]
    fn lifecycle_hooks_map_through_the_fixed_table() {
        let code = run(
            "export default { created() { this.init(); }, mounted() { this.load(); }, beforeDestroy() { this.stop(); } };",
        );
        assert!(code.contains("import { onMount, onDestroy } from 'svelte';"));
        assert!(code.contains("// created\n(() => {"));
        assert!(code.contains("onMount(() => {"));
        assert!(code.contains("onDestroy(() => {"));
    }

    #[test]
    fn empty_lifecycle_hooks_are_omitted() {
        let code = run("export default { mounted() {} };");
        assert!(!code.contains("onMount"));
    }

    #[test]
    fn watchers_wrap_in_the_runtime_adapter() {
        let settings = TranspileSettings::default();
        let rw = rewriter(
            "export default { data() { return { count: 0 }; }, watch: { count(value, old) { this.report(value); } } };",
        &settings);
        let out = rw.process(&TemplateOutput::default());
        assert!(out
            .code
            .contains("const countWatcher = makeWatcher((value, old) =>"));
        assert!(out.code.contains("$: countWatcher(count);"));
        assert!(out.runtime_helpers.contains("makeWatcher"));
        assert!(out
            .code
            .contains("import { makeWatcher } from './v2s-runtime.js';"));
    }

    #[test]
    fn immediate_single_argument_watchers_bind_directly() {
        let code = run(
            "export default { watch: { query: { handler(value) { this.search(value); }, immediate: true } } };",
        );
        assert!(code.contains("$: (value => {"));
        assert!(code.contains("})(query);"));
        assert!(!code.contains("makeWatcher"));
    }

    #[test]
    fn deep_path_watchers_get_a_sanitized_binding_name() {
        let code = run(
            "export default { watch: { 'user.name': function (value) { this.track(value); } } };",
        );
        assert!(code.contains("const user_nameWatcher = makeWatcher"));
        assert!(code.contains("$: user_nameWatcher(user.name);"));
    }

    #[test]
    fn partner_imports_are_dropped_and_component_imports_repointed() {
        let code = run(
            "import Vue from 'vue';\nimport Child from './Child.vue';\nimport { pick } from './util';\nexport default {};",
        );
        assert!(!code.contains("'vue'"));
        assert!(code.contains("import Child from './Child.svelte';"));
        assert!(code.contains("import { pick } from './util';"));
    }

    #[test]
    fn scheduled_update_calls_import_the_runtime_adapter() {
        let code = run(
            "export default { methods: { focus() { this.$nextTick(() => this.apply()); } } };",
        );
        assert!(code.contains("nextTick$(() => apply())"));
        assert!(code.contains("import { nextTick$ } from './v2s-runtime.js';"));
    }

    #[test]
    fn css_module_references_import_the_sibling_stylesheet() {
        let code = run(
            "export default { computed: { cls() { return this.$style.active; } } };",
        );
        assert!(code.contains("$: cls = style$.active;"));
        assert!(code.contains("import style$ from './Widget.pcss';"));
    }

    #[test]
    fn root_element_access_declares_the_binding() {
        let code = run("export default { methods: { width() { return this.$el.offsetWidth; } } };");
        assert!(code.contains("let el$;"));
        assert!(code.contains("el$.offsetWidth"));
    }

    #[test]
    fn root_element_derives_from_a_recorded_root_ref() {
        let settings = TranspileSettings::default();
        let rw = rewriter(
            "export default { methods: { width() { return this.$el.offsetWidth; } } };",
            &settings,
        );
        let template = TemplateOutput {
            root_ref: Some("refs$.main".to_string()),
            ..TemplateOutput::default()
        };
        let out = rw.process(&template);
        assert!(out.code.contains("let el$;"));
        assert!(out.code.contains("$: el$ = refs$.main;"));
    }

    #[test]
    fn props_emit_export_declarations() {
        let code = run(
            "export default { props: { title: { type: String, default: 'hi' }, items: { default: () => [] } } };",
        );
        assert!(code.contains("export let title = 'hi';"));
        assert!(code.contains("export let items = () => [];"));
    }

    #[test]
    fn typed_scripts_annotate_prop_declarations() {
        let settings = TranspileSettings::default();
        let rw = ScriptRewriter::new(
            "export default { props: { size: { type: Number, default: 4 } } };",
            "Widget",
            true,
            &settings,
        )
        .unwrap();
        let out = rw.process(&TemplateOutput::default());
        assert!(out.code.contains("export let size: number = 4;"));
    }

    #[test]
    fn builder_chain_props_resolve_through_the_import_alias() {
        let code = run(
            "import PropTypes from 'vue-types';\nexport default { props: { count: PropTypes.number.def(3) } };",
        );
        assert!(code.contains("export let count = 3;"));
        assert!(!code.contains("vue-types"));
    }

    #[test]
    fn unrecognized_function_options_become_helpers() {
        let code = run("export default { formatLabel() { return this.count.toFixed(2); } };");
        assert!(code.contains("const formatLabel = () =>"));
    }

    #[test]
    fn top_level_statements_pass_through() {
        let code = run("const LIMIT = 10;\nexport default { data() { return { max: LIMIT }; } };");
        assert!(code.contains("const LIMIT = 10;"));
        assert!(code.contains("let max = LIMIT;"));
    }

    #[test]
    fn missing_default_export_is_a_hard_failure() {
        let settings = TranspileSettings::default();
        let result = ScriptRewriter::new("const x = 1;", "Widget", false, &settings);
        assert!(matches!(result, Err(ScriptError::NoDefaultExport)));
    }

    #[test]
    fn non_object_export_is_a_hard_failure() {
        let settings = TranspileSettings::default();
        let result = ScriptRewriter::new("export default 42;", "Widget", false, &settings);
        assert!(matches!(result, Err(ScriptError::ExportNotObject)));
    }

    #[test]
    fn factory_wrapped_exports_are_unwrapped() {
        let code = run(
            "export default defineComponent({ data() { return { on: true }; } });",
        );
        assert!(code.contains("let on = true;"));
    }

    #[test]
    fn info_reports_markup_from_code() {
        let settings = TranspileSettings::default();
        let rw = rewriter(
            "export default { render() { return <div>hi</div>; } };",
            &settings,
        );
        assert!(rw.info().has_jsx);
        let plain = rewriter("export default {};", &settings);
        assert!(!plain.info().has_jsx);
    }

    #[test]
    fn registered_components_are_reported_by_name() {
        let settings = TranspileSettings::default();
        let rw = rewriter(
            "import ItemRow from './ItemRow.vue';\nexport default { components: { ItemRow, Picker: DatePicker } };",
            &settings,
        );
        assert_eq!(
            rw.component_names(),
            vec!["ItemRow".to_string(), "Picker".to_string()]
        );
    }
}
