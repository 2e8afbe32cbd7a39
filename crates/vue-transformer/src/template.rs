//! Template-section rewriting.
//!
//! Walks the parsed template tree and emits target-dialect markup:
//! conditional chains become `{#if}` block chains, loops become `{#each}`
//! blocks with their aliases pushed onto a scope stack, and every bound
//! expression is rewritten identifier-by-identifier through the shared
//! alias table. The walk records which instance variables the markup
//! consumes; the script rewriter uses that record to decide what to emit.

use crate::runtime::helper;
use crate::settings::{member, TranspileSettings};
use ecma_rewrite::{alias_idents, rename_identifiers, ParsedExpr, Rename};
use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use swc_ecma_ast::Expr;
use vue_sfc::{is_void_tag, Attribute, Element, Fragment, TemplateNode};

/// What a template walk produced, consumed by the script rewriter and the
/// orchestrator.
#[derive(Debug, Clone, Default)]
pub struct TemplateOutput {
    pub markup: String,
    /// Instance variables the markup references, by pre-alias key, in
    /// first-use order.
    pub used_vars: IndexSet<String>,
    /// Runtime helpers the markup calls.
    pub runtime_helpers: IndexSet<String>,
    /// Accessor expression for the root element's registry entry, when the
    /// root carries a `ref`.
    pub root_ref: Option<String>,
}

pub struct TemplateRewriter<'s> {
    settings: &'s TranspileSettings,
    functional: bool,
    /// Whether the script reads the root-element member, which forces a
    /// root binding even without a `ref` attribute.
    needs_el: bool,
    components: Vec<String>,
    scopes: Vec<FxHashSet<String>>,
    used: IndexSet<String>,
    runtime: IndexSet<String>,
    root_ref: Option<String>,
    saw_root: bool,
}

impl<'s> TemplateRewriter<'s> {
    pub fn new(
        settings: &'s TranspileSettings,
        functional: bool,
        needs_el: bool,
        components: Vec<String>,
    ) -> Self {
        Self {
            settings,
            functional,
            needs_el,
            components,
            scopes: Vec::new(),
            used: IndexSet::new(),
            runtime: IndexSet::new(),
            root_ref: None,
            saw_root: false,
        }
    }

    pub fn rewrite(mut self, fragment: &Fragment) -> TemplateOutput {
        let mut markup = String::new();
        for node in &fragment.nodes {
            markup.push_str(&self.node(node, true));
        }
        TemplateOutput {
            markup: markup.trim().to_string(),
            used_vars: self.used,
            runtime_helpers: self.runtime,
            root_ref: self.root_ref,
        }
    }

    fn nodes(&mut self, nodes: &[TemplateNode]) -> String {
        nodes.iter().map(|n| self.node(n, false)).collect()
    }

    fn node(&mut self, node: &TemplateNode, top_level: bool) -> String {
        match node {
            TemplateNode::Element(el) => {
                let is_root = top_level && !self.saw_root;
                if top_level {
                    self.saw_root = true;
                }
                self.conditional(el, is_root)
            }
            TemplateNode::Interpolation(interp) => interp
                .tokens
                .iter()
                .map(|token| match token {
                    vue_sfc::InterpolationToken::Text(text) => text.clone(),
                    vue_sfc::InterpolationToken::Binding(expr) => {
                        format!("{{{}}}", self.expression(expr))
                    }
                })
                .collect(),
            TemplateNode::Text(text) => text.text.clone(),
        }
    }

    /// Renders a conditional chain as one block with a single open and a
    /// single close marker, each arm in source order.
    fn conditional(&mut self, el: &Element, is_root: bool) -> String {
        let Some(condition) = &el.v_if else {
            return self.looped(el, is_root);
        };
        let mut out = format!("{{#if {}}}", self.expression(condition));
        out.push_str(&self.looped(el, is_root));
        for arm in &el.else_arms {
            match &arm.condition {
                Some(c) => out.push_str(&format!("{{:else if {}}}", self.expression(c))),
                None => out.push_str("{:else}"),
            }
            out.push_str(&self.looped(&arm.element, is_root));
        }
        out.push_str("{/if}");
        out
    }

    /// Wraps a loop-bound element in an iteration block, with the loop
    /// bindings in scope for the key and the subtree but not the source.
    fn looped(&mut self, el: &Element, is_root: bool) -> String {
        let Some(v_for) = &el.v_for else {
            return self.element(el, is_root);
        };
        let source = self.expression(&v_for.source);

        let mut locals: FxHashSet<String> = alias_idents(&v_for.alias).into_iter().collect();
        if let Some(iterator) = &v_for.iterator {
            locals.insert(iterator.clone());
        }
        self.scopes.push(locals);

        let key = el
            .attr_value(":key")
            .or_else(|| el.attr_value("key"))
            .map(|k| self.expression(k));
        let body = self.element(el, is_root);
        self.scopes.pop();

        let mut head = format!("{{#each {} as {}", source, v_for.alias);
        if let Some(iterator) = &v_for.iterator {
            head.push_str(&format!(", {}", iterator));
        }
        if let Some(key) = key {
            head.push_str(&format!(" ({})", key));
        }
        head.push('}');
        format!("{}{}{{/each}}", head, body)
    }

    fn element(&mut self, el: &Element, is_root: bool) -> String {
        // A template wrapper contributes no element of its own.
        if el.tag == "template" {
            return self.nodes(&el.children);
        }

        let tag = if el.tag == "component" {
            "svelte:component".to_string()
        } else {
            el.tag.clone()
        };

        let mut parts: Vec<String> = Vec::new();
        let mut raw_html: Option<String> = None;
        for attr in &el.attrs {
            if let Some(part) = self.attribute(el, attr, is_root, &mut raw_html) {
                parts.push(part);
            }
        }

        if is_root {
            let attrs_name = self.settings.aliases.attrs.clone();
            if !el.has_attr_any_form("class") {
                self.used.insert(member::ATTRS.to_string());
                parts.push(format!("class={{{}.class}}", attrs_name));
            }
            if !el.has_attr_any_form("style") {
                self.used.insert(member::ATTRS.to_string());
                parts.push(format!("style={{{}.style}}", attrs_name));
            }
            if self.needs_el && self.root_ref.is_none() {
                self.used.insert(member::EL.to_string());
                parts.push(format!("bind:this={{{}}}", self.settings.aliases.el));
            }
        }

        let attrs_text: String = parts.iter().map(|p| format!(" {}", p)).collect();
        let inner = match raw_html {
            Some(html) => html,
            None => self.nodes(&el.children),
        };

        if is_void_tag(&el.tag) || (el.children.is_empty() && inner.is_empty()) {
            format!("<{}{} />", tag, attrs_text)
        } else {
            format!("<{}{}>{}</{}>", tag, attrs_text, inner, tag)
        }
    }

    /// Classifies one attribute and renders its target form. `None` drops
    /// the attribute.
    fn attribute(
        &mut self,
        el: &Element,
        attr: &Attribute,
        is_root: bool,
        raw_html: &mut Option<String>,
    ) -> Option<String> {
        let name = attr.name.as_str();
        if name.is_empty() || name == "key" || name == ":key" {
            return None;
        }

        if let Some(event) = name
            .strip_prefix('@')
            .or_else(|| name.strip_prefix("v-on:"))
        {
            let value = attr.value.as_deref()?;
            let handler = self.event_expression(value, self.is_component(&el.tag));
            return Some(format!("{}={{{}}}", event_name(event), handler));
        }

        if let Some(prop) = name
            .strip_prefix(':')
            .or_else(|| name.strip_prefix("v-bind:"))
        {
            let value = attr.value.as_deref().unwrap_or("");
            return self.bound_attribute(el, prop, value, is_root);
        }

        match name {
            "ref" => {
                let value = attr.value.as_deref()?;
                self.used.insert(member::REFS.to_string());
                let accessor = format!("{}.{}", self.settings.aliases.refs, value);
                if is_root {
                    self.root_ref = Some(accessor.clone());
                }
                Some(format!("bind:this={{{}}}", accessor))
            }
            "v-model" => {
                let value = attr.value.as_deref()?;
                self.model_binding(el, value)
            }
            "v-html" => {
                let value = attr.value.as_deref()?;
                *raw_html = Some(format!("{{@html {}}}", self.expression(value)));
                None
            }
            "v-bind" => {
                let value = attr.value.as_deref()?;
                Some(format!("{{...({})}}", self.expression(value)))
            }
            _ if name.starts_with("v-") => None,
            _ => match &attr.value {
                // Static class/style on the root still merge what the
                // parent passes down.
                Some(value) if is_root && (name == "class" || name == "style") => {
                    self.used.insert(member::ATTRS.to_string());
                    let sep = if name == "style" { ";" } else { "" };
                    Some(format!(
                        "{}={{'{}{} ' + ({}.{} || '')}}",
                        name, value, sep, self.settings.aliases.attrs, name
                    ))
                }
                Some(value) => Some(format!("{}=\"{}\"", name, value)),
                None => Some(name.to_string()),
            },
        }
    }

    fn bound_attribute(
        &mut self,
        el: &Element,
        prop: &str,
        value: &str,
        is_root: bool,
    ) -> Option<String> {
        let expr = self.expression(value);
        match prop {
            "class" => {
                // A plain css-module access is already a class string.
                let module_access = expr
                    .strip_prefix(&self.settings.css_modules.target_var)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .is_some_and(|rest| {
                        !rest.is_empty()
                            && rest
                                .chars()
                                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
                    });
                let mut body = if module_access {
                    expr
                } else {
                    self.runtime.insert(helper::MAKE_CLASS_NAME.to_string());
                    format!("{}({})", helper::MAKE_CLASS_NAME, expr)
                };
                if is_root {
                    self.used.insert(member::ATTRS.to_string());
                    body.push_str(&format!(
                        " + ' ' + ({}.class || '')",
                        self.settings.aliases.attrs
                    ));
                }
                Some(format!("class={{{}}}", body))
            }
            "style" => {
                self.runtime.insert(helper::MAKE_STYLE.to_string());
                let mut body = format!("{}({})", helper::MAKE_STYLE, expr);
                if is_root {
                    self.used.insert(member::ATTRS.to_string());
                    body.push_str(&format!(
                        " + '; ' + ({}.style || '')",
                        self.settings.aliases.attrs
                    ));
                }
                Some(format!("style={{{}}}", body))
            }
            "ref" => {
                self.used.insert(member::REFS.to_string());
                let accessor = format!("{}[{}]", self.settings.aliases.refs, expr);
                if is_root {
                    self.root_ref = Some(accessor.clone());
                }
                Some(format!("bind:this={{{}}}", accessor))
            }
            "is" if el.tag == "component" => Some(format!("this={{{}}}", expr)),
            _ => Some(format!("{}={{{}}}", prop, expr)),
        }
    }

    /// Two-way bindings map to value/checked/group depending on the
    /// element kind and input type. Other tags have no native binding,
    /// so the directive is dropped there.
    fn model_binding(&mut self, el: &Element, value: &str) -> Option<String> {
        let binding = match el.tag.as_str() {
            "input" => match el.attr_value("type") {
                Some("checkbox") => "checked",
                Some("radio") => "group",
                _ => "value",
            },
            "select" | "textarea" => "value",
            _ => return None,
        };
        let expr = self.expression(value);
        Some(format!("bind:{}={{{}}}", binding, expr))
    }

    /// Rewrites a bound expression through the scope stack and alias
    /// table, recording non-local references.
    fn expression(&mut self, src: &str) -> String {
        rename_identifiers(src, |name, is_access| self.resolve(name, is_access))
    }

    fn resolve(&mut self, name: &str, is_access: bool) -> Rename {
        if name == "$event" || self.in_scope(name) {
            return Rename::Keep;
        }
        if self.functional {
            if name == "props" {
                return if is_access {
                    Rename::Drop
                } else {
                    Rename::To("$$props".to_string())
                };
            }
            if name == "$options" {
                return Rename::Drop;
            }
        }
        if let Some(alias) = self.settings.member_alias(name) {
            let alias = alias.to_string();
            self.used.insert(name.to_string());
            return if alias == name {
                Rename::Keep
            } else {
                Rename::To(alias)
            };
        }
        self.used.insert(name.to_string());
        Rename::Keep
    }

    fn in_scope(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn is_component(&self, tag: &str) -> bool {
        self.components
            .iter()
            .any(|c| c == tag || to_kebab(c) == tag)
    }

    /// Classifies an event handler expression. Handlers on sub-components
    /// receive custom events, so their payload is unwrapped before the
    /// user's handler runs.
    fn event_expression(&mut self, src: &str, on_component: bool) -> String {
        let trimmed = src.trim();
        let bare = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '$' || c == '_' || c == '.');

        if bare {
            let expr = self.expression(trimmed);
            return if on_component {
                self.runtime.insert(helper::UNWRAP_EVENT.to_string());
                format!("e$ => {}({}(e$))", expr, helper::UNWRAP_EVENT)
            } else {
                expr
            };
        }

        let is_function = ParsedExpr::parse(trimmed)
            .map(|parsed| matches!(*parsed.expr, Expr::Arrow(_) | Expr::Fn(_)))
            .unwrap_or(false);
        if is_function {
            let expr = self.expression(trimmed);
            return if on_component {
                self.runtime.insert(helper::UNWRAP_EVENT.to_string());
                format!("e$ => ({})({}(e$))", expr, helper::UNWRAP_EVENT)
            } else {
                expr
            };
        }

        // An inline statement becomes the body of a synthesized handler;
        // `$event` stays available inside it.
        let expr = rename_identifiers(trimmed, |name, is_access| {
            if name == "$event" && on_component {
                self.runtime.insert(helper::UNWRAP_EVENT.to_string());
                return Rename::To(format!("{}($event)", helper::UNWRAP_EVENT));
            }
            self.resolve(name, is_access)
        });
        format!("$event => {{ {} }}", expr)
    }
}

/// Renders an event attribute name with its modifiers mapped to the
/// target vocabulary. Unknown modifiers are dropped.
fn event_name(raw: &str) -> String {
    let mut parts = raw.split('.');
    let event = parts.next().unwrap_or(raw);
    let mods: Vec<&str> = parts
        .filter_map(|m| match m {
            "prevent" => Some("preventDefault"),
            "stop" => Some("stopPropagation"),
            "capture" => Some("capture"),
            "passive" => Some("passive"),
            "self" => Some("self"),
            "once" => Some("once"),
            _ => None,
        })
        .collect();
    if mods.is_empty() {
        format!("on:{}", event)
    } else {
        format!("on:{}|{}", event, mods.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vue_sfc::parse_template;

    fn rewrite(src: &str) -> TemplateOutput {
        rewrite_with(src, false, false, Vec::new())
    }

    fn rewrite_with(
        src: &str,
        functional: bool,
        needs_el: bool,
        components: Vec<String>,
    ) -> TemplateOutput {
        let settings = TranspileSettings::default();
        let fragment = parse_template(src).unwrap();
        TemplateRewriter::new(&settings, functional, needs_el, components).rewrite(&fragment)
    }

    #[test]
    fn interpolations_record_used_variables() {
        let out = rewrite("<p>{{ greeting }}</p>");
        assert!(out.markup.contains("{greeting}"));
        assert!(out.used_vars.contains("greeting"));
    }

    #[test]
    fn loop_variables_stay_out_of_the_used_set() {
        let out = rewrite("<li v-for=\"item in items\">{{ item.label }} {{ total }}</li>");
        assert!(!out.used_vars.contains("item"));
        assert!(out.used_vars.contains("items"));
        assert!(out.used_vars.contains("total"));
    }

    #[test]
    fn each_block_carries_iterator_and_key() {
        let out = rewrite("<li v-for=\"(item, i) in items\" :key=\"item.id\">{{ i }}</li>");
        assert!(out.markup.starts_with("{#each items as item, i (item.id)}"));
        assert!(out.markup.ends_with("{/each}"));
    }

    #[test]
    fn three_arm_chain_opens_and_closes_once() {
        let out = rewrite(
            "<div><p v-if=\"a\">1</p><p v-else-if=\"b\">2</p><p v-else>3</p></div>",
        );
        assert_eq!(out.markup.matches("{#if ").count(), 1);
        assert_eq!(out.markup.matches("{:else if ").count(), 1);
        assert_eq!(out.markup.matches("{:else}").count(), 1);
        assert_eq!(out.markup.matches("{/if}").count(), 1);
        let if_at = out.markup.find("{#if a}").unwrap();
        let elif_at = out.markup.find("{:else if b}").unwrap();
        let else_at = out.markup.find("{:else}").unwrap();
        assert!(if_at < elif_at && elif_at < else_at);
    }

    #[test]
    fn special_members_record_pre_alias_keys_and_emit_post_alias_names() {
        let out = rewrite("<button @click=\"$emit('save')\">go</button>");
        assert!(out.used_vars.contains("$emit"));
        assert!(out.markup.contains("emit$('save')"));
        assert!(!out.markup.contains("$emit"));
    }

    #[test]
    fn event_modifiers_map_to_the_target_vocabulary() {
        let out = rewrite("<form @submit.prevent=\"save\"><input /></form>");
        assert!(out.markup.contains("on:submit|preventDefault={save}"));
    }

    #[test]
    fn bound_class_goes_through_the_class_helper() {
        let out = rewrite("<div><span :class=\"{ active: isOn }\">x</span></div>");
        assert!(out.markup.contains("class={makeClassName({ active: isOn })}"));
        assert!(out.runtime_helpers.contains("makeClassName"));
    }

    #[test]
    fn root_class_binding_merges_passthrough_classes() {
        let out = rewrite("<div :class=\"cls\">x</div>");
        assert!(out
            .markup
            .contains("class={makeClassName(cls) + ' ' + ($$restProps.class || '')}"));
        assert!(out.used_vars.contains("$attrs"));
    }

    #[test]
    fn static_root_class_merges_passthrough_classes() {
        let out = rewrite("<div class=\"card\">x</div>");
        assert!(out
            .markup
            .contains("class={'card ' + ($$restProps.class || '')}"));
        assert!(out.markup.contains("style={$$restProps.style}"));
    }

    #[test]
    fn root_without_class_gets_a_passthrough_binding() {
        let out = rewrite("<div>x</div>");
        assert!(out.markup.contains("class={$$restProps.class}"));
        assert!(out.markup.contains("style={$$restProps.style}"));
    }

    #[test]
    fn every_arm_of_a_root_chain_gets_passthrough_bindings() {
        let out = rewrite("<div v-if=\"a\">1</div><div v-else>2</div>");
        assert_eq!(out.markup.matches("class={$$restProps.class}").count(), 2);
        assert_eq!(out.markup.matches("style={$$restProps.style}").count(), 2);
    }

    #[test]
    fn css_module_class_access_skips_the_class_helper() {
        let out = rewrite("<div><span :class=\"$style.box\">x</span></div>");
        assert!(out.markup.contains("class={style$.box}"));
        assert!(!out.runtime_helpers.contains("makeClassName"));
        assert!(out.used_vars.contains("$style"));
    }

    #[test]
    fn bound_style_goes_through_the_style_helper() {
        let out = rewrite("<div><i :style=\"{ marginTop: gap }\">x</i></div>");
        assert!(out.markup.contains("style={makeStyle({ marginTop: gap })}"));
        assert!(out.runtime_helpers.contains("makeStyle"));
    }

    #[test]
    fn static_ref_registers_and_binds() {
        let out = rewrite("<div><canvas ref=\"surface\"></canvas></div>");
        assert!(out.markup.contains("bind:this={refs$.surface}"));
        assert!(out.used_vars.contains("$refs"));
    }

    #[test]
    fn root_ref_is_recorded_for_the_script() {
        let out = rewrite("<div ref=\"main\">x</div>");
        assert_eq!(out.root_ref.as_deref(), Some("refs$.main"));
    }

    #[test]
    fn needed_root_element_binds_without_a_ref() {
        let out = rewrite_with("<div>x</div>", false, true, Vec::new());
        assert!(out.markup.contains("bind:this={el$}"));
        assert!(out.used_vars.contains("$el"));
    }

    #[test]
    fn model_bindings_follow_input_type() {
        let out = rewrite(
            "<form><input type=\"checkbox\" v-model=\"agreed\" /><input type=\"radio\" v-model=\"pick\" /><textarea v-model=\"note\"></textarea></form>",
        );
        assert!(out.markup.contains("bind:checked={agreed}"));
        assert!(out.markup.contains("bind:group={pick}"));
        assert!(out.markup.contains("bind:value={note}"));
    }

    #[test]
    fn model_binding_is_dropped_outside_form_elements() {
        let out = rewrite("<div><Picker v-model=\"when\"></Picker></div>");
        assert!(!out.markup.contains("bind:"));
        assert!(!out.markup.contains("v-model"));
    }

    #[test]
    fn raw_html_suppresses_children() {
        let out = rewrite("<div><p v-html=\"body\">ignored</p></div>");
        assert!(out.markup.contains("{@html body}"));
        assert!(!out.markup.contains("ignored"));
    }

    #[test]
    fn spread_binding_is_passed_through_as_object_spread() {
        let out = rewrite("<div><child v-bind=\"extras\"></child></div>");
        assert!(out.markup.contains("{...(extras)}"));
    }

    #[test]
    fn dynamic_component_uses_a_this_binding() {
        let out = rewrite("<div><component :is=\"current\"></component></div>");
        assert!(out.markup.contains("<svelte:component this={current}"));
    }

    #[test]
    fn component_event_handlers_unwrap_the_payload() {
        let out = rewrite_with(
            "<div><ItemRow @select=\"onSelect\"></ItemRow></div>",
            false,
            false,
            vec!["ItemRow".to_string()],
        );
        assert!(out
            .markup
            .contains("on:select={e$ => onSelect(unwrapEvent(e$))}"));
        assert!(out.runtime_helpers.contains("unwrapEvent"));
    }

    #[test]
    fn inline_statement_handlers_become_synthesized_arrows() {
        let out = rewrite("<button @click=\"count += step\">+</button>");
        assert!(out.markup.contains("on:click={$event => { count += step }}"));
        assert!(out.used_vars.contains("count"));
        assert!(out.used_vars.contains("step"));
    }

    #[test]
    fn functional_templates_rename_the_props_bag() {
        let out = rewrite_with(
            "<div><span>{{ props.label }}</span><em>{{ props }}</em></div>",
            true,
            false,
            Vec::new(),
        );
        assert!(out.markup.contains("{label}"));
        assert!(out.markup.contains("{$$props}"));
    }

    #[test]
    fn options_access_is_only_stripped_in_functional_templates() {
        let functional = rewrite_with("<div>{{ $options.name }}</div>", true, false, Vec::new());
        assert!(functional.markup.contains("{name}"));

        let ordinary = rewrite("<div>{{ $options.name }}</div>");
        assert!(ordinary.markup.contains("{$options.name}"));
    }

    #[test]
    fn unrecognized_directives_are_dropped() {
        let out = rewrite("<div><p v-custom=\"x\" title=\"kept\">y</p></div>");
        assert!(!out.markup.contains("v-custom"));
        assert!(out.markup.contains("title=\"kept\""));
    }
}

fn to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
