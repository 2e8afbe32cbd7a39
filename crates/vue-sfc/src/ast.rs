//! Template AST types.

/// The parsed template section: a sequence of top-level nodes.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    pub nodes: Vec<TemplateNode>,
}

/// One node of the template tree.
#[derive(Debug, Clone)]
pub enum TemplateNode {
    Element(Element),
    Interpolation(Interpolation),
    Text(Text),
}

/// An element with its attributes, structural directives and children.
///
/// `v-if`, `v-else-if`, `v-else` and `v-for` are decoded at parse time:
/// the head of a conditional chain carries its own condition in `v_if` and
/// the rest of the chain in `else_arms`; chained siblings are removed from
/// the child list. All other attributes stay in `attrs` in source order.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<TemplateNode>,
    pub v_if: Option<String>,
    pub else_arms: Vec<ElseArm>,
    pub v_for: Option<VFor>,
}

impl Element {
    /// Looks up an attribute by exact name.
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// The textual value of an attribute, if present and non-bare.
    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(|a| a.value.as_deref())
    }

    /// Whether the element carries the attribute in plain, `:`-bound or
    /// `v-bind:`-bound form.
    pub fn has_attr_any_form(&self, name: &str) -> bool {
        self.attr(name).is_some()
            || self.attr(&format!(":{}", name)).is_some()
            || self.attr(&format!("v-bind:{}", name)).is_some()
    }
}

/// One `else-if`/`else` arm of a conditional chain.
#[derive(Debug, Clone)]
pub struct ElseArm {
    /// The arm's condition; `None` for the final `else`.
    pub condition: Option<String>,
    pub element: Element,
}

/// A decoded `v-for` binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VFor {
    /// The iterated expression.
    pub source: String,
    /// The loop alias, possibly a destructuring pattern.
    pub alias: String,
    /// The optional index/key alias.
    pub iterator: Option<String>,
}

/// A plain attribute as written in the source. `value` is `None` for bare
/// attributes such as `disabled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

/// A text run containing `{{ ... }}` interpolations, decomposed into a
/// token list alternating literal text and bound expressions.
#[derive(Debug, Clone, Default)]
pub struct Interpolation {
    pub tokens: Vec<InterpolationToken>,
}

/// One token of an interpolation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpolationToken {
    Text(String),
    Binding(String),
}

/// A literal text run with no interpolations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub text: String,
}
