//! Shared transformation settings.

/// Canonical keys of the special instance members, as they appear in source.
pub mod member {
    pub const SLOTS: &str = "$slots";
    pub const ATTRS: &str = "$attrs";
    pub const EMIT: &str = "$emit";
    pub const NEXT_TICK: &str = "$nextTick";
    pub const REFS: &str = "$refs";
    pub const EL: &str = "$el";
}

/// Emitted names for the special instance members.
///
/// Slots and attrs map onto the target framework's built-in variables;
/// the rest default to `$`-suffixed names so generated bindings cannot
/// collide with a component's own `data`/`methods` names.
#[derive(Debug, Clone)]
pub struct MemberAliases {
    pub slots: String,
    pub attrs: String,
    pub emit: String,
    pub next_tick: String,
    pub refs: String,
    pub el: String,
}

impl Default for MemberAliases {
    fn default() -> Self {
        Self {
            slots: "$$slots".to_string(),
            attrs: "$$restProps".to_string(),
            emit: "emit$".to_string(),
            next_tick: "nextTick$".to_string(),
            refs: "refs$".to_string(),
            el: "el$".to_string(),
        }
    }
}

/// CSS-module variable naming.
#[derive(Debug, Clone)]
pub struct CssModules {
    /// The variable the source dialect exposes module classes under.
    pub source_var: String,
    /// The import binding generated for the sibling stylesheet.
    pub target_var: String,
}

impl Default for CssModules {
    fn default() -> Self {
        Self {
            source_var: "$style".to_string(),
            target_var: "style$".to_string(),
        }
    }
}

/// Where the shared runtime module lives.
#[derive(Debug, Clone)]
pub struct RuntimeModule {
    /// Output path of the emitted module, relative to the target root.
    pub path: String,
    /// Import specifier generated components use to reach it.
    pub alias: String,
}

impl Default for RuntimeModule {
    fn default() -> Self {
        Self {
            path: "v2s-runtime.js".to_string(),
            alias: "./v2s-runtime.js".to_string(),
        }
    }
}

/// Settings shared by the script and template rewriters. One instance is
/// owned by the orchestrator and borrowed for the whole run.
#[derive(Debug, Clone, Default)]
pub struct TranspileSettings {
    pub aliases: MemberAliases,
    pub css_modules: CssModules,
    pub runtime: RuntimeModule,
}

impl TranspileSettings {
    /// The emitted alias for a special member key, or `None` for an
    /// ordinary instance member.
    pub fn member_alias(&self, key: &str) -> Option<&str> {
        if key == self.css_modules.source_var {
            return Some(&self.css_modules.target_var);
        }
        match key {
            member::SLOTS => Some(&self.aliases.slots),
            member::ATTRS => Some(&self.aliases.attrs),
            member::EMIT => Some(&self.aliases.emit),
            member::NEXT_TICK => Some(&self.aliases.next_tick),
            member::REFS => Some(&self.aliases.refs),
            member::EL => Some(&self.aliases.el),
            _ => None,
        }
    }

    /// The name an instance member is emitted under: its alias for special
    /// members, itself otherwise.
    pub fn emitted_name(&self, key: &str) -> String {
        self.member_alias(key)
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }
}
