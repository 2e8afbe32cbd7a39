//! Configuration loading.
//!
//! Projects describe a conversion in a `v2s.config.js` file next to their
//! sources. The file is plain JavaScript, parsed with SWC rather than
//! executed, so both `export default {...}` and `module.exports = {...}`
//! forms are accepted but only literal values survive. Command-line
//! arguments override whatever the file provides.

use crate::cli::Args;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::sync::Arc;
use swc_common::SourceMap;
use swc_ecma_ast::{
    AssignTarget, Expr, KeyValueProp, Lit, MemberProp, ModuleDecl, ModuleItem, ObjectLit, Prop,
    PropName, PropOrSpread, SimpleAssignTarget, Stmt,
};
use swc_ecma_parser::{parse_file_as_module, EsSyntax, Syntax};
use thiserror::Error;
use vue_transformer::{MemberAliases, RuntimeModule, TranspileSettings};

/// Why a run could not start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no source directory: pass one as the first argument or set `source` in v2s.config.js")]
    MissingSource,

    #[error("no target directory: pass one as the second argument or set `target` in v2s.config.js")]
    MissingTarget,
}

/// Values read from a v2s.config.js file.
#[derive(Debug, Clone, Default)]
pub struct V2sConfig {
    /// Source directory containing the components.
    pub source: Option<Utf8PathBuf>,

    /// Target directory for generated files.
    pub target: Option<Utf8PathBuf>,

    /// Glob patterns skipped entirely.
    pub ignore: Vec<String>,

    /// Glob patterns copied verbatim instead of converted.
    pub copy: Vec<String>,
}

impl V2sConfig {
    /// Loads configuration. An explicit path is used as-is; otherwise the
    /// working directory is searched for the conventional file names. A
    /// file that fails to parse degrades to the defaults with a warning.
    pub fn load(explicit: Option<&Utf8Path>) -> Self {
        if let Some(path) = explicit {
            return match Self::parse_config(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: failed to parse {}: {}", path, e);
                    Self::default()
                }
            };
        }

        for config_file in ["v2s.config.js", "v2s.config.mjs"] {
            let path = Utf8PathBuf::from(config_file);
            if path.exists() {
                return match Self::parse_config(&path) {
                    Ok(config) => config,
                    Err(e) => {
                        eprintln!("Warning: failed to parse {}: {}", path, e);
                        Self::default()
                    }
                };
            }
        }

        Self::default()
    }

    /// Parses a v2s.config.js file using SWC.
    fn parse_config(path: &Utf8Path) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;

        let cm: Arc<SourceMap> = Default::default();
        let fm = cm.new_source_file(
            swc_common::FileName::Custom(path.to_string()).into(),
            content,
        );

        let module = parse_file_as_module(
            &fm,
            Syntax::Es(EsSyntax {
                jsx: false,
                ..Default::default()
            }),
            swc_ecma_ast::EsVersion::Es2022,
            None,
            &mut Vec::new(),
        )
        .map_err(|e| format!("parse error: {:?}", e))?;

        let mut config = V2sConfig::default();
        for item in &module.body {
            if let Some(obj) = exported_object(item) {
                Self::extract_from_object(obj, &mut config);
            }
        }
        Ok(config)
    }

    fn prop_name_str(key: &PropName) -> Option<&str> {
        match key {
            PropName::Ident(ident) => Some(ident.sym.as_str()),
            PropName::Str(s) => s.value.as_str(),
            _ => None,
        }
    }

    fn str_value(expr: &Expr) -> Option<&str> {
        match expr {
            Expr::Lit(Lit::Str(s)) => s.value.as_str(),
            _ => None,
        }
    }

    fn str_list(expr: &Expr) -> Vec<String> {
        let Expr::Array(arr) = expr else {
            return Vec::new();
        };
        arr.elems
            .iter()
            .flatten()
            .filter_map(|elem| Self::str_value(&elem.expr))
            .map(str::to_string)
            .collect()
    }

    fn extract_from_object(obj: &ObjectLit, config: &mut V2sConfig) {
        for prop in &obj.props {
            let PropOrSpread::Prop(prop) = prop else {
                continue;
            };
            let Prop::KeyValue(KeyValueProp { key, value }) = prop.as_ref() else {
                continue;
            };
            let Some(key_name) = Self::prop_name_str(key) else {
                continue;
            };
            match key_name {
                "source" => {
                    if let Some(dir) = Self::str_value(value) {
                        config.source = Some(Utf8PathBuf::from(dir));
                    }
                }
                "target" => {
                    if let Some(dir) = Self::str_value(value) {
                        config.target = Some(Utf8PathBuf::from(dir));
                    }
                }
                "ignore" => config.ignore = Self::str_list(value),
                "copy" => config.copy = Self::str_list(value),
                _ => {}
            }
        }
    }
}

/// The object a config module exports, from either module form.
fn exported_object(item: &ModuleItem) -> Option<&ObjectLit> {
    match item {
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(e)) => match e.expr.as_ref() {
            Expr::Object(obj) => Some(obj),
            _ => None,
        },
        ModuleItem::Stmt(Stmt::Expr(stmt)) => {
            let Expr::Assign(assign) = stmt.expr.as_ref() else {
                return None;
            };
            let AssignTarget::Simple(SimpleAssignTarget::Member(member)) = &assign.left else {
                return None;
            };
            let Expr::Ident(obj) = member.obj.as_ref() else {
                return None;
            };
            let MemberProp::Ident(prop) = &member.prop else {
                return None;
            };
            if obj.sym.as_str() != "module" || prop.sym.as_str() != "exports" {
                return None;
            }
            match assign.right.as_ref() {
                Expr::Object(obj) => Some(obj),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Fully resolved options for one run: config file values with
/// command-line overrides applied.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: Utf8PathBuf,
    pub target: Utf8PathBuf,
    pub ignore: Vec<String>,
    pub copy: Vec<String>,
    pub settings: TranspileSettings,
}

impl RunOptions {
    pub fn resolve(args: &Args, config: V2sConfig) -> Result<Self, ConfigError> {
        let source = args
            .source
            .clone()
            .or(config.source)
            .ok_or(ConfigError::MissingSource)?;
        let target = args
            .target
            .clone()
            .or(config.target)
            .ok_or(ConfigError::MissingTarget)?;

        let mut ignore = config.ignore;
        ignore.extend(args.ignore.iter().cloned());
        let mut copy = config.copy;
        copy.extend(args.copy.iter().cloned());

        let defaults = MemberAliases::default();
        let runtime_defaults = RuntimeModule::default();
        let settings = TranspileSettings {
            aliases: MemberAliases {
                emit: args.emit_alias.clone().unwrap_or(defaults.emit),
                next_tick: args.next_tick_alias.clone().unwrap_or(defaults.next_tick),
                refs: args.refs_alias.clone().unwrap_or(defaults.refs),
                el: args.el_alias.clone().unwrap_or(defaults.el),
                ..defaults
            },
            runtime: RuntimeModule {
                path: args
                    .runtime_path
                    .clone()
                    .unwrap_or(runtime_defaults.path),
                alias: args
                    .runtime_alias
                    .clone()
                    .unwrap_or(runtime_defaults.alias),
            },
            ..TranspileSettings::default()
        };

        Ok(Self {
            source,
            target,
            ignore,
            copy,
            settings,
        })
    }
}
