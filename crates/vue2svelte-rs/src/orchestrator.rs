//! Main orchestration logic.
//!
//! Walks the source tree, converts every component file and copies the
//! rest, then writes the collected outputs under the target root. A
//! component that cannot be converted degrades instead of failing the
//! run: a broken script passes through verbatim, a broken template is
//! dropped with a warning.

use crate::config::RunOptions;
use crate::output::{FileAction, FileRecord, RunSummary};
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use std::fs;
use thiserror::Error;
use vue_sfc::{parse_document, parse_template};
use vue_transformer::{
    ScriptRewriter, TemplateOutput, TemplateRewriter, TranspileSettings, RUNTIME_SOURCE,
};
use walkdir::WalkDir;

/// Orchestration errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Invalid glob pattern.
    #[error("invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// Failed to read a source file.
    #[error("failed to read {0}: {1}")]
    ReadFailed(Utf8PathBuf, String),

    /// Failed to write an output file.
    #[error("failed to write {0}: {1}")]
    WriteFailed(Utf8PathBuf, String),
}

/// One collected output, keyed by its target-relative path.
#[derive(Debug, Clone)]
pub struct OutputFile {
    /// Generated content; `None` copies `source` verbatim at write time.
    pub content: Option<String>,
    /// The input file this output came from, if any.
    pub source: Option<Utf8PathBuf>,
    pub action: FileAction,
}

impl OutputFile {
    fn generated(content: String, action: FileAction) -> Self {
        Self {
            content: Some(content),
            source: None,
            action,
        }
    }

    fn copied(source: Utf8PathBuf) -> Self {
        Self {
            content: None,
            source: Some(source),
            action: FileAction::Copied,
        }
    }
}

/// Converts a set of components, collecting outputs in memory until
/// `write_to` flushes them.
pub struct Transpiler<'s> {
    settings: &'s TranspileSettings,
    outputs: IndexMap<Utf8PathBuf, OutputFile>,
    need_runtime: bool,
    collisions: usize,
}

impl<'s> Transpiler<'s> {
    pub fn new(settings: &'s TranspileSettings) -> Self {
        Self {
            settings,
            outputs: IndexMap::new(),
            need_runtime: false,
            collisions: 0,
        }
    }

    /// Registers an output. The first producer of a path wins; later
    /// producers are dropped and counted.
    fn add_output(&mut self, path: Utf8PathBuf, file: OutputFile) {
        if self.outputs.contains_key(&path) {
            self.collisions += 1;
            return;
        }
        self.outputs.insert(path, file);
    }

    /// Schedules a verbatim copy.
    pub fn copy_file(&mut self, rel: &Utf8Path, source: Utf8PathBuf) {
        self.add_output(rel.to_owned(), OutputFile::copied(source));
    }

    /// Converts one component document. `rel` is the path under the
    /// source root; the output lands at the same path with a `.svelte`
    /// extension.
    pub fn transpile_component(&mut self, rel: &Utf8Path, source: &str) {
        let doc = parse_document(source);
        let name = rel.file_stem().unwrap_or("component");
        let typescript = doc.script.attr_text("lang") == Some("ts");
        let functional = doc.template.has_attr("functional");

        let script_src = doc.script.content.trim();
        let rewriter = if script_src.is_empty() {
            None
        } else {
            match ScriptRewriter::new(&doc.script.content, name, typescript, self.settings) {
                Ok(rewriter) => Some(rewriter),
                Err(e) => {
                    eprintln!("Warning: {}: script kept verbatim: {}", rel, e);
                    None
                }
            }
        };

        let info = rewriter.as_ref().map(|r| r.info());
        let has_jsx = info.is_some_and(|i| i.has_jsx);
        let needs_el = info.is_some_and(|i| i.uses_root_el);
        let components = rewriter
            .as_ref()
            .map(|r| r.component_names())
            .unwrap_or_default();

        // A script that renders its own markup keeps only the script block.
        let template = if has_jsx || doc.template.content.trim().is_empty() {
            TemplateOutput::default()
        } else {
            match parse_template(&doc.template.content) {
                Ok(fragment) => {
                    TemplateRewriter::new(self.settings, functional, needs_el, components)
                        .rewrite(&fragment)
                }
                Err(e) => {
                    eprintln!("Warning: {}: template dropped: {}", rel, e);
                    TemplateOutput::default()
                }
            }
        };

        let script_block = match &rewriter {
            Some(rewriter) => {
                let out = rewriter.process(&template);
                if !out.runtime_helpers.is_empty() {
                    self.need_runtime = true;
                }
                Some(out.code)
            }
            None if !script_src.is_empty() => Some(script_src.to_string()),
            None => None,
        };

        let mut sections: Vec<String> = Vec::new();
        if !template.markup.is_empty() {
            sections.push(template.markup);
        }
        if let Some(code) = script_block {
            let lang = if typescript { " lang=\"ts\"" } else { "" };
            sections.push(format!("<script{}>\n{}\n</script>", lang, code));
        }
        let mut content = sections.join("\n\n");

        let mut css_file = None;
        if !doc.style.content.trim().is_empty() {
            if doc.style.has_attr("module") {
                css_file = Some((rel.with_extension("pcss"), doc.style.content));
            } else {
                content.push_str(&format!("\n\n<style>{}</style>", doc.style.content));
            }
        }

        self.add_output(
            rel.with_extension("svelte"),
            OutputFile {
                content: Some(content),
                source: None,
                action: FileAction::Converted,
            },
        );
        if let Some((path, css)) = css_file {
            self.add_output(
                path,
                OutputFile::generated(css, FileAction::Converted),
            );
        }
    }

    /// Appends the shared runtime module if any component needed it.
    pub fn finish(&mut self) {
        if self.need_runtime {
            self.add_output(
                Utf8PathBuf::from(&self.settings.runtime.path),
                OutputFile::generated(RUNTIME_SOURCE.to_string(), FileAction::Generated),
            );
        }
    }

    pub fn outputs(&self) -> &IndexMap<Utf8PathBuf, OutputFile> {
        &self.outputs
    }

    /// Writes all collected outputs under the target root.
    pub fn write_to(&self, target: &Utf8Path) -> Result<(), OrchestratorError> {
        for (rel, file) in &self.outputs {
            let full = target.join(rel);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| OrchestratorError::WriteFailed(full.clone(), e.to_string()))?;
            }
            match (&file.content, &file.source) {
                (Some(content), _) => fs::write(&full, content)
                    .map_err(|e| OrchestratorError::WriteFailed(full.clone(), e.to_string()))?,
                (None, Some(source)) => {
                    fs::copy(source, &full)
                        .map_err(|e| OrchestratorError::WriteFailed(full.clone(), e.to_string()))?;
                }
                (None, None) => {}
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        let files: Vec<FileRecord> = self
            .outputs
            .iter()
            .map(|(path, file)| FileRecord {
                action: file.action,
                path: path.to_string(),
            })
            .collect();
        RunSummary {
            converted: files
                .iter()
                .filter(|f| f.action == FileAction::Converted)
                .count(),
            copied: files
                .iter()
                .filter(|f| f.action == FileAction::Copied)
                .count(),
            collisions: self.collisions,
            runtime_emitted: self.need_runtime,
            files,
        }
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, OrchestratorError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))
}

/// Runs a whole conversion.
pub fn run(options: &RunOptions) -> Result<RunSummary, OrchestratorError> {
    let ignore_set = build_glob_set(&options.ignore)?;
    let copy_set = build_glob_set(&options.copy)?;

    let files: Vec<Utf8PathBuf> = WalkDir::new(&options.source)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| Utf8PathBuf::try_from(e.into_path()).ok())
        .collect();

    let mut transpiler = Transpiler::new(&options.settings);
    for path in files {
        let rel = path
            .strip_prefix(&options.source)
            .unwrap_or(&path)
            .to_owned();
        if ignore_set.is_match(rel.as_str()) {
            continue;
        }
        if path.extension() != Some("vue") || copy_set.is_match(rel.as_str()) {
            transpiler.copy_file(&rel, path);
            continue;
        }
        let source = fs::read_to_string(&path)
            .map_err(|e| OrchestratorError::ReadFailed(path.clone(), e.to_string()))?;
        transpiler.transpile_component(&rel, &source);
    }
    transpiler.finish();
    transpiler.write_to(&options.target)?;
    Ok(transpiler.summary())
}
