//! CLI argument parsing.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

/// Converts Vue 2 single-file components to Svelte.
#[derive(Debug, Parser)]
#[command(name = "vue2svelte-rs")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Source directory containing components to convert
    pub source: Option<Utf8PathBuf>,

    /// Target directory for generated files
    pub target: Option<Utf8PathBuf>,

    /// Path to a v2s.config.js file
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,

    /// Glob patterns to skip entirely
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Glob patterns to copy verbatim instead of converting
    #[arg(long)]
    pub copy: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub output: OutputFormat,

    /// Emitted name for the event-dispatch member
    #[arg(long = "emit-alias")]
    pub emit_alias: Option<String>,

    /// Emitted name for the deferred-update member
    #[arg(long = "next-tick-alias")]
    pub next_tick_alias: Option<String>,

    /// Emitted name for the element-registry member
    #[arg(long = "refs-alias")]
    pub refs_alias: Option<String>,

    /// Emitted name for the root-element member
    #[arg(long = "el-alias")]
    pub el_alias: Option<String>,

    /// Output path of the shared runtime module, relative to the target
    #[arg(long = "runtime-path")]
    pub runtime_path: Option<String>,

    /// Import specifier generated components use for the runtime module
    #[arg(long = "runtime-alias")]
    pub runtime_alias: Option<String>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output
    Json,
}
