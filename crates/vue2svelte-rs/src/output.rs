//! Run reporting.

use crate::cli::OutputFormat;
use serde::Serialize;

/// What happened to one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    /// Converted to a component in the target dialect.
    Converted,
    /// Copied verbatim.
    Copied,
    /// Generated by the run itself, with no single input file.
    Generated,
}

/// One produced output file.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub action: FileAction,
    /// Output path, relative to the target root.
    pub path: String,
}

/// Totals for a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub files: Vec<FileRecord>,
    pub converted: usize,
    pub copied: usize,
    /// Outputs discarded because an earlier file claimed the same path.
    pub collisions: usize,
    pub runtime_emitted: bool,
}

impl RunSummary {
    pub fn format(&self) -> String {
        let mut line = format!(
            "converted {} component{}, copied {} file{}",
            self.converted,
            if self.converted == 1 { "" } else { "s" },
            self.copied,
            if self.copied == 1 { "" } else { "s" },
        );
        if self.runtime_emitted {
            line.push_str(", wrote runtime module");
        }
        if self.collisions > 0 {
            line.push_str(&format!(
                ", dropped {} duplicate output{}",
                self.collisions,
                if self.collisions == 1 { "" } else { "s" },
            ));
        }
        line
    }
}

/// Formats a run summary for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Human => {
                let mut out = String::new();
                for record in &summary.files {
                    let verb = match record.action {
                        FileAction::Converted => "convert",
                        FileAction::Copied => "copy",
                        FileAction::Generated => "emit",
                    };
                    out.push_str(&format!("{:>8}  {}\n", verb, record.path));
                }
                out.push_str(&summary.format());
                out.push('\n');
                out
            }
            OutputFormat::Json => {
                serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        RunSummary {
            files: vec![
                FileRecord {
                    action: FileAction::Converted,
                    path: "App.svelte".to_string(),
                },
                FileRecord {
                    action: FileAction::Generated,
                    path: "v2s-runtime.js".to_string(),
                },
            ],
            converted: 1,
            copied: 0,
            collisions: 0,
            runtime_emitted: true,
        }
    }

    #[test]
    fn test_human_format_lists_files_and_totals() {
        let text = Formatter::new(OutputFormat::Human).format(&summary());
        assert!(text.contains("convert  App.svelte"));
        assert!(text.contains("converted 1 component, copied 0 files"));
        assert!(text.contains("wrote runtime module"));
    }

    #[test]
    fn test_json_format_is_valid_json() {
        let text = Formatter::new(OutputFormat::Json).format(&summary());
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["converted"], 1);
        assert_eq!(value["files"][0]["action"], "converted");
    }

    #[test]
    fn test_collisions_are_reported() {
        let mut s = summary();
        s.collisions = 2;
        assert!(s.format().contains("dropped 2 duplicate outputs"));
    }
}
