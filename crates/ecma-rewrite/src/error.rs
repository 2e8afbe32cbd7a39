//! Error type for embedded-script parsing.

use thiserror::Error;

/// Errors raised while parsing embedded JavaScript/TypeScript.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The embedded source could not be parsed.
    #[error("failed to parse embedded script: {0}")]
    Parse(String),
}
