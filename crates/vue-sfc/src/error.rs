//! Template parse errors.

use thiserror::Error;

/// Errors raised while parsing a template section.
///
/// The parser is lenient where it can be (stray close tags are skipped,
/// unknown constructs pass through as text); these errors cover the cases
/// where no sensible recovery exists. Callers treat any of them as a
/// per-component degradation, never a run failure.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input ended inside an open tag or attribute value.
    #[error("unexpected end of template inside <{0}>")]
    UnexpectedEof(String),

    /// An interpolation was opened but never closed.
    #[error("unterminated interpolation")]
    UnterminatedInterpolation,

    /// An element was never closed.
    #[error("missing closing tag for <{0}>")]
    MissingClose(String),
}
