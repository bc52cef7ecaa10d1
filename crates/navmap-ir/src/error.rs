//! IR error types.

use thiserror::Error;

/// IR-level validation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A selector or accessor addressed a stage the context does not have.
    #[error("stage {index} out of range for context of {len} stages")]
    StageOutOfRange { index: usize, len: usize },

    /// Join key selectors disagree in shape or scalar kind.
    #[error("join key shapes differ: outer {outer}, inner {inner}")]
    KeyShape { outer: String, inner: String },

    /// A join key selector has no components.
    #[error("join key selector has no components")]
    EmptyKey,

    /// Structurally invalid expression tree.
    #[error("invalid join expression: {0}")]
    InvalidExpr(String),
}
