//! Reference in-memory backend.
//!
//! One executable consumer for the join IR: a hash-based grouped-join
//! evaluator over rows pulled through the [`RowSource`] seam. It is not a
//! storage engine; it exists so compiled expressions can be run and their
//! semantics asserted end to end.

mod eval;
mod source;

pub use eval::JoinEvaluator;
pub use source::{MemoryRowSource, RowSource};
