//! Navigation chain compilation.
//!
//! Turns chains of model edges into the grouped-join expression tree of
//! [`navmap_ir`]. Each hop compiles to a group join over key selectors
//! derived from the edge's referential constraint, followed by a flatten
//! that appends the inner rows as a new context stage. Synthesized
//! many-to-many edges expand into two hops through their hidden join
//! entity, with the intermediate stage elided from the final context.

mod compiler;
mod key;
mod limits;
mod path;

pub use compiler::JoinPathCompiler;
pub use limits::CompilerLimits;
pub use path::normalize_path;
