//! Core error types.

use thiserror::Error;

/// Errors raised by the model, the join compiler, and the save planner.
#[derive(Debug, Error)]
pub enum Error {
    /// IR-level validation error.
    #[error("ir error: {0}")]
    Ir(#[from] navmap_ir::Error),

    /// An entity type is not registered in the model.
    #[error("entity type not registered: {0}")]
    TypeNotRegistered(String),

    /// A navigation edge is not registered in the model.
    #[error("navigation not registered: {0}")]
    EdgeNotRegistered(String),

    /// A property does not exist on an entity, directly or through its
    /// first reference-shaped field.
    #[error("property {property} not found on entity {entity}")]
    PropertyNotFound { entity: String, property: String },

    /// A field access named a navigation path the compiler never joined.
    #[error("join path not found for {entity}.{path}")]
    PathNotJoined { entity: String, path: String },

    /// Outer and inner join key selectors cannot be unified.
    #[error("join key shapes differ on {edge}: outer {outer}, inner {inner}")]
    KeyShapeMismatch {
        edge: String,
        outer: String,
        inner: String,
    },

    /// Save ordering found no dependent-first candidate among the
    /// remaining types.
    #[error("dependency cycle among entity types: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    /// An entity type declares more than one self-referencing edge.
    #[error("entity {entity} has multiple self-referencing navigations")]
    MultipleSelfReferences { entity: String },

    /// A self-referencing edge uses a composite foreign key.
    #[error("entity {entity} self-reference uses a composite foreign key")]
    CompositeSelfReference { entity: String },

    /// A change set has no table registered for an entity type.
    #[error("table entity type not found: {0}")]
    TableNotFound(String),

    /// Model construction rejected a definition.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// A compiler limit was exceeded.
    #[error("{kind} depth {actual} exceeds limit {limit}")]
    DepthExceeded {
        kind: &'static str,
        actual: usize,
        limit: usize,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}
