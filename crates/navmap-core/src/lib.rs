//! Navmap Core - Navigation model, join compilation, and save planning.
//!
//! This crate provides the relational-mapping core for Navmap.

pub mod error;
pub mod exec;
pub mod join;
pub mod model;
pub mod save;

pub use error::Error;
pub use model::{
    DefaultValue, DeleteAction, EdgeId, EntityDef, FieldDef, FieldType, JoinDescription, Model,
    ModelBuilder, ModelSpec, Multiplicity, NavigationDef, PropertyPair,
};

pub use join::{CompilerLimits, JoinPathCompiler, normalize_path};

pub use save::{ChangeSet, IdentitySlot, MemoryTable, SaveExecutor, SavePlan, SavePlanner, Table};

// Backend exports
pub use exec::{JoinEvaluator, MemoryRowSource, RowSource};

/// Re-export join-expression IR types.
pub use navmap_ir as ir;
