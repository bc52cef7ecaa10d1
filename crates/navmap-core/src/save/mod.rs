//! Persistence batch planning and execution.
//!
//! A save batch touches a set of entity types, each with staged inserts,
//! updates, and deletes behind the [`Table`] seam. The planner orders those
//! types dependents-first along the model's navigation edges; the executor
//! walks the order in reverse for inserts so store-generated identities can
//! be propagated into dependent foreign keys before they flush, and forward
//! for deletes. Self-referencing types are planned once and flushed
//! parents-first within their own table.

mod executor;
mod planner;
mod table;

pub use executor::SaveExecutor;
pub use planner::{SavePlan, SavePlanner};
pub use table::{ChangeSet, IdentitySlot, MemoryTable, Table};
