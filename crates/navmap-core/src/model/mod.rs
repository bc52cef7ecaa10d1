//! Entity-navigation model.
//!
//! The model describes entity types, their fields and keys, and the
//! navigation edges between them. It is declared through [`ModelBuilder`],
//! validated and frozen once, and read-only afterwards; many-to-many
//! inference runs during the freeze and registers synthesized edges with
//! their join descriptions.

mod builder;
mod entity;
mod infer;
mod model;
mod navigation;
mod spec;

pub use builder::ModelBuilder;
pub use entity::{DefaultValue, EntityDef, FieldDef, FieldType};
pub use model::Model;
pub use navigation::{
    DeleteAction, EdgeId, JoinDescription, Multiplicity, NavigationDef, PropertyPair,
};
pub use spec::ModelSpec;
