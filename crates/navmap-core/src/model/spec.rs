//! Serializable model description.

use super::entity::EntityDef;
use super::navigation::NavigationDef;
use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};

/// The declared input of a model build: entity definitions plus navigation
/// edges, in declaration order.
///
/// Declaration order is meaningful. Edge ids are assigned by position when
/// the model is frozen, so a spec deserialized from bytes rebuilds to the
/// same ids it was declared with.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct ModelSpec {
    /// IR layout version the spec was written against.
    pub ir_version: u32,
    /// Entity definitions in declaration order.
    pub entities: Vec<EntityDef>,
    /// Navigation definitions in declaration order.
    pub navigations: Vec<NavigationDef>,
}

impl ModelSpec {
    /// Create an empty model spec.
    pub fn new() -> Self {
        Self {
            ir_version: navmap_ir::IR_VERSION,
            entities: Vec::new(),
            navigations: Vec::new(),
        }
    }

    /// Add an entity definition.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.push(entity);
        self
    }

    /// Add a navigation definition.
    pub fn with_navigation(mut self, navigation: NavigationDef) -> Self {
        self.navigations.push(navigation);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Serialize the spec to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a spec from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::new()
    }
}
