//! Frozen navigation model.

use super::entity::EntityDef;
use super::navigation::{EdgeId, JoinDescription, NavigationDef};
use crate::error::Error;
use std::collections::HashMap;

/// An immutable entity-navigation model.
///
/// Built once by [`crate::model::ModelBuilder`], then shared read-only by
/// every compiler and planner instance. Edges are stored in a flat table and
/// addressed by [`EdgeId`]; name lookups exist for the builder-facing edges
/// of an entity.
#[derive(Debug)]
pub struct Model {
    entities: HashMap<String, EntityDef>,
    edges: Vec<NavigationDef>,
    outgoing: HashMap<String, Vec<EdgeId>>,
    incoming: HashMap<String, Vec<EdgeId>>,
    join_descriptions: HashMap<EdgeId, JoinDescription>,
}

impl Model {
    pub(crate) fn from_parts(
        entities: HashMap<String, EntityDef>,
        edges: Vec<NavigationDef>,
        join_descriptions: HashMap<EdgeId, JoinDescription>,
    ) -> Self {
        let mut outgoing: HashMap<String, Vec<EdgeId>> = HashMap::new();
        let mut incoming: HashMap<String, Vec<EdgeId>> = HashMap::new();
        for (index, edge) in edges.iter().enumerate() {
            let id = EdgeId::new(index as u32);
            outgoing.entry(edge.source.clone()).or_default().push(id);
            incoming.entry(edge.target.clone()).or_default().push(id);
        }
        Self {
            entities,
            edges,
            outgoing,
            incoming,
            join_descriptions,
        }
    }

    /// Get an entity definition by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Get an entity definition, failing when the type is unknown.
    pub fn entity(&self, name: &str) -> Result<&EntityDef, Error> {
        self.get_entity(name)
            .ok_or_else(|| Error::TypeNotRegistered(name.to_string()))
    }

    /// Check whether an entity type is registered.
    pub fn contains_entity(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// All entity names.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }

    /// Get an edge by id.
    pub fn get_edge(&self, id: EdgeId) -> Option<&NavigationDef> {
        self.edges.get(id.index())
    }

    /// Get an edge by id, failing for ids the model never assigned.
    pub fn edge(&self, id: EdgeId) -> Result<&NavigationDef, Error> {
        self.get_edge(id)
            .ok_or_else(|| Error::EdgeNotRegistered(format!("edge {id}")))
    }

    /// Look up an edge by source entity and navigation name.
    pub fn edge_by_name(&self, source: &str, name: &str) -> Option<(EdgeId, &NavigationDef)> {
        self.edges_from(source)
            .find(|(_, edge)| edge.name == name)
    }

    /// Edges leaving an entity, in declaration order.
    pub fn edges_from(&self, source: &str) -> impl Iterator<Item = (EdgeId, &NavigationDef)> {
        self.outgoing
            .get(source)
            .into_iter()
            .flatten()
            .map(|id| (*id, &self.edges[id.index()]))
    }

    /// Edges arriving at an entity, in declaration order.
    pub fn edges_to(&self, target: &str) -> impl Iterator<Item = (EdgeId, &NavigationDef)> {
        self.incoming
            .get(target)
            .into_iter()
            .flatten()
            .map(|id| (*id, &self.edges[id.index()]))
    }

    /// The partner edge of a paired navigation.
    pub fn partner_of(&self, id: EdgeId) -> Option<(EdgeId, &NavigationDef)> {
        let edge = self.get_edge(id)?;
        let partner_name = edge.partner.as_deref()?;
        self.edge_by_name(&edge.target, partner_name)
    }

    /// The hidden join route behind a synthesized many-to-many edge.
    pub fn join_description(&self, id: EdgeId) -> Option<&JoinDescription> {
        self.join_descriptions.get(&id)
    }

    /// Number of edges, synthesized ones included.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Key columns on the edge's source entity that drive a join along it.
    ///
    /// The columns come from whichever edge owns the referential constraint:
    /// the partner when this edge is the principal end of a pair, this edge
    /// itself otherwise. Partner-less edges point principal to dependent, so
    /// their source columns are the principal members.
    pub fn source_join_properties(&self, id: EdgeId) -> Result<Vec<String>, Error> {
        let edge = self.edge(id)?;
        let columns = match (&edge.partner, edge.principal) {
            (Some(_), true) => {
                let (_, partner) = self
                    .partner_of(id)
                    .ok_or_else(|| Error::EdgeNotRegistered(partner_label(edge)))?;
                partner.principal_properties().map(str::to_string).collect()
            }
            (Some(_), false) => edge.dependent_properties().map(str::to_string).collect(),
            (None, true) => edge.principal_properties().map(str::to_string).collect(),
            (None, false) => edge.dependent_properties().map(str::to_string).collect(),
        };
        Ok(columns)
    }

    /// Key columns on the edge's target entity matching
    /// [`Model::source_join_properties`], pair for pair.
    pub fn target_join_properties(&self, id: EdgeId) -> Result<Vec<String>, Error> {
        let edge = self.edge(id)?;
        let columns = match (&edge.partner, edge.principal) {
            (Some(_), true) => {
                let (_, partner) = self
                    .partner_of(id)
                    .ok_or_else(|| Error::EdgeNotRegistered(partner_label(edge)))?;
                partner.dependent_properties().map(str::to_string).collect()
            }
            (Some(_), false) => edge.principal_properties().map(str::to_string).collect(),
            (None, true) => edge.dependent_properties().map(str::to_string).collect(),
            (None, false) => edge.principal_properties().map(str::to_string).collect(),
        };
        Ok(columns)
    }
}

fn partner_label(edge: &NavigationDef) -> String {
    format!(
        "{}.{}",
        edge.target,
        edge.partner.as_deref().unwrap_or_default()
    )
}
