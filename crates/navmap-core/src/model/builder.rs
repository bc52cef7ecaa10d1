//! Model construction and validation.

use super::entity::EntityDef;
use super::infer;
use super::model::Model;
use super::navigation::{EdgeId, JoinDescription, NavigationDef};
use super::spec::ModelSpec;
use crate::error::Error;
use std::collections::HashMap;
use tracing::debug;

/// Builder that validates entity and navigation definitions, runs
/// many-to-many inference, and freezes an immutable [`Model`].
///
/// Validation is strict where the join compiler and save planner rely on
/// shape: keys must be scalar columns, referential constraints must live on
/// the owning edge, and partner declarations must reciprocate. Inference is
/// the opposite: an ambiguous join-entity shape is silently skipped, never
/// an error.
pub struct ModelBuilder {
    spec: ModelSpec,
}

impl ModelBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            spec: ModelSpec::new(),
        }
    }

    /// Start from a declared (for example deserialized) spec.
    pub fn from_spec(spec: ModelSpec) -> Self {
        Self { spec }
    }

    /// Register an entity type.
    pub fn entity(mut self, entity: EntityDef) -> Self {
        self.spec = self.spec.with_entity(entity);
        self
    }

    /// Register a navigation edge.
    pub fn navigation(mut self, navigation: NavigationDef) -> Self {
        self.spec = self.spec.with_navigation(navigation);
        self
    }

    /// Validate the declarations, run many-to-many inference, and freeze
    /// the model. Edge ids are assigned in declaration order; synthesized
    /// edges follow the declared ones.
    pub fn build(self) -> Result<Model, Error> {
        let ModelSpec {
            entities: declared_entities,
            navigations,
            ..
        } = self.spec;

        let mut entities: HashMap<String, EntityDef> = HashMap::new();
        for entity in declared_entities {
            validate_entity(&entity)?;
            let name = entity.name.clone();
            if entities.insert(name.clone(), entity).is_some() {
                return Err(Error::InvalidModel(format!(
                    "duplicate entity definition: {name}"
                )));
            }
        }
        for entity in entities.values() {
            validate_entity_references(entity, &entities)?;
        }

        let mut edges = navigations;
        for (index, edge) in edges.iter().enumerate() {
            validate_navigation(index, edge, &entities, &edges)?;
        }

        let declared_count = edges.len();
        let inferred = infer::infer_many_to_many(&entities, &edges);
        let mut join_descriptions: HashMap<EdgeId, JoinDescription> = HashMap::new();
        for edge in inferred {
            let id = EdgeId::new(edges.len() as u32);
            join_descriptions.insert(
                id,
                JoinDescription {
                    join_entity: edge.join_entity,
                    join_edge: edge.join_edge,
                    target_edge: edge.target_edge,
                },
            );
            edges.push(edge.navigation);
        }

        debug!(
            entities = entities.len(),
            navigations = declared_count,
            synthesized = edges.len() - declared_count,
            "model frozen"
        );
        Ok(Model::from_parts(entities, edges, join_descriptions))
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_entity(entity: &EntityDef) -> Result<(), Error> {
    if entity.key.is_empty() {
        return Err(Error::InvalidModel(format!(
            "entity {} declares no key",
            entity.name
        )));
    }
    for key_field in &entity.key {
        match entity.get_field(key_field) {
            Some(field) if field.field_type.scalar_type().is_some() => {}
            Some(_) => {
                return Err(Error::InvalidModel(format!(
                    "key field {}.{} is not a scalar column",
                    entity.name, key_field
                )))
            }
            None => {
                return Err(Error::InvalidModel(format!(
                    "key field {}.{} is not declared",
                    entity.name, key_field
                )))
            }
        }
    }
    for (index, field) in entity.fields.iter().enumerate() {
        if entity.fields[..index].iter().any(|f| f.name == field.name) {
            return Err(Error::InvalidModel(format!(
                "duplicate field {}.{}",
                entity.name, field.name
            )));
        }
    }
    Ok(())
}

fn validate_entity_references(
    entity: &EntityDef,
    entities: &HashMap<String, EntityDef>,
) -> Result<(), Error> {
    for field in &entity.fields {
        if let Some(referenced) = field.field_type.referenced_entity() {
            if !entities.contains_key(referenced) {
                return Err(Error::InvalidModel(format!(
                    "field {}.{} references unregistered entity {referenced}",
                    entity.name, field.name
                )));
            }
        }
    }
    Ok(())
}

fn validate_navigation(
    index: usize,
    edge: &NavigationDef,
    entities: &HashMap<String, EntityDef>,
    edges: &[NavigationDef],
) -> Result<(), Error> {
    let label = format!("{}.{}", edge.source, edge.name);

    if !entities.contains_key(&edge.source) {
        return Err(Error::TypeNotRegistered(edge.source.clone()));
    }
    if !entities.contains_key(&edge.target) {
        return Err(Error::TypeNotRegistered(edge.target.clone()));
    }
    if edges[..index]
        .iter()
        .any(|other| other.source == edge.source && other.name == edge.name)
    {
        return Err(Error::InvalidModel(format!(
            "duplicate navigation {label}"
        )));
    }
    if edge.contains_target {
        return Err(Error::InvalidModel(format!(
            "navigation {label}: contains_target is reserved for synthesized edges"
        )));
    }

    // Constraint ownership: the dependent side of a pair, or the edge
    // itself when partner-less.
    let owns_constraint = edge.partner.is_none() || !edge.principal;
    if owns_constraint && edge.constraint.is_empty() {
        return Err(Error::InvalidModel(format!(
            "navigation {label} declares no referential constraint"
        )));
    }
    if !owns_constraint && !edge.constraint.is_empty() {
        return Err(Error::InvalidModel(format!(
            "principal navigation {label} must not declare a referential constraint"
        )));
    }

    if let Some(partner_name) = edge.partner.as_deref() {
        let partner = edges
            .iter()
            .find(|other| other.source == edge.target && other.name == partner_name)
            .ok_or_else(|| {
                Error::InvalidModel(format!(
                    "partner {}.{partner_name} of navigation {label} not found",
                    edge.target
                ))
            })?;
        if partner.partner.as_deref() != Some(edge.name.as_str()) || partner.target != edge.source
        {
            return Err(Error::InvalidModel(format!(
                "partner {}.{partner_name} does not reciprocate navigation {label}",
                edge.target
            )));
        }
        if partner.principal == edge.principal {
            return Err(Error::InvalidModel(format!(
                "paired navigations {label} and {}.{partner_name} must have exactly one principal end",
                edge.target
            )));
        }
    }

    if owns_constraint {
        // Column names in a constraint pair resolve against the dependent
        // and principal entities of the edge's orientation.
        let (dependent_entity, principal_entity) = if edge.partner.is_none() && edge.principal {
            (&edge.target, &edge.source)
        } else {
            (&edge.source, &edge.target)
        };
        let dependent = &entities[dependent_entity];
        let principal = &entities[principal_entity];
        for pair in &edge.constraint {
            let dependent_field = dependent.get_field(&pair.dependent).ok_or_else(|| {
                Error::InvalidModel(format!(
                    "navigation {label}: constraint column {}.{} is not declared",
                    dependent_entity, pair.dependent
                ))
            })?;
            let principal_field = principal.get_field(&pair.principal).ok_or_else(|| {
                Error::InvalidModel(format!(
                    "navigation {label}: constraint column {}.{} is not declared",
                    principal_entity, pair.principal
                ))
            })?;
            match (
                dependent_field.field_type.scalar_type(),
                principal_field.field_type.scalar_type(),
            ) {
                (Some(d), Some(p)) if d.joinable_with(&p) => {}
                _ => {
                    return Err(Error::InvalidModel(format!(
                        "navigation {label}: constraint pair {} / {} types differ",
                        pair.dependent, pair.principal
                    )))
                }
            }
        }
    }

    Ok(())
}
