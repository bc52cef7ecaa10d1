//! Save ordering for entity dependency graphs.

use crate::error::Error;
use crate::model::Model;
use tracing::debug;

/// The resolved ordering for one persistence batch.
///
/// `types` is dependents-first: a dependent type always appears before the
/// principal types it references. Insert execution walks it in reverse so
/// principal rows exist before dependent foreign keys flush; deletes walk it
/// forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePlan {
    /// Entity types in dependents-first order.
    pub types: Vec<String>,
    /// Self-referencing types paired with their single foreign-key column.
    pub self_refs: Vec<(String, String)>,
}

impl SavePlan {
    /// Position of a type in the plan.
    pub fn position(&self, entity: &str) -> Option<usize> {
        self.types.iter().position(|name| name == entity)
    }

    /// Number of planned types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the plan covers no types.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Orders the entity types touched by a batch along the model's dependency
/// edges.
pub struct SavePlanner<'a> {
    model: &'a Model,
}

impl<'a> SavePlanner<'a> {
    /// Create a planner over a frozen model.
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    /// Order `types` dependents-first.
    ///
    /// Repeatedly removes the first ready type. A sweep that finds no ready
    /// candidate means the remaining types reference each other in a cycle
    /// and fails instead of spinning. Self-referencing types are planned
    /// exactly once, with their self-edge recorded separately rather than
    /// treated as a blocking dependency.
    pub fn plan(&self, types: &[String]) -> Result<SavePlan, Error> {
        for name in types {
            self.model.entity(name)?;
        }

        let mut remaining: Vec<String> = types.to_vec();
        let mut ordered = Vec::with_capacity(remaining.len());
        let mut self_refs = Vec::new();

        while !remaining.is_empty() {
            let ready = remaining
                .iter()
                .position(|entity| self.is_ready(entity, &remaining));
            let Some(index) = ready else {
                return Err(Error::DependencyCycle(remaining));
            };

            let entity = remaining.remove(index);
            if let Some(field) = self.self_ref_field(&entity)? {
                self_refs.push((entity.clone(), field));
            }
            ordered.push(entity);
        }

        debug!(order = ?ordered, "save order resolved");
        Ok(SavePlan {
            types: ordered,
            self_refs,
        })
    }

    /// A type is ready when every type that must precede it is already
    /// ordered: the targets of its principal-side edges, and the sources of
    /// one-directional dependent edges pointing at it (those edges are
    /// declared on the dependent type, so the principal end only sees them
    /// as incoming). Synthesized many-to-many edges carry no foreign key of
    /// their own and never constrain the order.
    fn is_ready(&self, entity: &str, remaining: &[String]) -> bool {
        let blocked = self.model.edges_from(entity).any(|(_, edge)| {
            edge.principal
                && edge.target != entity
                && remaining.iter().any(|name| *name == edge.target)
        });
        if blocked {
            return false;
        }
        !self.model.edges_to(entity).any(|(_, edge)| {
            edge.partner.is_none()
                && !edge.principal
                && !edge.contains_target
                && edge.source != entity
                && remaining.iter().any(|name| *name == edge.source)
        })
    }

    /// The single self-reference foreign-key column of a type, if any.
    ///
    /// Read from the dependent side of a self-targeting edge. More than one
    /// such edge, or a composite self-reference constraint, is rejected
    /// outright rather than silently keeping the last one.
    fn self_ref_field(&self, entity: &str) -> Result<Option<String>, Error> {
        let mut found: Option<String> = None;
        for (_, edge) in self.model.edges_from(entity) {
            if !edge.is_self_reference() || edge.principal || edge.contains_target {
                continue;
            }
            if found.is_some() {
                return Err(Error::MultipleSelfReferences {
                    entity: entity.to_string(),
                });
            }
            let mut dependents = edge.dependent_properties();
            let first = dependents.next().ok_or_else(|| {
                Error::InvalidModel(format!(
                    "self-referencing navigation {}.{} has no constraint",
                    entity, edge.name
                ))
            })?;
            if dependents.next().is_some() {
                return Err(Error::CompositeSelfReference {
                    entity: entity.to_string(),
                });
            }
            found = Some(first.to_string());
        }
        Ok(found)
    }
}
