//! Join key selector derivation.
//!
//! For an edge being joined, the outer selector reads the constraint's
//! columns on the source side of the edge and the inner selector reads the
//! paired columns on the target side. Which edge owns those columns is
//! decided by the model (see `Model::source_join_properties`). Once both
//! selectors exist their types are unified leaf by leaf, lifting
//! nullability so a grouped join always compares like against like.

use super::limits::CompilerLimits;
use crate::error::Error;
use crate::model::{EdgeId, EntityDef, Model};
use navmap_ir::{KeyPart, KeySelector};

/// Derive the outer and inner key selectors for a join along `edge`.
///
/// `outer_entity` is the element type of the outer stage being keyed, which
/// may wrap the edge's source type; `inner_entity` is the element type of
/// the inner scan.
pub(crate) fn derive_key_selectors(
    model: &Model,
    edge_id: EdgeId,
    outer_stage: usize,
    outer_entity: &str,
    inner_entity: &str,
    limits: &CompilerLimits,
) -> Result<(KeySelector, KeySelector), Error> {
    let edge = model.edge(edge_id)?;
    if edge.contains_target {
        return Err(Error::InvalidModel(format!(
            "navigation {}.{} joins through its join description, not directly",
            edge.source, edge.name
        )));
    }

    let source_columns = model.source_join_properties(edge_id)?;
    let target_columns = model.target_join_properties(edge_id)?;

    let mut outer_part = build_key_part(model, model.entity(outer_entity)?, &source_columns, limits)?;
    let mut inner_part = build_key_part(model, model.entity(inner_entity)?, &target_columns, limits)?;

    outer_part
        .unify_with(&mut inner_part)
        .map_err(|err| match err {
            navmap_ir::Error::KeyShape { outer, inner } => Error::KeyShapeMismatch {
                edge: format!("{}.{}", edge.source, edge.name),
                outer,
                inner,
            },
            other => Error::Ir(other),
        })?;

    Ok((
        KeySelector {
            stage: outer_stage,
            part: outer_part,
        },
        KeySelector {
            stage: 0,
            part: inner_part,
        },
    ))
}

/// Build the key component tree for `columns` against `entity`.
///
/// Columns that do not exist on the entity are skipped. When none of them
/// exist the entity is treated as a wrapper: resolution descends into its
/// first reference-shaped field and prefixes the resulting column names, so
/// the runtime can address them as dotted columns.
fn build_key_part(
    model: &Model,
    entity: &EntityDef,
    columns: &[String],
    limits: &CompilerLimits,
) -> Result<KeyPart, Error> {
    build_key_part_at(model, entity, columns, "", 1, limits)
}

fn build_key_part_at(
    model: &Model,
    entity: &EntityDef,
    columns: &[String],
    prefix: &str,
    depth: usize,
    limits: &CompilerLimits,
) -> Result<KeyPart, Error> {
    limits.check_key_depth(depth)?;

    let mut parts = Vec::new();
    for column in columns {
        if let Some(key_type) = entity.get_field(column).and_then(|field| field.key_type()) {
            parts.push(KeyPart::field(format!("{prefix}{column}"), key_type));
        }
    }

    if parts.is_empty() {
        let Some((wrapper_name, wrapped)) = entity.reference_fields().find_map(|field| {
            field
                .field_type
                .referenced_entity()
                .map(|target| (field.name.as_str(), target))
        }) else {
            return Err(Error::PropertyNotFound {
                entity: entity.name.clone(),
                property: columns.first().cloned().unwrap_or_default(),
            });
        };
        let inner = model.entity(wrapped)?;
        let nested_prefix = format!("{prefix}{wrapper_name}.");
        return build_key_part_at(model, inner, columns, &nested_prefix, depth + 1, limits);
    }

    if parts.len() == 1 {
        return Ok(parts.remove(0));
    }
    Ok(KeyPart::composite(parts))
}
