//! Join path helpers.

use crate::error::Error;
use crate::model::{EdgeId, Model};

/// Expand synthesized many-to-many hops in a path into their physical
/// edges.
///
/// Callers that need the real hop sequence (for lowering to storage, or for
/// diagnostics) cannot use a path containing synthesized edges directly;
/// each such hop traverses two edges through the hidden join entity. Paths
/// without synthesized hops are returned unchanged.
pub fn normalize_path(model: &Model, path: &[EdgeId]) -> Result<Vec<EdgeId>, Error> {
    let mut contains_synthesized = false;
    for id in path {
        if model.edge(*id)?.contains_target {
            contains_synthesized = true;
            break;
        }
    }
    if !contains_synthesized {
        return Ok(path.to_vec());
    }

    let mut fixed = Vec::with_capacity(path.len() + 1);
    for id in path {
        let edge = model.edge(*id)?;
        if edge.contains_target {
            let description = model.join_description(*id).ok_or_else(|| {
                Error::InvalidModel(format!(
                    "synthesized navigation {}.{} has no join description",
                    edge.source, edge.name
                ))
            })?;
            fixed.push(description.join_edge);
            fixed.push(description.target_edge);
        } else {
            fixed.push(*id);
        }
    }
    Ok(fixed)
}

/// Render a path as dotted navigation names, for error messages and logs.
pub(crate) fn describe_path(model: &Model, path: &[EdgeId]) -> String {
    let names: Vec<&str> = path
        .iter()
        .map(|id| model.get_edge(*id).map(|edge| edge.name.as_str()).unwrap_or("?"))
        .collect();
    names.join(".")
}
