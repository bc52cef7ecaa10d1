//! Join expression IR.
//!
//! The compiler emits a small relational algebra: a source scan, a grouped
//! join, and a flatten that expands groups with outer-join semantics. The
//! tree is backend-neutral; consumers lower it to SQL, to a dataflow, or to
//! the in-memory evaluator shipped with `navmap-core`.

use crate::error::Error;
use crate::value::KeyType;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// A field access resolved against a join context: stage index plus column
/// name. Reference-shaped fields surface as dot-separated column names, so
/// one flat `(stage, field)` pair addresses nested data as well.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct FieldRef {
    /// Stage in the join context (0 = query root).
    pub stage: usize,
    /// Column name within the stage row.
    pub field: String,
}

impl FieldRef {
    /// Create a field reference.
    pub fn new(stage: usize, field: impl Into<String>) -> Self {
        Self {
            stage,
            field: field.into(),
        }
    }
}

/// One component of a join key.
///
/// Keys are trees, not lists: a composite key can itself contain composite
/// components, and nullability coercion has to reach every leaf. Recursive,
/// so serde-only (rkyv is reserved for the flat types in this crate).
#[derive(Debug, Clone, PartialEq, SerdeSerialize, SerdeDeserialize)]
pub enum KeyPart {
    /// A single column. The name may be dot-separated when the key column
    /// lives behind a reference-shaped field.
    Field {
        /// Column name within the keyed stage.
        field: String,
        /// Component type.
        ty: KeyType,
    },
    /// A fixed-arity composite of nested components.
    Composite {
        /// Ordered components.
        parts: Vec<KeyPart>,
    },
}

impl KeyPart {
    /// A single-column component.
    pub fn field(field: impl Into<String>, ty: KeyType) -> Self {
        KeyPart::Field {
            field: field.into(),
            ty,
        }
    }

    /// A composite component.
    pub fn composite(parts: Vec<KeyPart>) -> Self {
        KeyPart::Composite { parts }
    }

    /// Number of leaf columns under this component.
    pub fn leaf_count(&self) -> usize {
        match self {
            KeyPart::Field { .. } => 1,
            KeyPart::Composite { parts } => parts.iter().map(KeyPart::leaf_count).sum(),
        }
    }

    /// Nesting depth (a bare field is depth 1).
    pub fn depth(&self) -> usize {
        match self {
            KeyPart::Field { .. } => 1,
            KeyPart::Composite { parts } => {
                1 + parts.iter().map(KeyPart::depth).max().unwrap_or(0)
            }
        }
    }

    /// Whether any leaf component is nullable.
    pub fn has_nullable_leaf(&self) -> bool {
        match self {
            KeyPart::Field { ty, .. } => ty.nullable,
            KeyPart::Composite { parts } => parts.iter().any(KeyPart::has_nullable_leaf),
        }
    }

    /// Render the type shape, e.g. `int64` or `(int64, string?)`.
    pub fn describe(&self) -> String {
        match self {
            KeyPart::Field { ty, .. } => {
                let base = format!("{:?}", ty.scalar).to_lowercase();
                if ty.nullable {
                    format!("{base}?")
                } else {
                    base
                }
            }
            KeyPart::Composite { parts } => {
                let inner: Vec<String> = parts.iter().map(KeyPart::describe).collect();
                format!("({})", inner.join(", "))
            }
        }
    }

    /// Unify the types of two key components in place.
    ///
    /// Both components keep their own field names; only leaf types change.
    /// Where exactly one side of a leaf is nullable, both are lifted to
    /// nullable so the join compares like against like. Differing scalar
    /// kinds or differing tree shapes are unrecoverable.
    pub fn unify_with(&mut self, other: &mut KeyPart) -> Result<(), Error> {
        match (&mut *self, &mut *other) {
            (KeyPart::Field { ty: a, .. }, KeyPart::Field { ty: b, .. }) => {
                match a.unify(*b) {
                    Some(unified) => {
                        *a = unified;
                        *b = unified;
                        Ok(())
                    }
                    None => Err(Error::KeyShape {
                        outer: self.describe(),
                        inner: other.describe(),
                    }),
                }
            }
            (KeyPart::Composite { parts: a }, KeyPart::Composite { parts: b })
                if a.len() == b.len() =>
            {
                for (x, y) in a.iter_mut().zip(b.iter_mut()) {
                    x.unify_with(y)?;
                }
                Ok(())
            }
            _ => Err(Error::KeyShape {
                outer: self.describe(),
                inner: other.describe(),
            }),
        }
    }
}

/// A join-key selector: which stage of the keyed expression to read, and
/// the key component tree to extract from it.
#[derive(Debug, Clone, PartialEq, SerdeSerialize, SerdeDeserialize)]
pub struct KeySelector {
    /// Stage of the keyed expression the key columns are read from.
    pub stage: usize,
    /// Key component tree.
    pub part: KeyPart,
}

impl KeySelector {
    /// A single-column selector.
    pub fn scalar(stage: usize, field: impl Into<String>, ty: KeyType) -> Self {
        Self {
            stage,
            part: KeyPart::field(field, ty),
        }
    }

    /// A composite selector preserving component order.
    pub fn composite(stage: usize, parts: Vec<KeyPart>) -> Self {
        Self {
            stage,
            part: KeyPart::composite(parts),
        }
    }
}

/// A backend-neutral join expression.
///
/// Recursive, so serde-only; see the note on [`KeyPart`].
#[derive(Debug, Clone, PartialEq, SerdeSerialize, SerdeDeserialize)]
pub enum JoinExpr {
    /// Scan of one entity set. Produces one-stage contexts.
    Source {
        /// Entity type name.
        entity: String,
    },
    /// Grouped equality join: every outer context is paired with the group
    /// of inner rows whose key matches. Produces the outer stages plus one
    /// pending group stage.
    GroupJoin {
        /// Outer (left) input.
        outer: Box<JoinExpr>,
        /// Inner (right) input.
        inner: Box<JoinExpr>,
        /// Key selector over the outer context.
        outer_key: KeySelector,
        /// Key selector over the inner context.
        inner_key: KeySelector,
    },
    /// Expand a grouped join into flat contexts with outer-join semantics:
    /// an empty group still yields one context, with an absent inner stage.
    Flatten {
        /// The grouped join to expand.
        input: Box<JoinExpr>,
        /// Drop the last outer stage from the result. Used when a hidden
        /// join-entity hop must not surface in the final context.
        elide_outer_stage: bool,
    },
}

impl JoinExpr {
    /// Scan of one entity set.
    pub fn source(entity: impl Into<String>) -> Self {
        JoinExpr::Source {
            entity: entity.into(),
        }
    }

    /// Entity name at the root of the expression (stage 0 of its contexts).
    pub fn root_entity(&self) -> &str {
        match self {
            JoinExpr::Source { entity } => entity,
            JoinExpr::GroupJoin { outer, .. } => outer.root_entity(),
            JoinExpr::Flatten { input, .. } => input.root_entity(),
        }
    }

    /// Number of stages in the contexts this expression produces.
    pub fn stage_count(&self) -> usize {
        match self {
            JoinExpr::Source { .. } => 1,
            JoinExpr::GroupJoin { outer, .. } => outer.stage_count() + 1,
            JoinExpr::Flatten {
                input,
                elide_outer_stage,
            } => input.stage_count() - usize::from(*elide_outer_stage),
        }
    }

    /// Structural validation: flattens wrap grouped joins, key selector
    /// stages are in range, and both selectors of a join agree in shape.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            JoinExpr::Source { .. } => Ok(()),
            JoinExpr::GroupJoin {
                outer,
                inner,
                outer_key,
                inner_key,
            } => {
                outer.validate()?;
                inner.validate()?;
                if outer_key.part.leaf_count() == 0 || inner_key.part.leaf_count() == 0 {
                    return Err(Error::EmptyKey);
                }
                if outer_key.stage >= outer.stage_count() {
                    return Err(Error::StageOutOfRange {
                        index: outer_key.stage,
                        len: outer.stage_count(),
                    });
                }
                if inner_key.stage >= inner.stage_count() {
                    return Err(Error::StageOutOfRange {
                        index: inner_key.stage,
                        len: inner.stage_count(),
                    });
                }
                let mut outer_part = outer_key.part.clone();
                let mut inner_part = inner_key.part.clone();
                outer_part.unify_with(&mut inner_part)?;
                Ok(())
            }
            JoinExpr::Flatten { input, .. } => {
                if !matches!(**input, JoinExpr::GroupJoin { .. }) {
                    return Err(Error::InvalidExpr(
                        "flatten input must be a grouped join".into(),
                    ));
                }
                input.validate()
            }
        }
    }
}
