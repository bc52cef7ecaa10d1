//! Runtime rows and join contexts.

use crate::expr::FieldRef;
use crate::value::Value;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// One materialized entity row: an ordered list of named values.
///
/// Rows are flat. A reference-shaped field is materialized as dot-separated
/// columns (`"address.city"`), keeping the layout rkyv-friendly while still
/// addressing nested data by path.
#[derive(Debug, Clone, Default, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct Row {
    /// Named field values in column order.
    pub fields: Vec<(String, Value)>,
}

impl Row {
    /// An empty row.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Look up a field by exact column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Replace a field value, appending the column if it is absent.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A flat join context: one row slot per joined stage.
///
/// Stage 0 is the query root; each completed join appends one stage. A slot
/// is `None` when the stage was reached through an outer join that found no
/// match. The original shape here was a nest of tuples threaded through the
/// join chain; an explicit stage list keeps accessors trivial and lets a
/// hidden join-entity stage be removed without retyping anything.
#[derive(Debug, Clone, Default, PartialEq, SerdeSerialize, SerdeDeserialize)]
pub struct JoinContext {
    stages: Vec<Option<Row>>,
}

impl JoinContext {
    /// A one-stage context holding the query root row.
    pub fn from_root(row: Row) -> Self {
        Self {
            stages: vec![Some(row)],
        }
    }

    /// Append a stage. `None` records an unmatched outer join.
    pub fn push_stage(&mut self, row: Option<Row>) {
        self.stages.push(row);
    }

    /// Remove and return a stage, shifting later stages down.
    pub fn remove_stage(&mut self, index: usize) -> Option<Row> {
        if index < self.stages.len() {
            self.stages.remove(index)
        } else {
            None
        }
    }

    /// The row at a stage. `None` for an absent stage or an index past the
    /// end of the context.
    pub fn stage(&self, index: usize) -> Option<&Row> {
        self.stages.get(index).and_then(Option::as_ref)
    }

    /// The value a field reference points at. Null when the stage is absent
    /// or the column does not exist, matching outer-join column semantics.
    pub fn value(&self, field: &FieldRef) -> Value {
        self.stage(field.stage)
            .and_then(|row| row.get(&field.field))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the context has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
