//! Change-set collaborator driven by the save executor.

use crate::error::Error;
use crate::model::EntityDef;
use navmap_ir::{Row, ScalarType, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A store-generated identity assignment from the latest insert flush.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySlot {
    /// Generated column on the principal type.
    pub field: String,
    /// Value the row carried before the flush: a client placeholder, or
    /// null when the column was never set.
    pub placeholder: Value,
    /// Store-assigned value.
    pub value: Value,
}

/// Staged mutations for one entity type.
///
/// The save executor drives implementations through the flush calls in plan
/// order; how rows are staged and where they land is the implementor's
/// business. Flush methods return affected-row counts.
pub trait Table {
    /// Entity type this table stages rows for.
    fn entity(&self) -> &str;

    /// Flush staged inserts.
    fn save_inserted(&mut self) -> Result<usize, Error>;

    /// Flush staged updates.
    fn save_updated(&mut self) -> Result<usize, Error>;

    /// Flush staged deletes.
    fn save_deleted(&mut self) -> Result<usize, Error>;

    /// Identity values assigned by the latest insert flush.
    fn identities(&self) -> Vec<IdentitySlot>;

    /// Rewrite foreign-key values equal to a slot's placeholder with the
    /// slot's assigned value, in staged and flushed rows alike. Slots with a
    /// null placeholder are skipped; a null foreign key references nothing.
    fn update_identities(&mut self, field: &str, slots: &[IdentitySlot]);

    /// Order self-referencing inserts parents-first on this column.
    fn set_self_ref(&mut self, field: &str);
}

/// Caller-owned set of staged tables, one per touched entity type.
#[derive(Default)]
pub struct ChangeSet {
    tables: Vec<Box<dyn Table>>,
    index: HashMap<String, usize>,
}

impl ChangeSet {
    /// An empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table, replacing any table already held for its type.
    pub fn add_table(&mut self, table: Box<dyn Table>) {
        let entity = table.entity().to_string();
        match self.index.get(&entity) {
            Some(&position) => self.tables[position] = table,
            None => {
                self.index.insert(entity, self.tables.len());
                self.tables.push(table);
            }
        }
    }

    /// Touched entity types in registration order.
    pub fn entities(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|table| table.entity().to_string())
            .collect()
    }

    /// The table for an entity type.
    pub fn table(&self, entity: &str) -> Result<&dyn Table, Error> {
        self.index
            .get(entity)
            .map(|&position| self.tables[position].as_ref())
            .ok_or_else(|| Error::TableNotFound(entity.to_string()))
    }

    /// The table for an entity type, mutably.
    pub fn table_mut(&mut self, entity: &str) -> Result<&mut dyn Table, Error> {
        match self.index.get(entity) {
            Some(&position) => Ok(self.tables[position].as_mut()),
            None => Err(Error::TableNotFound(entity.to_string())),
        }
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no tables are registered.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[derive(Debug, Default)]
struct TableState {
    pending_inserts: Vec<Row>,
    pending_updates: Vec<Row>,
    pending_deletes: Vec<Row>,
    rows: Vec<Row>,
    identities: Vec<IdentitySlot>,
    self_ref: Option<String>,
    next_sequence: i64,
}

/// In-memory [`Table`] implementation.
///
/// Stages rows, assigns sequence values to generated columns on insert
/// flush, and rewrites placeholder foreign keys on identity propagation.
/// Clones share state, so a handle kept outside a [`ChangeSet`] observes
/// everything the executor does to the boxed copy.
#[derive(Clone)]
pub struct MemoryTable {
    entity: String,
    key: Vec<String>,
    generated: Vec<(String, Option<ScalarType>)>,
    state: Arc<Mutex<TableState>>,
}

impl MemoryTable {
    /// Create an empty table for an entity type.
    pub fn new(entity: &EntityDef) -> Self {
        let generated = entity
            .generated_fields()
            .map(|field| (field.name.clone(), field.field_type.scalar_type()))
            .collect();
        Self {
            entity: entity.name.clone(),
            key: entity.key.clone(),
            generated,
            state: Arc::new(Mutex::new(TableState {
                next_sequence: 1,
                ..TableState::default()
            })),
        }
    }

    /// Stage a row for insert.
    pub fn insert(&self, row: Row) {
        self.state.lock().unwrap().pending_inserts.push(row);
    }

    /// Stage a row for update, matched to a stored row by key.
    pub fn update(&self, row: Row) {
        self.state.lock().unwrap().pending_updates.push(row);
    }

    /// Stage a row for delete, matched to stored rows by key.
    pub fn delete(&self, row: Row) {
        self.state.lock().unwrap().pending_deletes.push(row);
    }

    /// Snapshot of the flushed rows, in insert order.
    pub fn rows(&self) -> Vec<Row> {
        self.state.lock().unwrap().rows.clone()
    }

    /// Number of flushed rows.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }

    /// Whether no rows have been flushed.
    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().rows.is_empty()
    }

    fn key_matches(&self, stored: &Row, candidate: &Row) -> bool {
        self.key.iter().all(|column| {
            match (stored.get(column), candidate.get(column)) {
                (Some(left), Some(right)) => left == right,
                _ => false,
            }
        })
    }
}

impl Table for MemoryTable {
    fn entity(&self) -> &str {
        &self.entity
    }

    fn save_inserted(&mut self) -> Result<usize, Error> {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        state.identities.clear();
        if state.pending_inserts.is_empty() {
            return Ok(0);
        }

        let pending = std::mem::take(&mut state.pending_inserts);
        let ordered = match (&state.self_ref, self.key.first()) {
            (Some(field), Some(key_column)) => order_self_ref(pending, field, key_column),
            _ => pending,
        };

        let mut count = 0;
        for mut row in ordered {
            for (field, scalar) in &self.generated {
                let placeholder = row.get(field).cloned().unwrap_or(Value::Null);
                let assigned = match scalar {
                    Some(ScalarType::Int32) => Value::Int32(state.next_sequence as i32),
                    _ => Value::Int64(state.next_sequence),
                };
                state.next_sequence += 1;
                row.set(field, assigned.clone());
                state.identities.push(IdentitySlot {
                    field: field.clone(),
                    placeholder,
                    value: assigned,
                });
            }
            state.rows.push(row);
            count += 1;
        }
        debug!(entity = %self.entity, count, "inserts flushed");
        Ok(count)
    }

    fn save_updated(&mut self) -> Result<usize, Error> {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        let mut count = 0;
        for update in std::mem::take(&mut state.pending_updates) {
            let matched = state
                .rows
                .iter_mut()
                .find(|stored| self.key_matches(stored, &update));
            if let Some(stored) = matched {
                for (column, value) in &update.fields {
                    stored.set(column, value.clone());
                }
                count += 1;
            }
        }
        Ok(count)
    }

    fn save_deleted(&mut self) -> Result<usize, Error> {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        let before = state.rows.len();
        let deletes = std::mem::take(&mut state.pending_deletes);
        state
            .rows
            .retain(|stored| !deletes.iter().any(|gone| self.key_matches(stored, gone)));
        Ok(before - state.rows.len())
    }

    fn identities(&self) -> Vec<IdentitySlot> {
        self.state.lock().unwrap().identities.clone()
    }

    fn update_identities(&mut self, field: &str, slots: &[IdentitySlot]) {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        for slot in slots {
            if slot.placeholder.is_null() {
                continue;
            }
            let staged = state
                .pending_inserts
                .iter_mut()
                .chain(state.pending_updates.iter_mut())
                .chain(state.rows.iter_mut());
            for row in staged {
                if row.get(field) == Some(&slot.placeholder) {
                    row.set(field, slot.value.clone());
                }
            }
        }
    }

    fn set_self_ref(&mut self, field: &str) {
        self.state.lock().unwrap().self_ref = Some(field.to_string());
    }
}

/// Order a batch of inserts so rows referencing another row of the same
/// batch come after it. A reference loop inside the batch cannot be ordered;
/// the tail is appended unordered rather than spinning.
fn order_self_ref(pending: Vec<Row>, field: &str, key_column: &str) -> Vec<Row> {
    let mut remaining = pending;
    let mut ordered = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let mut next = None;
        for (index, row) in remaining.iter().enumerate() {
            let ready = match row.get(field) {
                None | Some(Value::Null) => true,
                Some(parent) => !remaining
                    .iter()
                    .enumerate()
                    .any(|(other, candidate)| {
                        other != index && candidate.get(key_column) == Some(parent)
                    }),
            };
            if ready {
                next = Some(index);
                break;
            }
        }
        match next {
            Some(index) => ordered.push(remaining.remove(index)),
            None => ordered.append(&mut remaining),
        }
    }
    ordered
}
