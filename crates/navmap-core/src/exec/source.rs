//! Row sources for the in-memory backend.

use crate::error::Error;
use navmap_ir::Row;
use std::collections::HashMap;

/// Supplies materialized rows per entity type.
///
/// The evaluator pulls whole entity sets through this seam; filtering and
/// ordering stay on the caller's side of it.
pub trait RowSource {
    /// All rows of one entity type, in storage order.
    fn rows(&self, entity: &str) -> Result<Vec<Row>, Error>;
}

/// Hash-map backed row source. An entity with no registered rows scans
/// empty.
#[derive(Debug, Default)]
pub struct MemoryRowSource {
    tables: HashMap<String, Vec<Row>>,
}

impl MemoryRowSource {
    /// An empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the rows of an entity type.
    pub fn with_rows(mut self, entity: impl Into<String>, rows: Vec<Row>) -> Self {
        self.tables.insert(entity.into(), rows);
        self
    }

    /// Append one row to an entity type.
    pub fn push(&mut self, entity: &str, row: Row) {
        self.tables.entry(entity.to_string()).or_default().push(row);
    }
}

impl RowSource for MemoryRowSource {
    fn rows(&self, entity: &str) -> Result<Vec<Row>, Error> {
        Ok(self.tables.get(entity).cloned().unwrap_or_default())
    }
}
