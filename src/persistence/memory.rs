use super::{Row, StoreResult, Table, TableStore};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Process-local store, used by tests and embedders that manage durability
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    tables: Mutex<HashMap<Table, Vec<Row>>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a table, validating row width against its schema.
    pub fn with_rows(self, table: Table, rows: Vec<Row>) -> StoreResult<Self> {
        self.save(table, &rows)?;
        Ok(self)
    }

    pub fn row_count(&self, table: Table) -> usize {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.get(&table).map(Vec::len).unwrap_or(0)
    }
}

impl TableStore for MemoryTableStore {
    fn load(&self, table: Table) -> StoreResult<Vec<Row>> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.get(&table).cloned().unwrap_or_default())
    }

    fn save(&self, table: Table, rows: &[Row]) -> StoreResult<()> {
        let schema = table.schema();
        for row in rows {
            schema.check_width(table, row)?;
        }
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.insert(table, rows.to_vec());
        Ok(())
    }

    fn append(&self, table: Table, rows: &[Row]) -> StoreResult<()> {
        let schema = table.schema();
        for row in rows {
            schema.check_width(table, row)?;
        }
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.entry(table).or_default().extend(rows.iter().cloned());
        Ok(())
    }
}
