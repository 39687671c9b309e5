use crate::records::TableRecord;
use serde_json::Error as SerdeJsonError;
use std::fmt;
use std::io;

/// A single table row, fields in the table's canonical column order.
pub type Row = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Schedule,
    MasterDeadlines,
    StudentTasks,
    AttendanceObservations,
    Notes,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Schedule,
        Table::MasterDeadlines,
        Table::StudentTasks,
        Table::AttendanceObservations,
        Table::Notes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Schedule => "schedule",
            Table::MasterDeadlines => "master_deadlines",
            Table::StudentTasks => "student_tasks",
            Table::AttendanceObservations => "attendance_observations",
            Table::Notes => "notes",
        }
    }

    pub fn schema(&self) -> TableSchema {
        match self {
            Table::Schedule => TableSchema {
                columns: &["Student", "Block", "Course", "Teacher"],
                optional: &[],
                allow_extra: true,
            },
            Table::MasterDeadlines => TableSchema {
                columns: &["Task", "Course", "Block", "Teacher", "Due", "Grade"],
                optional: &["Grade"],
                allow_extra: false,
            },
            Table::StudentTasks => TableSchema {
                columns: &[
                    "Student", "Task", "Course", "Block", "Teacher", "Grade", "Due", "Completed",
                    "Hidden",
                ],
                optional: &[],
                allow_extra: false,
            },
            Table::AttendanceObservations => TableSchema {
                columns: &[
                    "Student", "Date", "Course", "Block", "Teacher", "Attendance", "Habit", "Work",
                ],
                optional: &[],
                allow_extra: false,
            },
            Table::Notes => TableSchema {
                columns: &["Student", "Note"],
                optional: &[],
                allow_extra: false,
            },
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed column layout of a table.
///
/// `columns` is the order rows are written in. Columns listed in `optional` may be
/// absent from a stored header and load as empty strings. Tables with
/// `allow_extra` accept auxiliary columns, which are ignored on load.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub columns: &'static [&'static str],
    pub optional: &'static [&'static str],
    pub allow_extra: bool,
}

impl TableSchema {
    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.to_string()).collect()
    }

    /// Maps each canonical column to its position in `found`, or `None` for an
    /// absent optional column. Returns `None` when the header does not fit.
    pub fn projection(&self, found: &[String]) -> Option<Vec<Option<usize>>> {
        if !self.allow_extra
            && found
                .iter()
                .any(|name| !self.columns.contains(&name.trim()))
        {
            return None;
        }
        let mut positions = Vec::with_capacity(self.columns.len());
        for column in self.columns {
            match found.iter().position(|name| name.trim() == *column) {
                Some(idx) => positions.push(Some(idx)),
                None if self.optional.contains(column) => positions.push(None),
                None => return None,
            }
        }
        Some(positions)
    }

    pub fn is_canonical(&self, found: &[String]) -> bool {
        found.len() == self.columns.len()
            && found
                .iter()
                .zip(self.columns.iter())
                .all(|(name, column)| name.trim() == *column)
    }

    pub(crate) fn check_width(&self, table: Table, row: &Row) -> StoreResult<()> {
        if row.len() != self.columns.len() {
            return Err(StoreError::InvalidData(format!(
                "{table} row has {} fields, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum StoreError {
    StorageUnavailable { location: String, source: io::Error },
    SchemaMismatch {
        table: Table,
        expected: Vec<String>,
        found: Vec<String>,
    },
    Csv(csv::Error),
    Serialization(SerdeJsonError),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    InvalidData(String),
}

impl StoreError {
    pub fn unavailable(location: impl fmt::Display, source: io::Error) -> Self {
        Self::StorageUnavailable {
            location: location.to_string(),
            source,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::StorageUnavailable { location, source } => {
                write!(f, "storage unavailable at {location}: {source}")
            }
            StoreError::SchemaMismatch {
                table,
                expected,
                found,
            } => write!(
                f,
                "schema mismatch in {table}: expected columns [{}], found [{}]",
                expected.join(", "),
                found.join(", ")
            ),
            StoreError::Csv(err) => write!(f, "csv error: {err}"),
            StoreError::Serialization(err) => write!(f, "serialization error: {err}"),
            #[cfg(feature = "sqlite")]
            StoreError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::StorageUnavailable { source, .. } => Some(source),
            StoreError::Csv(err) => Some(err),
            StoreError::Serialization(err) => Some(err),
            #[cfg(feature = "sqlite")]
            StoreError::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SerdeJsonError> for StoreError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<csv::Error> for StoreError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable home of every table.
///
/// Implementations never hold business state; all callers assume a single writer
/// per table.
pub trait TableStore {
    fn load(&self, table: Table) -> StoreResult<Vec<Row>>;
    /// Replaces the table. Must be all-or-nothing.
    fn save(&self, table: Table, rows: &[Row]) -> StoreResult<()>;
    fn append(&self, table: Table, rows: &[Row]) -> StoreResult<()>;
}

pub fn load_records<R: TableRecord>(store: &dyn TableStore) -> StoreResult<Vec<R>> {
    store
        .load(R::TABLE)?
        .iter()
        .map(|row| R::from_row(row))
        .collect()
}

pub fn save_records<R: TableRecord>(store: &dyn TableStore, records: &[R]) -> StoreResult<()> {
    let rows: Vec<Row> = records.iter().map(TableRecord::to_row).collect();
    store.save(R::TABLE, &rows)
}

pub fn append_records<R: TableRecord>(store: &dyn TableStore, records: &[R]) -> StoreResult<()> {
    if records.is_empty() {
        return Ok(());
    }
    let rows: Vec<Row> = records.iter().map(TableRecord::to_row).collect();
    store.append(R::TABLE, &rows)
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::CsvTableStore;
pub use memory::MemoryTableStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTableStore;

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn schedule_projection_ignores_auxiliary_columns() {
        let schema = Table::Schedule.schema();
        let found = header(&["Grade Level", "Teacher", "Course", "Block", "Student"]);
        let projection = schema.projection(&found).expect("schedule header fits");
        assert_eq!(projection, vec![Some(4), Some(3), Some(2), Some(1)]);
        assert!(!schema.is_canonical(&found));
    }

    #[test]
    fn deadline_projection_allows_missing_grade_only() {
        let schema = Table::MasterDeadlines.schema();
        let without_grade = header(&["Task", "Course", "Block", "Teacher", "Due"]);
        assert_eq!(
            schema.projection(&without_grade),
            Some(vec![Some(0), Some(1), Some(2), Some(3), Some(4), None])
        );
        let without_due = header(&["Task", "Course", "Block", "Teacher"]);
        assert!(schema.projection(&without_due).is_none());
    }

    #[test]
    fn notes_reject_unknown_columns() {
        let schema = Table::Notes.schema();
        assert!(schema.projection(&header(&["Student", "Note", "Extra"])).is_none());
        assert!(schema.is_canonical(&header(&["Student", "Note"])));
    }
}
