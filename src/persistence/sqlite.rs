use super::{Row, StoreError, StoreResult, Table, TableStore};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::sync::{Mutex, PoisonError};

/// Embedded-database backend. Each table keeps its rows as JSON arrays in
/// insertion order, plus the header it was written with.
pub struct SqliteTableStore {
    connection: Mutex<Connection>,
}

impl SqliteTableStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> StoreResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> StoreResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> StoreResult<()> {
        let mut ddl = String::from(
            r#"
            CREATE TABLE IF NOT EXISTS table_headers (
                name TEXT PRIMARY KEY,
                header_json TEXT NOT NULL
            );
            "#,
        );
        for table in Table::ALL {
            ddl.push_str(&format!(
                "CREATE TABLE IF NOT EXISTS {} (seq INTEGER PRIMARY KEY AUTOINCREMENT, row_json TEXT NOT NULL);\n",
                table.as_str()
            ));
        }
        connection.execute_batch(&ddl)?;
        Ok(())
    }

    fn check_header(connection: &Connection, table: Table) -> StoreResult<bool> {
        let stored: Option<String> = connection
            .query_row(
                "SELECT header_json FROM table_headers WHERE name = ?1",
                params![table.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(json) = stored else {
            return Ok(false);
        };
        let found: Vec<String> = serde_json::from_str(&json)?;
        let schema = table.schema();
        if !schema.is_canonical(&found) {
            return Err(StoreError::SchemaMismatch {
                table,
                expected: schema.header(),
                found,
            });
        }
        Ok(true)
    }

    fn write_header(tx: &Transaction, table: Table) -> StoreResult<()> {
        let json = serde_json::to_string(&table.schema().header())?;
        tx.execute(
            "INSERT OR REPLACE INTO table_headers (name, header_json) VALUES (?1, ?2)",
            params![table.as_str(), json],
        )?;
        Ok(())
    }

    fn insert_rows(tx: &Transaction, table: Table, rows: &[Row]) -> StoreResult<()> {
        let schema = table.schema();
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} (row_json) VALUES (?1)",
            table.as_str()
        ))?;
        for row in rows {
            schema.check_width(table, row)?;
            let json = serde_json::to_string(row)?;
            stmt.execute(params![json])?;
        }
        Ok(())
    }
}

impl TableStore for SqliteTableStore {
    fn load(&self, table: Table) -> StoreResult<Vec<Row>> {
        let conn = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        if !Self::check_header(&conn, table)? {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT row_json FROM {} ORDER BY seq ASC",
            table.as_str()
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut loaded = Vec::new();
        for json in rows {
            let row: Row = serde_json::from_str(&json?)?;
            table.schema().check_width(table, &row)?;
            loaded.push(row);
        }
        debug!("event=load table={table} rows={} backend=sqlite", loaded.len());
        Ok(loaded)
    }

    fn save(&self, table: Table, rows: &[Row]) -> StoreResult<()> {
        let mut conn = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        tx.execute(&format!("DELETE FROM {}", table.as_str()), [])?;
        Self::write_header(&tx, table)?;
        Self::insert_rows(&tx, table, rows)?;
        tx.commit()?;
        info!("event=save table={table} rows={} backend=sqlite", rows.len());
        Ok(())
    }

    fn append(&self, table: Table, rows: &[Row]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let has_header = Self::check_header(&conn, table)?;
        let tx = conn.transaction()?;
        if !has_header {
            Self::write_header(&tx, table)?;
        }
        Self::insert_rows(&tx, table, rows)?;
        tx.commit()?;
        info!("event=append table={table} rows={} backend=sqlite", rows.len());
        Ok(())
    }
}
