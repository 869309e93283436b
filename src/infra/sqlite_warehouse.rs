use crate::constants::{CEREAL_COLUMNS, TEXT_COLUMNS};
use crate::error::WarehouseError;
use crate::storage::{validate_table_name, WarehouseSink};
use crate::types::{Record, Table, Value};
use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Real,
}

impl ColumnType {
    fn sql(self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Real => "real",
        }
    }
}

/// Ordered column layout of a warehouse table.
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseSchema {
    columns: Vec<(String, ColumnType)>,
}

impl WarehouseSchema {
    pub fn new(columns: Vec<(String, ColumnType)>) -> Self {
        Self { columns }
    }

    /// name, mfr and type as text; every other cereal column as real.
    pub fn cereals() -> Self {
        Self::new(
            CEREAL_COLUMNS
                .iter()
                .map(|c| {
                    let ty = if TEXT_COLUMNS.contains(c) {
                        ColumnType::Text
                    } else {
                        ColumnType::Real
                    };
                    (c.to_string(), ty)
                })
                .collect(),
        )
    }

    pub fn columns(&self) -> &[(String, ColumnType)] {
        &self.columns
    }

    fn ddl(&self, table_name: &str) -> String {
        let cols: Vec<String> = self
            .columns
            .iter()
            .map(|(name, ty)| format!("\"{}\" {}", name, ty.sql()))
            .collect();
        format!("CREATE TABLE {} ({})", table_name, cols.join(", "))
    }

    fn insert_sql(&self, table_name: &str) -> String {
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{}", i)).collect();
        format!("INSERT INTO {} VALUES ({})", table_name, placeholders.join(", "))
    }

    /// Binds a record's values in schema order, regardless of the record's own order.
    fn bind(&self, record: &Record, row: usize) -> Result<Vec<SqlValue>, WarehouseError> {
        self.columns
            .iter()
            .map(|(name, ty)| {
                let value = record.get(name).ok_or_else(|| WarehouseError::MissingColumn {
                    column: name.clone(),
                    row,
                })?;
                match ty {
                    ColumnType::Text => Ok(SqlValue::Text(value.as_text())),
                    ColumnType::Real => value
                        .numeric(name, row)
                        .map(SqlValue::Real)
                        .map_err(|_| WarehouseError::NotNumeric {
                            column: name.clone(),
                            row,
                            value: value.as_text(),
                        }),
                }
            })
            .collect()
    }
}

/// SQLite-backed warehouse. One connection, guarded so writers never interleave.
pub struct SqliteWarehouse {
    conn: Mutex<Connection>,
    schema: WarehouseSchema,
}

impl SqliteWarehouse {
    /// Opens `conn_str` as a database file, creating parent directories.
    /// `:memory:` opens a private in-memory database.
    pub fn open(conn_str: &str, schema: WarehouseSchema) -> Result<Self, WarehouseError> {
        if conn_str == ":memory:" {
            return Self::open_in_memory(schema);
        }
        let path = Path::new(conn_str);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!("Opened warehouse at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            schema,
        })
    }

    pub fn open_in_memory(schema: WarehouseSchema) -> Result<Self, WarehouseError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            schema,
        })
    }

    pub fn schema(&self) -> &WarehouseSchema {
        &self.schema
    }

    fn table_exists(conn: &Connection, table_name: &str) -> Result<bool, WarehouseError> {
        let mut stmt =
            conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
        let mut rows = stmt.query(params![table_name])?;
        Ok(rows.next()?.is_some())
    }
}

#[async_trait]
impl WarehouseSink for SqliteWarehouse {
    async fn replace_table(&self, table_name: &str, records: &Table) -> Result<(), WarehouseError> {
        validate_table_name(table_name)?;

        // Bind everything up front so a bad row never reaches the DROP.
        let bound: Vec<Vec<SqlValue>> = records
            .records()
            .iter()
            .enumerate()
            .map(|(row, record)| self.schema.bind(record, row))
            .collect::<Result<_, _>>()?;

        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {}; {};",
            table_name,
            self.schema.ddl(table_name)
        ))?;
        {
            let mut stmt = tx.prepare(&self.schema.insert_sql(table_name))?;
            for values in &bound {
                stmt.execute(params_from_iter(values.iter()))?;
            }
        }
        tx.commit()?;

        debug!("Replaced {} with {} rows", table_name, bound.len());
        Ok(())
    }

    async fn read_table(&self, table_name: &str) -> Result<Table, WarehouseError> {
        validate_table_name(table_name)?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        if !Self::table_exists(&conn, table_name)? {
            return Err(WarehouseError::NoSuchTable(table_name.to_string()));
        }

        let mut stmt = conn.prepare(&format!("SELECT * FROM {} ORDER BY rowid", table_name))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (idx, column) in columns.iter().enumerate() {
                let value = match row.get_ref(idx)? {
                    ValueRef::Null => Value::text(""),
                    ValueRef::Integer(i) => Value::Number(i as f64),
                    ValueRef::Real(f) => Value::Number(f),
                    ValueRef::Text(t) | ValueRef::Blob(t) => {
                        Value::text(String::from_utf8_lossy(t).into_owned())
                    }
                };
                record.set(column.as_str(), value);
            }
            records.push(record);
        }

        Table::with_columns(columns, records)
            .map_err(|e| WarehouseError::InconsistentColumns(e.to_string()))
    }
}
