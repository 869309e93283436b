use crate::error::WarehouseError;
use crate::types::Table;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Durable destination for normalized tables.
#[async_trait]
pub trait WarehouseSink: Send + Sync {
    /// Drops whatever `table_name` held and stores `records` in its place.
    async fn replace_table(&self, table_name: &str, records: &Table) -> Result<(), WarehouseError>;

    /// Reads back the rows last written to `table_name`.
    async fn read_table(&self, table_name: &str) -> Result<Table, WarehouseError>;
}

/// Accepts plain SQL identifiers only, since table names are spliced into DDL.
pub fn validate_table_name(name: &str) -> Result<(), WarehouseError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(WarehouseError::InvalidTableName(name.to_string()))
    }
}

/// In-memory warehouse for development/testing
#[derive(Default)]
pub struct InMemoryWarehouse {
    tables: Arc<Mutex<HashMap<String, Table>>>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_names(&self) -> Vec<String> {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl WarehouseSink for InMemoryWarehouse {
    async fn replace_table(&self, table_name: &str, records: &Table) -> Result<(), WarehouseError> {
        validate_table_name(table_name)?;
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.insert(table_name.to_string(), records.clone());
        debug!("Replaced in-memory table {} with {} rows", table_name, records.len());
        Ok(())
    }

    async fn read_table(&self, table_name: &str) -> Result<Table, WarehouseError> {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables
            .get(table_name)
            .cloned()
            .ok_or_else(|| WarehouseError::NoSuchTable(table_name.to_string()))
    }
}
