use crate::error::{PipelineError, Result};
use crate::storage::WarehouseSink;
use crate::types::{Table, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Which columns to rescale, and the column holding each row's divisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationSpec {
    pub columns: Vec<String>,
    pub divisor_column: String,
}

impl NormalizationSpec {
    pub fn new(columns: Vec<String>, divisor_column: impl Into<String>) -> Self {
        Self {
            columns,
            divisor_column: divisor_column.into(),
        }
    }
}

/// Rescales `spec.columns` of every row by `1 / row[spec.divisor_column]`.
///
/// Works on a deep copy; `table` is left untouched. Columns not named in
/// `spec.columns` keep their original values. An empty table is an error so
/// that it never replaces a populated warehouse table.
pub fn normalize(table: &Table, spec: &NormalizationSpec) -> Result<Table> {
    if table.is_empty() {
        return Err(PipelineError::EmptyTable {
            column: spec.divisor_column.clone(),
        });
    }
    for column in spec.columns.iter().chain(std::iter::once(&spec.divisor_column)) {
        if !table.has_column(column) {
            return Err(PipelineError::Conversion {
                column: column.clone(),
                row: 0,
                value: "<column not present>".to_string(),
            });
        }
    }

    let mut normalized = table.clone();
    for (row, record) in normalized.records_mut().iter_mut().enumerate() {
        let quantity = record
            .get(&spec.divisor_column)
            .map(|v| v.numeric(&spec.divisor_column, row))
            .transpose()?
            .unwrap_or_default();
        if quantity == 0.0 {
            return Err(PipelineError::DivideByZero {
                column: spec.divisor_column.clone(),
                row,
            });
        }
        let reweight = 1.0 / quantity;

        for column in &spec.columns {
            let original = match record.get(column) {
                Some(value) => value.numeric(column, row)?,
                None => continue,
            };
            record.set(column.as_str(), Value::Number(original * reweight));
        }
    }

    debug!("Normalized {} rows by '{}'", normalized.len(), spec.divisor_column);
    Ok(normalized)
}

/// Normalizes `table` and replaces `table_name` in the warehouse with the result.
/// Nothing is written unless every row normalizes.
pub async fn normalize_into(
    table: &Table,
    spec: &NormalizationSpec,
    warehouse: &dyn WarehouseSink,
    table_name: &str,
) -> Result<usize> {
    let normalized = normalize(table, spec)?;
    warehouse.replace_table(table_name, &normalized).await?;
    info!("Wrote {} normalized rows to '{}'", normalized.len(), table_name);
    Ok(normalized.len())
}
