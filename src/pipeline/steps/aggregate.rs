use crate::constants::NAME_COLUMN;
use crate::error::{PipelineError, Result};
use crate::types::Table;

/// Returns the `name` of the row with the largest numeric value in `column`.
///
/// Rows are stably sorted by `f64::total_cmp` and the last one is taken, so
/// among tied rows the one appearing last wins.
pub fn max_by_column(table: &Table, column: &str) -> Result<String> {
    if table.is_empty() {
        return Err(PipelineError::EmptyTable {
            column: column.to_string(),
        });
    }

    let mut keyed = Vec::with_capacity(table.len());
    for (row, record) in table.records().iter().enumerate() {
        let value = record
            .get(column)
            .ok_or_else(|| PipelineError::Conversion {
                column: column.to_string(),
                row,
                value: "<column not present>".to_string(),
            })?
            .numeric(column, row)?;
        if value.is_nan() {
            return Err(PipelineError::Conversion {
                column: column.to_string(),
                row,
                value: value.to_string(),
            });
        }
        keyed.push((value, row, record));
    }

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (_, row, winner) = keyed.last().ok_or_else(|| PipelineError::EmptyTable {
        column: column.to_string(),
    })?;

    winner
        .get(NAME_COLUMN)
        .map(|v| v.as_text())
        .ok_or_else(|| PipelineError::Conversion {
            column: NAME_COLUMN.to_string(),
            row: *row,
            value: "<column not present>".to_string(),
        })
}
