//! Reading monthly summaries back from Parquet.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field;

use crate::error::{IngestionError, IngestionResult};
use crate::output::MONTHLY_COLUMNS;
use crate::types::MonthlyRecord;

/// Read a summary written by [`crate::output::write_parquet`].
///
/// Notes:
/// - Validates that all monthly record columns exist as Parquet leaf columns
/// - Integer and float widths are accepted loosely (INT32/INT64, FLOAT/DOUBLE)
pub fn read_monthly_parquet(path: impl AsRef<Path>) -> IngestionResult<Vec<MonthlyRecord>> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;

    let available_columns = parquet_leaf_column_paths(&reader);
    for name in MONTHLY_COLUMNS {
        if !available_columns.contains(name) {
            return Err(IngestionError::SchemaMismatch {
                message: format!("missing required column '{name}' in {}", path.as_ref().display()),
            });
        }
    }

    let mut records: Vec<MonthlyRecord> = Vec::new();
    for (idx0, row_res) in reader.into_iter().enumerate() {
        let row_num = idx0 + 1;
        let row = row_res?;

        let map: HashMap<&str, &Field> = row
            .get_column_iter()
            .map(|(name, field)| (name.as_str(), field))
            .collect();
        let get = |name: &str| -> IngestionResult<&Field> {
            map.get(name).copied().ok_or_else(|| IngestionError::SchemaMismatch {
                message: format!("row {row_num} missing required column '{name}'"),
            })
        };

        records.push(MonthlyRecord {
            year: int_field(row_num, "year", get("year")?)?
                .try_into()
                .map_err(|_| out_of_range(row_num, "year"))?,
            month: int_field(row_num, "month", get("month")?)?
                .try_into()
                .map_err(|_| out_of_range(row_num, "month"))?,
            quantity_tonnes: float_field(row_num, "quantity_tonnes", get("quantity_tonnes")?)?,
            value_currency: float_field(row_num, "value_currency", get("value_currency")?)?,
            row_count: int_field(row_num, "row_count", get("row_count")?)?
                .try_into()
                .map_err(|_| out_of_range(row_num, "row_count"))?,
        });
    }

    Ok(records)
}

fn parquet_leaf_column_paths<R: ChunkReader + 'static>(
    reader: &SerializedFileReader<R>,
) -> HashSet<String> {
    reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.path().string())
        .collect()
}

fn int_field(row: usize, column: &str, f: &Field) -> IngestionResult<i64> {
    match f {
        Field::Int(v) => Ok(i64::from(*v)),
        Field::Long(v) => Ok(*v),
        Field::UInt(v) => Ok(i64::from(*v)),
        _ => Err(IngestionError::SchemaMismatch {
            message: format!("row {row} column '{column}': expected integer, got {f}"),
        }),
    }
}

fn float_field(row: usize, column: &str, f: &Field) -> IngestionResult<f64> {
    match f {
        Field::Double(v) => Ok(*v),
        Field::Float(v) => Ok(f64::from(*v)),
        Field::Null => Ok(0.0),
        _ => Err(IngestionError::SchemaMismatch {
            message: format!("row {row} column '{column}': expected number, got {f}"),
        }),
    }
}

fn out_of_range(row: usize, column: &str) -> IngestionError {
    IngestionError::SchemaMismatch {
        message: format!("row {row} column '{column}': value out of range"),
    }
}
