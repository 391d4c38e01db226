//! Monthly aggregation.
//!
//! Both input layouts converge on the same long dataset before this step:
//!
//! | field      | type      |
//! |------------|-----------|
//! | `year`     | `Int64`   |
//! | `month`    | `Int64`   |
//! | `quantity` | `Float64` |
//! | `value`    | `Float64` |
//! | `rows`     | `Int64`   |
//!
//! [`aggregate`] groups it by (year, month), sums quantity, value and rows, and returns the
//! groups sorted by key. The group key makes (year, month) unique in the output.
//!
//! Sums are accumulated in input order, so permuting the input can change the last bits of a
//! float total. Everything else is independent of row order.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{IngestionError, IngestionResult, PipelineStage};
use crate::types::{DataSet, DataType, Field, MonthlyRecord, Schema, Value};

use super::columns::{MONTH, YEAR};
use super::numeric::to_float;

pub const QUANTITY: &str = "quantity";
pub const VALUE: &str = "value";
pub const ROWS: &str = "rows";

/// Schema of the long layout.
pub fn long_schema() -> Schema {
    Schema::new(vec![
        Field::new(YEAR, DataType::Int64),
        Field::new(MONTH, DataType::Int64),
        Field::new(QUANTITY, DataType::Float64),
        Field::new(VALUE, DataType::Float64),
        Field::new(ROWS, DataType::Int64),
    ])
}

/// Column positions of a transaction dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionColumns {
    pub year: usize,
    pub month: usize,
    pub quantity: usize,
    /// Rows get value 0.0 when absent.
    pub value: Option<usize>,
}

/// Convert transaction rows (one per landing) into the long layout.
///
/// Every numeric cell goes through [`to_float`]; the first failure aborts with
/// [`IngestionError::NumericParse`]. Rows without a usable year or month are skipped.
pub fn transactions_to_long(
    dataset: &DataSet,
    cols: TransactionColumns,
    path: &Path,
) -> IngestionResult<DataSet> {
    let parse = |row_idx0: usize, col: usize, cell: &Value| -> IngestionResult<f64> {
        to_float(cell).map_err(|e| IngestionError::NumericParse {
            path: path.to_path_buf(),
            stage: PipelineStage::Aggregate,
            row: row_idx0 + 1,
            column: dataset.schema.fields[col].name.clone(),
            raw: e.raw,
        })
    };

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(dataset.row_count());
    for (idx0, row) in dataset.rows.iter().enumerate() {
        let (Some(year), Some(month)) = (
            row.get(cols.year).and_then(Value::as_i64),
            row.get(cols.month).and_then(Value::as_i64),
        ) else {
            tracing::debug!(row = idx0 + 1, "row without year/month skipped");
            continue;
        };

        let quantity = parse(idx0, cols.quantity, row.get(cols.quantity).unwrap_or(&Value::Null))?;
        let value = match cols.value {
            Some(v) => parse(idx0, v, row.get(v).unwrap_or(&Value::Null))?,
            None => 0.0,
        };

        rows.push(vec![
            Value::Int64(year),
            Value::Int64(month),
            Value::Float64(quantity),
            Value::Float64(value),
            Value::Int64(1),
        ]);
    }

    Ok(DataSet::new(long_schema(), rows))
}

/// Group a long dataset by (year, month) and sum quantity, value and rows.
///
/// Columns are located by name; rows whose year or month is not an integer in range are
/// ignored. Output is sorted ascending by (year, month).
pub fn aggregate(long: &DataSet) -> Vec<MonthlyRecord> {
    let idx = |name: &str| long.schema.index_of(name);
    let (Some(y), Some(m), Some(q), Some(v), r) =
        (idx(YEAR), idx(MONTH), idx(QUANTITY), idx(VALUE), idx(ROWS))
    else {
        tracing::warn!("long dataset is missing year/month/quantity/value");
        return Vec::new();
    };

    let groups = long.reduce_rows(
        BTreeMap::<(i32, u32), MonthlyRecord>::new(),
        |mut acc, row| {
            let year = row[y].as_i64().and_then(|v| i32::try_from(v).ok());
            let month = row[m]
                .as_i64()
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| (1..=12).contains(v));
            let (Some(year), Some(month)) = (year, month) else {
                return acc;
            };

            let entry = acc.entry((year, month)).or_insert_with(|| MonthlyRecord {
                year,
                month,
                quantity_tonnes: 0.0,
                value_currency: 0.0,
                row_count: 0,
            });
            entry.quantity_tonnes += as_f64(&row[q]);
            entry.value_currency += as_f64(&row[v]);
            entry.row_count += r
                .and_then(|r| row[r].as_i64())
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(1);
            acc
        },
    );

    groups.into_values().collect()
}

/// Re-aggregate already produced records at (year, month) granularity.
///
/// Row counts add up, so aggregating an aggregate returns it unchanged.
pub fn aggregate_records(records: &[MonthlyRecord]) -> Vec<MonthlyRecord> {
    aggregate(&records_to_long(records))
}

/// Long-layout view of monthly records.
pub fn records_to_long(records: &[MonthlyRecord]) -> DataSet {
    let rows = records
        .iter()
        .map(|r| {
            vec![
                Value::Int64(i64::from(r.year)),
                Value::Int64(i64::from(r.month)),
                Value::Float64(r.quantity_tonnes),
                Value::Float64(r.value_currency),
                Value::Int64(i64::try_from(r.row_count).unwrap_or(i64::MAX)),
            ]
        })
        .collect();
    DataSet::new(long_schema(), rows)
}

fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Float64(x) => *x,
        Value::Int64(x) => *x as f64,
        _ => 0.0,
    }
}
