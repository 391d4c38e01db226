//! Year-total comparison of two monthly summaries.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};
use crate::processing::aggregate::{records_to_long, QUANTITY};
use crate::processing::columns::YEAR;
use crate::processing::{filter, reduce, ReduceOp};
use crate::types::{MonthlyRecord, Value};

/// One side of a comparison: a summary reduced to a single year's total quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub label: String,
    pub path: PathBuf,
    pub year: i32,
    pub total_tonnes: f64,
}

/// Difference between two [`YearSummary`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub first: YearSummary,
    pub second: YearSummary,
    /// `first - second`.
    pub difference_tonnes: f64,
    pub abs_difference_tonnes: f64,
    /// Difference as a percentage of the second total; `None` when that total is zero.
    pub pct_of_second: Option<f64>,
    /// Difference as a percentage of the first total; `None` when that total is zero.
    pub pct_of_first: Option<f64>,
}

/// Total quantity for `forced_year`, or for the latest year present.
pub fn summarize_year(
    label: impl Into<String>,
    path: impl Into<PathBuf>,
    records: &[MonthlyRecord],
    forced_year: Option<i32>,
) -> IngestionResult<YearSummary> {
    let path = path.into();
    let long = records_to_long(records);

    let year = match forced_year {
        Some(y) => y,
        None => match reduce(&long, YEAR, ReduceOp::Max) {
            Some(Value::Int64(y)) => i32::try_from(y).map_err(|_| IngestionError::InvalidConfig {
                message: format!("year {y} out of range"),
            })?,
            _ => {
                return Err(IngestionError::SchemaMismatch {
                    message: format!("no years found in {}", path.display()),
                });
            }
        },
    };

    let year_idx = long.schema.index_of(YEAR).unwrap_or(0);
    let one_year = filter(&long, |row| row[year_idx] == Value::Int64(i64::from(year)));
    let total_tonnes = match reduce(&one_year, QUANTITY, ReduceOp::Sum) {
        Some(Value::Float64(v)) => v,
        _ => 0.0,
    };

    Ok(YearSummary {
        label: label.into(),
        path,
        year,
        total_tonnes,
    })
}

/// Compare `first` against `second`.
pub fn compare(first: YearSummary, second: YearSummary) -> Comparison {
    let diff = first.total_tonnes - second.total_tonnes;
    let pct = |base: f64| (base != 0.0).then(|| diff / base * 100.0);
    Comparison {
        difference_tonnes: diff,
        abs_difference_tonnes: diff.abs(),
        pct_of_second: pct(second.total_tonnes),
        pct_of_first: pct(first.total_tonnes),
        first,
        second,
    }
}
