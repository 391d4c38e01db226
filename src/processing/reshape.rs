//! Wide-to-long reshaping of monthly exports.
//!
//! A wide export has one row per month label and one column per year:
//!
//! ```text
//! landingsmåned | art - hovedgruppe | art - gruppe | 2023 | 2024
//! Januar        | Torsk             | ...          | 10   | 5
//! ```
//!
//! [`melt_wide`] unpivots it into the long layout used by the aggregator, one row per
//! (year, month label) pair.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult, PipelineStage};
use crate::types::{DataSet, Value};

use super::aggregate::long_schema;
use super::numeric::to_float;

/// Closed mapping from localized month names to month numbers.
///
/// Keys are stored lower-case; lookups are case-insensitive and ignore surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthNameTable(BTreeMap<String, u32>);

impl MonthNameTable {
    /// Build a table from (name, month) pairs. Names are lower-cased.
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(name, month)| (name.trim().to_lowercase(), month))
                .collect(),
        )
    }

    /// Norwegian month names.
    pub fn norwegian() -> Self {
        Self::new([
            ("januar", 1),
            ("februar", 2),
            ("mars", 3),
            ("april", 4),
            ("mai", 5),
            ("juni", 6),
            ("juli", 7),
            ("august", 8),
            ("september", 9),
            ("oktober", 10),
            ("november", 11),
            ("desember", 12),
        ])
    }

    /// Month number for `label`, or `None` if the label is not in the table.
    pub fn lookup(&self, label: &str) -> Option<u32> {
        self.0.get(&label.trim().to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for MonthNameTable {
    fn default() -> Self {
        Self::norwegian()
    }
}

/// Text fragments that betray a header/legend row leaking into the data area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeakMarkers {
    /// Dropped when found (case-insensitive) in the month label, e.g. "Måned".
    pub month_label: String,
    /// Dropped when found (case-insensitive) in a quantity cell, e.g. "Rundvekt (tonn)".
    pub quantity: String,
}

impl Default for LeakMarkers {
    fn default() -> Self {
        Self {
            month_label: "måned".to_string(),
            quantity: "rundvekt".to_string(),
        }
    }
}

/// Result of [`melt_wide`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReshapeOutcome {
    /// Long dataset with the [`long_schema`] fields.
    pub dataset: DataSet,
    /// Melted cells dropped by the leak markers.
    pub dropped_legend: usize,
    /// Melted cells dropped because the month label is not in the table.
    pub dropped_unknown_month: usize,
}

/// Unpivot year columns into long rows.
///
/// Each year column yields one row per source row with `year` from the column name and
/// `quantity` from the cell (via [`to_float`]). `value` is always 0.0 and `rows` is 1.
/// Rows are emitted year column by year column, in source row order within a column.
///
/// Legend rows and unknown month labels are dropped before the quantity is parsed; an
/// unparseable quantity on a kept row fails with [`IngestionError::NumericParse`].
pub fn melt_wide(
    dataset: &DataSet,
    month_idx: usize,
    year_idxs: &[usize],
    months: &MonthNameTable,
    markers: &LeakMarkers,
    path: &Path,
) -> IngestionResult<ReshapeOutcome> {
    let month_marker = markers.month_label.to_lowercase();
    let quantity_marker = markers.quantity.to_lowercase();

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(dataset.row_count() * year_idxs.len());
    let mut dropped_legend = 0usize;
    let mut dropped_unknown_month = 0usize;

    for &col_idx in year_idxs {
        let column = &dataset.schema.fields[col_idx].name;
        let year: i64 = match column.parse() {
            Ok(y) => y,
            Err(_) => {
                tracing::warn!(column = %column, "year column name out of range, skipping");
                continue;
            }
        };

        for (idx0, row) in dataset.rows.iter().enumerate() {
            let label = row.get(month_idx).and_then(Value::to_text).unwrap_or_default();
            let label = label.trim();
            let cell = row.get(col_idx).unwrap_or(&Value::Null);

            if contains_marker(label, &month_marker)
                || cell.to_text().is_some_and(|s| contains_marker(&s, &quantity_marker))
            {
                dropped_legend += 1;
                continue;
            }

            let Some(month) = months.lookup(label) else {
                dropped_unknown_month += 1;
                continue;
            };

            let quantity = to_float(cell).map_err(|e| IngestionError::NumericParse {
                path: path.to_path_buf(),
                stage: PipelineStage::Reshape,
                row: idx0 + 1,
                column: column.clone(),
                raw: e.raw,
            })?;

            rows.push(vec![
                Value::Int64(year),
                Value::Int64(i64::from(month)),
                Value::Float64(quantity),
                Value::Float64(0.0),
                Value::Int64(1),
            ]);
        }
    }

    tracing::debug!(
        rows = rows.len(),
        dropped_legend,
        dropped_unknown_month,
        "reshaped wide table"
    );

    Ok(ReshapeOutcome {
        dataset: DataSet::new(long_schema(), rows),
        dropped_legend,
        dropped_unknown_month,
    })
}

fn contains_marker(text: &str, marker: &str) -> bool {
    !marker.is_empty() && text.to_lowercase().contains(marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::aggregate::aggregate;
    use crate::types::{DataType, Field, MonthlyRecord, Schema};

    fn wide(rows: &[[&str; 3]]) -> DataSet {
        let schema = Schema::new(vec![
            Field::new("landingsmåned", DataType::Utf8),
            Field::new("2023", DataType::Utf8),
            Field::new("2024", DataType::Utf8),
        ]);
        let rows = rows
            .iter()
            .map(|r| {
                r.iter()
                    .map(|s| {
                        if s.is_empty() {
                            Value::Null
                        } else {
                            Value::Utf8(s.to_string())
                        }
                    })
                    .collect()
            })
            .collect();
        DataSet::new(schema, rows)
    }

    fn melt(ds: &DataSet) -> IngestionResult<ReshapeOutcome> {
        melt_wide(
            ds,
            0,
            &[1, 2],
            &MonthNameTable::norwegian(),
            &LeakMarkers::default(),
            Path::new("wide.csv"),
        )
    }

    #[test]
    fn month_table_is_case_insensitive_and_closed() {
        let t = MonthNameTable::norwegian();
        assert_eq!(t.len(), 12);
        assert_eq!(t.lookup(" JANUAR "), Some(1));
        assert_eq!(t.lookup("Desember"), Some(12));
        assert_eq!(t.lookup("January"), None);
        assert_eq!(t.lookup("Sum"), None);
    }

    #[test]
    fn melts_year_columns_in_column_order() {
        let ds = wide(&[["Januar", "10", "5"], ["Februar", "20", "0"]]);
        let out = melt(&ds).unwrap();
        let years_months: Vec<(Value, Value)> = out
            .dataset
            .rows
            .iter()
            .map(|r| (r[0].clone(), r[1].clone()))
            .collect();
        assert_eq!(
            years_months,
            vec![
                (Value::Int64(2023), Value::Int64(1)),
                (Value::Int64(2023), Value::Int64(2)),
                (Value::Int64(2024), Value::Int64(1)),
                (Value::Int64(2024), Value::Int64(2)),
            ]
        );
        assert_eq!(out.dataset.rows[3][2], Value::Float64(0.0));
        assert_eq!(out.dataset.rows[0][3], Value::Float64(0.0));
        assert_eq!(out.dataset.rows[0][4], Value::Int64(1));

        let record = |year: i32, month: u32, quantity_tonnes: f64| MonthlyRecord {
            year,
            month,
            quantity_tonnes,
            value_currency: 0.0,
            row_count: 1,
        };
        assert_eq!(
            aggregate(&out.dataset),
            vec![
                record(2023, 1, 10.0),
                record(2023, 2, 20.0),
                record(2024, 1, 5.0),
                record(2024, 2, 0.0),
            ]
        );
    }

    #[test]
    fn legend_rows_and_unknown_months_are_dropped() {
        let ds = wide(&[
            ["Måned", "999", "999"],
            ["", "Rundvekt (tonn)", "Rundvekt (tonn)"],
            ["Totalt", "1", "1"],
            ["mars", "1 000,5", ""],
        ]);
        let out = melt(&ds).unwrap();
        assert_eq!(out.dropped_legend, 4);
        assert_eq!(out.dropped_unknown_month, 2);
        assert_eq!(out.dataset.row_count(), 2);
        assert_eq!(out.dataset.rows[0][2], Value::Float64(1000.5));
        assert_eq!(out.dataset.rows[1][2], Value::Float64(0.0));
    }

    #[test]
    fn unparseable_quantity_is_fatal_with_context() {
        let ds = wide(&[["Januar", "1", "n/a"]]);
        match melt(&ds).unwrap_err() {
            IngestionError::NumericParse { path, stage, row, column, raw } => {
                assert_eq!(path, Path::new("wide.csv"));
                assert_eq!(stage, PipelineStage::Reshape);
                assert_eq!(row, 1);
                assert_eq!(column, "2024");
                assert_eq!(raw, "n/a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_month_with_garbage_quantity_is_dropped_not_fatal() {
        let ds = wide(&[["Sum", "x", "y"]]);
        let out = melt(&ds).unwrap();
        assert_eq!(out.dataset.row_count(), 0);
        assert_eq!(out.dropped_unknown_month, 2);
    }
}
