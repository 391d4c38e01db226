//! Column normalization: header flattening, name clean-up and period derivation.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

use crate::ingestion::csv::RawTable;
use crate::types::{DataSet, DataType, Field, Schema, Value};

use super::roles::resolve_role;

/// Lower header label that marks a year column in two-row exports.
pub const ROUND_WEIGHT_SENTINEL: &str = "rundvekt (tonn)";

/// Name of the derived year field.
pub const YEAR: &str = "year";
/// Name of the derived month field.
pub const MONTH: &str = "month";

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d", "%d/%m/%Y", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Trim and lower-case a header label.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Flatten the raw header and normalize every column name.
///
/// For two-row headers, a column whose lower label equals `sentinel` (compared normalized) takes
/// its name from the upper row; every other column takes the lower label.
pub fn normalize_columns(table: RawTable, sentinel: &str) -> DataSet {
    let sentinel = normalize_name(sentinel);
    let fields = table
        .columns
        .iter()
        .map(|col| {
            let name = match &col.top {
                Some(top) if normalize_name(&col.label) == sentinel => top.as_str(),
                _ => col.label.as_str(),
            };
            Field::new(normalize_name(name), DataType::Utf8)
        })
        .collect();

    DataSet::new(Schema::new(fields), table.rows)
}

/// Result of [`add_period`].
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodOutcome {
    /// Dataset with `year`/`month` fields appended when a date column was found.
    pub dataset: DataSet,
    /// The date column that was used, if any.
    pub date_column: Option<String>,
    /// Rows dropped because their date did not parse.
    pub dropped_rows: usize,
}

/// Locate the first date column from `candidates` and derive `year` and `month` from it.
///
/// The date cells are replaced by [`Value::Date`]. Rows whose date does not parse are dropped.
/// Pre-existing `year`/`month` columns are replaced. Without a date column the dataset is
/// returned unchanged.
pub fn add_period(dataset: DataSet, candidates: &[String]) -> PeriodOutcome {
    let Some(date_idx) = resolve_role(&dataset.schema, candidates) else {
        return PeriodOutcome {
            dataset,
            date_column: None,
            dropped_rows: 0,
        };
    };
    let date_column = dataset.schema.fields[date_idx].name.clone();

    let keep: Vec<usize> = (0..dataset.schema.fields.len())
        .filter(|&i| i == date_idx || !matches!(dataset.schema.fields[i].name.as_str(), YEAR | MONTH))
        .collect();

    let mut fields: Vec<Field> = keep.iter().map(|&i| dataset.schema.fields[i].clone()).collect();
    let new_date_idx = keep.iter().position(|&i| i == date_idx).unwrap_or(0);
    fields[new_date_idx].data_type = DataType::Date;
    fields.push(Field::new(YEAR, DataType::Int64));
    fields.push(Field::new(MONTH, DataType::Int64));

    let input_rows = dataset.row_count();
    let rows: Vec<Vec<Value>> = dataset
        .rows
        .into_iter()
        .filter_map(|row| {
            let date = row.get(date_idx).and_then(|v| match v {
                Value::Date(d) => Some(*d),
                Value::Utf8(s) => parse_date(s),
                _ => None,
            })?;
            let mut out: Vec<Value> = keep.iter().map(|&i| row[i].clone()).collect();
            out[new_date_idx] = Value::Date(date);
            out.push(Value::Int64(i64::from(date.year())));
            out.push(Value::Int64(i64::from(date.month())));
            Some(out)
        })
        .collect();

    let dropped_rows = input_rows - rows.len();
    if dropped_rows > 0 {
        tracing::debug!(column = %date_column, dropped_rows, "dropped rows with unparseable dates");
    }

    PeriodOutcome {
        dataset: DataSet::new(Schema::new(fields), rows),
        date_column: Some(date_column),
        dropped_rows,
    }
}

/// Parse a landing date. Timestamps with an offset are converted to UTC first.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    {
        return Some(d);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(|dt| dt.date())
}
