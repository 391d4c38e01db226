//! Writers for monthly summaries.
//!
//! Every written record carries all five fields: `year`, `month`, `quantity_tonnes`,
//! `value_currency`, `row_count`.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parquet::data_type::{DoubleType, Int32Type, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};
use crate::types::MonthlyRecord;

/// Column names of a written summary, in order.
pub const MONTHLY_COLUMNS: [&str; 5] = ["year", "month", "quantity_tonnes", "value_currency", "row_count"];

const MONTHLY_PARQUET_SCHEMA: &str = "
message monthly_landings {
    REQUIRED INT32 year;
    REQUIRED INT32 month;
    REQUIRED DOUBLE quantity_tonnes;
    REQUIRED DOUBLE value_currency;
    REQUIRED INT64 row_count;
}
";

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Write records as a comma-separated file with a header row.
pub fn write_csv(path: impl AsRef<Path>, records: &[MonthlyRecord]) -> IngestionResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    if records.is_empty() {
        wtr.write_record(MONTHLY_COLUMNS)?;
    }
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write records as a single-row-group Parquet file.
pub fn write_parquet(path: impl AsRef<Path>, records: &[MonthlyRecord]) -> IngestionResult<()> {
    let schema = Arc::new(parse_message_type(MONTHLY_PARQUET_SCHEMA)?);
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, schema, props)?;

    let years: Vec<i32> = records.iter().map(|r| r.year).collect();
    let months = records
        .iter()
        .map(|r| {
            i32::try_from(r.month).map_err(|_| IngestionError::InvalidConfig {
                message: format!("month {} out of range", r.month),
            })
        })
        .collect::<IngestionResult<Vec<i32>>>()?;
    let quantities: Vec<f64> = records.iter().map(|r| r.quantity_tonnes).collect();
    let values: Vec<f64> = records.iter().map(|r| r.value_currency).collect();
    let counts: Vec<i64> = records
        .iter()
        .map(|r| i64::try_from(r.row_count).unwrap_or(i64::MAX))
        .collect();

    let mut row_group = writer.next_row_group()?;
    let mut column_idx = 0usize;
    while let Some(mut col) = row_group.next_column()? {
        match column_idx {
            0 => {
                col.typed::<Int32Type>().write_batch(&years, None, None)?;
            }
            1 => {
                col.typed::<Int32Type>().write_batch(&months, None, None)?;
            }
            2 => {
                col.typed::<DoubleType>().write_batch(&quantities, None, None)?;
            }
            3 => {
                col.typed::<DoubleType>().write_batch(&values, None, None)?;
            }
            _ => {
                col.typed::<Int64Type>().write_batch(&counts, None, None)?;
            }
        }
        col.close()?;
        column_idx += 1;
    }
    row_group.close()?;
    writer.close()?;
    Ok(())
}

/// Write `records` to `path` in `format`.
pub fn write_records(path: impl AsRef<Path>, records: &[MonthlyRecord], format: OutputFormat) -> IngestionResult<()> {
    match format {
        OutputFormat::Csv => write_csv(path, records),
        OutputFormat::Parquet => write_parquet(path, records),
    }
}

/// Split records by year and write `monthly_<year>.<ext>` files into `dir`, sorted by month.
///
/// Returns the written paths in year order.
pub fn write_per_year(
    dir: impl AsRef<Path>,
    records: &[MonthlyRecord],
    format: OutputFormat,
) -> IngestionResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut by_year: BTreeMap<i32, Vec<MonthlyRecord>> = BTreeMap::new();
    for r in records {
        by_year.entry(r.year).or_default().push(r.clone());
    }

    let mut written = Vec::with_capacity(by_year.len());
    for (year, mut rows) in by_year {
        rows.sort_by_key(MonthlyRecord::key);
        let path = dir.join(format!("monthly_{year}.{}", format.extension()));
        write_records(&path, &rows, format)?;
        tracing::info!(path = %path.display(), records = rows.len(), "saved");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, month: u32, q: f64) -> MonthlyRecord {
        MonthlyRecord {
            year,
            month,
            quantity_tonnes: q,
            value_currency: 0.0,
            row_count: 1,
        }
    }

    #[test]
    fn csv_has_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &[record(2024, 1, 1.5)]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("year,month,quantity_tonnes,value_currency,row_count"));
        assert_eq!(lines.next(), Some("2024,1,1.5,0.0,1"));
    }

    #[test]
    fn empty_csv_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_csv(&path, &[]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim_end(),
            "year,month,quantity_tonnes,value_currency,row_count"
        );
    }

    #[test]
    fn per_year_split_sorts_months() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record(2024, 2, 2.0), record(2023, 5, 1.0), record(2024, 1, 3.0)];
        let written = write_per_year(dir.path(), &records, OutputFormat::Csv).unwrap();

        assert_eq!(
            written,
            vec![dir.path().join("monthly_2023.csv"), dir.path().join("monthly_2024.csv")]
        );
        let text = fs::read_to_string(&written[1]).unwrap();
        let months: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|l| l.split(',').nth(1).unwrap())
            .collect();
        assert_eq!(months, vec!["1", "2"]);
    }
}
