//! `landings-monthly` turns raw fishery landing exports into monthly summaries.
//!
//! Exports come in several shapes: per-landing registers with a date column, and pre-aggregated
//! statistics sheets with one row per month and one column per year. Their text encoding and
//! field delimiter are not declared. The library detects both, normalizes column names and
//! locale-formatted numbers, keeps only final settlement notes, and produces one
//! [`types::MonthlyRecord`] per (year, month), sorted.
//!
//! The primary entrypoint is [`pipeline::run_file`]; a [`pipeline::FormatProfile`] describes
//! the export variant.
//!
//! ## Quick example
//!
//! ```no_run
//! use landings_monthly::output::{write_per_year, OutputFormat};
//! use landings_monthly::pipeline::{run_file, FormatProfile, PipelineOptions};
//!
//! # fn main() -> Result<(), landings_monthly::IngestionError> {
//! let summary = run_file(
//!     "fangstdata_2024.csv",
//!     &FormatProfile::domestic_landings(),
//!     &PipelineOptions::default(),
//! )?;
//! println!("encoding={} records={}", summary.encoding, summary.records.len());
//! write_per_year("out", &summary.records, OutputFormat::Parquet)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: encoding/delimiter detection, summary reader, observers
//! - [`processing`]: column normalization, role resolution, status filter, reshape, aggregation
//! - [`pipeline`]: format profiles and the end-to-end run
//! - [`output`]: CSV and Parquet writers
//! - [`fetch`]: download of yearly archives
//! - [`compare`]: year totals of two summaries side by side
//! - [`types`]: dataset and record types
//! - [`error`]: error types used across the crate
//!
//! ## Numbers
//!
//! Numeric cells follow Norwegian conventions: comma decimal separator, space or no-break
//! space as thousands separator, and `-`/`.` for zero. Anything else that does not parse
//! aborts the run; see [`processing::numeric::to_float`].

pub mod compare;
pub mod error;
pub mod fetch;
pub mod ingestion;
pub mod output;
pub mod pipeline;
pub mod processing;
pub mod types;

pub use error::{IngestionError, IngestionResult, PipelineStage};
pub use pipeline::{run_bytes, run_file, run_files, FormatProfile, MonthlySummary, Orientation, PipelineOptions};
pub use types::MonthlyRecord;
