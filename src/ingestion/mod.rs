//! Reading inputs.
//!
//! - [`encoding`]: candidate text encodings and strict decoding
//! - [`csv`]: the raw loader that detects encoding and delimiter of a delimited export
//! - [`parquet`]: reading written monthly summaries back
//! - [`observability`]: observer hooks reported to by [`crate::pipeline`]

pub mod csv;
pub mod encoding;
pub mod observability;
pub mod parquet;

pub use csv::{load_table_from_bytes, load_table_from_path, HeaderShape, LoadOptions, RawTable};
pub use encoding::TextEncoding;
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, RunStats,
    TracingObserver,
};
pub use parquet::read_monthly_parquet;
