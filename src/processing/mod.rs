//! In-memory dataset transformations.
//!
//! The processing layer operates on [`crate::types::DataSet`] values produced by the loader.
//! Each stage consumes a whole dataset and hands a new one to the next stage:
//!
//! - [`columns`]: header flattening, name normalization, year/month from a date column
//! - [`roles`]: binding semantic roles (quantity, value, month label, ...) to columns
//! - [`status`]: keeping only final settlement notes
//! - [`reshape`]: wide (month × year) to long layout
//! - [`aggregate`]: grouping the long layout into [`crate::types::MonthlyRecord`]s
//! - [`numeric`]: locale-aware number parsing shared by the stages above
//!
//! The generic helpers [`filter()`] and [`reduce()`] work on any dataset.
//!
//! ## Example: reshape → aggregate
//!
//! ```rust
//! use std::path::Path;
//!
//! use landings_monthly::processing::aggregate::aggregate;
//! use landings_monthly::processing::reshape::{melt_wide, LeakMarkers, MonthNameTable};
//! use landings_monthly::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("landingsmåned", DataType::Utf8),
//!     Field::new("2024", DataType::Utf8),
//! ]);
//! let ds = DataSet::new(
//!     schema,
//!     vec![
//!         vec![Value::Utf8("Januar".into()), Value::Utf8("1 200,5".into())],
//!         vec![Value::Utf8("Måned".into()), Value::Utf8("999".into())],
//!     ],
//! );
//!
//! let long = melt_wide(
//!     &ds,
//!     0,
//!     &[1],
//!     &MonthNameTable::norwegian(),
//!     &LeakMarkers::default(),
//!     Path::new("inline"),
//! )
//! .unwrap();
//! let monthly = aggregate(&long.dataset);
//! assert_eq!(monthly.len(), 1);
//! assert_eq!(monthly[0].quantity_tonnes, 1200.5);
//! ```

pub mod aggregate;
pub mod columns;
pub mod filter;
pub mod numeric;
pub mod reduce;
pub mod reshape;
pub mod roles;
pub mod status;

pub use filter::filter;
pub use reduce::{reduce, ReduceOp};
