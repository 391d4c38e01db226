//! End-to-end pipeline: one delimited export in, sorted monthly records out.
//!
//! Every export variant runs through the same stages. What differs between variants lives in a
//! [`FormatProfile`]: candidate column names, the header shape, the status rule, the month-name
//! table and, optionally, a fixed [`Orientation`].
//!
//! ```text
//! load -> normalize columns -> derive period -> status filter -+-> transactions_to_long -+-> aggregate
//!                                                              +-> melt_wide ------------+
//! ```
//!
//! If [`PipelineOptions::observer`] is set, each run reports to it:
//!
//! - `on_success` with [`RunStats`]
//! - `on_failure` with a severity computed by [`IngestionSeverity::for_error`]
//! - `on_alert` when that severity is >= [`PipelineOptions::alert_at_or_above`]

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::csv::{load_table_from_bytes, HeaderShape, LoadOptions};
use crate::ingestion::encoding::TextEncoding;
use crate::ingestion::observability::{IngestionContext, IngestionObserver, IngestionSeverity, RunStats};
use crate::processing::aggregate::{aggregate, transactions_to_long, TransactionColumns};
use crate::processing::columns::{add_period, normalize_columns, MONTH, ROUND_WEIGHT_SENTINEL, YEAR};
use crate::processing::reshape::{melt_wide, LeakMarkers, MonthNameTable};
use crate::processing::roles::{
    missing, require_role, require_year_columns, resolve_month_label, resolve_role, year_columns, Role,
    RoleCandidates,
};
use crate::processing::status::{filter_final, StatusRule};
use crate::types::{MonthlyRecord, Schema};

/// Layout of the data rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// One row per landing, with a date column.
    Transaction,
    /// One row per month label, one column per year.
    Wide,
}

impl Orientation {
    /// A resolvable date column means transactions; otherwise digit-named columns mean wide.
    pub fn detect(schema: &Schema, roles: &RoleCandidates, path: &Path) -> IngestionResult<Self> {
        if resolve_role(schema, roles.for_role(Role::Date)).is_some() {
            Ok(Orientation::Transaction)
        } else if !year_columns(schema).is_empty() {
            Ok(Orientation::Wide)
        } else {
            Err(missing(schema, Role::Date, path))
        }
    }
}

/// Immutable description of one export variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatProfile {
    pub name: String,
    pub header_shape: HeaderShape,
    /// Fixed orientation; detected per file when `None`.
    pub orientation: Option<Orientation>,
    pub roles: RoleCandidates,
    pub status: StatusRule,
    pub months: MonthNameTable,
    pub markers: LeakMarkers,
    /// Lower header label whose column takes its name from the upper row (two-row headers).
    pub sentinel: String,
}

impl Default for FormatProfile {
    fn default() -> Self {
        Self::domestic_landings()
    }
}

impl FormatProfile {
    /// Per-landing register export with settlement-note document types.
    pub fn domestic_landings() -> Self {
        Self {
            name: "domestic".to_string(),
            header_shape: HeaderShape::Single,
            orientation: Some(Orientation::Transaction),
            roles: RoleCandidates::default(),
            status: StatusRule::default(),
            months: MonthNameTable::norwegian(),
            markers: LeakMarkers::default(),
            sentinel: ROUND_WEIGHT_SENTINEL.to_string(),
        }
    }

    /// Landings by foreign vessels. No document-type filter; wider quantity/value vocabulary.
    pub fn foreign_landings() -> Self {
        let mut roles = RoleCandidates::default();
        roles.status.clear();
        roles.quantity.extend(["qty_kg", "quantity_kg"].map(String::from));
        roles.value = ["forstehandsverdi", "førstehandsverdi", "value_nok", "price_nok"]
            .map(String::from)
            .to_vec();
        Self {
            name: "foreign".to_string(),
            roles,
            ..Self::domestic_landings()
        }
    }

    /// Pre-aggregated statistics sheet: month labels down, years across, two header rows.
    pub fn monthly_wide() -> Self {
        Self {
            name: "monthly-wide".to_string(),
            header_shape: HeaderShape::TwoRow,
            orientation: Some(Orientation::Wide),
            ..Self::domestic_landings()
        }
    }

    /// Built-in profile by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "domestic" => Some(Self::domestic_landings()),
            "foreign" => Some(Self::foreign_landings()),
            "monthly-wide" => Some(Self::monthly_wide()),
            _ => None,
        }
    }

    /// Load a profile from a JSON file. Missing fields take the domestic defaults.
    pub fn from_json_path(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let text = fs::read_to_string(path)?;
        let profile: Self = serde_json::from_str(&text)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> IngestionResult<()> {
        if self.months.is_empty() {
            return Err(IngestionError::InvalidConfig {
                message: format!("profile '{}' has an empty month-name table", self.name),
            });
        }
        if self.roles.quantity.is_empty() && self.orientation != Some(Orientation::Wide) {
            return Err(IngestionError::InvalidConfig {
                message: format!("profile '{}' has no quantity candidates", self.name),
            });
        }
        Ok(())
    }

    /// Loader options for this profile's header shape.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::with_header_shape(self.header_shape)
    }
}

/// Options controlling observability of pipeline runs.
#[derive(Clone)]
pub struct PipelineOptions {
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Output of one successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    pub source: PathBuf,
    pub encoding: TextEncoding,
    pub delimiter: u8,
    /// Sorted ascending by (year, month), one record per pair.
    pub records: Vec<MonthlyRecord>,
    pub stats: RunStats,
}

/// Summarize the export at `path`.
///
/// # Examples
///
/// ```no_run
/// use landings_monthly::pipeline::{run_file, FormatProfile, PipelineOptions};
///
/// # fn main() -> Result<(), landings_monthly::IngestionError> {
/// let summary = run_file("fangstdata_2024.csv", &FormatProfile::domestic_landings(), &PipelineOptions::default())?;
/// for r in &summary.records {
///     println!("{}-{:02} {:.1} t", r.year, r.month, r.quantity_tonnes);
/// }
/// # Ok(())
/// # }
/// ```
pub fn run_file(
    path: impl AsRef<Path>,
    profile: &FormatProfile,
    options: &PipelineOptions,
) -> IngestionResult<MonthlySummary> {
    let path = path.as_ref();
    let result = fs::read(path)
        .map_err(|e| IngestionError::input_io(path, e))
        .and_then(|bytes| summarize(&bytes, path, profile));
    report(path, profile, options, result)
}

/// Summarize in-memory file content. `source` labels errors and observer events.
pub fn run_bytes(
    bytes: &[u8],
    source: impl AsRef<Path>,
    profile: &FormatProfile,
    options: &PipelineOptions,
) -> IngestionResult<MonthlySummary> {
    let source = source.as_ref();
    let result = summarize(bytes, source, profile);
    report(source, profile, options, result)
}

/// Summarize independent files in parallel. Results are in input order.
pub fn run_files<P>(
    paths: &[P],
    profile: &FormatProfile,
    options: &PipelineOptions,
) -> Vec<IngestionResult<MonthlySummary>>
where
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(|p| run_file(p, profile, options))
        .collect()
}

fn report(
    path: &Path,
    profile: &FormatProfile,
    options: &PipelineOptions,
    result: IngestionResult<MonthlySummary>,
) -> IngestionResult<MonthlySummary> {
    if let Some(obs) = options.observer.as_ref() {
        let ctx = IngestionContext {
            path: path.to_path_buf(),
            profile: profile.name.clone(),
        };
        match &result {
            Ok(summary) => obs.on_success(&ctx, summary.stats),
            Err(e) => {
                let sev = IngestionSeverity::for_error(e);
                obs.on_failure(&ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }
    result
}

fn summarize(bytes: &[u8], path: &Path, profile: &FormatProfile) -> IngestionResult<MonthlySummary> {
    let table = load_table_from_bytes(bytes, path, &profile.load_options())?;
    let (encoding, delimiter) = (table.encoding, table.delimiter);

    let dataset = normalize_columns(table, &profile.sentinel);
    let mut stats = RunStats {
        input_rows: dataset.row_count(),
        ..RunStats::default()
    };

    let orientation = match profile.orientation {
        Some(o) => o,
        None => Orientation::detect(&dataset.schema, &profile.roles, path)?,
    };
    stats.orientation = Some(orientation);
    tracing::debug!(path = %path.display(), ?orientation, profile = %profile.name, "orientation");

    let long = match orientation {
        Orientation::Transaction => {
            require_role(&dataset.schema, &profile.roles, Role::Date, path)?;
            let period = add_period(dataset, profile.roles.for_role(Role::Date));
            stats.dropped_dates = period.dropped_rows;

            let before = period.dataset.row_count();
            let (dataset, _) = filter_final(period.dataset, &profile.roles, &profile.status);
            stats.dropped_status = before - dataset.row_count();

            let schema = &dataset.schema;
            let cols = TransactionColumns {
                year: schema.index_of(YEAR).unwrap_or_default(),
                month: schema.index_of(MONTH).unwrap_or_default(),
                quantity: require_role(schema, &profile.roles, Role::Quantity, path)?,
                value: resolve_role(schema, profile.roles.for_role(Role::Value)),
            };
            transactions_to_long(&dataset, cols, path)?
        }
        Orientation::Wide => {
            let before = dataset.row_count();
            let (dataset, _) = filter_final(dataset, &profile.roles, &profile.status);
            stats.dropped_status = before - dataset.row_count();

            let year_idxs = require_year_columns(&dataset.schema, path)?;
            let month_idx = match resolve_month_label(&dataset.schema, &profile.roles) {
                Some(i) => i,
                None => require_role(&dataset.schema, &profile.roles, Role::MonthLabel, path)?,
            };
            let outcome = melt_wide(&dataset, month_idx, &year_idxs, &profile.months, &profile.markers, path)?;
            stats.dropped_legend = outcome.dropped_legend;
            stats.dropped_unknown_month = outcome.dropped_unknown_month;
            outcome.dataset
        }
    };

    let records = aggregate(&long);
    stats.records = records.len();

    Ok(MonthlySummary {
        source: path.to_path_buf(),
        encoding,
        delimiter,
        records,
        stats,
    })
}
