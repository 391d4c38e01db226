//! Document-type filtering.
//!
//! Only final settlement notes count towards landings. When the export carries a
//! document-type column, every other row is discarded.

use serde::{Deserialize, Serialize};

use crate::types::DataSet;

use super::filter::filter;
use super::roles::{resolve_role, Role, RoleCandidates};

/// Code that marks a final record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusRule {
    /// Code of a finalized settlement note, compared after trimming.
    pub final_code: String,
}

impl Default for StatusRule {
    fn default() -> Self {
        Self {
            final_code: "0".to_string(),
        }
    }
}

/// Keep only final records.
///
/// The status column is the first of `candidates.status` present. Returns the filtered dataset
/// and the column used; without a status column the dataset is returned as-is.
pub fn filter_final(
    dataset: DataSet,
    candidates: &RoleCandidates,
    rule: &StatusRule,
) -> (DataSet, Option<String>) {
    let Some(idx) = resolve_role(&dataset.schema, candidates.for_role(Role::Status)) else {
        return (dataset, None);
    };
    let column = dataset.schema.fields[idx].name.clone();
    let code = rule.final_code.trim();

    let out = filter(&dataset, |row| {
        row.get(idx)
            .and_then(|v| v.to_text())
            .is_some_and(|s| s.trim() == code)
    });
    tracing::debug!(
        column = %column,
        kept = out.row_count(),
        dropped = dataset.row_count() - out.row_count(),
        "status filter applied"
    );
    (out, Some(column))
}
