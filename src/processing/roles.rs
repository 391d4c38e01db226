//! Column-role resolution.
//!
//! Each semantic role is bound to the first column whose normalized name appears in that role's
//! priority-ordered candidate list. Year columns are found structurally instead: any column
//! whose name is made only of digits.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult, PipelineStage};
use crate::types::Schema;

/// Semantic role a column can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Date,
    Status,
    Quantity,
    Value,
    MonthLabel,
    Year,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Date => "date",
            Role::Status => "status",
            Role::Quantity => "quantity",
            Role::Value => "value",
            Role::MonthLabel => "month_label",
            Role::Year => "year",
        };
        f.write_str(s)
    }
}

/// Priority-ordered candidate names per role. Names are compared after normalization
/// (trimmed, lower-case).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleCandidates {
    pub date: Vec<String>,
    pub status: Vec<String>,
    pub quantity: Vec<String>,
    pub value: Vec<String>,
    pub month_label: Vec<String>,
}

impl Default for RoleCandidates {
    fn default() -> Self {
        Self {
            date: names(&["date", "landingsdato", "landings_dato", "landingsdato (yyyy-mm-dd)"]),
            status: names(&["dokumenttype (kode)", "dokumenttype", "dokument_type", "dokument type"]),
            quantity: names(&["rundvekt", "kvantum_rundvekt", "kvantum (rundvekt)"]),
            value: names(&[
                "forstehandsverdi",
                "førstehandsverdi",
                "forstehands_verdi",
                "forstehandsverdi (nok)",
                "førstehandsverdi (nok)",
            ]),
            month_label: names(&["landingsmåned", "landingsmaned", "måned", "month_name", "month"]),
        }
    }
}

impl RoleCandidates {
    /// Candidate list for `role`. Year columns have none; see [`year_columns`].
    pub fn for_role(&self, role: Role) -> &[String] {
        match role {
            Role::Date => &self.date,
            Role::Status => &self.status,
            Role::Quantity => &self.quantity,
            Role::Value => &self.value,
            Role::MonthLabel => &self.month_label,
            Role::Year => &[],
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Index of the column bound to the first candidate present in `schema`.
pub fn resolve_role(schema: &Schema, candidates: &[String]) -> Option<usize> {
    candidates.iter().find_map(|c| schema.index_of(c))
}

/// Like [`resolve_role`], but a missing column is a [`IngestionError::RequiredColumnMissing`].
pub fn require_role(
    schema: &Schema,
    candidates: &RoleCandidates,
    role: Role,
    path: &Path,
) -> IngestionResult<usize> {
    resolve_role(schema, candidates.for_role(role)).ok_or_else(|| missing(schema, role, path))
}

/// Indexes of all columns whose name is a non-empty run of ASCII digits.
pub fn year_columns(schema: &Schema) -> Vec<usize> {
    schema
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| is_year_name(&f.name))
        .map(|(i, _)| i)
        .collect()
}

/// Year columns, failing when there are none.
pub fn require_year_columns(schema: &Schema, path: &Path) -> IngestionResult<Vec<usize>> {
    let cols = year_columns(schema);
    if cols.is_empty() {
        return Err(missing(schema, Role::Year, path));
    }
    Ok(cols)
}

/// Month-label column: a named candidate if present, otherwise the first non-year column.
pub fn resolve_month_label(schema: &Schema, candidates: &RoleCandidates) -> Option<usize> {
    resolve_role(schema, &candidates.month_label).or_else(|| {
        schema
            .fields
            .iter()
            .position(|f| !f.name.is_empty() && !is_year_name(&f.name))
    })
}

fn is_year_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn missing(schema: &Schema, role: Role, path: &Path) -> IngestionError {
    IngestionError::RequiredColumnMissing {
        path: path.to_path_buf(),
        stage: PipelineStage::ResolveRoles,
        role,
        available: schema.field_names().map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Field};

    fn schema(names: &[&str]) -> Schema {
        Schema::new(names.iter().map(|n| Field::new(*n, DataType::Utf8)).collect())
    }

    #[test]
    fn first_candidate_in_priority_order_wins() {
        let s = schema(&["kvantum (rundvekt)", "rundvekt", "art"]);
        let c = RoleCandidates::default();
        // "rundvekt" precedes "kvantum (rundvekt)" in the candidate list.
        assert_eq!(resolve_role(&s, &c.quantity), Some(1));
        assert_eq!(resolve_role(&s, &c.value), None);
    }

    #[test]
    fn missing_required_role_reports_path_and_stage() {
        let s = schema(&["art"]);
        let err = require_role(&s, &RoleCandidates::default(), Role::Quantity, Path::new("x.csv"))
            .unwrap_err();
        match err {
            IngestionError::RequiredColumnMissing { path, stage, role, available } => {
                assert_eq!(path, Path::new("x.csv"));
                assert_eq!(stage, PipelineStage::ResolveRoles);
                assert_eq!(role, Role::Quantity);
                assert_eq!(available, vec!["art".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn year_columns_are_digit_only_names() {
        let s = schema(&["landingsmåned", "2023", "art", "2024", "2024a", ""]);
        assert_eq!(year_columns(&s), vec![1, 3]);
        assert!(require_year_columns(&schema(&["a"]), Path::new("x")).is_err());
    }

    #[test]
    fn month_label_falls_back_to_first_non_year_column() {
        let c = RoleCandidates::default();
        assert_eq!(resolve_month_label(&schema(&["art", "måned", "2024"]), &c), Some(1));
        assert_eq!(resolve_month_label(&schema(&["2023", "periode", "2024"]), &c), Some(1));
        assert_eq!(resolve_month_label(&schema(&["2023"]), &c), None);
    }
}
