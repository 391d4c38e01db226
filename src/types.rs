//! Core data model types.
//!
//! Every stage of the pipeline passes an in-memory [`DataSet`] to the next one; the final
//! product is a sorted list of [`MonthlyRecord`]s.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// UTF-8 string.
    Utf8,
    /// Calendar date.
    Date,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// An ordered list of fields describing the shape of a [`DataSet`].
///
/// Field names are not required to be unique: source exports sometimes repeat a header.
/// Lookups by name always resolve to the first match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of the first field with `name`, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns true if any field is called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

/// A single cell value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
    /// Calendar date.
    Date(NaiveDate),
}

impl Value {
    /// Borrow the text of a [`Value::Utf8`] cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer view of the cell. Floats are accepted only when they carry no fraction.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            Value::Float64(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            Value::Utf8(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Textual rendering used when comparing codes (e.g. a document type).
    ///
    /// Returns `None` for [`Value::Null`].
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Int64(v) => Some(v.to_string()),
            Value::Float64(v) => Some(v.to_string()),
            Value::Utf8(s) => Some(s.clone()),
            Value::Date(d) => Some(d.to_string()),
        }
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Create a new dataset containing only rows that match `predicate`.
    ///
    /// The returned dataset preserves the original schema.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(row.as_slice()))
            .cloned()
            .collect();
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Reduce (fold) all rows into an accumulator value.
    ///
    /// This is similar to `Iterator::fold`, but provides each row as `&[Value]`.
    pub fn reduce_rows<A, F>(&self, init: A, mut reducer: F) -> A
    where
        F: FnMut(A, &[Value]) -> A,
    {
        self.rows
            .iter()
            .fold(init, |acc, row| reducer(acc, row.as_slice()))
    }
}

/// One output unit of the pipeline: the totals for a single (year, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    /// Calendar year.
    pub year: i32,
    /// Month number, 1 to 12.
    pub month: u32,
    /// Sum of round-weight in tonnes.
    pub quantity_tonnes: f64,
    /// Sum of first-hand value. Wide exports carry no value figure, so this is 0.0 there.
    pub value_currency: f64,
    /// Number of source rows folded into this record.
    pub row_count: u64,
}

impl MonthlyRecord {
    /// Group key used for ordering and uniqueness.
    pub fn key(&self) -> (i32, u32) {
        (self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("kode", DataType::Utf8),
            Field::new("kvantum", DataType::Utf8),
            Field::new("kode", DataType::Utf8),
        ]);
        DataSet::new(
            schema,
            vec![
                vec![
                    Value::Utf8("0".to_string()),
                    Value::Utf8("12,5".to_string()),
                    Value::Utf8("x".to_string()),
                ],
                vec![Value::Utf8("1".to_string()), Value::Null, Value::Null],
            ],
        )
    }

    #[test]
    fn duplicate_names_resolve_to_first_field() {
        let ds = sample_dataset();
        assert_eq!(ds.schema.index_of("kode"), Some(0));
        assert_eq!(ds.schema.index_of("missing"), None);
        assert!(ds.schema.contains("kvantum"));
    }

    #[test]
    fn value_integer_view() {
        assert_eq!(Value::Utf8(" 2024 ".to_string()).as_i64(), Some(2024));
        assert_eq!(Value::Float64(3.0).as_i64(), Some(3));
        assert_eq!(Value::Float64(3.5).as_i64(), None);
        assert_eq!(Value::Null.as_i64(), None);
    }

    #[test]
    fn value_text_view() {
        assert_eq!(Value::Int64(0).to_text().as_deref(), Some("0"));
        assert_eq!(Value::Null.to_text(), None);
    }
}
