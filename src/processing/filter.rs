//! Row filtering for [`crate::types::DataSet`].

use crate::types::{DataSet, Value};

/// Returns a new [`DataSet`] containing only rows for which `predicate` returns `true`.
///
/// This is a convenience wrapper around [`DataSet::filter_rows`].
pub fn filter<F>(dataset: &DataSet, predicate: F) -> DataSet
where
    F: FnMut(&[Value]) -> bool,
{
    dataset.filter_rows(predicate)
}

#[cfg(test)]
mod tests {
    use super::filter;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn landings() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("year", DataType::Int64),
            Field::new("art", DataType::Utf8),
            Field::new("rundvekt", DataType::Float64),
        ]);

        let rows = vec![
            vec![Value::Int64(2023), Value::Utf8("torsk".to_string()), Value::Float64(1.0)],
            vec![Value::Int64(2024), Value::Utf8("sei".to_string()), Value::Float64(2.0)],
            vec![Value::Int64(2024), Value::Utf8("torsk".to_string()), Value::Null],
        ];

        DataSet::new(schema, rows)
    }

    #[test]
    fn filter_by_integer_column() {
        let ds = landings();
        let year_idx = ds.schema.index_of("year").unwrap();

        let out = filter(&ds, |row| matches!(row.get(year_idx), Some(Value::Int64(2024))));

        assert_eq!(out.schema, ds.schema);
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.rows[0][1], Value::Utf8("sei".to_string()));
        // Original unchanged
        assert_eq!(ds.row_count(), 3);
    }

    #[test]
    fn filter_can_return_empty_dataset() {
        let ds = landings();
        let out = filter(&ds, |_| false);
        assert_eq!(out.schema, ds.schema);
        assert!(out.rows.is_empty());
    }
}
