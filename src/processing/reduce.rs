//! Reduction operations for [`crate::types::DataSet`].

use crate::types::{DataSet, DataType, Value};

/// Built-in reduction operations over a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Sum numeric values, ignoring nulls.
    Sum,
    /// Maximum numeric value, ignoring nulls.
    Max,
}

/// Reduce a column using a built-in [`ReduceOp`].
///
/// - Returns `None` if `column` does not exist in the schema.
/// - Returns `Some(Value::Null)` if there are no non-null numeric values.
pub fn reduce(dataset: &DataSet, column: &str, op: ReduceOp) -> Option<Value> {
    let idx = dataset.schema.index_of(column)?;
    let field = dataset.schema.fields.get(idx)?;
    Some(reduce_numeric_typed(dataset, idx, field.data_type, op))
}

fn reduce_numeric_typed(dataset: &DataSet, idx: usize, data_type: DataType, op: ReduceOp) -> Value {
    match data_type {
        DataType::Int64 => {
            let acc = dataset.reduce_rows(None::<i64>, |acc, row| match (row.get(idx), acc) {
                (Some(Value::Int64(v)), Some(a)) => Some(combine(op, a, *v)),
                (Some(Value::Int64(v)), None) => Some(*v),
                (_, acc) => acc,
            });
            acc.map(Value::Int64).unwrap_or(Value::Null)
        }
        DataType::Float64 => {
            let acc = dataset.reduce_rows(None::<f64>, |acc, row| match (row.get(idx), acc) {
                (Some(Value::Float64(v)), Some(a)) => Some(combine_f64(op, a, *v)),
                (Some(Value::Float64(v)), None) => Some(*v),
                (_, acc) => acc,
            });
            acc.map(Value::Float64).unwrap_or(Value::Null)
        }
        DataType::Utf8 | DataType::Date => Value::Null,
    }
}

fn combine(op: ReduceOp, a: i64, v: i64) -> i64 {
    match op {
        ReduceOp::Sum => a + v,
        ReduceOp::Max => a.max(v),
    }
}

fn combine_f64(op: ReduceOp, a: f64, v: f64) -> f64 {
    match op {
        ReduceOp::Sum => a + v,
        ReduceOp::Max => a.max(v),
    }
}
