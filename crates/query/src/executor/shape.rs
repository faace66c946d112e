//! Result shaping: projection, then aggregation.

use crate::ast::{Aggregation, Projection};
use siftql_core::value::dedup_by_serialization;
use siftql_core::{Row, Value};

/// One value per matched row.
pub(crate) fn project(rows: &[&Row], projection: &Projection, id_column: &str) -> Vec<Value> {
    rows.iter()
        .map(|row| match projection {
            Projection::Default => cell(row, id_column),
            Projection::Column(column) => cell(row, column),
            Projection::Columns(columns) => Value::Object(
                columns
                    .iter()
                    .map(|column| (column.clone(), cell(row, column)))
                    .collect(),
            ),
            Projection::All => Value::Object((*row).clone()),
        })
        .collect()
}

/// Id values of the matched rows.
pub(crate) fn ids(rows: &[&Row], id_column: &str) -> Vec<Value> {
    rows.iter().map(|row| cell(row, id_column)).collect()
}

/// `COUNT` yields a number; `FIRST`/`LAST` an element, or `[]` when there
/// is none; otherwise an array.
pub(crate) fn aggregate(values: Vec<Value>, aggregation: Option<Aggregation>) -> Value {
    match aggregation {
        None => Value::Array(values),
        Some(Aggregation::Count) => Value::from(values.len()),
        Some(Aggregation::Unique) => Value::Array(dedup_by_serialization(values)),
        Some(Aggregation::First) => values
            .into_iter()
            .next()
            .unwrap_or_else(|| Value::Array(Vec::new())),
        Some(Aggregation::Last) => values
            .into_iter()
            .last()
            .unwrap_or_else(|| Value::Array(Vec::new())),
    }
}

fn cell(row: &Row, column: &str) -> Value {
    row.get(column).cloned().unwrap_or(Value::Null)
}
