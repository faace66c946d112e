//! Built-in functions, registered under the `core` namespace.

mod aggregate;
mod loader;
mod transform;

pub use aggregate::{Count, GroupCount, Sum};
pub use loader::Load;
pub use transform::{Distinct, Limit, Pluck, Sort};

use crate::function::QueryFunction;
use siftql_core::{Error, Result, Value};
use std::sync::Arc;

/// Namespace of the built-in functions.
pub const CORE_NAMESPACE: &str = "core";

/// Every built-in function.
pub fn all() -> Vec<Arc<dyn QueryFunction>> {
    vec![
        Arc::new(Count::new()),
        Arc::new(Sum::new()),
        Arc::new(GroupCount::new()),
        Arc::new(Pluck::new()),
        Arc::new(Sort::new()),
        Arc::new(Limit::new()),
        Arc::new(Distinct::new()),
        Arc::new(Load::new()),
    ]
}

/// Borrows the input as a list; `null` is an empty list.
fn input_items<'v>(function: &str, input: &'v Value) -> Result<&'v [Value]> {
    match input {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(&[]),
        _ => Err(Error::function(function, "expects a list input")),
    }
}

/// Field of a row, or the item itself when no field is given.
fn field_of<'v>(item: &'v Value, field: Option<&str>) -> Option<&'v Value> {
    match field {
        Some(field) => item.as_object().and_then(|row| row.get(field)),
        None => Some(item),
    }
}

/// Integral results stay integers.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
