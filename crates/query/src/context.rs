//! Per-batch execution state: the variables statements produce for later
//! statements of the same batch.

use serde::Serialize;
use siftql_core::{Error, Result, Value};
use std::collections::BTreeMap;

/// Name under which the most recent statement result is always stored.
pub const PREV_VARIABLE: &str = "_prev";

/// Materialized output of a statement.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VariableValue {
    pub values: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl VariableValue {
    /// Wraps a shaped result: arrays contribute their elements, anything
    /// else is a single value.
    pub fn from_result(result: &Value) -> Self {
        let values = match result {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        };
        Self {
            values,
            ..Self::default()
        }
    }
}

/// The element bound while a `$name.key = …` statement iterates `name`.
#[derive(Clone, Copy, Debug)]
pub struct LoopFrame<'a> {
    pub variable: &'a str,
    pub value: &'a Value,
    pub index: usize,
}

/// Variables produced so far in one batch. Never shared between batches.
#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    variables: BTreeMap<String, VariableValue>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.variables.get(name)
    }

    /// Like [`get`](Self::get), failing with `UnresolvedVariable`.
    pub fn require(&self, name: &str) -> Result<&VariableValue> {
        self.variables
            .get(name)
            .ok_or_else(|| Error::unresolved_variable(name))
    }

    /// Stores a statement result under `name` (if any) and under `_prev`.
    pub fn bind(&mut self, name: Option<&str>, value: VariableValue) {
        if let Some(name) = name {
            self.variables.insert(name.to_string(), value.clone());
        }
        self.variables.insert(PREV_VARIABLE.to_string(), value);
    }

    pub fn variables(&self) -> &BTreeMap<String, VariableValue> {
        &self.variables
    }

    pub fn into_variables(self) -> BTreeMap<String, VariableValue> {
        self.variables
    }
}
