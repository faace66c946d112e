//! Call-site arguments and their binding to an argument schema.

use crate::signature::{ArgKind, FunctionSignature};
use serde::{Deserialize, Serialize};
use siftql_core::value::{canonical_key, parse_bool, parse_number, Map, Value};
use siftql_core::{Error, Result};

/// An argument as written in the query: positional or `name=value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallArg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub value: Value,
}

impl CallArg {
    /// A positional argument.
    pub fn positional(value: Value) -> Self {
        Self { name: None, value }
    }

    /// A named argument.
    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

/// Arguments bound to a function's schema, keyed by argument name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionArgs {
    values: Map<String, Value>,
}

impl FunctionArgs {
    /// Binds call arguments: positional ones in schema order, named ones by
    /// name. Unknown, duplicate or missing required arguments are errors.
    pub fn bind(signature: &FunctionSignature, args: &[CallArg]) -> Result<Self> {
        let fname = signature.key();
        let mut values = Map::new();
        let mut position = 0usize;

        for arg in args {
            let spec = match &arg.name {
                Some(name) => signature
                    .args_schema
                    .iter()
                    .find(|s| &s.name == name)
                    .ok_or_else(|| Error::function(&fname, format!("unknown argument '{}'", name)))?,
                None => {
                    let spec = signature.args_schema.get(position).ok_or_else(|| {
                        Error::function(
                            &fname,
                            format!(
                                "expected at most {} arguments",
                                signature.args_schema.len()
                            ),
                        )
                    })?;
                    position += 1;
                    spec
                }
            };
            if values.contains_key(&spec.name) {
                return Err(Error::function(
                    &fname,
                    format!("argument '{}' given twice", spec.name),
                ));
            }
            let value = coerce_arg(&arg.value, spec.kind).ok_or_else(|| {
                Error::function(
                    &fname,
                    format!("argument '{}' expects {:?}", spec.name, spec.kind),
                )
            })?;
            values.insert(spec.name.clone(), value);
        }

        for spec in &signature.args_schema {
            if spec.required && !values.contains_key(&spec.name) {
                return Err(Error::function(
                    &fname,
                    format!("missing required argument '{}'", spec.name),
                ));
            }
        }
        Ok(Self { values })
    }

    /// Raw argument value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String argument.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.as_str())
    }

    /// Non-negative integer argument.
    pub fn usize(&self, name: &str) -> Option<usize> {
        self.values
            .get(name)
            .and_then(|v| v.as_f64())
            .filter(|f| *f >= 0.0)
            .map(|f| f as usize)
    }

    /// Boolean argument.
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(|v| v.as_bool())
    }
}

fn coerce_arg(value: &Value, kind: ArgKind) -> Option<Value> {
    match (kind, value) {
        (ArgKind::Any, v) => Some(v.clone()),
        (ArgKind::String, Value::String(_)) => Some(value.clone()),
        (ArgKind::String, Value::Number(_) | Value::Bool(_)) => {
            Some(Value::String(canonical_key(value)))
        }
        (ArgKind::Number, Value::Number(_)) => Some(value.clone()),
        (ArgKind::Number, Value::String(s)) => {
            parse_number(s).and_then(serde_json::Number::from_f64).map(Value::Number)
        }
        (ArgKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ArgKind::Boolean, Value::String(s)) => parse_bool(s).map(Value::Bool),
        _ => None,
    }
}
