//! Function declarations: category, data-shape contract and argument schema.

use core::fmt;
use serde::{Deserialize, Serialize};

/// What a pipeline function does with its input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionCategory {
    /// Collapses the input into a summary.
    Aggregation,
    /// Reshapes or reorders the input.
    Transform,
    /// Enriches the input with rows fetched from storage.
    Loader,
}

/// Data-shape token threaded through pipeline validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataShape {
    /// Accepts anything; as an output, passes the input shape through.
    Any,
    /// Array of row objects.
    Rows,
    /// Array of scalars.
    Values,
    /// Array of rows of the `posts` table.
    Posts,
    /// A single number.
    Count,
    /// Shape cannot be determined statically.
    Unknown,
}

impl fmt::Display for DataShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataShape::Any => "any",
            DataShape::Rows => "rows",
            DataShape::Values => "values",
            DataShape::Posts => "posts",
            DataShape::Count => "count",
            DataShape::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Accepted argument kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    String,
    Number,
    Boolean,
    Any,
}

/// One declared argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    pub kind: ArgKind,
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

impl ArgSpec {
    /// A required argument.
    pub fn required(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: String::new(),
        }
    }

    /// An optional argument.
    pub fn optional(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: String::new(),
        }
    }

    /// Sets the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Declaration of a pipeline function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub category: FunctionCategory,
    pub input_type: DataShape,
    pub output_type: DataShape,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub args_schema: Vec<ArgSpec>,
}

impl FunctionSignature {
    /// Creates a signature without arguments.
    pub fn new(
        name: impl Into<String>,
        category: FunctionCategory,
        input_type: DataShape,
        output_type: DataShape,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            category,
            input_type,
            output_type,
            description: String::new(),
            args_schema: Vec::new(),
        }
    }

    /// Sets the namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends an argument to the schema.
    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args_schema.push(spec);
        self
    }

    /// Registry key: `namespace.name`, or the bare name.
    pub fn key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key() {
        let sig = FunctionSignature::new(
            "count",
            FunctionCategory::Aggregation,
            DataShape::Any,
            DataShape::Count,
        );
        assert_eq!(sig.key(), "count");
        assert_eq!(sig.namespace("core").key(), "core.count");
    }

    #[test]
    fn test_shape_tokens() {
        assert_eq!(DataShape::Rows.to_string(), "rows");
        let shape: DataShape = serde_json::from_str("\"posts\"").unwrap();
        assert_eq!(shape, DataShape::Posts);
    }
}
