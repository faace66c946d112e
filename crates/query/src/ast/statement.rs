//! Statements: an expression plus binding, projection, aggregation and
//! function stages.

use super::expr::Expression;
use serde::{Deserialize, Serialize};
use siftql_functions::{DataShape, FunctionCall};

/// Aggregation applied after projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregation {
    Count,
    Unique,
    First,
    Last,
}

impl Aggregation {
    pub fn keyword(&self) -> &'static str {
        match self {
            Aggregation::Count => "COUNT",
            Aggregation::Unique => "UNIQUE",
            Aggregation::First => "FIRST",
            Aggregation::Last => "LAST",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "COUNT" => Some(Aggregation::Count),
            "UNIQUE" => Some(Aggregation::Unique),
            "FIRST" => Some(Aggregation::First),
            "LAST" => Some(Aggregation::Last),
            _ => None,
        }
    }
}

/// Output shape of a statement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "columns", rename_all = "snake_case")]
pub enum Projection {
    /// Identifying column values.
    #[default]
    Default,
    /// `AS col`: a list of that column's values.
    Column(String),
    /// `AS a,b`: objects holding those columns.
    Columns(Vec<String>),
    /// `AS *`: full rows.
    All,
}

/// One executable statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Variable the result is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub expr: Expression,
    #[serde(default)]
    pub projection: Projection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
    /// Set by `$name.key = …`: merge the result into each element of the
    /// existing array variable `name` under `key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pipeline: Vec<FunctionCall>,
}

impl Statement {
    /// An anonymous statement with the default projection.
    pub fn new(expr: Expression) -> Self {
        Self {
            name: None,
            expr,
            projection: Projection::Default,
            aggregation: None,
            target_key: None,
            pipeline: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn target_key(mut self, key: impl Into<String>) -> Self {
        self.target_key = Some(key.into());
        self
    }

    pub fn stage(mut self, call: FunctionCall) -> Self {
        self.pipeline.push(call);
        self
    }

    /// Key the result is reported under.
    pub fn result_key(&self) -> &str {
        self.name.as_deref().unwrap_or("result")
    }

    /// Data shape fed into the first function stage.
    pub fn output_shape(&self) -> DataShape {
        match (self.aggregation, &self.projection) {
            (Some(Aggregation::Count), _) => DataShape::Count,
            (Some(Aggregation::First | Aggregation::Last), _) => DataShape::Unknown,
            (_, Projection::All | Projection::Columns(_)) => DataShape::Rows,
            (_, Projection::Default | Projection::Column(_)) => DataShape::Values,
        }
    }
}
