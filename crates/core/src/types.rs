//! Column type definitions for SiftQL.
//!
//! The semantic type of a column decides which conditions can be pushed down
//! to storage and how literal query values are coerced before comparison.

use serde::{Deserialize, Serialize};

/// Semantic column types known to the schema catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// UTF-8 text
    String,
    /// Integer or floating point number
    Number,
    /// true/false
    Boolean,
    /// Date or timestamp
    Date,
    /// Arbitrary JSON document
    Json,
    /// UUID stored as text
    Uuid,
    /// Integer wider than 53 bits, usually transported as text
    #[serde(alias = "bigint")]
    BigInt,
    /// Array of text
    #[serde(alias = "string[]")]
    StringArray,
    /// Array of numbers
    #[serde(alias = "number[]")]
    NumberArray,
    /// Array of JSON documents
    #[serde(alias = "json[]")]
    JsonArray,
}

impl ColumnType {
    /// Returns whether values of this column are arrays.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            ColumnType::StringArray | ColumnType::NumberArray | ColumnType::JsonArray
        )
    }

    /// Returns whether text operators (contains, starts with, ends with)
    /// are supported by storage for this column.
    pub fn supports_text_ops(&self) -> bool {
        matches!(self, ColumnType::String)
    }

    /// Returns whether an exact-match condition on this column can be
    /// pushed down when the literal parses as the column's type.
    pub fn supports_exact_pushdown(&self) -> bool {
        matches!(
            self,
            ColumnType::Number | ColumnType::Boolean | ColumnType::Date | ColumnType::BigInt
        )
    }

    /// Returns whether range conditions can be pushed down.
    pub fn supports_range_pushdown(&self) -> bool {
        matches!(self, ColumnType::Date)
    }

    /// Element type for array columns, the type itself otherwise.
    pub fn element_type(&self) -> ColumnType {
        match self {
            ColumnType::StringArray => ColumnType::String,
            ColumnType::NumberArray => ColumnType::Number,
            ColumnType::JsonArray => ColumnType::Json,
            other => *other,
        }
    }
}
