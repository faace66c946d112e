//! Column definition for SiftQL schema.

use crate::types::ColumnType;
use serde::{Deserialize, Serialize};

/// A column of a catalog table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name.
    name: String,
    /// Semantic type.
    #[serde(rename = "type")]
    column_type: ColumnType,
    /// Whether the column may be null or missing.
    #[serde(default)]
    optional: bool,
}

impl TableColumn {
    /// Creates a new required column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            optional: false,
        }
    }

    /// Sets whether this column is optional.
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Returns the column name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the semantic type.
    #[inline]
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Returns whether this column is optional.
    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}
