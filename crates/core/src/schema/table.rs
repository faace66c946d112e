//! Table definition for SiftQL schema.

use super::column::TableColumn;
use crate::error::{Error, Result};
use crate::types::ColumnType;
use serde::{Deserialize, Serialize};

/// A table known to the schema catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name.
    name: String,
    /// Column definitions.
    columns: Vec<TableColumn>,
    /// Column identifying a row, used as the default projection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_column: Option<String>,
}

impl TableDef {
    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns.
    #[inline]
    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    /// Gets a column by name.
    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Returns all column names in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Returns the identifying column.
    ///
    /// Uses the declared id column, then a column named `id`, then the
    /// first column.
    pub fn id_column(&self) -> &str {
        if let Some(id) = &self.id_column {
            return id;
        }
        if self.column("id").is_some() {
            return "id";
        }
        self.columns.first().map(|c| c.name()).unwrap_or("id")
    }

    /// Checks the definition after deserialization.
    pub(crate) fn validate(&self) -> Result<()> {
        check_naming_rules(&self.name)?;
        let mut seen = hashbrown::HashSet::new();
        for col in &self.columns {
            check_naming_rules(col.name())?;
            if !seen.insert(col.name()) {
                return Err(Error::config(format!(
                    "Column already exists: {}.{}",
                    self.name,
                    col.name()
                )));
            }
        }
        if let Some(id) = &self.id_column {
            if self.column(id).is_none() {
                return Err(Error::config(format!(
                    "Id column {} not found in table {}",
                    id, self.name
                )));
            }
        }
        Ok(())
    }
}

/// Validates a name follows naming rules.
pub(crate) fn check_naming_rules(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return Err(Error::config("Name cannot be empty")),
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(Error::config(format!(
            "Name must start with letter or underscore: {}",
            name
        )));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::config(format!(
            "Name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}

/// Builder for creating table definitions.
pub struct TableBuilder {
    name: String,
    columns: Vec<TableColumn>,
    id_column: Option<String>,
}

impl TableBuilder {
    /// Creates a new table builder.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
            id_column: None,
        })
    }

    /// Adds a required column.
    pub fn add_column(self, name: impl Into<String>, column_type: ColumnType) -> Result<Self> {
        self.push_column(TableColumn::new(name, column_type))
    }

    /// Adds an optional column.
    pub fn add_optional(self, name: impl Into<String>, column_type: ColumnType) -> Result<Self> {
        self.push_column(TableColumn::new(name, column_type).optional(true))
    }

    fn push_column(mut self, column: TableColumn) -> Result<Self> {
        check_naming_rules(column.name())?;
        if self.columns.iter().any(|c| c.name() == column.name()) {
            return Err(Error::config(format!(
                "Column already exists: {}",
                column.name()
            )));
        }
        self.columns.push(column);
        Ok(self)
    }

    /// Sets the identifying column.
    pub fn id_column(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !self.columns.iter().any(|c| c.name() == name) {
            return Err(Error::config(format!("Column not found: {}", name)));
        }
        self.id_column = Some(name);
        Ok(self)
    }

    /// Builds the table definition.
    pub fn build(self) -> Result<TableDef> {
        if self.columns.is_empty() {
            return Err(Error::config(format!(
                "Table {} must have at least one column",
                self.name
            )));
        }
        Ok(TableDef {
            name: self.name,
            columns: self.columns,
            id_column: self.id_column,
        })
    }
}
