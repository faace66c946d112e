//! Schema catalog: the read-only description of every queryable table.

use super::column::TableColumn;
use super::relation::RelationMeta;
use super::table::TableDef;
use crate::error::{Error, Result};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Serialized form of the catalog, as supplied by an external metadata source.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogMetadata {
    #[serde(default)]
    pub tables: Vec<TableDef>,
    #[serde(default)]
    pub relations: Vec<RelationMeta>,
}

/// Read-only snapshot of table, column and relation metadata.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, TableDef>,
    relations: Vec<RelationMeta>,
}

impl Catalog {
    /// Creates a catalog builder.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Builds a catalog from JSON metadata.
    pub fn from_json(json: &str) -> Result<Self> {
        let metadata: CatalogMetadata = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("catalog metadata: {}", e)))?;
        Self::from_metadata(metadata)
    }

    /// Builds a catalog from already-deserialized metadata.
    pub fn from_metadata(metadata: CatalogMetadata) -> Result<Self> {
        let mut builder = CatalogBuilder::new();
        for table in metadata.tables {
            table.validate()?;
            builder = builder.table(table)?;
        }
        for relation in metadata.relations {
            builder = builder.relation(relation)?;
        }
        Ok(builder.build())
    }

    /// Returns whether `name` is a known table.
    pub fn is_valid_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Gets a table definition.
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    /// Gets a table definition or fails with `UnknownTable`.
    pub fn require_table(&self, name: &str) -> Result<&TableDef> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::unknown_table(name))
    }

    /// Gets a column of a table.
    pub fn column(&self, table: &str, column: &str) -> Option<&TableColumn> {
        self.tables.get(table).and_then(|t| t.column(column))
    }

    /// Returns the column definitions of a table, in declaration order.
    pub fn columns(&self, table: &str) -> Result<&[TableColumn]> {
        Ok(self.require_table(table)?.columns())
    }

    /// Returns every column name of a table.
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.require_table(table)?.column_names())
    }

    /// Returns the identifying column of a table.
    pub fn default_id_column(&self, table: &str) -> Result<&str> {
        Ok(self.require_table(table)?.id_column())
    }

    /// Finds the relation declared from `from` to `to`.
    pub fn relation(&self, from: &str, to: &str) -> Option<&RelationMeta> {
        self.relations
            .iter()
            .find(|r| r.from_table == from && r.to_table == to)
    }

    /// Returns all declared relations.
    pub fn relations(&self) -> &[RelationMeta] {
        &self.relations
    }

    /// Returns table names in sorted order.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Builder for a schema catalog.
#[derive(Default)]
pub struct CatalogBuilder {
    tables: HashMap<String, TableDef>,
    relations: Vec<RelationMeta>,
}

impl CatalogBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    pub fn table(mut self, table: TableDef) -> Result<Self> {
        if self.tables.contains_key(table.name()) {
            return Err(Error::config(format!(
                "Table already exists: {}",
                table.name()
            )));
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(self)
    }

    /// Adds a relation. Both tables and every key column must exist.
    pub fn relation(mut self, relation: RelationMeta) -> Result<Self> {
        if relation.from_keys.is_empty() || relation.from_keys.len() != relation.to_keys.len() {
            return Err(Error::config(format!(
                "Relation {} -> {} must pair key columns one to one",
                relation.from_table, relation.to_table
            )));
        }
        for (table, keys) in [
            (&relation.from_table, &relation.from_keys),
            (&relation.to_table, &relation.to_keys),
        ] {
            let def = self
                .tables
                .get(table)
                .ok_or_else(|| Error::unknown_table(table.as_str()))?;
            for key in keys {
                if def.column(key).is_none() {
                    return Err(Error::unknown_column(table.as_str(), key.as_str()));
                }
            }
        }
        self.relations.push(relation);
        Ok(self)
    }

    /// Builds the catalog.
    pub fn build(self) -> Catalog {
        Catalog {
            tables: self.tables,
            relations: self.relations,
        }
    }
}
