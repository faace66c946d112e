//! Schema module for SiftQL.
//!
//! This module contains the schema catalog and its building blocks: columns,
//! tables and the relations declared between them.

mod catalog;
mod column;
mod relation;
mod table;

pub use catalog::{Catalog, CatalogBuilder, CatalogMetadata};
pub use column::TableColumn;
pub use relation::{RelationDirection, RelationMeta, RelationPath};
pub use table::{TableBuilder, TableDef};
