//! SiftQL Core - Column types, schema catalog, whitelist and storage boundary.
//!
//! This crate provides the foundational pieces shared by the SiftQL parser,
//! executor and function pipeline:
//!
//! - `ColumnType`: semantic column types (string, number, date, uuid, arrays…)
//! - `schema`: tables, columns, relations and the read-only `Catalog`
//! - `Whitelist`: table/column access policy with the all-columns marker
//! - `storage`: the `RowSource` boundary, structural filters and an
//!   in-memory source
//! - `value`: JSON value coercion shared by every evaluator
//! - `Error`: error types for parsing, access control and execution
//!
//! # Example
//!
//! ```rust
//! use siftql_core::schema::{Catalog, TableBuilder};
//! use siftql_core::{ColumnType, Whitelist};
//!
//! let posts = TableBuilder::new("posts")
//!     .unwrap()
//!     .add_column("id", ColumnType::Number)
//!     .unwrap()
//!     .add_column("title", ColumnType::String)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let catalog = Catalog::builder().table(posts).unwrap().build();
//! assert_eq!(catalog.default_id_column("posts").unwrap(), "id");
//!
//! let whitelist = Whitelist::new().allow_columns("posts", ["id", "title"]);
//! assert!(whitelist.ensure_columns_whitelisted("posts", &["title"]).is_ok());
//! assert!(whitelist.ensure_all_columns_allowed("posts").is_err());
//! ```

mod error;
pub mod schema;
pub mod storage;
mod types;
pub mod value;
mod whitelist;

pub use error::{Error, Result};
pub use storage::{InMemoryRowSource, RowSource, StorageError, StorageFilter};
pub use types::ColumnType;
pub use value::{Row, Value};
pub use whitelist::{ColumnPolicy, Whitelist, ALL_COLUMNS};
