//! SiftQL Query - Parser, executor and result cache for the SiftQL DSL.
//!
//! This crate provides the query pipeline:
//!
//! - `ast`: statements, expressions and value literals, plus the canonical printer
//! - `parser`: query text to statements, checked against the catalog
//! - `executor`: planning, pushdown, relation resolution, predicate
//!   compilation, shaping and function stages
//! - `context`: per-batch variables
//! - `query_cache`: single-flight TTL cache of batch results
//!
//! # Example
//!
//! ```rust
//! use siftql_core::schema::{Catalog, TableBuilder};
//! use siftql_core::{ColumnType, InMemoryRowSource, Whitelist};
//! use siftql_functions::FunctionRegistry;
//! use siftql_query::{parse, Executor};
//! use serde_json::json;
//!
//! let posts = TableBuilder::new("posts").unwrap()
//!     .add_column("id", ColumnType::Number).unwrap()
//!     .add_column("title", ColumnType::String).unwrap()
//!     .build().unwrap();
//! let catalog = Catalog::builder().table(posts).unwrap().build();
//! let whitelist = Whitelist::new().allow_columns("posts", ["id", "title"]);
//! let source = InMemoryRowSource::new().with_table("posts", vec![
//!     json!({"id": 1, "title": "hello world"}),
//!     json!({"id": 2, "title": "nope"}),
//! ]);
//! let registry = FunctionRegistry::with_builtins();
//!
//! let statements = parse(r#"[Where posts:title ("hello")]"#, &catalog).unwrap();
//! let executor = Executor::new(&catalog, &whitelist, &source, &registry);
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let output = rt.block_on(executor.execute_query(&statements, None)).unwrap();
//! assert_eq!(output.get("result"), Some(&json!([1])));
//! ```

pub mod ast;
pub mod context;
pub mod executor;
pub mod parser;
pub mod query_cache;

pub use ast::{print_statements, Statement};
pub use context::{ExecutionContext, VariableValue};
pub use executor::{Executor, ExecutorOptions, QueryOutput, StatementErrorPolicy};
pub use parser::{parse, Parser};
pub use query_cache::{cache_key, CacheStats, QueryCache};
