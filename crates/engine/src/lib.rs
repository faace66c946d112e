//! SiftQL Engine - Cached, whitelist-gated execution of SiftQL query text.
//!
//! The engine ties the workspace together: it owns the catalog, the
//! whitelist, the row source and the function registry, parses query text,
//! runs batches through the executor and memoizes their results.
//!
//! - `Engine`: parse, execute and cache management
//! - `EngineBuilder`: constructor injection of every collaborator
//! - `EngineConfig`: cache and error-policy tunables, loadable from JSON
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use siftql_core::schema::Catalog;
//! use siftql_core::{InMemoryRowSource, Whitelist};
//! use siftql_engine::Engine;
//! use std::sync::Arc;
//!
//! let catalog = Catalog::from_json(r#"{
//!     "tables": [{"name": "posts", "columns": [
//!         {"name": "id", "type": "number"},
//!         {"name": "title", "type": "string"}
//!     ]}]
//! }"#).unwrap();
//! let whitelist = Whitelist::from_json(r#"{"posts": "*"}"#).unwrap();
//! let source = InMemoryRowSource::new().with_table("posts", vec![
//!     json!({"id": 1, "title": "hello world"}),
//!     json!({"id": 2, "title": "nope"}),
//! ]);
//!
//! let engine = Engine::builder()
//!     .catalog(catalog)
//!     .whitelist(whitelist)
//!     .source(Arc::new(source))
//!     .build()
//!     .unwrap();
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
//! let output = rt.block_on(engine.execute(r#"[Where posts:title ("hello")]"#, None)).unwrap();
//! assert_eq!(output.get("result"), Some(&json!([1])));
//! ```

mod config;
mod engine;

pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder};
