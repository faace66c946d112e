//! Query executor module.
//!
//! Each statement is planned (target table, access checks, required
//! columns), fetched with a single `find_rows` call carrying whatever part
//! of the expression pushes down, rechecked in memory by a compiled
//! predicate, shaped, and finally fed through its function pipeline.

mod plan;
mod predicate;
mod pushdown;
mod relation;
mod runner;
mod shape;

pub use predicate::Predicate;
pub use pushdown::to_storage_filter;
pub use runner::{Executor, ExecutorOptions, QueryOutput, StatementErrorPolicy};
