//! SiftQL Functions - Registry and pipeline of post-processing stages.
//!
//! A statement's shaped result can be fed through named stages written
//! after the query: `[Where posts ("rust")] AS * | @sort(title) | @limit(5)`.
//!
//! - `FunctionSignature`: category, data-shape contract and argument schema
//! - `QueryFunction`: the async stage trait
//! - `FunctionRegistry`: resolution and static pipeline validation
//! - `run_pipeline`: validate, bind arguments, run stages in order
//! - `builtin`: the `core` namespace (`count`, `sum`, `group_count`,
//!   `pluck`, `sort`, `limit`, `distinct`, `load`)

mod args;
pub mod builtin;
mod function;
mod pipeline;
mod registry;
mod signature;

pub use args::{CallArg, FunctionArgs};
pub use function::{FunctionContext, QueryFunction};
pub use pipeline::{run_pipeline, FunctionCall, StageScope};
pub use registry::{FunctionRegistry, PipelineValidation};
pub use signature::{ArgKind, ArgSpec, DataShape, FunctionCategory, FunctionSignature};
