//! Pipeline execution: validate the stage list, then run stages in order.

use crate::args::{CallArg, FunctionArgs};
use crate::function::FunctionContext;
use crate::registry::FunctionRegistry;
use crate::signature::DataShape;
use serde::{Deserialize, Serialize};
use siftql_core::schema::Catalog;
use siftql_core::{Result, RowSource, Value, Whitelist};
use tracing::debug;

/// One `@name(args)` stage as written after a statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<CallArg>,
}

impl FunctionCall {
    /// A call without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, arg: CallArg) -> Self {
        self.args.push(arg);
        self
    }
}

/// Storage and policy shared by every stage of one pipeline run.
#[derive(Clone, Copy)]
pub struct StageScope<'a> {
    pub table: Option<&'a str>,
    pub source: &'a dyn RowSource,
    pub catalog: &'a Catalog,
    pub whitelist: &'a Whitelist,
    pub allowed_tables: Option<&'a [String]>,
}

impl<'a> StageScope<'a> {
    fn context(&self, input: Value) -> FunctionContext<'a> {
        FunctionContext {
            input,
            table: self.table,
            source: self.source,
            catalog: self.catalog,
            whitelist: self.whitelist,
            allowed_tables: self.allowed_tables,
        }
    }
}

/// Validates `calls` against `initial`, then feeds `input` through them.
///
/// Validation failures are reported together as `InvalidPipeline` before
/// any stage runs.
pub async fn run_pipeline(
    registry: &FunctionRegistry,
    calls: &[FunctionCall],
    initial: DataShape,
    input: Value,
    scope: StageScope<'_>,
) -> Result<Value> {
    if calls.is_empty() {
        return Ok(input);
    }
    let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
    registry.validate_pipeline(&names, initial).into_result()?;

    let mut value = input;
    for call in calls {
        let function = registry.require(&call.name)?;
        let args = FunctionArgs::bind(function.signature(), &call.args)?;
        debug!(function = %function.signature().key(), "running pipeline stage");
        value = function.execute(&args, scope.context(value)).await?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use siftql_core::{Error, InMemoryRowSource};

    fn scope<'a>(
        source: &'a InMemoryRowSource,
        catalog: &'a Catalog,
        whitelist: &'a Whitelist,
    ) -> StageScope<'a> {
        StageScope {
            table: None,
            source,
            catalog,
            whitelist,
            allowed_tables: None,
        }
    }

    #[tokio::test]
    async fn test_runs_stages_in_order() {
        let registry = FunctionRegistry::with_builtins();
        let source = InMemoryRowSource::new();
        let catalog = Catalog::builder().build();
        let whitelist = Whitelist::new();

        let calls = vec![
            FunctionCall::new("sort").arg(CallArg::named("order", json!("desc"))),
            FunctionCall::new("limit").arg(CallArg::positional(json!(2))),
        ];
        let out = run_pipeline(
            &registry,
            &calls,
            DataShape::Values,
            json!([3, 1, 5, 4]),
            scope(&source, &catalog, &whitelist),
        )
        .await
        .unwrap();
        assert_eq!(out, json!([5, 4]));
    }

    #[tokio::test]
    async fn test_invalid_pipeline_runs_nothing() {
        let registry = FunctionRegistry::with_builtins();
        let source = InMemoryRowSource::new();
        let catalog = Catalog::builder().build();
        let whitelist = Whitelist::new();

        let calls = vec![FunctionCall::new("count"), FunctionCall::new("pluck")];
        let err = run_pipeline(
            &registry,
            &calls,
            DataShape::Values,
            json!([1, 2]),
            scope(&source, &catalog, &whitelist),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidPipeline { .. }));
    }

    #[test]
    fn test_call_serialization() {
        let call = FunctionCall::new("limit").arg(CallArg::positional(json!(5)));
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({"name": "limit", "args": [{"value": 5}]})
        );
    }
}
