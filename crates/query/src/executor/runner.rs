//! Statement runner: executes a parsed batch in order against one row
//! source, threading variables from statement to statement.

use super::plan::{self, RequiredColumns};
use super::predicate::{compile, filter_rows, CompileEnv};
use super::pushdown::to_storage_filter;
use super::relation::{resolve_relations, RelationChecks, RelationScope};
use super::shape;
use crate::ast::{Projection, Statement};
use crate::context::{ExecutionContext, LoopFrame, VariableValue};
use serde::{Deserialize, Serialize};
use siftql_core::schema::{Catalog, TableDef};
use siftql_core::{Error, Result, Row, RowSource, Value, Whitelist};
use siftql_functions::{run_pipeline, FunctionRegistry, StageScope};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What happens to the rest of a batch when a statement fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementErrorPolicy {
    /// The first error aborts the batch.
    #[default]
    FailFast,
    /// Storage, function and variable-shape errors are logged, the
    /// statement's result is omitted and the batch continues. Access, syntax and
    /// resolution errors still abort.
    Skip,
}

/// Tunables of an [`Executor`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    pub statement_errors: StatementErrorPolicy,
    /// Whether `$v -> ALL` over an empty variable matches every row.
    pub all_matches_empty_variable: bool,
}

/// Result of one batch.
///
/// Serializes as `{"variables": {...}, "<name or result>": <value>, ...}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryOutput {
    pub variables: BTreeMap<String, VariableValue>,
    #[serde(flatten)]
    pub results: BTreeMap<String, Value>,
}

impl QueryOutput {
    /// Result reported under a statement name (or `result`).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.results.get(key)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Errors a [`StatementErrorPolicy::Skip`] batch survives.
fn is_skippable(err: &Error) -> bool {
    matches!(
        err,
        Error::Storage { .. }
            | Error::Function { .. }
            | Error::InvalidPipeline { .. }
            | Error::UnknownFunction { .. }
            | Error::VariableShape { .. }
    )
}

/// Shaped rows of one evaluation.
struct Matched {
    value: Value,
    ids: Vec<Value>,
}

/// Executes statements against a catalog, whitelist and row source.
pub struct Executor<'a> {
    catalog: &'a Catalog,
    whitelist: &'a Whitelist,
    source: &'a dyn RowSource,
    registry: &'a FunctionRegistry,
    options: ExecutorOptions,
}

impl<'a> Executor<'a> {
    pub fn new(
        catalog: &'a Catalog,
        whitelist: &'a Whitelist,
        source: &'a dyn RowSource,
        registry: &'a FunctionRegistry,
    ) -> Self {
        Self {
            catalog,
            whitelist,
            source,
            registry,
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs `statements` in order. `allowed_tables`, when given, further
    /// restricts the whitelist for this call.
    pub async fn execute_query(
        &self,
        statements: &[Statement],
        allowed_tables: Option<&[String]>,
    ) -> Result<QueryOutput> {
        debug!(statements = statements.len(), "executing query");
        let mut ctx = ExecutionContext::new();
        let mut results = BTreeMap::new();

        for (index, stmt) in statements.iter().enumerate() {
            match self.execute_statement(stmt, &mut ctx, allowed_tables).await {
                Ok(value) => {
                    results.insert(stmt.result_key().to_string(), value);
                }
                Err(err)
                    if self.options.statement_errors == StatementErrorPolicy::Skip
                        && is_skippable(&err) =>
                {
                    warn!(statement = index, error = %err, "skipping failed statement");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(QueryOutput {
            variables: ctx.into_variables(),
            results,
        })
    }

    async fn execute_statement(
        &self,
        stmt: &Statement,
        ctx: &mut ExecutionContext,
        allowed_tables: Option<&[String]>,
    ) -> Result<Value> {
        let table = plan::target_table(&stmt.expr)?;
        self.whitelist.ensure_table_whitelisted(table)?;
        plan::ensure_allowed(table, allowed_tables)?;
        let def = self.catalog.require_table(table)?;

        let columns = plan::required_columns(self.catalog, def, stmt)?;
        if columns.all {
            self.whitelist.ensure_all_columns_allowed(table)?;
        }
        self.whitelist
            .ensure_columns_whitelisted(table, &columns.names)?;

        if !stmt.pipeline.is_empty() {
            let names: Vec<&str> = stmt.pipeline.iter().map(|c| c.name.as_str()).collect();
            self.registry
                .validate_pipeline(&names, stmt.output_shape())
                .into_result()?;
        }

        let filter = to_storage_filter(&stmt.expr, def);
        let rows = self
            .source
            .find_rows(table, &columns.names, filter.as_ref())
            .await?;
        debug!(
            table,
            columns = columns.names.len(),
            pushdown = filter.is_some(),
            rows = rows.len(),
            "fetched candidate rows"
        );

        let relations = resolve_relations(
            &stmt.expr,
            table,
            &rows,
            RelationScope {
                catalog: self.catalog,
                whitelist: self.whitelist,
                source: self.source,
                allowed_tables,
            },
        )
        .await?;

        let (value, variable) = match (&stmt.name, &stmt.target_key) {
            (Some(name), Some(key)) => {
                self.join_into(stmt, name, key, def, &rows, &relations, ctx, allowed_tables)
                    .await?
            }
            _ => {
                let matched = self.evaluate(stmt, def, &rows, &relations, ctx, None)?;
                let value = self
                    .run_stages(stmt, table, matched.value, allowed_tables)
                    .await?;
                let variable = describe(&value, stmt, def, &columns, matched.ids);
                (value, variable)
            }
        };

        ctx.bind(stmt.name.as_deref(), variable);
        Ok(value)
    }

    /// Filters and shapes `rows` for one statement (or one loop element).
    fn evaluate(
        &self,
        stmt: &Statement,
        def: &TableDef,
        rows: &[Row],
        relations: &RelationChecks,
        ctx: &ExecutionContext,
        frame: Option<LoopFrame<'_>>,
    ) -> Result<Matched> {
        let env = CompileEnv {
            table: def,
            context: ctx,
            frame,
            relations,
            all_matches_empty_variable: self.options.all_matches_empty_variable,
        };
        let predicate = compile(&stmt.expr, &env)?;
        let matched = filter_rows(rows, &predicate);
        let values = shape::project(&matched, &stmt.projection, def.id_column());
        Ok(Matched {
            value: shape::aggregate(values, stmt.aggregation),
            ids: shape::ids(&matched, def.id_column()),
        })
    }

    /// `$name.key = …`: evaluates the statement once per element of `name`
    /// and attaches each result to a copy of its element under `key`.
    #[allow(clippy::too_many_arguments)]
    async fn join_into(
        &self,
        stmt: &Statement,
        name: &str,
        key: &str,
        def: &TableDef,
        rows: &[Row],
        relations: &RelationChecks,
        ctx: &ExecutionContext,
        allowed_tables: Option<&[String]>,
    ) -> Result<(Value, VariableValue)> {
        let target = ctx.require(name)?;
        let mut updated = Vec::with_capacity(target.values.len());

        for (index, element) in target.values.iter().enumerate() {
            let Value::Object(fields) = element else {
                return Err(Error::variable_shape(
                    name,
                    format!("element {} is not an object, cannot attach '{}'", index, key),
                ));
            };
            let frame = LoopFrame {
                variable: name,
                value: element,
                index,
            };
            let matched = self.evaluate(stmt, def, rows, relations, ctx, Some(frame))?;
            let result = self
                .run_stages(stmt, def.name(), matched.value, allowed_tables)
                .await?;
            let mut fields = fields.clone();
            fields.insert(key.to_string(), result);
            updated.push(Value::Object(fields));
        }
        debug!(variable = name, key, elements = updated.len(), "attached results");

        let variable = VariableValue {
            values: updated.clone(),
            ..target.clone()
        };
        Ok((Value::Array(updated), variable))
    }

    async fn run_stages(
        &self,
        stmt: &Statement,
        table: &str,
        value: Value,
        allowed_tables: Option<&[String]>,
    ) -> Result<Value> {
        run_pipeline(
            self.registry,
            &stmt.pipeline,
            stmt.output_shape(),
            value,
            StageScope {
                table: Some(table),
                source: self.source,
                catalog: self.catalog,
                whitelist: self.whitelist,
                allowed_tables,
            },
        )
        .await
    }
}

/// Variable bound for a plain statement: the result values plus where they
/// came from.
fn describe(
    result: &Value,
    stmt: &Statement,
    def: &TableDef,
    columns: &RequiredColumns,
    ids: Vec<Value>,
) -> VariableValue {
    let mut variable = VariableValue::from_result(result);
    variable.table = Some(def.name().to_string());
    match &stmt.projection {
        Projection::Default => variable.column = Some(def.id_column().to_string()),
        Projection::Column(column) => {
            variable.column = Some(column.clone());
            variable.ids = Some(ids);
        }
        Projection::Columns(list) => {
            variable.columns = Some(list.clone());
            variable.ids = Some(ids);
        }
        Projection::All => {
            variable.columns = Some(columns.names.clone());
            variable.ids = Some(ids);
        }
    }
    variable
}
