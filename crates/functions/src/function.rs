//! The pipeline function trait and the context handed to each stage.

use crate::args::FunctionArgs;
use crate::signature::FunctionSignature;
use async_trait::async_trait;
use siftql_core::schema::Catalog;
use siftql_core::{Error, Result, Row, RowSource, StorageFilter, Value, Whitelist};
use tracing::debug;

/// A post-processing stage registered in a [`FunctionRegistry`].
///
/// [`FunctionRegistry`]: crate::FunctionRegistry
#[async_trait]
pub trait QueryFunction: Send + Sync {
    /// Declaration used for resolution, validation and argument binding.
    fn signature(&self) -> &FunctionSignature;

    /// Runs the stage over `ctx.input`.
    async fn execute(&self, args: &FunctionArgs, ctx: FunctionContext<'_>) -> Result<Value>;
}

/// Everything a stage may see: its input, the statement's table, and the
/// same storage, catalog and access policy the statement ran under.
pub struct FunctionContext<'a> {
    pub input: Value,
    pub table: Option<&'a str>,
    pub source: &'a dyn RowSource,
    pub catalog: &'a Catalog,
    pub whitelist: &'a Whitelist,
    pub allowed_tables: Option<&'a [String]>,
}

impl<'a> FunctionContext<'a> {
    /// Fetches rows for a stage, applying the catalog, whitelist and caller
    /// allowlist checks a statement would.
    pub async fn fetch(
        &self,
        table: &str,
        columns: &[String],
        filter: Option<&StorageFilter>,
    ) -> Result<Vec<Row>> {
        self.whitelist.ensure_table_whitelisted(table)?;
        if let Some(allowed) = self.allowed_tables {
            if !allowed.iter().any(|t| t == table) {
                return Err(Error::table_denied(table, "table is not in the allowed tables"));
            }
        }
        let def = self.catalog.require_table(table)?;
        for column in columns {
            if def.column(column).is_none() {
                return Err(Error::unknown_column(table, column.as_str()));
            }
        }
        self.whitelist.ensure_columns_whitelisted(table, columns)?;

        debug!(table, columns = columns.len(), "function fetch");
        let rows = self.source.find_rows(table, columns, filter).await?;
        Ok(rows)
    }
}
