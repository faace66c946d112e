//! Loader functions: enrich a list of keys with rows from storage.

use super::{input_items, CORE_NAMESPACE};
use crate::args::FunctionArgs;
use crate::function::{FunctionContext, QueryFunction};
use crate::signature::{ArgKind, ArgSpec, DataShape, FunctionCategory, FunctionSignature};
use async_trait::async_trait;
use hashbrown::HashSet;
use siftql_core::value::canonical_key;
use siftql_core::{ColumnPolicy, Error, Result, StorageFilter, Value};

/// `load(table, key?)`: fetches the rows of `table` whose `key` column
/// (default: the table's id column) equals one of the input values.
///
/// Selects every column of `table` the whitelist grants. One storage call
/// per stage; an empty input makes no call.
pub struct Load {
    signature: FunctionSignature,
}

impl Load {
    pub fn new() -> Self {
        Self {
            signature: FunctionSignature::new(
                "load",
                FunctionCategory::Loader,
                DataShape::Values,
                DataShape::Rows,
            )
            .namespace(CORE_NAMESPACE)
            .describe("Load rows whose key matches the input values")
            .arg(ArgSpec::required("table", ArgKind::String))
            .arg(ArgSpec::optional("key", ArgKind::String)),
        }
    }
}

impl Default for Load {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryFunction for Load {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    async fn execute(&self, args: &FunctionArgs, ctx: FunctionContext<'_>) -> Result<Value> {
        let table = args
            .str("table")
            .ok_or_else(|| Error::function("load", "missing table"))?;
        let def = ctx.catalog.require_table(table)?;
        let key = match args.str("key") {
            Some(key) => key.to_string(),
            None => def.id_column().to_string(),
        };

        let mut seen = HashSet::new();
        let keys: Vec<Value> = input_items("load", &ctx.input)?
            .iter()
            .filter(|v| !v.is_null())
            .filter(|v| seen.insert(canonical_key(v)))
            .cloned()
            .collect();
        if keys.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }

        let columns: Vec<String> = match ctx.whitelist.policy(table) {
            Some(ColumnPolicy::AllColumns) => def.column_names(),
            Some(ColumnPolicy::Columns(allowed)) => def
                .column_names()
                .into_iter()
                .filter(|c| allowed.contains(c))
                .collect(),
            None => return Err(Error::table_denied(table, "table is not whitelisted")),
        };
        if !columns.iter().any(|c| c == &key) {
            return Err(Error::columns_denied(
                table,
                vec![key],
                "load key column is not whitelisted",
            ));
        }

        let filter = StorageFilter::or(
            keys.into_iter()
                .map(|value| StorageFilter::Eq {
                    column: key.clone(),
                    value,
                })
                .collect(),
        );
        let rows = ctx.fetch(table, &columns, Some(&filter)).await?;
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }
}
