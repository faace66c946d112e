//! Transform functions.

use super::{field_of, input_items, CORE_NAMESPACE};
use crate::args::FunctionArgs;
use crate::function::{FunctionContext, QueryFunction};
use crate::signature::{ArgKind, ArgSpec, DataShape, FunctionCategory, FunctionSignature};
use async_trait::async_trait;
use siftql_core::value::{compare_values, dedup_by_serialization};
use siftql_core::{Error, Result, Value};

/// `pluck(field)`: projects rows to one field's values.
pub struct Pluck {
    signature: FunctionSignature,
}

impl Pluck {
    pub fn new() -> Self {
        Self {
            signature: FunctionSignature::new(
                "pluck",
                FunctionCategory::Transform,
                DataShape::Rows,
                DataShape::Values,
            )
            .namespace(CORE_NAMESPACE)
            .describe("Values of one field")
            .arg(ArgSpec::required("field", ArgKind::String)),
        }
    }
}

impl Default for Pluck {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryFunction for Pluck {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    async fn execute(&self, args: &FunctionArgs, ctx: FunctionContext<'_>) -> Result<Value> {
        let items = input_items("pluck", &ctx.input)?;
        let field = args.str("field");
        Ok(Value::Array(
            items
                .iter()
                .map(|item| field_of(item, field).cloned().unwrap_or(Value::Null))
                .collect(),
        ))
    }
}

/// `sort(field?, order?)`: stable sort, ascending unless `order` is `desc`.
pub struct Sort {
    signature: FunctionSignature,
}

impl Sort {
    pub fn new() -> Self {
        Self {
            signature: FunctionSignature::new(
                "sort",
                FunctionCategory::Transform,
                DataShape::Any,
                DataShape::Any,
            )
            .namespace(CORE_NAMESPACE)
            .describe("Sort items, or rows by a field")
            .arg(ArgSpec::optional("field", ArgKind::String))
            .arg(ArgSpec::optional("order", ArgKind::String).describe("asc or desc")),
        }
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryFunction for Sort {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    async fn execute(&self, args: &FunctionArgs, ctx: FunctionContext<'_>) -> Result<Value> {
        let descending = match args.str("order").map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(other) => {
                return Err(Error::function(
                    "sort",
                    format!("order must be asc or desc, got '{}'", other),
                ))
            }
        };
        let field = args.str("field");
        let mut items = input_items("sort", &ctx.input)?.to_vec();
        items.sort_by(|a, b| {
            let ord = compare_values(
                field_of(a, field).unwrap_or(&Value::Null),
                field_of(b, field).unwrap_or(&Value::Null),
            );
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        Ok(Value::Array(items))
    }
}

/// `limit(n, offset?)`: a page of the input.
pub struct Limit {
    signature: FunctionSignature,
}

impl Limit {
    pub fn new() -> Self {
        Self {
            signature: FunctionSignature::new(
                "limit",
                FunctionCategory::Transform,
                DataShape::Any,
                DataShape::Any,
            )
            .namespace(CORE_NAMESPACE)
            .describe("Keep at most n items after skipping offset")
            .arg(ArgSpec::required("n", ArgKind::Number))
            .arg(ArgSpec::optional("offset", ArgKind::Number)),
        }
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryFunction for Limit {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    async fn execute(&self, args: &FunctionArgs, ctx: FunctionContext<'_>) -> Result<Value> {
        let n = args
            .usize("n")
            .ok_or_else(|| Error::function("limit", "n must be a non-negative number"))?;
        let offset = args.usize("offset").unwrap_or(0);
        let items = input_items("limit", &ctx.input)?;
        Ok(Value::Array(
            items.iter().skip(offset).take(n).cloned().collect(),
        ))
    }
}

/// `distinct`: drops deep-equal duplicates, keeping the first.
pub struct Distinct {
    signature: FunctionSignature,
}

impl Distinct {
    pub fn new() -> Self {
        Self {
            signature: FunctionSignature::new(
                "distinct",
                FunctionCategory::Transform,
                DataShape::Any,
                DataShape::Any,
            )
            .namespace(CORE_NAMESPACE)
            .describe("Remove duplicate items"),
        }
    }
}

impl Default for Distinct {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryFunction for Distinct {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    async fn execute(&self, _args: &FunctionArgs, ctx: FunctionContext<'_>) -> Result<Value> {
        let items = input_items("distinct", &ctx.input)?.to_vec();
        Ok(Value::Array(dedup_by_serialization(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::CallArg;
    use serde_json::json;
    use siftql_core::schema::Catalog;
    use siftql_core::{InMemoryRowSource, Whitelist};

    async fn run(function: &dyn QueryFunction, args: &[CallArg], input: Value) -> Result<Value> {
        let source = InMemoryRowSource::new();
        let catalog = Catalog::builder().build();
        let whitelist = Whitelist::new();
        let args = FunctionArgs::bind(function.signature(), args)?;
        function
            .execute(
                &args,
                FunctionContext {
                    input,
                    table: None,
                    source: &source,
                    catalog: &catalog,
                    whitelist: &whitelist,
                    allowed_tables: None,
                },
            )
            .await
    }

    #[tokio::test]
    async fn test_pluck() {
        let rows = json!([{"id": 1, "title": "a"}, {"id": 2}]);
        let out = run(&Pluck::new(), &[CallArg::positional(json!("title"))], rows)
            .await
            .unwrap();
        assert_eq!(out, json!(["a", null]));
    }

    #[tokio::test]
    async fn test_sort_rows_by_field() {
        let rows = json!([{"t": "b"}, {"t": "c"}, {"t": "a"}]);
        let out = run(
            &Sort::new(),
            &[
                CallArg::positional(json!("t")),
                CallArg::positional(json!("DESC")),
            ],
            rows,
        )
        .await
        .unwrap();
        assert_eq!(out, json!([{"t": "c"}, {"t": "b"}, {"t": "a"}]));

        let err = run(
            &Sort::new(),
            &[CallArg::named("order", json!("sideways"))],
            json!([1]),
        )
        .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_limit_with_offset() {
        let out = run(
            &Limit::new(),
            &[
                CallArg::positional(json!(2)),
                CallArg::named("offset", json!(1)),
            ],
            json!([1, 2, 3, 4]),
        )
        .await
        .unwrap();
        assert_eq!(out, json!([2, 3]));
    }

    #[tokio::test]
    async fn test_distinct() {
        let out = run(
            &Distinct::new(),
            &[],
            json!([{"a": 1}, 2, {"a": 1}, 2, "2"]),
        )
        .await
        .unwrap();
        assert_eq!(out, json!([{"a": 1}, 2, "2"]));
    }
}
