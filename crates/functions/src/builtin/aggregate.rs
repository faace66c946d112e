//! Aggregation functions.

use super::{field_of, input_items, number_value, CORE_NAMESPACE};
use crate::args::FunctionArgs;
use crate::function::{FunctionContext, QueryFunction};
use crate::signature::{ArgKind, ArgSpec, DataShape, FunctionCategory, FunctionSignature};
use async_trait::async_trait;
use hashbrown::HashMap;
use siftql_core::value::{canonical_key, coerce_number, Map};
use siftql_core::{Result, Value};

/// `count`: number of items; a number input passes through.
pub struct Count {
    signature: FunctionSignature,
}

impl Count {
    pub fn new() -> Self {
        Self {
            signature: FunctionSignature::new(
                "count",
                FunctionCategory::Aggregation,
                DataShape::Any,
                DataShape::Count,
            )
            .namespace(CORE_NAMESPACE)
            .describe("Number of items in the input"),
        }
    }
}

impl Default for Count {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryFunction for Count {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    async fn execute(&self, _args: &FunctionArgs, ctx: FunctionContext<'_>) -> Result<Value> {
        Ok(match ctx.input {
            Value::Number(n) => Value::Number(n),
            Value::Null => Value::from(0),
            Value::Array(items) => Value::from(items.len()),
            _ => Value::from(1),
        })
    }
}

/// `sum(field?)`: total of the numeric items (or of a row field).
/// Non-numeric entries are ignored.
pub struct Sum {
    signature: FunctionSignature,
}

impl Sum {
    pub fn new() -> Self {
        Self {
            signature: FunctionSignature::new(
                "sum",
                FunctionCategory::Aggregation,
                DataShape::Any,
                DataShape::Count,
            )
            .namespace(CORE_NAMESPACE)
            .describe("Sum of numeric values")
            .arg(ArgSpec::optional("field", ArgKind::String).describe("row field to sum")),
        }
    }
}

impl Default for Sum {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryFunction for Sum {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    async fn execute(&self, args: &FunctionArgs, ctx: FunctionContext<'_>) -> Result<Value> {
        let items = input_items("sum", &ctx.input)?;
        let field = args.str("field");
        let total: f64 = items
            .iter()
            .filter_map(|item| field_of(item, field))
            .filter_map(coerce_number)
            .sum();
        Ok(number_value(total))
    }
}

/// `group_count(field)`: one `{field, count}` row per distinct field value,
/// in first-seen order.
pub struct GroupCount {
    signature: FunctionSignature,
}

impl GroupCount {
    pub fn new() -> Self {
        Self {
            signature: FunctionSignature::new(
                "group_count",
                FunctionCategory::Aggregation,
                DataShape::Rows,
                DataShape::Rows,
            )
            .namespace(CORE_NAMESPACE)
            .describe("Count rows per distinct field value")
            .arg(ArgSpec::required("field", ArgKind::String)),
        }
    }
}

impl Default for GroupCount {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryFunction for GroupCount {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    async fn execute(&self, args: &FunctionArgs, ctx: FunctionContext<'_>) -> Result<Value> {
        let items = input_items("group_count", &ctx.input)?;
        let field = args.str("field").unwrap_or_default();

        let mut order: Vec<(Value, usize)> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();
        for item in items {
            let value = field_of(item, Some(field)).cloned().unwrap_or(Value::Null);
            let key = canonical_key(&value);
            match slots.get(&key) {
                Some(&slot) => order[slot].1 += 1,
                None => {
                    slots.insert(key, order.len());
                    order.push((value, 1));
                }
            }
        }

        let groups = order
            .into_iter()
            .map(|(value, count)| {
                let mut row = Map::new();
                row.insert(field.to_string(), value);
                row.insert("count".to_string(), Value::from(count));
                Value::Object(row)
            })
            .collect();
        Ok(Value::Array(groups))
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
        let ctx = FunctionContext {
            input,
            table: None,
            source: &source,
            catalog: &catalog,
            whitelist: &whitelist,
            allowed_tables: None,
        };
        function.execute(&args, ctx).await
    }

    #[tokio::test]
    async fn test_count() {
        let count = Count::new();
        assert_eq!(run(&count, &[], json!([1, 2, 3])).await.unwrap(), json!(3));
        assert_eq!(run(&count, &[], json!(7)).await.unwrap(), json!(7));
        assert_eq!(run(&count, &[], Value::Null).await.unwrap(), json!(0));
    }

    #[tokio::test]
    async fn test_sum() {
        let sum = Sum::new();
        assert_eq!(run(&sum, &[], json!([1, "2", "x", 3])).await.unwrap(), json!(6));

        let rows = json!([{"views": 1.5}, {"views": 2}, {"other": 9}]);
        let out = run(&sum, &[CallArg::positional(json!("views"))], rows)
            .await
            .unwrap();
        assert_eq!(out, json!(3.5));

        assert!(run(&sum, &[], json!("nope")).await.is_err());
    }

    #[tokio::test]
    async fn test_group_count() {
        let rows = json!([
            {"author": "ann"},
            {"author": "bob"},
            {"author": "ann"},
            {}
        ]);
        let out = run(&GroupCount::new(), &[CallArg::positional(json!("author"))], rows)
            .await
            .unwrap();
        assert_eq!(
            out,
            json!([
                {"author": "ann", "count": 2},
                {"author": "bob", "count": 1},
                {"author": null, "count": 1}
            ])
        );
    }
}
