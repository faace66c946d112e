//! Translation of statement expressions into storage filters.
//!
//! Pushdown only narrows what storage returns; the compiled predicate
//! rechecks every fetched row, so a condition that cannot be expressed
//! structurally is simply left out. `NOT`, variables, lists, emptiness
//! tests, relations and column-less atoms never push down. An `OR` pushes
//! down only when both sides do, and so does an `AND`.

use crate::ast::{Expression, QueryValue, TextMatch, WhereNode};
use siftql_core::schema::{TableColumn, TableDef};
use siftql_core::value::{parse_big_int, parse_bool, parse_date, parse_date_upper, parse_number};
use siftql_core::{ColumnType, StorageFilter, Value};

/// Storage filter equivalent to (a superset of) `expr` on `table`.
pub fn to_storage_filter(expr: &Expression, table: &TableDef) -> Option<StorageFilter> {
    match expr {
        Expression::And(left, right) => {
            let left = to_storage_filter(left, table)?;
            let right = to_storage_filter(right, table)?;
            Some(merge_and(left, right))
        }
        Expression::Or(left, right) => {
            let left = to_storage_filter(left, table)?;
            let right = to_storage_filter(right, table)?;
            Some(merge_or(left, right))
        }
        Expression::Not(_) => None,
        Expression::Atom(WhereNode::Basic {
            table: atom_table,
            columns: Some(columns),
            value,
        }) if columns.len() == 1 && atom_table == table.name() => {
            atom_filter(table.column(&columns[0])?, value)
        }
        Expression::Atom(_) => None,
    }
}

fn merge_and(left: StorageFilter, right: StorageFilter) -> StorageFilter {
    let mut filters = Vec::new();
    for filter in [left, right] {
        match filter {
            StorageFilter::And { filters: inner } => filters.extend(inner),
            other => filters.push(other),
        }
    }
    StorageFilter::And { filters }
}

fn merge_or(left: StorageFilter, right: StorageFilter) -> StorageFilter {
    let mut filters = Vec::new();
    for filter in [left, right] {
        match filter {
            StorageFilter::Or { filters: inner } => filters.extend(inner),
            other => filters.push(other),
        }
    }
    StorageFilter::Or { filters }
}

fn atom_filter(column: &TableColumn, value: &QueryValue) -> Option<StorageFilter> {
    let name = column.name().to_string();
    let column_type = column.column_type();
    match value {
        QueryValue::Text {
            value,
            case_sensitive,
            mode,
        } => {
            if column_type.supports_text_ops() {
                let value = value.clone();
                let case_insensitive = !case_sensitive;
                return Some(match mode {
                    TextMatch::Contains => StorageFilter::Contains {
                        column: name,
                        value,
                        case_insensitive,
                    },
                    TextMatch::StartsWith => StorageFilter::StartsWith {
                        column: name,
                        value,
                        case_insensitive,
                    },
                    TextMatch::EndsWith => StorageFilter::EndsWith {
                        column: name,
                        value,
                        case_insensitive,
                    },
                });
            }
            if *mode != TextMatch::Contains || !column_type.supports_exact_pushdown() {
                return None;
            }
            exact_filter(name, column_type, value)
        }
        QueryValue::DateRange { from, to } if column_type.supports_range_pushdown() => {
            let from_ms = match from {
                Some(text) => Some(parse_date(text)?),
                None => None,
            };
            let to_ms = match to {
                Some(text) => Some(parse_date_upper(text)?),
                None => None,
            };
            Some(StorageFilter::Range {
                column: name,
                from_ms,
                to_ms,
            })
        }
        _ => None,
    }
}

/// Exact match on a typed column, when the literal parses as that type.
/// A date literal matches the whole day (or the exact instant).
fn exact_filter(column: String, column_type: ColumnType, text: &str) -> Option<StorageFilter> {
    let value = match column_type {
        ColumnType::Number => number_literal(parse_number(text)?),
        ColumnType::BigInt => {
            let big = parse_big_int(text)?;
            match i64::try_from(big) {
                Ok(small) => Value::from(small),
                Err(_) => Value::String(big.to_string()),
            }
        }
        ColumnType::Boolean => Value::Bool(parse_bool(text)?),
        ColumnType::Date => {
            return Some(StorageFilter::Range {
                column,
                from_ms: Some(parse_date(text)?),
                to_ms: Some(parse_date_upper(text)?),
            })
        }
        _ => return None,
    };
    Some(StorageFilter::Eq { column, value })
}

fn number_literal(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < 9.007_199_254_740_992e15 {
        Value::from(number as i64)
    } else {
        serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siftql_core::schema::TableBuilder;

    fn table() -> TableDef {
        TableBuilder::new("posts")
            .unwrap()
            .add_column("id", ColumnType::Number)
            .unwrap()
            .add_column("title", ColumnType::String)
            .unwrap()
            .add_column("published", ColumnType::Boolean)
            .unwrap()
            .add_column("created_at", ColumnType::Date)
            .unwrap()
            .add_column("owner", ColumnType::Uuid)
            .unwrap()
            .build()
            .unwrap()
    }

    fn atom(column: &str, value: QueryValue) -> Expression {
        Expression::basic("posts", Some(vec![column]), value)
    }

    #[test]
    fn test_text_on_string_column() {
        let expr = atom(
            "title",
            QueryValue::Text {
                value: "Rust".into(),
                case_sensitive: true,
                mode: TextMatch::StartsWith,
            },
        );
        assert_eq!(
            to_storage_filter(&expr, &table()),
            Some(StorageFilter::StartsWith {
                column: "title".into(),
                value: "Rust".into(),
                case_insensitive: false,
            })
        );
    }

    #[test]
    fn test_exact_match_on_typed_columns() {
        let filter = to_storage_filter(&atom("id", QueryValue::text("42")), &table());
        assert_eq!(
            filter,
            Some(StorageFilter::Eq {
                column: "id".into(),
                value: Value::from(42),
            })
        );
        let filter = to_storage_filter(&atom("published", QueryValue::text("TRUE")), &table());
        assert_eq!(
            filter,
            Some(StorageFilter::Eq {
                column: "published".into(),
                value: Value::Bool(true),
            })
        );
        // Unparseable literals stay in memory.
        assert_eq!(to_storage_filter(&atom("id", QueryValue::text("abc")), &table()), None);
        // Uuid columns never take text operators.
        assert_eq!(
            to_storage_filter(&atom("owner", QueryValue::text("abc")), &table()),
            None
        );
    }

    #[test]
    fn test_date_range_upper_bound_covers_day() {
        let expr = atom(
            "created_at",
            QueryValue::DateRange {
                from: Some("2024-01-01".into()),
                to: Some("2024-01-31".into()),
            },
        );
        let Some(StorageFilter::Range { from_ms, to_ms, .. }) = to_storage_filter(&expr, &table())
        else {
            panic!("expected a range");
        };
        assert_eq!(from_ms, parse_date("2024-01-01"));
        assert_eq!(to_ms, parse_date("2024-02-01").map(|ms| ms - 1));
    }

    #[test]
    fn test_boolean_structure() {
        let title = atom("title", QueryValue::text("a"));
        let id = atom("id", QueryValue::text("1"));
        let empty = atom("title", QueryValue::Empty);

        let and = Expression::and(Expression::and(title.clone(), id.clone()), title.clone());
        match to_storage_filter(&and, &table()) {
            Some(StorageFilter::And { filters }) => assert_eq!(filters.len(), 3),
            other => panic!("unexpected {:?}", other),
        }

        assert!(to_storage_filter(&Expression::or(title.clone(), id), &table()).is_some());
        assert!(to_storage_filter(&Expression::or(title.clone(), empty.clone()), &table()).is_none());
        assert!(to_storage_filter(&Expression::and(title.clone(), empty), &table()).is_none());
        assert!(to_storage_filter(&Expression::not(title.clone()), &table()).is_none());

        // same column name, other table
        let foreign = Expression::basic("users", Some(vec!["title"]), QueryValue::text("a"));
        assert!(to_storage_filter(&foreign, &table()).is_none());
        assert!(to_storage_filter(&Expression::or(title, foreign), &table()).is_none());
    }
}
