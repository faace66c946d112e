//! Structural storage filters.

use crate::value::{coerce_date, loose_eq, Row, Value};
use serde::Serialize;

/// Filter a row source applies itself.
///
/// Text operators carry `case_insensitive`, which maps onto the store's
/// case-insensitive match mode. Ranges are inclusive Unix milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StorageFilter {
    Eq {
        column: String,
        value: Value,
    },
    Contains {
        column: String,
        value: String,
        case_insensitive: bool,
    },
    StartsWith {
        column: String,
        value: String,
        case_insensitive: bool,
    },
    EndsWith {
        column: String,
        value: String,
        case_insensitive: bool,
    },
    Range {
        column: String,
        from_ms: Option<i64>,
        to_ms: Option<i64>,
    },
    And {
        filters: Vec<StorageFilter>,
    },
    Or {
        filters: Vec<StorageFilter>,
    },
}

/// Text operator kinds, for error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

impl TextOp {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            TextOp::Contains => "contains",
            TextOp::StartsWith => "starts_with",
            TextOp::EndsWith => "ends_with",
        }
    }

    fn apply(&self, haystack: &str, needle: &str) -> bool {
        match self {
            TextOp::Contains => haystack.contains(needle),
            TextOp::StartsWith => haystack.starts_with(needle),
            TextOp::EndsWith => haystack.ends_with(needle),
        }
    }
}

/// Outcome of evaluating a filter against one row.
pub(crate) enum FilterEval {
    Match(bool),
    /// A text operator hit a non-text cell.
    Unsupported { column: String, op: TextOp },
}

impl StorageFilter {
    /// Conjunction of `filters`, collapsing the single-element case.
    pub fn and(mut filters: Vec<StorageFilter>) -> StorageFilter {
        if filters.len() == 1 {
            filters.remove(0)
        } else {
            StorageFilter::And { filters }
        }
    }

    /// Disjunction of `filters`, collapsing the single-element case.
    pub fn or(mut filters: Vec<StorageFilter>) -> StorageFilter {
        if filters.len() == 1 {
            filters.remove(0)
        } else {
            StorageFilter::Or { filters }
        }
    }

    /// Columns the filter reads.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            StorageFilter::Eq { column, .. }
            | StorageFilter::Contains { column, .. }
            | StorageFilter::StartsWith { column, .. }
            | StorageFilter::EndsWith { column, .. }
            | StorageFilter::Range { column, .. } => vec![column.as_str()],
            StorageFilter::And { filters } | StorageFilter::Or { filters } => {
                filters.iter().flat_map(|f| f.columns()).collect()
            }
        }
    }

    /// Reference semantics used by the in-memory source.
    pub(crate) fn eval(&self, row: &Row) -> FilterEval {
        match self {
            StorageFilter::Eq { column, value } => FilterEval::Match(
                row.get(column)
                    .map(|cell| !cell.is_null() && loose_eq(cell, value))
                    .unwrap_or(false),
            ),
            StorageFilter::Contains {
                column,
                value,
                case_insensitive,
            } => eval_text(row, column, value, *case_insensitive, TextOp::Contains),
            StorageFilter::StartsWith {
                column,
                value,
                case_insensitive,
            } => eval_text(row, column, value, *case_insensitive, TextOp::StartsWith),
            StorageFilter::EndsWith {
                column,
                value,
                case_insensitive,
            } => eval_text(row, column, value, *case_insensitive, TextOp::EndsWith),
            StorageFilter::Range {
                column,
                from_ms,
                to_ms,
            } => {
                let millis = row.get(column).and_then(coerce_date);
                FilterEval::Match(match millis {
                    Some(ms) => {
                        from_ms.map_or(true, |from| ms >= from) && to_ms.map_or(true, |to| ms <= to)
                    }
                    None => false,
                })
            }
            StorageFilter::And { filters } => {
                for filter in filters {
                    match filter.eval(row) {
                        FilterEval::Match(true) => {}
                        other => return other,
                    }
                }
                FilterEval::Match(true)
            }
            StorageFilter::Or { filters } => {
                for filter in filters {
                    match filter.eval(row) {
                        FilterEval::Match(false) => {}
                        other => return other,
                    }
                }
                FilterEval::Match(false)
            }
        }
    }
}

fn eval_text(row: &Row, column: &str, needle: &str, case_insensitive: bool, op: TextOp) -> FilterEval {
    match row.get(column) {
        None | Some(Value::Null) => FilterEval::Match(false),
        Some(Value::String(text)) => {
            let matched = if case_insensitive {
                op.apply(&text.to_lowercase(), &needle.to_lowercase())
            } else {
                op.apply(text, needle)
            };
            FilterEval::Match(matched)
        }
        Some(_) => FilterEval::Unsupported {
            column: column.to_string(),
            op,
        },
    }
}
