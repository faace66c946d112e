//! Relation atoms: `Where a -> b` and `Where a <- b`.
//!
//! Existence of related rows is resolved in bulk before the predicate runs:
//! the distinct key tuples of the fetched candidate rows go to storage in a
//! single call per relation, and the compiled predicate then only tests set
//! membership. The number of round trips therefore never depends on the
//! number of candidate rows.

use super::plan::{ensure_allowed, relation_path};
use crate::ast::{Expression, WhereNode};
use hashbrown::HashSet;
use siftql_core::schema::{Catalog, RelationDirection};
use siftql_core::value::canonical_key;
use siftql_core::{Result, Row, RowSource, StorageFilter, Value, Whitelist};
use tracing::{debug, warn};

const TUPLE_SEPARATOR: char = '\u{1f}';

/// Outcome of resolving one relation atom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RelationCheck {
    /// No relation is declared between the tables. Never matches.
    Unknown,
    /// Key tuples of the candidate rows for which a related row exists.
    Resolved {
        local_keys: Vec<String>,
        existing: HashSet<String>,
    },
}

impl RelationCheck {
    pub(crate) fn matches(&self, row: &Row) -> bool {
        match self {
            RelationCheck::Unknown => false,
            RelationCheck::Resolved {
                local_keys,
                existing,
            } => tuple_key(row, local_keys).map_or(false, |key| existing.contains(&key)),
        }
    }
}

#[derive(Clone, Debug)]
struct RelationEntry {
    direction: RelationDirection,
    from_table: String,
    to_table: String,
    check: RelationCheck,
}

/// Resolved relation atoms of one statement.
#[derive(Clone, Debug, Default)]
pub(crate) struct RelationChecks {
    entries: Vec<RelationEntry>,
}

impl RelationChecks {
    pub(crate) fn get(
        &self,
        direction: RelationDirection,
        from_table: &str,
        to_table: &str,
    ) -> Option<&RelationCheck> {
        self.entries
            .iter()
            .find(|e| e.direction == direction && e.from_table == from_table && e.to_table == to_table)
            .map(|e| &e.check)
    }
}

/// Key of a tuple of cells, or `None` when any cell is null or missing.
pub(crate) fn tuple_key(row: &Row, keys: &[String]) -> Option<String> {
    let mut out = String::new();
    for (i, key) in keys.iter().enumerate() {
        let cell = row.get(key).filter(|v| !v.is_null())?;
        if i > 0 {
            out.push(TUPLE_SEPARATOR);
        }
        out.push_str(&canonical_key(cell));
    }
    Some(out)
}

/// Storage and policy a relation lookup runs against.
#[derive(Clone, Copy)]
pub(crate) struct RelationScope<'a> {
    pub catalog: &'a Catalog,
    pub whitelist: &'a Whitelist,
    pub source: &'a dyn RowSource,
    pub allowed_tables: Option<&'a [String]>,
}

/// Resolves every distinct relation atom of `expr` starting at `table`
/// against `rows`, which are rows of `table`.
pub(crate) async fn resolve_relations(
    expr: &Expression,
    table: &str,
    rows: &[Row],
    scope: RelationScope<'_>,
) -> Result<RelationChecks> {
    let mut checks = RelationChecks::default();
    for atom in expr.atoms() {
        let WhereNode::Relation {
            direction,
            from_table,
            to_table,
        } = atom
        else {
            continue;
        };
        if from_table != table {
            continue;
        }
        if checks.get(*direction, from_table, to_table).is_some() {
            continue;
        }
        let check = resolve_one(*direction, from_table, to_table, rows, scope).await?;
        checks.entries.push(RelationEntry {
            direction: *direction,
            from_table: from_table.clone(),
            to_table: to_table.clone(),
            check,
        });
    }
    Ok(checks)
}

async fn resolve_one(
    direction: RelationDirection,
    from_table: &str,
    to_table: &str,
    rows: &[Row],
    scope: RelationScope<'_>,
) -> Result<RelationCheck> {
    let Some(path) = relation_path(scope.catalog, direction, from_table, to_table) else {
        warn!(from = from_table, to = to_table, ?direction, "no relation declared; atom never matches");
        return Ok(RelationCheck::Unknown);
    };
    scope
        .whitelist
        .ensure_columns_whitelisted(&path.remote_table, &path.remote_keys)?;
    ensure_allowed(&path.remote_table, scope.allowed_tables)?;

    let mut seen = HashSet::new();
    let mut tuples: Vec<Vec<Value>> = Vec::new();
    for row in rows {
        let Some(key) = tuple_key(row, &path.local_keys) else {
            continue;
        };
        if seen.insert(key) {
            tuples.push(
                path.local_keys
                    .iter()
                    .map(|k| row.get(k).cloned().unwrap_or(Value::Null))
                    .collect(),
            );
        }
    }

    let mut existing = HashSet::new();
    if !tuples.is_empty() {
        let filter = StorageFilter::or(
            tuples
                .into_iter()
                .map(|tuple| {
                    StorageFilter::and(
                        path.remote_keys
                            .iter()
                            .zip(tuple)
                            .map(|(column, value)| StorageFilter::Eq {
                                column: column.clone(),
                                value,
                            })
                            .collect(),
                    )
                })
                .collect(),
        );
        let remote = scope
            .source
            .find_rows(&path.remote_table, &path.remote_keys, Some(&filter))
            .await?;
        existing.extend(remote.iter().filter_map(|r| tuple_key(r, &path.remote_keys)));
    }

    debug!(
        from = from_table,
        to = to_table,
        remote = %path.remote_table,
        candidates = seen.len(),
        existing = existing.len(),
        "resolved relation"
    );
    Ok(RelationCheck::Resolved {
        local_keys: path.local_keys,
        existing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_tuple_key() {
        let r = row(json!({"a": 1, "b": "x", "c": null}));
        assert_eq!(tuple_key(&r, &["a".to_string()]), Some("1".to_string()));
        assert_eq!(
            tuple_key(&r, &["a".to_string(), "b".to_string()]),
            Some("1\u{1f}x".to_string())
        );
        assert_eq!(tuple_key(&r, &["c".to_string()]), None);
        assert_eq!(tuple_key(&r, &["missing".to_string()]), None);
    }

    #[test]
    fn test_loose_key_equality() {
        let local = row(json!({"author_id": "7"}));
        let remote = row(json!({"id": 7}));
        assert_eq!(
            tuple_key(&local, &["author_id".to_string()]),
            tuple_key(&remote, &["id".to_string()])
        );
    }

    #[test]
    fn test_unknown_never_matches() {
        assert!(!RelationCheck::Unknown.matches(&row(json!({"id": 1}))));
    }
}
