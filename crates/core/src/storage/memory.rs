//! In-memory row source for tests, embedding and benchmarks.

use super::filter::{FilterEval, StorageFilter};
use super::{RowSource, StorageError, StorageResult};
use crate::value::{Row, Value};
use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::trace;

/// One recorded `find_rows` call.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchCall {
    pub table: String,
    pub columns: Vec<String>,
    pub filter: Option<StorageFilter>,
}

/// Row source over in-memory tables.
///
/// Records every call so tests can assert how many round trips a query made
/// and what was pushed down.
#[derive(Default)]
pub struct InMemoryRowSource {
    tables: HashMap<String, Vec<Row>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl InMemoryRowSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table from JSON objects; non-object values are skipped.
    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.tables.insert(name.into(), rows);
        self
    }

    /// Appends a row to a table, creating the table if needed.
    pub fn insert(&mut self, table: impl Into<String>, row: Row) {
        self.tables.entry(table.into()).or_default().push(row);
    }

    /// Returns the number of `find_rows` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns every recorded call.
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().clone()
    }

    /// Returns the recorded calls against one table.
    pub fn calls_for(&self, table: &str) -> Vec<FetchCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.table == table)
            .cloned()
            .collect()
    }

    /// Forgets recorded calls.
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl RowSource for InMemoryRowSource {
    async fn find_rows(
        &self,
        table: &str,
        columns: &[String],
        filter: Option<&StorageFilter>,
    ) -> StorageResult<Vec<Row>> {
        self.calls.lock().push(FetchCall {
            table: table.to_string(),
            columns: columns.to_vec(),
            filter: filter.cloned(),
        });

        let rows = self
            .tables
            .get(table)
            .ok_or_else(|| StorageError::Backend(format!("relation \"{}\" does not exist", table)))?;

        let mut result = Vec::new();
        for row in rows {
            if let Some(filter) = filter {
                match filter.eval(row) {
                    FilterEval::Match(true) => {}
                    FilterEval::Match(false) => continue,
                    FilterEval::Unsupported { column, op } => {
                        return Err(StorageError::UnsupportedOperator {
                            table: table.to_string(),
                            column,
                            operator: op.name().to_string(),
                        })
                    }
                }
            }
            let projected: Row = columns
                .iter()
                .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                .collect();
            result.push(projected);
        }
        trace!(table, rows = result.len(), "in-memory fetch");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> InMemoryRowSource {
        InMemoryRowSource::new().with_table(
            "posts",
            vec![
                json!({"id": 1, "title": "hello world", "views": 10}),
                json!({"id": 2, "title": "nope", "views": 3}),
            ],
        )
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_projection_and_filter() {
        let source = source();
        let filter = StorageFilter::Contains {
            column: "title".into(),
            value: "HELLO".into(),
            case_insensitive: true,
        };
        let rows = source
            .find_rows("posts", &cols(&["id"]), Some(&filter))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(Value::Object(rows[0].clone()), json!({"id": 1}));
        assert_eq!(source.call_count(), 1);
        assert_eq!(source.calls()[0].filter, Some(filter));
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let source = source();
        let err = source.find_rows("users", &cols(&["id"]), None).await;
        assert!(matches!(err, Err(StorageError::Backend(_))));
    }

    #[tokio::test]
    async fn test_text_op_on_number_column() {
        let source = source();
        let filter = StorageFilter::Contains {
            column: "views".into(),
            value: "1".into(),
            case_insensitive: true,
        };
        let err = source
            .find_rows("posts", &cols(&["id"]), Some(&filter))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StorageError::UnsupportedOperator {
                table: "posts".into(),
                column: "views".into(),
                operator: "contains".into(),
            }
        );
    }
}
