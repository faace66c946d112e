//! Storage boundary.
//!
//! The engine reaches storage through exactly one operation: find the rows
//! of a table, selecting a set of columns, optionally restricted by a
//! structural [`StorageFilter`]. No query text crosses this boundary.

mod filter;
mod memory;

pub use filter::StorageFilter;
pub use memory::{FetchCall, InMemoryRowSource};

use crate::error::Error;
use crate::value::Row;
use async_trait::async_trait;
use core::fmt;

/// Errors reported by a row source.
#[derive(Clone, Debug, PartialEq)]
pub enum StorageError {
    /// The store cannot apply `operator` to `column` (for example a text
    /// operator against a numeric or uuid column).
    UnsupportedOperator {
        table: String,
        column: String,
        operator: String,
    },
    /// Any other backend failure.
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::UnsupportedOperator {
                table,
                column,
                operator,
            } => write!(
                f,
                "operator {} is not supported on column {}.{}",
                operator, table, column
            ),
            StorageError::Backend(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedOperator {
                table,
                column,
                operator,
            } => Error::BadRequest {
                message: format!(
                    "Text search ({}) is not supported on column {}.{}",
                    operator, table, column
                ),
                hint: "match this column with an exact value, or search a text column instead"
                    .to_string(),
            },
            StorageError::Backend(msg) => Error::storage(msg),
        }
    }
}

/// Result type for row sources.
pub type StorageResult<T> = core::result::Result<T, StorageError>;

/// The storage collaborator.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Returns the rows of `table` matching `filter`, each containing only
    /// the requested `columns`.
    async fn find_rows(
        &self,
        table: &str,
        columns: &[String],
        filter: Option<&StorageFilter>,
    ) -> StorageResult<Vec<Row>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_operator_becomes_bad_request() {
        let err: Error = StorageError::UnsupportedOperator {
            table: "posts".into(),
            column: "id".into(),
            operator: "contains".into(),
        }
        .into();
        assert_eq!(err.status_code(), 400);
        match err {
            Error::BadRequest { message, hint } => {
                assert!(message.contains("posts.id"));
                assert!(!hint.is_empty());
            }
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[test]
    fn test_backend_error_is_storage() {
        let err: Error = StorageError::Backend("connection reset".into()).into();
        assert_eq!(err, Error::storage("connection reset"));
    }
}
