//! Table/column whitelist.
//!
//! Every statement must pass the whitelist before the catalog or storage is
//! consulted. Selecting "all columns" of a table requires the explicit
//! all-columns marker: listing every current column is not enough, so columns
//! added to a table later never become visible by accident.

use crate::error::{Error, Result};
use hashbrown::{HashMap, HashSet};
use serde::Deserialize;

/// Sentinel granting access to every column of a table.
pub const ALL_COLUMNS: &str = "*";

/// Column access granted for one table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnPolicy {
    /// Every column, including ones added later.
    AllColumns,
    /// Only the listed columns.
    Columns(HashSet<String>),
}

impl ColumnPolicy {
    fn allows(&self, column: &str) -> bool {
        match self {
            ColumnPolicy::AllColumns => true,
            ColumnPolicy::Columns(columns) => columns.contains(column),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyEntry {
    Marker(String),
    Columns(Vec<String>),
}

/// Security policy mapping tables to their accessible columns.
#[derive(Clone, Debug, Default)]
pub struct Whitelist {
    tables: HashMap<String, ColumnPolicy>,
}

impl Whitelist {
    /// Creates an empty whitelist that denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a policy from JSON: `{"posts": "*", "users": ["id", "name"]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: std::collections::BTreeMap<String, PolicyEntry> =
            serde_json::from_str(json)
                .map_err(|e| Error::config(format!("whitelist: {}", e)))?;

        let mut whitelist = Self::new();
        for (table, entry) in entries {
            whitelist = match entry {
                PolicyEntry::Marker(marker) if marker == ALL_COLUMNS => whitelist.allow_all(table),
                PolicyEntry::Marker(other) => {
                    return Err(Error::config(format!(
                        "whitelist: table {} has invalid policy '{}'",
                        table, other
                    )))
                }
                PolicyEntry::Columns(columns) => whitelist.allow_columns(table, columns),
            };
        }
        Ok(whitelist)
    }

    /// Grants every column of `table`.
    pub fn allow_all(mut self, table: impl Into<String>) -> Self {
        self.tables.insert(table.into(), ColumnPolicy::AllColumns);
        self
    }

    /// Grants the listed columns of `table`. A `"*"` entry grants all columns.
    pub fn allow_columns<I, S>(mut self, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: HashSet<String> = columns.into_iter().map(Into::into).collect();
        let policy = if columns.contains(ALL_COLUMNS) {
            ColumnPolicy::AllColumns
        } else {
            ColumnPolicy::Columns(columns)
        };
        self.tables.insert(table.into(), policy);
        self
    }

    /// Returns the policy of a table.
    pub fn policy(&self, table: &str) -> Option<&ColumnPolicy> {
        self.tables.get(table)
    }

    /// Fails with `AccessDenied` unless `table` appears in the policy.
    pub fn ensure_table_whitelisted(&self, table: &str) -> Result<()> {
        if self.tables.contains_key(table) {
            Ok(())
        } else {
            Err(Error::table_denied(table, "table is not whitelisted"))
        }
    }

    /// Fails listing every column of `columns` the policy does not grant.
    pub fn ensure_columns_whitelisted<S: AsRef<str>>(
        &self,
        table: &str,
        columns: &[S],
    ) -> Result<()> {
        let policy = self
            .tables
            .get(table)
            .ok_or_else(|| Error::table_denied(table, "table is not whitelisted"))?;

        let denied: Vec<String> = columns
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| !policy.allows(c))
            .map(|c| c.to_string())
            .collect();

        if denied.is_empty() {
            Ok(())
        } else {
            Err(Error::columns_denied(table, denied, "columns are not whitelisted"))
        }
    }

    /// Fails unless the table carries the all-columns marker.
    pub fn ensure_all_columns_allowed(&self, table: &str) -> Result<()> {
        match self.tables.get(table) {
            Some(ColumnPolicy::AllColumns) => Ok(()),
            Some(ColumnPolicy::Columns(_)) => Err(Error::columns_denied(
                table,
                vec![ALL_COLUMNS.to_string()],
                "selecting all columns requires the all-columns marker",
            )),
            None => Err(Error::table_denied(table, "table is not whitelisted")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> Whitelist {
        Whitelist::new()
            .allow_all("posts")
            .allow_columns("users", ["id", "name"])
    }

    #[test]
    fn test_table_check() {
        let wl = policy();
        assert!(wl.ensure_table_whitelisted("posts").is_ok());
        assert!(matches!(
            wl.ensure_table_whitelisted("secrets"),
            Err(Error::AccessDenied { .. })
        ));
    }

    #[test]
    fn test_column_check_lists_every_denied_column() {
        let wl = policy();
        assert!(wl.ensure_columns_whitelisted("users", &["id", "name"]).is_ok());
        assert!(wl
            .ensure_columns_whitelisted("posts", &["anything", "at_all"])
            .is_ok());

        match wl.ensure_columns_whitelisted("users", &["id", "email", "password"]) {
            Err(Error::AccessDenied { columns, .. }) => {
                assert_eq!(columns, vec!["email".to_string(), "password".to_string()]);
            }
            other => panic!("expected access denied, got {:?}", other),
        }
    }

    #[test]
    fn test_full_column_list_is_not_all_columns() {
        let wl = Whitelist::new().allow_columns("users", ["id", "name"]);
        assert!(wl.ensure_columns_whitelisted("users", &["id", "name"]).is_ok());
        assert!(wl.ensure_all_columns_allowed("users").is_err());
    }

    #[test]
    fn test_from_json() {
        let wl = Whitelist::from_json(r#"{"posts": "*", "users": ["id"], "tags": ["*"]}"#).unwrap();
        assert!(wl.ensure_all_columns_allowed("posts").is_ok());
        assert!(wl.ensure_all_columns_allowed("tags").is_ok());
        assert!(wl.ensure_all_columns_allowed("users").is_err());

        assert!(Whitelist::from_json(r#"{"posts": "all"}"#).is_err());
    }
}
