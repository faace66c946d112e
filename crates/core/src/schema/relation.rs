//! Relation metadata between catalog tables.

use serde::{Deserialize, Serialize};

/// Direction in which a relation atom navigates a declared link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationDirection {
    /// `a -> b`: rows of `a` pointing at an existing `b` row.
    Forward,
    /// `a <- b`: rows of `a` pointed at by some `b` row.
    Backward,
}

/// A declared foreign-key-style link between two tables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMeta {
    /// Table holding the referencing key columns.
    pub from_table: String,
    /// Referenced table.
    pub to_table: String,
    /// Key columns on `from_table`.
    pub from_keys: Vec<String>,
    /// Matching key columns on `to_table`, positionally aligned with `from_keys`.
    pub to_keys: Vec<String>,
    /// Whether one `from` row links to many `to` rows.
    #[serde(default)]
    pub is_list: bool,
}

impl RelationMeta {
    /// Creates a single-column relation.
    pub fn new(
        from_table: impl Into<String>,
        from_key: impl Into<String>,
        to_table: impl Into<String>,
        to_key: impl Into<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            to_table: to_table.into(),
            from_keys: vec![from_key.into()],
            to_keys: vec![to_key.into()],
            is_list: false,
        }
    }

    /// Creates a composite-key relation.
    pub fn composite(
        from_table: impl Into<String>,
        from_keys: Vec<String>,
        to_table: impl Into<String>,
        to_keys: Vec<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            to_table: to_table.into(),
            from_keys,
            to_keys,
            is_list: false,
        }
    }

    /// Marks the relation as one-to-many.
    pub fn list(mut self, is_list: bool) -> Self {
        self.is_list = is_list;
        self
    }
}

/// The key columns a relation atom compares, resolved for one direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationPath {
    /// Key columns read from the candidate rows.
    pub local_keys: Vec<String>,
    /// Table holding the rows that must exist.
    pub remote_table: String,
    /// Key columns on the remote table.
    pub remote_keys: Vec<String>,
}

impl RelationPath {
    /// Resolves the comparison path for `direction`, starting from the
    /// table the candidate rows come from.
    pub fn resolve(meta: &RelationMeta, direction: RelationDirection) -> Self {
        match direction {
            RelationDirection::Forward => Self {
                local_keys: meta.from_keys.clone(),
                remote_table: meta.to_table.clone(),
                remote_keys: meta.to_keys.clone(),
            },
            RelationDirection::Backward => Self {
                local_keys: meta.to_keys.clone(),
                remote_table: meta.from_table.clone(),
                remote_keys: meta.from_keys.clone(),
            },
        }
    }
}
