//! Statement planning: target table, access checks and the column set one
//! storage call must return.

use crate::ast::{Expression, Projection, Statement, WhereNode};
use siftql_core::schema::{Catalog, RelationDirection, RelationPath, TableDef};
use siftql_core::{Error, Result};

/// The table of the first atom of `expr`, depth first. Atoms naming any
/// other table never match a row of it.
pub(crate) fn target_table(expr: &Expression) -> Result<&str> {
    expr.first_table()
        .ok_or_else(|| Error::invalid_query("statement references no table"))
}

/// Fails unless `table` is in the caller's allowlist (when one is given).
pub(crate) fn ensure_allowed(table: &str, allowed: Option<&[String]>) -> Result<()> {
    match allowed {
        Some(allowed) if !allowed.iter().any(|t| t == table) => Err(Error::table_denied(
            table,
            "table is not in the allowed tables",
        )),
        _ => Ok(()),
    }
}

/// Resolves a relation atom against the catalog. `a -> b` uses the relation
/// declared from `a` to `b`; `a <- b` the one declared from `b` to `a`.
pub(crate) fn relation_path(
    catalog: &Catalog,
    direction: RelationDirection,
    from: &str,
    to: &str,
) -> Option<RelationPath> {
    let meta = match direction {
        RelationDirection::Forward => catalog.relation(from, to),
        RelationDirection::Backward => catalog.relation(to, from),
    }?;
    Some(RelationPath::resolve(meta, direction))
}

/// Columns requested from storage for one statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RequiredColumns {
    /// In catalog order.
    pub names: Vec<String>,
    /// Whether every column of the table was requested.
    pub all: bool,
}

/// Union of the id column, projected columns, referenced columns and
/// relation local keys. A column-less atom or `AS *` requests everything.
/// Atoms of other tables request nothing.
pub(crate) fn required_columns(
    catalog: &Catalog,
    def: &TableDef,
    stmt: &Statement,
) -> Result<RequiredColumns> {
    let mut wanted: Vec<&str> = vec![def.id_column()];
    let mut all = false;

    match &stmt.projection {
        Projection::Default => {}
        Projection::Column(column) => wanted.push(column),
        Projection::Columns(columns) => wanted.extend(columns.iter().map(String::as_str)),
        Projection::All => all = true,
    }

    let mut local_keys = Vec::new();
    for atom in stmt.expr.atoms() {
        if atom.table() != Some(def.name()) {
            continue;
        }
        match atom {
            WhereNode::Basic { columns: None, .. } => all = true,
            WhereNode::Basic {
                columns: Some(columns),
                ..
            } => wanted.extend(columns.iter().map(String::as_str)),
            WhereNode::Relation {
                direction,
                from_table,
                to_table,
            } => {
                if let Some(path) = relation_path(catalog, *direction, from_table, to_table) {
                    local_keys.extend(path.local_keys);
                }
            }
            WhereNode::Group => {}
        }
    }
    wanted.extend(local_keys.iter().map(String::as_str));

    for column in &wanted {
        if def.column(column).is_none() {
            return Err(Error::unknown_column(def.name(), *column));
        }
    }

    let names = def
        .columns()
        .iter()
        .map(|c| c.name())
        .filter(|name| all || wanted.contains(name))
        .map(str::to_string)
        .collect();
    Ok(RequiredColumns { names, all })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{QueryValue, TextMatch};
    use siftql_core::schema::{RelationMeta, TableBuilder};
    use siftql_core::ColumnType;

    fn catalog() -> Catalog {
        let posts = TableBuilder::new("posts")
            .unwrap()
            .add_column("id", ColumnType::Number)
            .unwrap()
            .add_column("title", ColumnType::String)
            .unwrap()
            .add_column("body", ColumnType::String)
            .unwrap()
            .add_column("author_id", ColumnType::Number)
            .unwrap()
            .build()
            .unwrap();
        let users = TableBuilder::new("users")
            .unwrap()
            .add_column("id", ColumnType::Number)
            .unwrap()
            .build()
            .unwrap();
        Catalog::builder()
            .table(posts)
            .unwrap()
            .table(users)
            .unwrap()
            .relation(RelationMeta::new("posts", "author_id", "users", "id"))
            .unwrap()
            .build()
    }

    fn title(value: &str) -> Expression {
        Expression::basic(
            "posts",
            Some(vec!["title"]),
            QueryValue::Text {
                value: value.into(),
                case_sensitive: false,
                mode: TextMatch::Contains,
            },
        )
    }

    #[test]
    fn test_target_table_is_first_atom() {
        let expr = Expression::or(title("a"), Expression::basic("users", None, QueryValue::Empty));
        assert_eq!(target_table(&expr).unwrap(), "posts");
        let expr = Expression::and(Expression::basic("users", None, QueryValue::Empty), title("a"));
        assert_eq!(target_table(&expr).unwrap(), "users");
        assert_eq!(target_table(&title("a")).unwrap(), "posts");
    }

    #[test]
    fn test_required_columns() {
        let catalog = catalog();
        let def = catalog.table("posts").unwrap();

        let stmt = Statement::new(title("a"));
        let cols = required_columns(&catalog, def, &stmt).unwrap();
        assert_eq!(cols.names, vec!["id".to_string(), "title".to_string()]);
        assert!(!cols.all);

        let stmt = Statement::new(Expression::and(
            title("a"),
            Expression::relation(RelationDirection::Forward, "posts", "users"),
        ))
        .projection(Projection::Column("body".into()));
        let cols = required_columns(&catalog, def, &stmt).unwrap();
        assert_eq!(cols.names, vec!["id", "title", "body", "author_id"]);

        let stmt = Statement::new(Expression::basic("posts", None, QueryValue::NotEmpty));
        assert!(required_columns(&catalog, def, &stmt).unwrap().all);
    }

    #[test]
    fn test_required_columns_ignore_other_tables() {
        let catalog = catalog();
        let def = catalog.table("posts").unwrap();
        let stmt = Statement::new(Expression::or(
            title("a"),
            Expression::or(
                Expression::basic("users", Some(vec!["name"]), QueryValue::text("x")),
                Expression::basic("users", None, QueryValue::Empty),
            ),
        ));
        let cols = required_columns(&catalog, def, &stmt).unwrap();
        assert_eq!(cols.names, vec!["id", "title"]);
        assert!(!cols.all);
    }

    #[test]
    fn test_unknown_projection_column() {
        let catalog = catalog();
        let def = catalog.table("posts").unwrap();
        let stmt = Statement::new(title("a")).projection(Projection::Column("nope".into()));
        assert!(matches!(
            required_columns(&catalog, def, &stmt),
            Err(Error::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_allowlist() {
        let allowed = vec!["posts".to_string()];
        assert!(ensure_allowed("posts", Some(allowed.as_slice())).is_ok());
        assert!(ensure_allowed("users", Some(allowed.as_slice())).is_err());
        assert!(ensure_allowed("users", None).is_ok());
    }
}
