//! Expression trees.

use super::value::QueryValue;
use serde::{Deserialize, Serialize};
use siftql_core::schema::RelationDirection;

/// A leaf condition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WhereNode {
    /// Column test. `columns: None` matches when any column of the table does.
    Basic {
        table: String,
        columns: Option<Vec<String>>,
        value: QueryValue,
    },
    /// Existence of a related row through a declared relation.
    Relation {
        direction: RelationDirection,
        from_table: String,
        to_table: String,
    },
    /// Reserved. The parser never produces it and it never matches.
    Group,
}

impl WhereNode {
    /// Table the atom reads candidate rows from.
    pub fn table(&self) -> Option<&str> {
        match self {
            WhereNode::Basic { table, .. } => Some(table),
            WhereNode::Relation { from_table, .. } => Some(from_table),
            WhereNode::Group => None,
        }
    }
}

/// Boolean expression over atoms.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    Atom(WhereNode),
}

impl Expression {
    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Or(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Expression) -> Self {
        Expression::Not(Box::new(inner))
    }

    /// Basic atom.
    pub fn basic(table: impl Into<String>, columns: Option<Vec<&str>>, value: QueryValue) -> Self {
        Expression::Atom(WhereNode::Basic {
            table: table.into(),
            columns: columns.map(|c| c.into_iter().map(str::to_string).collect()),
            value,
        })
    }

    /// Relation atom.
    pub fn relation(
        direction: RelationDirection,
        from_table: impl Into<String>,
        to_table: impl Into<String>,
    ) -> Self {
        Expression::Atom(WhereNode::Relation {
            direction,
            from_table: from_table.into(),
            to_table: to_table.into(),
        })
    }

    /// Atoms in depth-first order, left before right.
    pub fn atoms(&self) -> Vec<&WhereNode> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms<'a>(&'a self, out: &mut Vec<&'a WhereNode>) {
        match self {
            Expression::And(l, r) | Expression::Or(l, r) => {
                l.collect_atoms(out);
                r.collect_atoms(out);
            }
            Expression::Not(inner) => inner.collect_atoms(out),
            Expression::Atom(node) => out.push(node),
        }
    }

    /// Table of the first atom reached depth-first.
    pub fn first_table(&self) -> Option<&str> {
        self.atoms().into_iter().find_map(WhereNode::table)
    }
}
