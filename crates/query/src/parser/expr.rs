//! Expression and atom grammar.

use super::lexer::{is_ident, split_keyword, strip_keyword, take_ident, unwrap_group};
use super::value::parse_value;
use super::Parser;
use crate::ast::{Expression, WhereNode};
use siftql_core::schema::RelationDirection;
use siftql_core::{Error, Result};

impl Parser<'_> {
    /// `NOT` first (consuming the rest of the clause), then OR, then AND.
    pub(crate) fn parse_expression(&self, text: &str) -> Result<Expression> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::syntax("empty expression", text));
        }
        if let Some(rest) = strip_keyword(text, "NOT") {
            return Ok(Expression::not(self.parse_expression(rest)?));
        }
        let mut operands = split_keyword(text, "OR").into_iter();
        let first = operands.next().unwrap_or_default();
        let mut expr = self.parse_conjunction(first)?;
        for operand in operands {
            expr = Expression::or(expr, self.parse_conjunction(operand)?);
        }
        Ok(expr)
    }

    fn parse_conjunction(&self, text: &str) -> Result<Expression> {
        let mut operands = split_keyword(text, "AND").into_iter();
        let first = operands.next().unwrap_or_default();
        let mut expr = self.parse_operand(first)?;
        for operand in operands {
            expr = Expression::and(expr, self.parse_operand(operand)?);
        }
        Ok(expr)
    }

    fn parse_operand(&self, text: &str) -> Result<Expression> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::syntax("missing operand", text));
        }
        if strip_keyword(text, "NOT").is_some() {
            return self.parse_expression(text);
        }
        if let Some(inner) = unwrap_group(text, '(') {
            return self.parse_expression(inner);
        }
        self.parse_atom(text).map(Expression::Atom)
    }

    /// `Where table[:col,…] (value)` or `Where a -> b` / `Where a <- b`.
    fn parse_atom(&self, text: &str) -> Result<WhereNode> {
        let rest = strip_keyword(text, "WHERE")
            .ok_or_else(|| Error::syntax("expected 'Where'", text))?;
        let (table, mut rest) = take_ident(rest);
        if table.is_empty() {
            return Err(Error::syntax("expected a table name", text));
        }
        self.check_table(table)?;

        let mut columns = None;
        if let Some(after) = rest.strip_prefix(':') {
            let end = after
                .find(|c: char| c.is_whitespace() || c == '(')
                .unwrap_or(after.len());
            let list: Vec<String> = after[..end].split(',').map(str::to_string).collect();
            if list.iter().any(|c| !is_ident(c)) {
                return Err(Error::syntax("invalid column list", &after[..end]));
            }
            columns = Some(list);
            rest = &after[end..];
        }
        let rest = rest.trim();

        let direction = if rest.starts_with("->") {
            Some(RelationDirection::Forward)
        } else if rest.starts_with("<-") {
            Some(RelationDirection::Backward)
        } else {
            None
        };
        if let Some(direction) = direction {
            if columns.is_some() {
                return Err(Error::syntax("relation atoms take no columns", text));
            }
            let other = rest[2..].trim();
            if !is_ident(other) {
                return Err(Error::syntax("expected a related table name", other));
            }
            self.check_table(other)?;
            return Ok(WhereNode::Relation {
                direction,
                from_table: table.to_string(),
                to_table: other.to_string(),
            });
        }

        let inner = unwrap_group(rest, '(')
            .ok_or_else(|| Error::syntax("expected a value in parentheses", text))?;
        Ok(WhereNode::Basic {
            table: table.to_string(),
            columns,
            value: parse_value(inner)?,
        })
    }

    fn check_table(&self, table: &str) -> Result<()> {
        if self.catalog.is_valid_table(table) {
            Ok(())
        } else {
            Err(Error::unknown_table(table))
        }
    }
}
