//! Canonical text form. Printing a parsed statement and parsing the output
//! again yields an equal statement.

use super::expr::{Expression, WhereNode};
use super::statement::{Projection, Statement};
use super::value::{ListModifier, QueryValue, TextMatch, VariableMode};
use core::fmt::{self, Write};
use siftql_core::schema::RelationDirection;
use siftql_core::Value;
use siftql_functions::FunctionCall;

fn write_quoted(f: &mut impl Write, text: &str) -> fmt::Result {
    f.write_char('"')?;
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(ch)?;
    }
    f.write_char('"')
}

impl fmt::Display for VariableMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VariableMode::Any => "ANY",
            VariableMode::All => "ALL",
            VariableMode::One => "ONE",
        })
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('(')?;
        match self {
            QueryValue::Text {
                value,
                case_sensitive,
                mode,
            } => {
                let wrapped;
                let text = match mode {
                    TextMatch::Contains if value.starts_with('*') || value.ends_with('*') => {
                        wrapped = format!("*{}*", value);
                        wrapped.as_str()
                    }
                    TextMatch::Contains => value.as_str(),
                    TextMatch::StartsWith => {
                        wrapped = format!("{}*", value);
                        wrapped.as_str()
                    }
                    TextMatch::EndsWith => {
                        wrapped = format!("*{}", value);
                        wrapped.as_str()
                    }
                };
                write_quoted(f, text)?;
                if *case_sensitive {
                    f.write_str(":s")?;
                }
            }
            QueryValue::DateRange { from, to } => {
                if let Some(from) = from {
                    write_quoted(f, from)?;
                }
                f.write_str("..")?;
                if let Some(to) = to {
                    write_quoted(f, to)?;
                }
            }
            QueryValue::Empty => f.write_str("EMPTY")?,
            QueryValue::NotEmpty => f.write_str("NOT EMPTY")?,
            QueryValue::Variable { name, key, mode } => {
                write!(f, "${}", name)?;
                if let Some(key) = key {
                    write!(f, ":{}", key)?;
                }
                write!(f, " -> {}", mode)?;
            }
            QueryValue::List { items } => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_char(' ')?;
                    }
                    let prefix = match item.modifier {
                        ListModifier::And => "",
                        ListModifier::Or => "~",
                        ListModifier::Not => "-",
                    };
                    write_quoted(f, &format!("{}{}", prefix, item.value))?;
                }
            }
        }
        f.write_char(')')
    }
}

impl fmt::Display for WhereNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhereNode::Basic {
                table,
                columns,
                value,
            } => {
                write!(f, "Where {}", table)?;
                if let Some(columns) = columns {
                    write!(f, ":{}", columns.join(","))?;
                }
                write!(f, " {}", value)
            }
            WhereNode::Relation {
                direction,
                from_table,
                to_table,
            } => {
                let arrow = match direction {
                    RelationDirection::Forward => "->",
                    RelationDirection::Backward => "<-",
                };
                write!(f, "Where {} {} {}", from_table, arrow, to_table)
            }
            WhereNode::Group => f.write_str("Where ()"),
        }
    }
}

impl Expression {
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, wrap: bool) -> fmt::Result {
        if wrap {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Or(l, r) => {
                l.fmt_operand(f, matches!(**l, Expression::Not(_)))?;
                f.write_str(" OR ")?;
                r.fmt_operand(f, matches!(**r, Expression::Or(..) | Expression::Not(_)))
            }
            Expression::And(l, r) => {
                l.fmt_operand(f, matches!(**l, Expression::Or(..) | Expression::Not(_)))?;
                f.write_str(" AND ")?;
                r.fmt_operand(f, !matches!(**r, Expression::Atom(_)))
            }
            Expression::Not(inner) => write!(f, "NOT {}", inner),
            Expression::Atom(node) => write!(f, "{}", node),
        }
    }
}

fn write_arg(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write_quoted(f, s),
        other => write!(f, "{}", other),
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Default => Ok(()),
            Projection::Column(column) => write!(f, " AS {}", column),
            Projection::Columns(columns) => write!(f, " AS {}", columns.join(",")),
            Projection::All => f.write_str(" AS *"),
        }
    }
}

fn write_call(f: &mut fmt::Formatter<'_>, call: &FunctionCall) -> fmt::Result {
    write!(f, " | @{}", call.name)?;
    if call.args.is_empty() {
        return Ok(());
    }
    f.write_char('(')?;
    for (i, arg) in call.args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if let Some(name) = &arg.name {
            write!(f, "{}=", name)?;
        }
        write_arg(f, &arg.value)?;
    }
    f.write_char(')')
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "${}", name)?;
            if let Some(key) = &self.target_key {
                write!(f, ".{}", key)?;
            }
            f.write_str(" = ")?;
        }
        f.write_char('[')?;
        if let Some(aggregation) = self.aggregation {
            write!(f, "{}() ", aggregation.keyword())?;
        }
        write!(f, "{}]{}", self.expr, self.projection)?;
        for call in &self.pipeline {
            write_call(f, call)?;
        }
        Ok(())
    }
}

/// Prints statements separated by `; `.
pub fn print_statements(statements: &[Statement]) -> String {
    statements
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
