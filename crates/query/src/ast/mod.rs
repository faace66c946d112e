//! AST for parsed statements.
//!
//! Values, atoms and expressions are closed sum types; the parser, the
//! pushdown translator and the predicate compiler all match on them
//! exhaustively.

mod display;
mod expr;
mod statement;
mod value;

pub use display::print_statements;
pub use expr::{Expression, WhereNode};
pub use statement::{Aggregation, Projection, Statement};
pub use value::{ListItem, ListModifier, QueryValue, TextMatch, VariableMode};
