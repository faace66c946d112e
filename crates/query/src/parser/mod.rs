//! Query text parser.
//!
//! ```text
//! input      := segment (';' segment)*
//! segment    := [binding] part+ ('|' stage)*
//! binding    := '$' name ['.' key] '='
//! part       := [AGG] '[' [AGG] ['AS' cols] expression ']' ['AS' cols]
//! stage      := '@' name ['(' arg (',' arg)* ')']
//! AGG        := COUNT() | UNIQUE() | FIRST() | LAST()
//! ```
//!
//! Parsing performs no I/O. Table names are checked against the catalog;
//! column names are checked later, at execution.

mod expr;
mod lexer;
mod value;

use crate::ast::{Aggregation, Projection, Statement};
use lexer::{check_balanced, group_end, is_ident, read_quoted, split_top, strip_keyword, take_ident, TopLevel};
use siftql_core::schema::Catalog;
use siftql_core::{Error, Result, Value};
use siftql_functions::{CallArg, FunctionCall};

/// Variable names a statement may not bind.
const RESERVED_NAMES: &[&str] = &["_prev", "variables", "result"];

/// Parses query text against a catalog.
pub struct Parser<'a> {
    catalog: &'a Catalog,
}

impl<'a> Parser<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Parses `text` into statements, in order.
    pub fn parse(&self, text: &str) -> Result<Vec<Statement>> {
        check_balanced(text)?;
        let mut statements = Vec::new();
        for segment in split_top(text, ';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            statements.extend(self.parse_segment(segment)?);
        }
        Ok(statements)
    }

    fn parse_segment(&self, segment: &str) -> Result<Vec<Statement>> {
        let (binding, body) = parse_binding(segment)?;

        let mut pieces = split_top(body, '|').into_iter();
        let query = pieces.next().unwrap_or_default().trim();
        let pipeline = pieces.map(parse_stage).collect::<Result<Vec<_>>>()?;

        let starts: Vec<usize> = TopLevel::new(query)
            .filter(|(_, ch, top)| *top && *ch == '[')
            .map(|(index, _, _)| index)
            .collect();
        let Some(&first) = starts.first() else {
            return Err(Error::syntax("expected '[' to open a query", query));
        };
        let mut leading_aggregation = parse_aggregation_token(query[..first].trim())?;

        let mut statements = Vec::with_capacity(starts.len());
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(query.len());
            let aggregation = leading_aggregation.take();
            statements.push(self.parse_part(query[start..end].trim(), aggregation)?);
        }

        if let Some(last) = statements.last_mut() {
            if let Some((name, target_key)) = binding {
                last.name = Some(name.to_string());
                last.target_key = target_key.map(str::to_string);
            }
            last.pipeline = pipeline;
        }
        Ok(statements)
    }

    /// `[ … ] [AS cols]`, where `part` starts at its `[`.
    fn parse_part(&self, part: &str, outer_aggregation: Option<Aggregation>) -> Result<Statement> {
        let close = group_end(part).ok_or_else(|| Error::syntax("unclosed '['", part))?;
        let mut inner = part[1..close].trim();
        let trailing = part[close + 1..].trim();

        let mut aggregation = outer_aggregation;
        if let Some((inside, rest)) = split_aggregation(inner) {
            if aggregation.is_some() {
                return Err(Error::syntax("aggregation given twice", part));
            }
            aggregation = Some(inside);
            inner = rest;
        }

        let mut projection = None;
        if let Some(rest) = strip_keyword(inner, "AS") {
            let (columns, after) = split_leading_projection(rest);
            projection = Some(parse_projection(columns)?);
            inner = after;
        }
        if !trailing.is_empty() {
            let columns = strip_keyword(trailing, "AS")
                .ok_or_else(|| Error::syntax("unexpected text after ']'", trailing))?;
            if projection.is_some() {
                return Err(Error::syntax("projection given both inside and after ']'", part));
            }
            projection = Some(parse_projection(columns)?);
        }

        let mut statement = Statement::new(self.parse_expression(inner)?)
            .projection(projection.unwrap_or_default());
        statement.aggregation = aggregation;
        Ok(statement)
    }
}

/// Convenience wrapper around [`Parser::parse`].
pub fn parse(text: &str, catalog: &Catalog) -> Result<Vec<Statement>> {
    Parser::new(catalog).parse(text)
}

type Binding<'a> = Option<(&'a str, Option<&'a str>)>;

/// Splits a leading `$name = ` / `$name.key = ` off a segment.
fn parse_binding(segment: &str) -> Result<(Binding<'_>, &str)> {
    let Some(rest) = segment.strip_prefix('$') else {
        return Ok((None, segment));
    };
    let (name, mut rest) = take_ident(rest);
    if name.is_empty() {
        return Err(Error::syntax("expected a variable name after '$'", segment));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(Error::syntax("reserved variable name", name));
    }
    let mut target_key = None;
    if let Some(after) = rest.strip_prefix('.') {
        let (key, after) = take_ident(after);
        if key.is_empty() {
            return Err(Error::syntax("expected a key after '.'", segment));
        }
        target_key = Some(key);
        rest = after;
    }
    let body = rest
        .trim_start()
        .strip_prefix('=')
        .ok_or_else(|| Error::syntax("expected '=' after variable name", segment))?;
    Ok((Some((name, target_key)), body.trim()))
}

/// `COUNT()` and friends, or nothing.
fn parse_aggregation_token(text: &str) -> Result<Option<Aggregation>> {
    if text.is_empty() {
        return Ok(None);
    }
    match split_aggregation(text) {
        Some((aggregation, rest)) if rest.is_empty() => Ok(Some(aggregation)),
        _ => Err(Error::syntax("unexpected text before '['", text)),
    }
}

fn split_aggregation(text: &str) -> Option<(Aggregation, &str)> {
    let (word, rest) = take_ident(text);
    let aggregation = Aggregation::from_keyword(word)?;
    let rest = rest.strip_prefix("()")?;
    Some((aggregation, rest.trim_start()))
}

/// Splits `*` or `a, b, c` off the front of `text`.
fn split_leading_projection(text: &str) -> (&str, &str) {
    let start = text.len() - text.trim_start().len();
    if text[start..].starts_with('*') {
        return text.split_at(start + 1);
    }
    let mut end = start;
    loop {
        let (ident, _) = take_ident(&text[end..]);
        end += ident.len();
        let after = text[end..].trim_start();
        match after.strip_prefix(',') {
            Some(next) => end = text.len() - next.trim_start().len(),
            None => return text.split_at(end),
        }
    }
}

fn parse_projection(text: &str) -> Result<Projection> {
    let text = text.trim();
    if text == "*" {
        return Ok(Projection::All);
    }
    let columns: Vec<String> = text.split(',').map(|c| c.trim().to_string()).collect();
    if columns.iter().any(|c| !is_ident(c)) {
        return Err(Error::syntax("invalid projection", text));
    }
    Ok(if columns.len() == 1 {
        Projection::Column(columns.into_iter().next().unwrap_or_default())
    } else {
        Projection::Columns(columns)
    })
}

/// `@name`, `@ns.name`, optionally with `(args)`.
fn parse_stage(text: &str) -> Result<FunctionCall> {
    let text = text.trim();
    let rest = text
        .strip_prefix('@')
        .ok_or_else(|| Error::syntax("expected '@function' after '|'", text))?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .unwrap_or(rest.len());
    let name = &rest[..end];
    if name.is_empty() || name.starts_with('.') || name.ends_with('.') {
        return Err(Error::syntax("invalid function name", text));
    }
    let mut call = FunctionCall::new(name);

    let rest = rest[end..].trim();
    if rest.is_empty() {
        return Ok(call);
    }
    let inner = lexer::unwrap_group(rest, '(')
        .ok_or_else(|| Error::syntax("unexpected text after function name", rest))?;
    if inner.trim().is_empty() {
        return Ok(call);
    }
    for arg in split_top(inner, ',') {
        call = call.arg(parse_arg(arg.trim())?);
    }
    Ok(call)
}

fn parse_arg(text: &str) -> Result<CallArg> {
    if text.is_empty() {
        return Err(Error::syntax("empty function argument", text));
    }
    let (ident, rest) = take_ident(text);
    if !ident.is_empty() {
        if let Some(value) = rest.trim_start().strip_prefix('=') {
            return Ok(CallArg::named(ident, parse_literal(value.trim())?));
        }
    }
    Ok(CallArg::positional(parse_literal(text)?))
}

fn parse_literal(text: &str) -> Result<Value> {
    if text.is_empty() {
        return Err(Error::syntax("missing argument value", text));
    }
    if text.starts_with('"') {
        let (value, rest) = read_quoted(text)?;
        if !rest.trim().is_empty() {
            return Err(Error::syntax("unexpected text after string", rest));
        }
        return Ok(Value::String(value));
    }
    if text.eq_ignore_ascii_case("true") {
        return Ok(Value::Bool(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Ok(Value::Bool(false));
    }
    if let Ok(int) = text.parse::<i64>() {
        return Ok(Value::from(int));
    }
    if let Some(number) = text
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return Ok(Value::Number(number));
    }
    Ok(Value::String(text.to_string()))
}
