//! In-memory predicates.
//!
//! An [`Expression`] is compiled once per statement (or once per loop
//! element for `$name.key = …` statements) into a [`CompiledPredicate`]:
//! literals are parsed for the column types they meet, variables are
//! resolved to key sets and relation atoms to membership tests. Evaluating
//! a row afterwards never fails: anything that cannot be compared is false.

use super::relation::{RelationCheck, RelationChecks};
use crate::ast::{Expression, ListItem, ListModifier, QueryValue, TextMatch, VariableMode, WhereNode};
use crate::context::{ExecutionContext, LoopFrame};
use hashbrown::HashSet;
use siftql_core::schema::TableDef;
use siftql_core::value::{
    candidates, canonical_key, coerce_big_int, coerce_bool, coerce_date, coerce_number,
    is_empty_value, parse_big_int, parse_bool, parse_date, parse_date_upper, parse_number,
    value_text,
};
use siftql_core::{ColumnType, Error, Result, Row, Value};

/// A boolean test over one row.
pub trait Predicate {
    fn eval(&self, row: &Row) -> bool;
}

/// Rows of `rows` accepted by `predicate`, in order.
pub(crate) fn filter_rows<'r, P: Predicate + ?Sized>(rows: &'r [Row], predicate: &P) -> Vec<&'r Row> {
    rows.iter().filter(|row| predicate.eval(row)).collect()
}

/// Everything a compilation reads besides the expression.
pub(crate) struct CompileEnv<'a> {
    pub table: &'a TableDef,
    pub context: &'a ExecutionContext,
    pub frame: Option<LoopFrame<'a>>,
    pub relations: &'a RelationChecks,
    pub all_matches_empty_variable: bool,
}

#[derive(Debug)]
pub(crate) enum CompiledPredicate<'a> {
    And(Box<CompiledPredicate<'a>>, Box<CompiledPredicate<'a>>),
    Or(Box<CompiledPredicate<'a>>, Box<CompiledPredicate<'a>>),
    Not(Box<CompiledPredicate<'a>>),
    /// Matches when any of the columns passes the test.
    Columns {
        columns: Vec<(&'a str, ColumnType)>,
        test: CellTest,
    },
    Relation(&'a RelationCheck),
    Constant(bool),
}

impl Predicate for CompiledPredicate<'_> {
    fn eval(&self, row: &Row) -> bool {
        match self {
            CompiledPredicate::And(l, r) => l.eval(row) && r.eval(row),
            CompiledPredicate::Or(l, r) => l.eval(row) || r.eval(row),
            CompiledPredicate::Not(inner) => !inner.eval(row),
            CompiledPredicate::Columns { columns, test } => columns
                .iter()
                .any(|(name, column_type)| test.matches(row.get(*name), *column_type)),
            CompiledPredicate::Relation(check) => check.matches(row),
            CompiledPredicate::Constant(value) => *value,
        }
    }
}

/// Test applied to one cell.
#[derive(Debug)]
pub(crate) enum CellTest {
    Text(TextProbe),
    Range {
        from_ms: Option<i64>,
        to_ms: Option<i64>,
    },
    Empty,
    NotEmpty,
    /// Some element of the cell is in the set.
    AnyKey(HashSet<String>),
    /// Every key of the set is among the cell's elements.
    AllKeys(HashSet<String>),
    List(ListProbe),
}

impl CellTest {
    fn matches(&self, cell: Option<&Value>, column_type: ColumnType) -> bool {
        match self {
            CellTest::Empty => return is_empty_value(cell),
            CellTest::NotEmpty => return !is_empty_value(cell),
            _ => {}
        }
        let Some(cell) = cell.filter(|v| !v.is_null()) else {
            return false;
        };
        let elements = candidates(cell);
        match self {
            CellTest::Text(probe) => {
                let element_type = column_type.element_type();
                elements
                    .iter()
                    .any(|v| !v.is_null() && probe.matches(v, element_type))
            }
            CellTest::Range { from_ms, to_ms } => elements.iter().any(|v| {
                coerce_date(v).map_or(false, |ms| {
                    from_ms.map_or(true, |from| ms >= from) && to_ms.map_or(true, |to| ms <= to)
                })
            }),
            CellTest::AnyKey(keys) => elements
                .iter()
                .any(|v| !v.is_null() && keys.contains(&canonical_key(v))),
            CellTest::AllKeys(keys) => {
                let present: HashSet<String> = elements.iter().map(|v| canonical_key(v)).collect();
                keys.iter().all(|k| present.contains(k))
            }
            CellTest::List(probe) => {
                let present: Vec<&Value> = elements.iter().copied().filter(|v| !v.is_null()).collect();
                probe.matches(&present, column_type.element_type())
            }
            CellTest::Empty | CellTest::NotEmpty => false,
        }
    }
}

/// A text literal, pre-parsed for every column type it may meet.
#[derive(Debug)]
pub(crate) struct TextProbe {
    raw: String,
    needle: String,
    case_sensitive: bool,
    mode: TextMatch,
    number: Option<f64>,
    big_int: Option<i128>,
    boolean: Option<bool>,
    day: Option<(i64, i64)>,
}

impl TextProbe {
    fn new(raw: &str, case_sensitive: bool, mode: TextMatch) -> Self {
        let needle = if case_sensitive {
            raw.to_string()
        } else {
            raw.to_lowercase()
        };
        Self {
            raw: raw.to_string(),
            needle,
            case_sensitive,
            mode,
            number: parse_number(raw),
            big_int: parse_big_int(raw),
            boolean: parse_bool(raw),
            day: parse_date(raw).zip(parse_date_upper(raw)),
        }
    }

    /// Typed columns compare exactly after coercion; text compares by mode.
    fn matches(&self, value: &Value, element_type: ColumnType) -> bool {
        if self.mode == TextMatch::Contains {
            match element_type {
                ColumnType::Number => {
                    return self.number.is_some() && coerce_number(value) == self.number
                }
                ColumnType::BigInt => {
                    return self.big_int.is_some() && coerce_big_int(value) == self.big_int
                }
                ColumnType::Boolean => {
                    return self.boolean.is_some() && coerce_bool(value) == self.boolean
                }
                ColumnType::Date => {
                    return match (self.day, coerce_date(value)) {
                        (Some((start, end)), Some(ms)) => start <= ms && ms <= end,
                        _ => false,
                    }
                }
                ColumnType::Uuid => return value_text(value).eq_ignore_ascii_case(&self.raw),
                _ => {}
            }
        }
        self.matches_text(&value_text(value))
    }

    fn matches_text(&self, text: &str) -> bool {
        let lowered;
        let haystack = if self.case_sensitive {
            text
        } else {
            lowered = text.to_lowercase();
            &lowered
        };
        match self.mode {
            TextMatch::Contains => haystack.contains(&self.needle),
            TextMatch::StartsWith => haystack.starts_with(&self.needle),
            TextMatch::EndsWith => haystack.ends_with(&self.needle),
        }
    }
}

/// Plain items must all match some element, `~` items at least one (when
/// any are given), `-` items none. Each item matches like a single text
/// value, so typed columns compare exactly and `*` marks a prefix or suffix.
#[derive(Debug, Default)]
pub(crate) struct ListProbe {
    all: Vec<TextProbe>,
    any: Vec<TextProbe>,
    none: Vec<TextProbe>,
}

impl ListProbe {
    fn new(items: &[ListItem]) -> Self {
        let mut probe = Self::default();
        for item in items {
            let (mode, value) = TextMatch::split(&item.value);
            let text = TextProbe::new(value, false, mode);
            match item.modifier {
                ListModifier::And => probe.all.push(text),
                ListModifier::Or => probe.any.push(text),
                ListModifier::Not => probe.none.push(text),
            }
        }
        probe
    }

    fn matches(&self, elements: &[&Value], element_type: ColumnType) -> bool {
        let found = |item: &TextProbe| elements.iter().any(|v| item.matches(v, element_type));
        self.all.iter().all(found)
            && (self.any.is_empty() || self.any.iter().any(found))
            && !self.none.iter().any(found)
    }
}

/// Compiles `expr` against the table, variables and relations in `env`.
pub(crate) fn compile<'a>(expr: &Expression, env: &CompileEnv<'a>) -> Result<CompiledPredicate<'a>> {
    Ok(match expr {
        Expression::And(l, r) => {
            CompiledPredicate::And(Box::new(compile(l, env)?), Box::new(compile(r, env)?))
        }
        Expression::Or(l, r) => {
            CompiledPredicate::Or(Box::new(compile(l, env)?), Box::new(compile(r, env)?))
        }
        Expression::Not(inner) => CompiledPredicate::Not(Box::new(compile(inner, env)?)),
        Expression::Atom(WhereNode::Basic { table, .. }) if table != env.table.name() => {
            CompiledPredicate::Constant(false)
        }
        Expression::Atom(WhereNode::Basic { columns, value, .. }) => {
            compile_basic(columns.as_deref(), value, env)?
        }
        Expression::Atom(WhereNode::Relation {
            direction,
            from_table,
            to_table,
        }) => env
            .relations
            .get(*direction, from_table, to_table)
            .map_or(CompiledPredicate::Constant(false), CompiledPredicate::Relation),
        Expression::Atom(WhereNode::Group) => CompiledPredicate::Constant(false),
    })
}

fn compile_basic<'a>(
    columns: Option<&[String]>,
    value: &QueryValue,
    env: &CompileEnv<'a>,
) -> Result<CompiledPredicate<'a>> {
    let table = env.table;
    let columns: Vec<(&'a str, ColumnType)> = match columns {
        Some(names) => names
            .iter()
            .map(|name| {
                table
                    .column(name)
                    .map(|c| (c.name(), c.column_type()))
                    .ok_or_else(|| Error::unknown_column(table.name(), name.as_str()))
            })
            .collect::<Result<_>>()?,
        None => table
            .columns()
            .iter()
            .map(|c| (c.name(), c.column_type()))
            .collect(),
    };

    let test = match value {
        QueryValue::Text {
            value,
            case_sensitive,
            mode,
        } => CellTest::Text(TextProbe::new(value, *case_sensitive, *mode)),
        QueryValue::DateRange { from, to } => {
            let from_ms = match from.as_deref().map(parse_date) {
                Some(None) => return Ok(CompiledPredicate::Constant(false)),
                Some(ms) => ms,
                None => None,
            };
            let to_ms = match to.as_deref().map(parse_date_upper) {
                Some(None) => return Ok(CompiledPredicate::Constant(false)),
                Some(ms) => ms,
                None => None,
            };
            CellTest::Range { from_ms, to_ms }
        }
        QueryValue::Empty => CellTest::Empty,
        QueryValue::NotEmpty => CellTest::NotEmpty,
        QueryValue::Variable { name, key, mode } => {
            match compile_variable(name, key.as_deref(), *mode, env)? {
                Some(test) => test,
                None => return Ok(CompiledPredicate::Constant(env.all_matches_empty_variable)),
            }
        }
        QueryValue::List { items } => CellTest::List(ListProbe::new(items)),
    };
    Ok(CompiledPredicate::Columns { columns, test })
}

/// `None` for `ALL` over an empty variable, which does not test cells.
fn compile_variable(
    name: &str,
    key: Option<&str>,
    mode: VariableMode,
    env: &CompileEnv<'_>,
) -> Result<Option<CellTest>> {
    match mode {
        VariableMode::One => {
            let frame = env
                .frame
                .filter(|frame| frame.variable == name)
                .ok_or_else(|| Error::LoopContextRequired {
                    variable: name.to_string(),
                })?;
            let keys = collect_keys(name, std::slice::from_ref(frame.value), key)?;
            Ok(Some(CellTest::AnyKey(keys)))
        }
        VariableMode::Any => {
            let variable = env.context.require(name)?;
            Ok(Some(CellTest::AnyKey(collect_keys(name, &variable.values, key)?)))
        }
        VariableMode::All => {
            let variable = env.context.require(name)?;
            let keys = collect_keys(name, &variable.values, key)?;
            Ok((!keys.is_empty()).then_some(CellTest::AllKeys(keys)))
        }
    }
}

/// Canonical keys of a variable's values, flattened one level, with the
/// `:key` accessor applied to each element.
fn collect_keys(name: &str, values: &[Value], key: Option<&str>) -> Result<HashSet<String>> {
    let mut keys = HashSet::new();
    for value in values {
        for element in candidates(value) {
            let Some(projected) = project_key(name, element, key)? else {
                continue;
            };
            for candidate in candidates(projected) {
                if !candidate.is_null() {
                    keys.insert(canonical_key(candidate));
                }
            }
        }
    }
    Ok(keys)
}

fn project_key<'v>(name: &str, value: &'v Value, key: Option<&str>) -> Result<Option<&'v Value>> {
    match (value, key) {
        (Value::Null, _) => Ok(None),
        (Value::Object(map), Some(key)) => Ok(map.get(key)),
        (Value::Object(_), None) => Err(Error::variable_shape(
            name,
            "values are objects; select a field with $name:key",
        )),
        (_, Some(key)) => Err(Error::variable_shape(
            name,
            format!("cannot read key '{}' from a non-object value", key),
        )),
        (other, None) => Ok(Some(other)),
    }
}
