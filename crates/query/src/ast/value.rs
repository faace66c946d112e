//! Value literals on the right-hand side of a basic atom.

use serde::{Deserialize, Serialize};

/// How a text value is matched against a cell.
///
/// `"foo"` and `"*foo*"` both parse to `Contains`, `"foo*"` to `StartsWith`
/// and `"*foo"` to `EndsWith`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    Contains,
    StartsWith,
    EndsWith,
}

impl TextMatch {
    /// Splits the `*` wildcards off `raw`.
    pub fn split(raw: &str) -> (TextMatch, &str) {
        let leading = raw.starts_with('*');
        let trailing = raw.len() > 1 && raw.ends_with('*');
        match (leading, trailing) {
            (true, true) => (TextMatch::Contains, &raw[1..raw.len() - 1]),
            (true, false) => (TextMatch::EndsWith, &raw[1..]),
            (false, true) => (TextMatch::StartsWith, &raw[..raw.len() - 1]),
            (false, false) => (TextMatch::Contains, raw),
        }
    }
}

/// How a variable reference compares against a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariableMode {
    /// The row value equals some recorded value.
    Any,
    /// The row values cover every recorded value.
    All,
    /// The row value equals the element bound by the current iteration.
    One,
}

/// Role of an item in a list value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListModifier {
    /// Plain item: must match.
    And,
    /// `~item`: at least one of these must match.
    Or,
    /// `-item`: must not match.
    Not,
}

/// One entry of a list value. `value` keeps its wildcards; items match
/// the way a single text value would.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListItem {
    pub modifier: ListModifier,
    pub value: String,
}

impl ListItem {
    pub fn new(modifier: ListModifier, value: impl Into<String>) -> Self {
        Self {
            modifier,
            value: value.into(),
        }
    }
}

/// Parsed value literal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryValue {
    Text {
        value: String,
        case_sensitive: bool,
        mode: TextMatch,
    },
    DateRange {
        from: Option<String>,
        to: Option<String>,
    },
    Empty,
    NotEmpty,
    Variable {
        name: String,
        key: Option<String>,
        mode: VariableMode,
    },
    List {
        items: Vec<ListItem>,
    },
}

impl QueryValue {
    /// Case-insensitive substring match.
    pub fn text(value: impl Into<String>) -> Self {
        QueryValue::Text {
            value: value.into(),
            case_sensitive: false,
            mode: TextMatch::Contains,
        }
    }

    /// Variable reference.
    pub fn variable(name: impl Into<String>, key: Option<&str>, mode: VariableMode) -> Self {
        QueryValue::Variable {
            name: name.into(),
            key: key.map(str::to_string),
            mode,
        }
    }
}
