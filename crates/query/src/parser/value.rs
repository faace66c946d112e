//! Value literal grammar: the text inside an atom's trailing parentheses.

use super::lexer::{read_quoted, strip_keyword, take_ident, TopLevel};
use crate::ast::{ListItem, ListModifier, QueryValue, TextMatch, VariableMode};
use siftql_core::{Error, Result};

pub(crate) fn parse_value(inner: &str) -> Result<QueryValue> {
    let text = inner.trim();
    if text.eq_ignore_ascii_case("EMPTY") {
        return Ok(QueryValue::Empty);
    }
    if let Some(rest) = strip_keyword(text, "NOT") {
        if rest.trim().eq_ignore_ascii_case("EMPTY") {
            return Ok(QueryValue::NotEmpty);
        }
    }
    if let Some(rest) = text.strip_prefix('$') {
        return parse_variable(rest, text);
    }
    if let Some(split) = find_range_dots(text) {
        return parse_date_range(&text[..split], &text[split + 2..]);
    }
    if text.starts_with('"') {
        return parse_quoted_values(text);
    }
    if text.is_empty() {
        return Err(Error::syntax("empty value", inner));
    }
    Ok(text_value(text, false))
}

/// `"*foo*"`/`"foo"` → contains, `"foo*"` → starts with, `"*foo"` → ends with.
fn text_value(raw: &str, case_sensitive: bool) -> QueryValue {
    let (mode, value) = TextMatch::split(raw);
    QueryValue::Text {
        value: value.to_string(),
        case_sensitive,
        mode,
    }
}

fn parse_variable(rest: &str, whole: &str) -> Result<QueryValue> {
    let (name, rest) = take_ident(rest);
    if name.is_empty() {
        return Err(Error::syntax("expected a variable name after $", whole));
    }
    let (key, rest) = match rest.strip_prefix(':') {
        Some(after) => {
            let (key, rest) = take_ident(after);
            if key.is_empty() {
                return Err(Error::syntax("expected a key after ':'", whole));
            }
            (Some(key), rest)
        }
        None => (None, rest),
    };
    let rest = rest.trim();
    let mode = if rest.is_empty() {
        VariableMode::Any
    } else {
        let mode = rest
            .strip_prefix("->")
            .map(str::trim)
            .ok_or_else(|| Error::syntax("expected '-> ANY|ALL|ONE'", whole))?;
        match mode.to_ascii_uppercase().as_str() {
            "ANY" => VariableMode::Any,
            "ALL" => VariableMode::All,
            "ONE" => VariableMode::One,
            _ => return Err(Error::syntax("unknown variable mode", mode)),
        }
    };
    Ok(QueryValue::variable(name, key, mode))
}

/// Byte index of a top-level `..`.
fn find_range_dots(text: &str) -> Option<usize> {
    let mut previous: Option<(usize, char, bool)> = None;
    for (index, ch, top) in TopLevel::new(text) {
        if let Some((prev_index, '.', true)) = previous {
            if ch == '.' && top {
                return Some(prev_index);
            }
        }
        previous = Some((index, ch, top));
    }
    None
}

fn parse_date_range(from: &str, to: &str) -> Result<QueryValue> {
    Ok(QueryValue::DateRange {
        from: parse_bound(from)?,
        to: parse_bound(to)?,
    })
}

fn parse_bound(text: &str) -> Result<Option<String>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if text.starts_with('"') {
        let (value, rest) = read_quoted(text)?;
        if !rest.trim().is_empty() {
            return Err(Error::syntax("unexpected text in date bound", rest));
        }
        return Ok(Some(value));
    }
    Ok(Some(text.to_string()))
}

/// One quoted string (optionally `:s`), or a whitespace-separated list.
fn parse_quoted_values(text: &str) -> Result<QueryValue> {
    let mut items = Vec::new();
    let mut case_sensitive = false;
    let mut rest = text;
    while !rest.is_empty() {
        let (value, after) = read_quoted(rest)?;
        items.push(value);
        rest = after;
        if let Some(after) = rest.strip_prefix(":s").or_else(|| rest.strip_prefix(":S")) {
            case_sensitive = true;
            rest = after;
        }
        let trimmed = rest.trim_start();
        if !trimmed.is_empty() && trimmed.len() == rest.len() {
            return Err(Error::syntax("expected whitespace between values", rest));
        }
        rest = trimmed;
    }

    if items.len() == 1 {
        return Ok(text_value(&items[0], case_sensitive));
    }
    if case_sensitive {
        return Err(Error::syntax("':s' is not supported on list values", text));
    }
    Ok(QueryValue::List {
        items: items.iter().map(|item| list_item(item)).collect(),
    })
}

fn list_item(raw: &str) -> ListItem {
    if let Some(value) = raw.strip_prefix('~') {
        ListItem::new(ListModifier::Or, value)
    } else if let Some(value) = raw.strip_prefix('-') {
        ListItem::new(ListModifier::Not, value)
    } else {
        ListItem::new(ListModifier::And, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str, case_sensitive: bool, mode: TextMatch) -> QueryValue {
        QueryValue::Text {
            value: value.to_string(),
            case_sensitive,
            mode,
        }
    }

    #[test]
    fn test_empty_markers() {
        assert_eq!(parse_value("EMPTY").unwrap(), QueryValue::Empty);
        assert_eq!(parse_value(" not  empty ").unwrap(), QueryValue::NotEmpty);
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(parse_value(r#""hello""#).unwrap(), text("hello", false, TextMatch::Contains));
        assert_eq!(parse_value(r#""*foo*""#).unwrap(), text("foo", false, TextMatch::Contains));
        assert_eq!(parse_value(r#""foo*":s"#).unwrap(), text("foo", true, TextMatch::StartsWith));
        assert_eq!(parse_value(r#""*foo""#).unwrap(), text("foo", false, TextMatch::EndsWith));
        assert_eq!(parse_value("42").unwrap(), text("42", false, TextMatch::Contains));
    }

    #[test]
    fn test_variables() {
        assert_eq!(
            parse_value("$a -> ANY").unwrap(),
            QueryValue::variable("a", None, VariableMode::Any)
        );
        assert_eq!(
            parse_value("$posts:id -> one").unwrap(),
            QueryValue::variable("posts", Some("id"), VariableMode::One)
        );
        assert_eq!(
            parse_value("$a").unwrap(),
            QueryValue::variable("a", None, VariableMode::Any)
        );
        assert!(parse_value("$a -> SOME").is_err());
        assert!(parse_value("$ -> ANY").is_err());
    }

    #[test]
    fn test_date_ranges() {
        assert_eq!(
            parse_value(r#""2024-01-01".."2024-02-01""#).unwrap(),
            QueryValue::DateRange {
                from: Some("2024-01-01".into()),
                to: Some("2024-02-01".into())
            }
        );
        assert_eq!(
            parse_value(r#".."2024-02-01""#).unwrap(),
            QueryValue::DateRange {
                from: None,
                to: Some("2024-02-01".into())
            }
        );
        // Dots inside a string are not a range.
        assert_eq!(
            parse_value(r#""a..b""#).unwrap(),
            text("a..b", false, TextMatch::Contains)
        );
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            parse_value(r#""a" "~b" "-c""#).unwrap(),
            QueryValue::List {
                items: vec![
                    ListItem::new(ListModifier::And, "a"),
                    ListItem::new(ListModifier::Or, "b"),
                    ListItem::new(ListModifier::Not, "c"),
                ]
            }
        );
        assert!(parse_value(r#""a""b""#).is_err());
        assert!(parse_value(r#""a" x"#).is_err());
    }
}
