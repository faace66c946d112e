//! Quote- and nesting-aware scanning helpers.
//!
//! The grammar is split top-down (statements, pipeline stages, parts,
//! OR/AND operands), so instead of a token stream the parser works with
//! slices and needs to know, for every character, whether it sits at the
//! top level: outside string literals and outside `(...)` / `[...]`.

use siftql_core::{Error, Result};
use core::str::CharIndices;

/// Iterates `(byte index, char, at_top_level)`.
///
/// `at_top_level` describes the state *before* the character is consumed,
/// so an opening bracket at depth zero is itself top-level.
pub(crate) struct TopLevel<'a> {
    chars: CharIndices<'a>,
    depth: usize,
    in_quote: bool,
    escaped: bool,
    underflow: bool,
}

impl<'a> TopLevel<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices(),
            depth: 0,
            in_quote: false,
            escaped: false,
            underflow: false,
        }
    }

    fn balanced(&self) -> bool {
        !self.in_quote && self.depth == 0 && !self.underflow
    }
}

impl Iterator for TopLevel<'_> {
    type Item = (usize, char, bool);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, ch) = self.chars.next()?;
        let top = !self.in_quote && self.depth == 0;
        if self.in_quote {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.in_quote = false;
            }
        } else {
            match ch {
                '"' => self.in_quote = true,
                '(' | '[' => self.depth += 1,
                ')' | ']' => match self.depth.checked_sub(1) {
                    Some(depth) => self.depth = depth,
                    None => self.underflow = true,
                },
                _ => {}
            }
        }
        Some((index, ch, top))
    }
}

/// Fails on unterminated strings or unbalanced brackets.
pub(crate) fn check_balanced(text: &str) -> Result<()> {
    let mut scan = TopLevel::new(text);
    for _ in scan.by_ref() {}
    if scan.balanced() {
        Ok(())
    } else {
        Err(Error::syntax("unbalanced brackets or quotes", text))
    }
}

/// Splits on `sep` at the top level.
pub(crate) fn split_top(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (index, ch, top) in TopLevel::new(text) {
        if top && ch == sep {
            parts.push(&text[start..index]);
            start = index + ch.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Splits on a whitespace-delimited keyword (case-insensitive) at the top
/// level.
pub(crate) fn split_keyword<'a>(text: &'a str, keyword: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut resume = 0;
    for (index, ch, top) in TopLevel::new(text) {
        if index < resume || !top || !ch.is_ascii_whitespace() {
            continue;
        }
        let kw_start = index + 1;
        let kw_end = kw_start + keyword.len();
        let matches = text
            .get(kw_start..kw_end)
            .map_or(false, |word| word.eq_ignore_ascii_case(keyword));
        let delimited = matches
            && text[kw_end..]
                .chars()
                .next()
                .map_or(false, |c| c.is_ascii_whitespace());
        if delimited {
            parts.push(&text[start..index]);
            start = kw_end;
            resume = kw_end;
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Byte index of the bracket closing the one `text` starts with.
pub(crate) fn group_end(text: &str) -> Option<usize> {
    let mut scan = TopLevel::new(text);
    scan.next()?;
    while let Some((index, _, _)) = scan.next() {
        if scan.depth == 0 && !scan.in_quote {
            return Some(index);
        }
    }
    None
}

/// Whether `text` is one bracketed group, returning its inside.
pub(crate) fn unwrap_group(text: &str, open: char) -> Option<&str> {
    if !text.starts_with(open) {
        return None;
    }
    let end = group_end(text)?;
    if end + 1 == text.len() {
        Some(&text[1..end])
    } else {
        None
    }
}

/// Strips a leading case-insensitive keyword followed by whitespace (or the
/// end of input).
pub(crate) fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_ascii_whitespace() => Some(rest.trim_start()),
        Some(_) => None,
    }
}

/// Reads a leading `"..."` literal, returning its unescaped content and the
/// remaining text.
pub(crate) fn read_quoted(text: &str) -> Result<(String, &str)> {
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, '"')) => {}
        _ => return Err(Error::syntax("expected a quoted string", text)),
    }
    let mut out = String::new();
    let mut escaped = false;
    for (index, ch) in chars {
        if escaped {
            out.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            return Ok((out, &text[index + 1..]));
        } else {
            out.push(ch);
        }
    }
    Err(Error::syntax("unterminated string", text))
}

pub(crate) fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Splits a leading identifier off `text`.
pub(crate) fn take_ident(text: &str) -> (&str, &str) {
    let end = text
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map_or(text.len(), |(i, _)| i);
    text.split_at(end)
}

pub(crate) fn is_ident(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_ident_char)
}
