// SnapTrace - Execution Snapshot Tracer
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! String-to-structure parser.
//!
//! Some containers only expose their elements through their printed form (`(1, 'a')`,
//! `{1, 2}`, `{'k': [1]}`). [`parse_composite`] rewrites such text into a JSON document in
//! a single left-to-right pass and then reads it back with `serde_json`:
//!
//! - `(`/`[` become `[`, `{` becomes `{` for mappings and `[` for sets
//! - quoted strings of either quote style become JSON strings that keep their quotes
//! - bare tokens (`None`, `True`, numbers) and `<...>` object reprs become JSON strings
//! - constructor calls (`set()`, `frozenset({1})`, `deque([1])`) keep only their argument
//!
//! Every scalar comes back as an [`Composite::Atom`] holding its printed token, so `1` and
//! `'1'` stay distinct (escapes inside quoted strings are resolved). Mapping keys are
//! printed tokens as well.

use indexmap::IndexMap;
use serde::Deserialize;
use snaptrace_common::types::ContainerKind;

use crate::CompositeParseError;

/// Output closer of a constructor call's parentheses, which print nothing
const TRANSPARENT: char = '\0';

/// A parsed printed composite
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Composite {
    /// A scalar, as printed
    Atom(String),
    /// A sequence (list, tuple, set)
    Seq(Vec<Composite>),
    /// A mapping keyed by printed key, in printed order
    Mapping(IndexMap<String, Composite>),
}

/// Parse the printed form of a container of the given kind
pub fn parse_composite(kind: ContainerKind, text: &str) -> Result<Composite, CompositeParseError> {
    let error = |reason: String| CompositeParseError {
        kind: kind.to_string(),
        text: text.to_string(),
        reason,
    };

    let document = normalize(kind, text).map_err(error)?;
    let parsed: Composite = serde_json::from_str(&document).map_err(|e| error(e.to_string()))?;
    conform(kind, parsed).map_err(error)
}

/// Check the parsed document against the expected kind
fn conform(kind: ContainerKind, parsed: Composite) -> Result<Composite, String> {
    match (kind, parsed) {
        (
            ContainerKind::List | ContainerKind::Tuple | ContainerKind::Set,
            seq @ Composite::Seq(_),
        ) => Ok(seq),
        (ContainerKind::Dict | ContainerKind::Map, mapping @ Composite::Mapping(_)) => Ok(mapping),
        // `OrderedDict([('a', 1)])` prints its entries as a list of pairs
        (ContainerKind::Dict | ContainerKind::Map, Composite::Seq(items)) => items
            .into_iter()
            .map(|item| match item {
                Composite::Seq(mut pair) if pair.len() == 2 => {
                    let value = pair.pop();
                    match (pair.pop(), value) {
                        (Some(Composite::Atom(key)), Some(value)) => Ok((key, value)),
                        _ => Err("mapping entry with a composite key".to_string()),
                    }
                }
                _ => Err("mapping entry is not a key/value pair".to_string()),
            })
            .collect::<Result<IndexMap<_, _>, _>>()
            .map(Composite::Mapping),
        (kind, _) => Err(format!("printed text does not describe a {kind}")),
    }
}

fn is_bare(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '+' | '-')
}

fn push_json_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn push_quote(out: &mut String, quote: char) {
    if quote == '"' {
        out.push_str("\\\"");
    } else {
        out.push(quote);
    }
}

/// Copy a quoted string starting at `start`, quotes included, as a JSON string; returns
/// the index after it
fn copy_string(chars: &[char], start: usize, out: &mut String) -> Result<usize, String> {
    let quote = chars[start];
    out.push('"');
    push_quote(out, quote);
    let mut i = start + 1;
    while let Some(&c) = chars.get(i) {
        match c {
            '\\' => {
                match chars.get(i + 1) {
                    Some('\'') => out.push('\''),
                    Some(&n)
                        if matches!(n, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u') =>
                    {
                        out.push('\\');
                        out.push(n);
                    }
                    // `\x41` and friends have no JSON form, keep them literally
                    Some(&n) => {
                        out.push_str("\\\\");
                        out.push(n);
                    }
                    None => return Err("unterminated escape".to_string()),
                }
                i += 2;
                continue;
            }
            c if c == quote => {
                push_quote(out, quote);
                out.push('"');
                return Ok(i + 1);
            }
            '"' => out.push_str("\\\""),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
        i += 1;
    }
    Err("unterminated string".to_string())
}

/// Copy an `<...>` repr as a JSON string; returns the index after it
fn copy_opaque(chars: &[char], start: usize, out: &mut String) -> Result<usize, String> {
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate().skip(start) {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    let repr: String = chars[start..=i].iter().collect();
                    push_json_string(out, &repr);
                    return Ok(i + 1);
                }
            }
            _ => {}
        }
    }
    Err("unterminated object repr".to_string())
}

/// Whether the `{` at `start` opens a mapping, i.e. has a `:` at its own nesting level
fn brace_holds_mapping(chars: &[char], start: usize) -> bool {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = start + 1;
    while let Some(&c) = chars.get(i) {
        if let Some(q) = quote {
            if c == '\\' {
                i += 1;
            } else if c == q {
                quote = None;
            }
        } else {
            match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' if depth > 0 => depth -= 1,
                '}' if depth == 0 => return false,
                '}' => depth -= 1,
                ':' if depth == 0 => return true,
                _ => {}
            }
        }
        i += 1;
    }
    false
}

fn trim_trailing_comma(out: &mut String) {
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    if out.ends_with(',') {
        out.pop();
    }
}

/// Rewrite printed container text into a JSON document
fn normalize(kind: ContainerKind, text: &str) -> Result<String, String> {
    let chars: Vec<char> = text.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 16);
    let mut closers: Vec<char> = Vec::new();
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        match c {
            '\'' | '"' => {
                i = copy_string(&chars, i, &mut out)?;
                continue;
            }
            '<' => {
                i = copy_opaque(&chars, i, &mut out)?;
                continue;
            }
            '(' | '[' => {
                out.push('[');
                closers.push(']');
            }
            '{' => {
                let outermost = out.trim().is_empty() && closers.iter().all(|&c| c == TRANSPARENT);
                let mapping = match kind {
                    ContainerKind::Set | ContainerKind::List | ContainerKind::Tuple
                        if outermost =>
                    {
                        false
                    }
                    ContainerKind::Dict | ContainerKind::Map if outermost => true,
                    _ => brace_holds_mapping(&chars, i),
                };
                out.push(if mapping { '{' } else { '[' });
                closers.push(if mapping { '}' } else { ']' });
            }
            ')' | ']' | '}' => {
                let closer = closers.pop().ok_or_else(|| format!("unbalanced `{c}`"))?;
                trim_trailing_comma(&mut out);
                if closer != TRANSPARENT {
                    out.push(closer);
                }
            }
            ',' | ':' => out.push(c),
            c if c.is_whitespace() => out.push(c),
            c if is_bare(c) => {
                let start = i;
                while chars.get(i).copied().is_some_and(is_bare) {
                    i += 1;
                }
                if chars.get(i) == Some(&'(') {
                    // Constructor call: print its argument only, or `[]` if it has none
                    if chars.get(i + 1) == Some(&')') {
                        out.push_str("[]");
                        i += 2;
                    } else {
                        closers.push(TRANSPARENT);
                        i += 1;
                    }
                } else {
                    let word: String = chars[start..i].iter().collect();
                    push_json_string(&mut out, &word);
                }
                continue;
            }
            c => return Err(format!("unexpected character `{c}`")),
        }
        i += 1;
    }

    if !closers.is_empty() {
        return Err("unbalanced brackets".to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn atom(s: &str) -> Composite {
        Composite::Atom(s.to_string())
    }

    fn seq(items: Vec<Composite>) -> Composite {
        Composite::Seq(items)
    }

    #[test]
    fn test_set_literal() {
        let parsed = parse_composite(ContainerKind::Set, "{1, 2, 3}").unwrap();
        assert_eq!(parsed, seq(vec![atom("1"), atom("2"), atom("3")]));
    }

    #[test]
    fn test_dict_literal() {
        let parsed = parse_composite(ContainerKind::Dict, "{'a':1}").unwrap();
        assert_eq!(parsed, Composite::Mapping(IndexMap::from([("'a'".to_string(), atom("1"))])));
    }

    #[test]
    fn test_keys_keep_their_printed_form() {
        let parsed = parse_composite(ContainerKind::Dict, "{1: 'a', '1': 'b'}").unwrap();
        assert_eq!(
            parsed,
            Composite::Mapping(IndexMap::from([
                ("1".to_string(), atom("'a'")),
                ("'1'".to_string(), atom("'b'")),
            ]))
        );
    }

    #[test]
    fn test_tuple_with_trailing_comma_and_sentinels() {
        let parsed = parse_composite(ContainerKind::Tuple, "(None, True, -1.5,)").unwrap();
        assert_eq!(parsed, seq(vec![atom("None"), atom("True"), atom("-1.5")]));
    }

    #[test]
    fn test_nested_mixed_containers() {
        let parsed =
            parse_composite(ContainerKind::List, "[(1, 'x'), {2}, {'k': [3]}, []]").unwrap();
        assert_eq!(
            parsed,
            seq(vec![
                seq(vec![atom("1"), atom("'x'")]),
                seq(vec![atom("2")]),
                Composite::Mapping(IndexMap::from([("'k'".to_string(), seq(vec![atom("3")]))])),
                seq(vec![]),
            ])
        );
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(parse_composite(ContainerKind::List, "[]").unwrap(), seq(vec![]));
        assert_eq!(parse_composite(ContainerKind::Set, "set()").unwrap(), seq(vec![]));
        assert_eq!(
            parse_composite(ContainerKind::Dict, "{}").unwrap(),
            Composite::Mapping(IndexMap::new())
        );
    }

    #[test]
    fn test_constructor_calls() {
        assert_eq!(
            parse_composite(ContainerKind::Set, "frozenset({1, 2})").unwrap(),
            seq(vec![atom("1"), atom("2")])
        );
        assert_eq!(
            parse_composite(ContainerKind::Dict, "OrderedDict([('a', 1), ('b', 2)])").unwrap(),
            Composite::Mapping(IndexMap::from([
                ("'a'".to_string(), atom("1")),
                ("'b'".to_string(), atom("2")),
            ]))
        );
    }

    #[test]
    fn test_quotes_and_escapes() {
        let text = r#"["it's", 'say "hi"', 'a\'b']"#;
        let parsed = parse_composite(ContainerKind::List, text).unwrap();
        assert_eq!(parsed, seq(vec![atom("\"it's\""), atom("'say \"hi\"'"), atom("'a'b'")]));
    }

    #[test]
    fn test_object_reprs_and_recursion_marker() {
        let text = "[<__main__.Node object at 0x10>, [...]]";
        let parsed = parse_composite(ContainerKind::List, text).unwrap();
        assert_eq!(
            parsed,
            seq(vec![atom("<__main__.Node object at 0x10>"), seq(vec![atom("...")])])
        );
    }

    #[test]
    fn test_malformed_text() {
        assert!(parse_composite(ContainerKind::List, "[1, 2").is_err());
        assert!(parse_composite(ContainerKind::List, "1, 2]").is_err());
        assert!(parse_composite(ContainerKind::List, "None").is_err());
        assert!(parse_composite(ContainerKind::Dict, "[1, 2]").is_err());
        assert!(parse_composite(ContainerKind::Instance, "{}").is_err());

        let err = parse_composite(ContainerKind::Set, "{1; 2}").unwrap_err();
        assert_eq!(err.kind, "set");
    }
}
