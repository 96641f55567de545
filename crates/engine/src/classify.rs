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

//! Value classifier.
//!
//! Turns one [`RawVariable`] into a typed [`Value`]. Anything expandable becomes a
//! reference carrying the variable's raw reference id; the identity resolver may remap it
//! afterwards. Everything else is decoded according to its declared type.

use snaptrace_common::types::{Address, Value};

use crate::{RawVariable, ValueDecodeError};

/// How a scalar's printed text is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarClass {
    /// Base-10 integer
    Int,
    /// Floating point number
    Float,
    /// Boolean, kept as the printed token
    Bool,
    /// Single character, printed quoted
    Char,
    /// String, or a sentinel with no value (`None`, `null`)
    Str,
}

impl ScalarClass {
    /// Scalar class of a declared type, `None` for types that are not known scalars
    pub fn of(declared_type: &str) -> Option<Self> {
        let class = match declared_type.trim() {
            "int" | "long" | "short" | "byte" => Self::Int,
            "float" | "double" => Self::Float,
            "bool" | "boolean" => Self::Bool,
            "char" => Self::Char,
            "str" | "String" | "java.lang.String" | "NoneType" | "null" => Self::Str,
            _ => return None,
        };
        Some(class)
    }
}

/// Strip one pair of matching surrounding quotes
pub fn unquote(text: &str) -> &str {
    let bytes = text.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last))
            if bytes.len() >= 2 && first == last && (first == b'\'' || first == b'"') =>
        {
            &text[1..text.len() - 1]
        }
        _ => text,
    }
}

/// Classify a raw variable.
///
/// Expandable variables (non-zero reference id) always become [`Value::Ref`]; scalars
/// are decoded by declared type, and unknown scalar types keep their printed text.
pub fn classify(raw: &RawVariable) -> Result<Value, ValueDecodeError> {
    if raw.is_expandable() {
        return Ok(Value::Ref(Address(raw.raw_reference_id)));
    }

    let Some(class) = ScalarClass::of(&raw.declared_type) else {
        return Ok(Value::Str(raw.raw_value_text.clone()));
    };
    decode_scalar(class, &raw.declared_type, &raw.raw_value_text)
}

/// Decode printed text as a scalar of the given class
pub fn decode_scalar(
    class: ScalarClass,
    declared_type: &str,
    text: &str,
) -> Result<Value, ValueDecodeError> {
    let trimmed = text.trim();
    let error = |reason: String| ValueDecodeError {
        declared_type: declared_type.to_string(),
        text: text.to_string(),
        reason,
    };

    let value = match class {
        ScalarClass::Int => Value::Int(trimmed.parse().map_err(|e| error(format!("{e}")))?),
        ScalarClass::Float => Value::Float(trimmed.parse().map_err(|e| error(format!("{e}")))?),
        ScalarClass::Bool => match trimmed {
            "True" | "False" | "true" | "false" => Value::Bool(trimmed.to_string()),
            _ => return Err(error("not a boolean literal".to_string())),
        },
        ScalarClass::Char => Value::Char(unquote(trimmed).to_string()),
        ScalarClass::Str => Value::Str(unquote(text).to_string()),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(declared_type: &str, text: &str) -> Result<Value, ValueDecodeError> {
        classify(&RawVariable::new("v", declared_type, text, 0))
    }

    #[test]
    fn test_integers() {
        assert_eq!(scalar("int", "1").unwrap(), Value::Int(1));
        assert_eq!(scalar("long", "-42").unwrap(), Value::Int(-42));
        assert!(scalar("int", "1_000x").is_err());
        // Arbitrary precision ints do not fit
        assert!(scalar("int", "123456789012345678901234567890").is_err());
    }

    #[test]
    fn test_floats() {
        assert_eq!(scalar("float", "2.5").unwrap(), Value::Float(2.5));
        assert_eq!(scalar("double", "1.0E3").unwrap(), Value::Float(1000.0));
        assert!(scalar("double", "one").is_err());
    }

    #[test]
    fn test_booleans_keep_token() {
        assert_eq!(scalar("bool", "True").unwrap(), Value::Bool("True".into()));
        assert_eq!(scalar("boolean", "false").unwrap(), Value::Bool("false".into()));
        assert!(scalar("bool", "yes").is_err());
    }

    #[test]
    fn test_strings_chars_and_sentinels() {
        assert_eq!(scalar("str", "'hello'").unwrap(), Value::str("hello"));
        assert_eq!(scalar("String", "\"a b\"").unwrap(), Value::str("a b"));
        assert_eq!(scalar("NoneType", "None").unwrap(), Value::str("None"));
        assert_eq!(scalar("char", "'x'").unwrap(), Value::Char("x".into()));
        assert_eq!(scalar("complex", "(1+2j)").unwrap(), Value::str("(1+2j)"));
    }

    #[test]
    fn test_expandable_is_always_a_reference() {
        for ty in ["int", "list", "String", "Node"] {
            let raw = RawVariable::new("v", ty, "whatever", 42);
            assert_eq!(classify(&raw).unwrap(), Value::reference(42));
        }
    }

    #[test]
    fn test_scalars_are_never_references() {
        for (ty, text) in [("int", "0"), ("str", "''"), ("Node", "<gone>"), ("null", "null")] {
            assert!(!classify(&RawVariable::new("v", ty, text, 0)).unwrap().is_ref());
        }
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'a'"), "a");
        assert_eq!(unquote("\"\""), "");
        assert_eq!(unquote("'"), "'");
        assert_eq!(unquote("'a\""), "'a\"");
    }
}
