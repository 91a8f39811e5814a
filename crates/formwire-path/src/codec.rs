//! Field-name ↔ path codec.
//!
//! Grammar (no whitespace, no escaping):
//!
//! ```text
//! name    := "" | first ( "." segment | index )*
//! first   := segment | index
//! segment := [^.\[\]]+
//! index   := "[" digit+ "]"
//! ```
//!
//! The empty name decodes to the empty path (the root of the tree). Every
//! malformed input is an explicit [`PathError`] with the byte offset of the
//! offending token; nothing is silently truncated or coerced.

use std::fmt::Write as _;

use nom::bytes::complete::take_while1;
use nom::IResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One key of a structured path: an object property or an array index.
///
/// Serializes untagged, so a path renders as a JSON array of strings and
/// numbers (`["items", 0, "name"]`) — the shape validator issues carry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
    Index(usize),
    Field(String),
}

impl PathKey {
    pub fn field(name: impl Into<String>) -> Self {
        PathKey::Field(name.into())
    }

    pub fn index(index: usize) -> Self {
        PathKey::Index(index)
    }
}

/// A structured path into a nested value tree.
pub type FieldPath = Vec<PathKey>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid field name at byte {offset}: {message}")]
    Invalid { offset: usize, message: String },
}

impl PathError {
    fn at(offset: usize, message: impl Into<String>) -> Self {
        PathError::Invalid {
            offset,
            message: message.into(),
        }
    }
}

fn field_segment(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c != '.' && c != '[' && c != ']')(input)
}

/// Decode a flat field name into its structured path.
///
/// The empty string decodes to the empty path. See the module docs for the
/// accepted grammar; anything else is a [`PathError`].
pub fn decode(name: &str) -> Result<FieldPath, PathError> {
    let mut keys: FieldPath = Vec::new();
    let mut rest = name;

    while !rest.is_empty() {
        let at = name.len() - rest.len();

        if let Some(after) = rest.strip_prefix('[') {
            let Some(close) = after.find(']') else {
                return Err(PathError::at(at, "unmatched `[`"));
            };
            let digits = &after[..close];
            if digits.is_empty() {
                return Err(PathError::at(at + 1, "empty array index"));
            }
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PathError::at(
                    at + 1,
                    format!("array index `{digits}` is not a non-negative integer"),
                ));
            }
            let index: usize = digits
                .parse()
                .map_err(|_| PathError::at(at + 1, format!("array index `{digits}` out of range")))?;
            keys.push(PathKey::Index(index));
            rest = &after[close + 1..];
            continue;
        }

        if rest.starts_with(']') {
            return Err(PathError::at(at, "unmatched `]`"));
        }

        if let Some(after) = rest.strip_prefix('.') {
            if keys.is_empty() {
                return Err(PathError::at(at, "leading `.`"));
            }
            let (next, segment) = field_segment(after)
                .map_err(|_| PathError::at(at + 1, "empty field segment after `.`"))?;
            keys.push(PathKey::Field(segment.to_string()));
            rest = next;
            continue;
        }

        // A bare field segment is only valid at the very start of the name;
        // everything after the first key must be introduced by `.` or `[`.
        if !keys.is_empty() {
            return Err(PathError::at(at, "expected `.` or `[` between keys"));
        }
        let (next, segment) =
            field_segment(rest).map_err(|_| PathError::at(at, "empty field segment"))?;
        keys.push(PathKey::Field(segment.to_string()));
        rest = next;
    }

    Ok(keys)
}

/// Encode a structured path back into its flat field name.
///
/// Exact inverse of [`decode`] for every path whose field keys are non-empty
/// and free of `.`, `[` and `]` (the only paths `decode` can produce).
pub fn encode(path: &[PathKey]) -> String {
    let mut out = String::new();
    for key in path {
        match key {
            PathKey::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            PathKey::Index(index) => {
                // Infallible: writing to a String cannot fail.
                let _ = write!(out, "[{index}]");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(name: &str) -> PathKey {
        PathKey::field(name)
    }

    fn i(index: usize) -> PathKey {
        PathKey::index(index)
    }

    #[test]
    fn decodes_plain_and_nested_names() {
        assert_eq!(decode("email").unwrap(), vec![f("email")]);
        assert_eq!(decode("a.b.c").unwrap(), vec![f("a"), f("b"), f("c")]);
        assert_eq!(
            decode("items[0].name").unwrap(),
            vec![f("items"), i(0), f("name")]
        );
        assert_eq!(decode("m[2][10]").unwrap(), vec![f("m"), i(2), i(10)]);
    }

    #[test]
    fn empty_name_is_the_root_path() {
        assert_eq!(decode("").unwrap(), Vec::<PathKey>::new());
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn leading_index_is_accepted() {
        assert_eq!(decode("[0].x").unwrap(), vec![i(0), f("x")]);
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in [".a", "a.", "a..b", "a[", "a[]", "a[1x]", "a[0]b", "]x", "a]"] {
            assert!(decode(bad).is_err(), "`{bad}` should not decode");
        }
    }

    #[test]
    fn reports_the_offending_offset() {
        let err = decode("items[x]").unwrap_err();
        let PathError::Invalid { offset, .. } = err;
        assert_eq!(offset, 6);
    }

    #[test]
    fn encode_inverts_decode() {
        for name in ["", "a", "a.b", "items[0].name", "a[0][1].b.c", "[3]"] {
            assert_eq!(encode(&decode(name).unwrap()), name);
        }
    }

    #[test]
    fn path_keys_serialize_as_strings_and_numbers() {
        let path = vec![f("items"), i(0), f("name")];
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#"["items",0,"name"]"#);
        let back: FieldPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
