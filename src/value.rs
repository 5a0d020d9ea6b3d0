//! Result value tree (§3.8) and the formatting rules §4.7 assigns it:
//! list parentheses for `List`, whitespace separation otherwise, with
//! `\`, `"` and newline escaped inside strings. Rendering works on raw
//! bytes throughout since `name`/`value` fields are arbitrary byte
//! strings, not necessarily valid UTF-8.

use crate::{err_at, guid::Id, Guid, Result};

/// An unresolved lazy subquery, addressed by an arena-local handle; only
/// the execution engine (not this module) knows how to drive it.
pub type DeferredHandle = u64;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    String(Vec<u8>),
    Atom(String),
    Guid(Guid),
    Datatype(u8),
    Timestamp(u64),
    /// Parenthesized, ordered.
    List(Vec<Value>),
    /// Whitespace-separated, ordered; no enclosing punctuation.
    Sequence(Vec<Value>),
    /// A range of primitive ids materialized only when the formatter
    /// reaches this node (bulk result, §4.7 "records").
    Records { start: Id, end: Id },
    /// An unevaluated sub-pipeline; the formatter drives it to completion
    /// (or to suspension) when it reaches this node.
    Deferred(DeferredHandle),
}

/// Escape `\`, `"` and newline; every other byte, including non-ASCII
/// UTF-8 continuation bytes, passes through unchanged. `name`/`value` are
/// arbitrary byte strings (§3.1), not necessarily valid UTF-8, so this
/// works on raw bytes rather than `char`s to avoid reinterpreting a byte
/// ≥ 0x80 as a Latin-1 code point and corrupting it on re-encode.
fn escape(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'"' => out.extend_from_slice(b"\\\""),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(b),
        }
    }
    out
}

fn join(parts: Vec<Vec<u8>>, sep: u8) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push(sep);
        }
        out.extend(part);
    }
    out
}

impl Value {
    /// Render the fully-resolved value to its wire text, as raw bytes
    /// rather than a `String`: `name`/`value` fields are arbitrary byte
    /// strings (§3.1) that need not be valid UTF-8, so the rendered reply
    /// is built byte-safe throughout and only ever decoded lossily (or not
    /// at all) once it reaches an actual text sink. `Records` and
    /// `Deferred` nodes must already have been driven to a concrete value
    /// by the execution engine before this is called; encountering one
    /// here is a caller bug, not a data condition.
    pub fn render(&self) -> Result<Vec<u8>> {
        match self {
            Value::Null => Ok(b"null".to_vec()),
            Value::Boolean(b) => Ok(b.to_string().into_bytes()),
            Value::Number(n) => Ok(n.to_string().into_bytes()),
            Value::String(bytes) => {
                let mut out = Vec::with_capacity(bytes.len() + 2);
                out.push(b'"');
                out.extend(escape(bytes));
                out.push(b'"');
                Ok(out)
            }
            Value::Atom(s) => Ok(s.clone().into_bytes()),
            Value::Guid(g) => Ok(g.to_string().into_bytes()),
            Value::Datatype(d) => Ok(d.to_string().into_bytes()),
            Value::Timestamp(t) => Ok(t.to_string().into_bytes()),
            Value::List(items) => {
                let rendered: Result<Vec<Vec<u8>>> = items.iter().map(Value::render).collect();
                let mut out = Vec::new();
                out.push(b'(');
                out.extend(join(rendered?, b' '));
                out.push(b')');
                Ok(out)
            }
            Value::Sequence(items) => {
                let rendered: Result<Vec<Vec<u8>>> = items.iter().map(Value::render).collect();
                Ok(join(rendered?, b' '))
            }
            Value::Records { .. } => {
                err_at!(System, msg: "records value reached the formatter unresolved")
            }
            Value::Deferred(_) => {
                err_at!(System, msg: "deferred value reached the formatter unresolved")
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

#[cfg(test)]
#[path = "value_test.rs"]
mod value_test;
