//! Error type and location-capturing construction macro.
//!
//! Every fallible path in this crate returns [Result]. Each [Error] variant
//! carries a `(location, message)` pair so that a `SYSTEM` failure can be
//! logged, and replayed, with the exact call site that raised it.

use std::{fmt, result};

/// Crate wide `Result` type.
pub type Result<T> = result::Result<T, Error>;

/// Error kinds, mirroring the taxonomy in the error-handling design (one
/// variant per propagated error kind; `more`/`suspend` is deliberately not
/// a variant here, see [crate::budget::Outcome::NeedsMore]).
#[derive(Clone, PartialEq, Eq)]
pub enum Error {
    /// no such mapping / no matching primitive.
    Empty(String, String),
    /// cursor or request text could not be parsed.
    Syntax(String, String),
    /// well formed but disallowed composition.
    Semantics(String, String),
    /// planner could not reduce within budget.
    TooHard(String, String),
    /// allocation failure.
    Memory(String, String),
    /// unexpected I/O or invariant violation.
    System(String, String),
    /// duplicate insert into a GMAP that forbids duplicates.
    Already(String, String),
    /// mutating verb on a read-only replica session.
    NotReplica(String, String),
    /// request deadline exceeded.
    Timeout(String, String),
    /// caller supplied a malformed value (not on the wire-protocol path).
    InvalidInput(String, String),
    /// I/O error from the block-store facade.
    IOError(String, String),
    /// numeric conversion failure.
    FailConvert(String, String),
    /// malformed on-disk file.
    InvalidFile(String, String),
    /// no such internal id.
    NoSuchId(String, String),
}

impl Error {
    /// The wire-level keyword for this error (§6/§7).
    pub fn keyword(&self) -> &'static str {
        match self {
            Error::Empty(..) => "EMPTY",
            Error::Syntax(..) => "SYNTAX",
            Error::Semantics(..) => "SEMANTICS",
            Error::TooHard(..) => "TOOMANY",
            Error::Memory(..) => "MEMORY",
            Error::System(..) => "SYSTEM",
            Error::Already(..) => "SYSTEM",
            Error::NotReplica(..) => "NOTREPLICA",
            Error::Timeout(..) => "TIMEOUT",
            Error::InvalidInput(..) => "SYNTAX",
            Error::IOError(..) => "SYSTEM",
            Error::FailConvert(..) => "SYSTEM",
            Error::InvalidFile(..) => "SYSTEM",
            Error::NoSuchId(..) => "EMPTY",
        }
    }

    fn parts(&self) -> (&str, &str, &str) {
        let (kind, loc, msg) = match self {
            Error::Empty(l, m) => ("Empty", l, m),
            Error::Syntax(l, m) => ("Syntax", l, m),
            Error::Semantics(l, m) => ("Semantics", l, m),
            Error::TooHard(l, m) => ("TooHard", l, m),
            Error::Memory(l, m) => ("Memory", l, m),
            Error::System(l, m) => ("System", l, m),
            Error::Already(l, m) => ("Already", l, m),
            Error::NotReplica(l, m) => ("NotReplica", l, m),
            Error::Timeout(l, m) => ("Timeout", l, m),
            Error::InvalidInput(l, m) => ("InvalidInput", l, m),
            Error::IOError(l, m) => ("IOError", l, m),
            Error::FailConvert(l, m) => ("FailConvert", l, m),
            Error::InvalidFile(l, m) => ("InvalidFile", l, m),
            Error::NoSuchId(l, m) => ("NoSuchId", l, m),
        };
        (kind, loc.as_str(), msg.as_str())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (kind, loc, msg) = self.parts();
        write!(f, "{} at {}: {}", kind, loc, msg)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

/// Construct or wrap an [Error], capturing the call site.
///
/// Three forms:
/// * `err_at!(Kind, expr)` — evaluate `expr: Result<T, E: Display>`, convert
///   the `Err` arm into `Error::Kind(location, e.to_string())`.
/// * `err_at!(Kind, expr, "fmt", args...)` — same, with an extra formatted
///   message appended to the converted error.
/// * `err_at!(Kind, msg: "fmt", args...)` — construct an `Err(Error::Kind(..))`
///   directly, no wrapped expression.
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err($crate::Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err($crate::Error::$v(prefix, err.to_string()))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let extra = format!($($arg),+);
                Err($crate::Error::$v(prefix, format!("{}: {}", extra, err)))
            }
        }
    }};
}

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;
