//! Runtime error model.
//!
//! A closed exception-type enum (`strum`-derived `Display`/`EnumString`
//! over a fixed tag set) rather than an open `Box<dyn Error>` hierarchy,
//! since the language defines a fixed, closed list of error kinds rather
//! than an extensible exception taxonomy.

use strum::{Display, EnumString};

use crate::ast::Line;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "PascalCase")]
pub enum ErrorKind {
    UndefinedName,
    NotCallable,
    DivisionByZero,
    TypeMismatch,
    IndexOutOfBounds,
    InvalidSlice,
    NoSuchMethod,
    NoSuchMember,
    PrivateAccess,
    SelfOutsideMethod,
    NoParent,
    UndefinedParent,
    NotIterable,
    PromiseRejected,
    ImportFailed,
    SyntaxError,
}

/// A raised runtime error: a kind plus a human-readable message, and the
/// line it was raised at when known (`attempt`/`recover` only ever see the
/// message — `recover` binds "the error message", not a structured object).
#[derive(Debug, Clone)]
pub struct RaisedError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<Line>,
}

impl RaisedError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), line: None }
    }

    #[must_use]
    pub fn at(mut self, line: Line) -> Self {
        self.line = Some(line);
        self
    }

    /// The text bound to a `recover as e` variable and printed by `declare`.
    #[must_use]
    pub fn display_message(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

impl std::fmt::Display for RaisedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.display_message()),
            None => write!(f, "{}", self.display_message()),
        }
    }
}

impl std::error::Error for RaisedError {}

pub type RunResult<T> = Result<T, RaisedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_message_prefixes_kind() {
        let err = RaisedError::new(ErrorKind::DivisionByZero, "division by zero");
        assert_eq!(err.display_message(), "DivisionByZero: division by zero");
    }
}
