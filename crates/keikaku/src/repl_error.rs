use std::fmt;

use crate::exception::RaisedError;
use crate::parser::ParseError;

/// Error type for REPL execution, separating failures by pipeline stage so
/// callers can handle feedback and recovery policy accurately without
/// string matching. A tripped recursion limit surfaces as `Runtime` since
/// the evaluator folds resource errors into a [`RaisedError`] before they
/// ever reach the REPL boundary.
#[derive(Debug, Clone)]
pub enum ReplError {
    /// Parsing failed before evaluation.
    Parse(ParseError),
    /// The program raised an error while executing.
    Runtime(RaisedError),
}

impl fmt::Display for ReplError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(error) => write!(f, "{error}"),
            Self::Runtime(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for ReplError {}

impl From<ParseError> for ReplError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<RaisedError> for ReplError {
    fn from(error: RaisedError) -> Self {
        Self::Runtime(error)
    }
}
