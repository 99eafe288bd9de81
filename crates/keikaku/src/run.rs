//! Public one-shot interface for running Keikaku code to completion.

use crate::ast::Program;
use crate::eval::Evaluator;
use crate::exception::RaisedError;
use crate::io::{PrintWriter, StdPrint};
use crate::parser::{ParseError, parse};
use crate::resource::{NoLimitTracker, RecursionLimitTracker, ResourceTracker};
use crate::tracer::{NoopTracer, Tracer};
use crate::value::Value;

/// Either phase of running a program can fail: parsing, or evaluation.
#[derive(Debug)]
pub enum Error {
    Parse(ParseError),
    Runtime(RaisedError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<RaisedError> for Error {
    fn from(e: RaisedError) -> Self {
        Self::Runtime(e)
    }
}

/// Primary interface for running Keikaku source to completion.
///
/// # Example
/// ```
/// use keikaku::Runner;
///
/// let runner = Runner::new("announce 1 + 1", "demo.kei").unwrap();
/// let result = runner.run_no_limits().unwrap();
/// assert_eq!(result.display_string(), "void");
/// ```
#[derive(Debug, Clone)]
pub struct Runner {
    program: Program,
    script_name: String,
}

impl Runner {
    /// Parses `code` into a program ready to run. The result carries no
    /// evaluator state yet — call one of the `run*` methods to execute it.
    ///
    /// # Errors
    /// Returns [`Error::Parse`] if `code` fails to lex or parse.
    pub fn new(code: &str, script_name: &str) -> Result<Self, Error> {
        let program = parse(code)?;
        Ok(Self { program, script_name: script_name.to_string() })
    }

    #[must_use]
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Executes the program with caller-supplied resource tracking, tracing
    /// and output sink.
    ///
    /// # Errors
    /// Returns [`Error::Runtime`] if the program raises an error that
    /// reaches the top level, or if the resource tracker trips a limit.
    pub fn run(
        &self,
        resources: Box<dyn ResourceTracker>,
        tracer: Box<dyn Tracer>,
        print: Box<dyn PrintWriter>,
    ) -> Result<Value, Error> {
        let mut eval = Evaluator::new(resources, tracer, print);
        let value = eval.run_program(&self.program.statements)?;
        Ok(value)
    }

    /// Executes with no recursion limit, no tracing, and output to stdout —
    /// the path the CLI uses for `keikaku file.kei`.
    ///
    /// # Errors
    /// Returns [`Error::Runtime`] if the program raises an error at the top
    /// level.
    pub fn run_no_limits(&self) -> Result<Value, Error> {
        self.run(Box::new(NoLimitTracker::default()), Box::new(NoopTracer), Box::new(StdPrint))
    }

    /// Executes with a fixed recursion-depth limit, output to stdout.
    ///
    /// # Errors
    /// Returns [`Error::Runtime`] if the program raises an error at the top
    /// level, including a tripped recursion limit.
    pub fn run_with_limit(&self, limit: usize) -> Result<Value, Error> {
        self.run(Box::new(RecursionLimitTracker::new(limit)), Box::new(NoopTracer), Box::new(StdPrint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CollectStringPrint;

    #[test]
    fn runs_a_simple_program_to_completion() {
        let runner = Runner::new("designate x = 1 + 2\nannounce x", "test.kei").unwrap();
        let print = Box::new(CollectStringPrint::new());
        let result = runner.run(Box::new(NoLimitTracker::default()), Box::new(NoopTracer), print);
        assert!(result.is_ok());
    }

    #[test]
    fn surfaces_parse_errors() {
        let err = Runner::new("designate x = ", "test.kei").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn surfaces_runtime_errors() {
        let runner = Runner::new("announce undefined_name", "test.kei").unwrap();
        let err = runner.run_no_limits().unwrap_err();
        assert!(matches!(err, Error::Runtime(_)));
    }

    #[test]
    fn recursion_limit_trips_for_unbounded_recursion() {
        let runner = Runner::new("protocol loop():\n    yield loop()\nannounce loop()", "test.kei").unwrap();
        let err = runner.run_with_limit(50).unwrap_err();
        assert!(matches!(err, Error::Runtime(_)));
    }
}
