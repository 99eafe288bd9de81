//! Persistent REPL session support.
//!
//! `ReplSession` keeps one [`Evaluator`] alive across `execute()` calls so
//! interactive snippets share variables, functions, classes, and instances
//! the same way top-level statements in a single file would.

use std::cell::RefCell;
use std::rc::Rc;

use crate::eval::Evaluator;
use crate::io::PrintWriter;
use crate::parser::parse;
use crate::repl_error::ReplError;
use crate::resource::RecursionLimitTracker;
use crate::tracer::NoopTracer;
use crate::value::Value;

/// Writes into a buffer shared with [`ReplSession`], so each `execute()`
/// call can drain exactly what that snippet printed without reaching
/// inside the evaluator.
#[derive(Debug, Default)]
struct SharedBuffer(Rc<RefCell<String>>);

impl PrintWriter for SharedBuffer {
    fn write_str(&mut self, output: std::borrow::Cow<'_, str>) {
        self.0.borrow_mut().push_str(&output);
    }

    fn write_char(&mut self, end: char) {
        self.0.borrow_mut().push(end);
    }
}

/// An interactive session: one persistent global scope, fed one snippet of
/// source at a time.
pub struct ReplSession {
    eval: Evaluator,
    output: Rc<RefCell<String>>,
}

impl ReplSession {
    #[must_use]
    pub fn new() -> Self {
        let output = Rc::new(RefCell::new(String::new()));
        let eval = Evaluator::new(
            Box::new(RecursionLimitTracker::default()),
            Box::new(NoopTracer),
            Box::new(SharedBuffer(Rc::clone(&output))),
        );
        Self { eval, output }
    }

    /// Parses and evaluates one snippet against the session's persistent
    /// global scope, returning the snippet's value and anything it wrote
    /// to `declare`/`announce` during evaluation.
    ///
    /// # Errors
    /// Returns [`ReplError::Parse`] if `line` fails to lex or parse, or
    /// [`ReplError::Runtime`] if evaluating it raises an error.
    pub fn execute(&mut self, line: &str) -> Result<(Value, String), ReplError> {
        let program = parse(line)?;
        self.output.borrow_mut().clear();
        let result = self.eval.run_program(&program.statements)?;
        let output = self.output.borrow_mut().split_off(0);
        Ok((result, output))
    }

    /// Names currently bound in the session's global scope, in the order
    /// they were defined — used by a REPL's `:env`-style introspection
    /// command.
    #[must_use]
    pub fn global_names(&self) -> Vec<Rc<str>> {
        self.eval.globals.borrow().own_names()
    }

    /// Feeds an error message into the session's repeat counter, returning
    /// how many times in a row this exact message has now been seen. A
    /// REPL uses this to escalate verbosity when a user hits the same
    /// mistake repeatedly, without the evaluator itself caring.
    pub fn note_error(&mut self, message: &str) -> u32 {
        self.eval.note_top_level_error(message)
    }
}

impl Default for ReplSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persists_bindings_across_calls() {
        let mut session = ReplSession::new();
        session.execute("designate x = 41").unwrap();
        let (value, _) = session.execute("x + 1").unwrap();
        assert_eq!(value, Value::Int(42));
    }

    #[test]
    fn captures_declare_output() {
        let mut session = ReplSession::new();
        let (_, output) = session.execute("declare 1, 2").unwrap();
        assert_eq!(output, "1 2\n");
    }

    #[test]
    fn reports_parse_errors_without_poisoning_session() {
        let mut session = ReplSession::new();
        assert!(session.execute("designate x = ").is_err());
        session.execute("designate x = 1").unwrap();
        let (value, _) = session.execute("x").unwrap();
        assert_eq!(value, Value::Int(1));
    }

    #[test]
    fn global_names_reflects_definitions() {
        let mut session = ReplSession::new();
        session.execute("designate answer = 42").unwrap();
        assert!(session.global_names().iter().any(|n| n.as_ref() == "answer"));
    }
}
