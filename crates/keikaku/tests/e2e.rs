//! Whole-program behavioral tests covering generators, inheritance, error
//! recovery, pattern matching and scoping end to end.
//!
//! Each test parses and runs a complete source string against a shared
//! output buffer and asserts on the captured `declare`/`announce` text,
//! mirroring the crate's own whole-program test style (see `depth_guard.rs`
//! alongside this file).

use std::cell::RefCell;
use std::rc::Rc;

use keikaku::{NoLimitTracker, NoopTracer, PrintWriter, Runner};

/// A `PrintWriter` that accumulates into a shared buffer the test can read
/// after `Runner::run` consumes its boxed writer — the same pattern
/// `ReplSession`'s internal `SharedBuffer` uses to recover captured output.
#[derive(Default)]
struct SharedOutput(Rc<RefCell<String>>);

impl PrintWriter for SharedOutput {
    fn write_str(&mut self, output: std::borrow::Cow<'_, str>) {
        self.0.borrow_mut().push_str(&output);
    }

    fn write_char(&mut self, end: char) {
        self.0.borrow_mut().push(end);
    }
}

/// Runs `code` to completion and returns everything it printed.
fn run_code(code: &str) -> String {
    let runner = Runner::new(code, "test.kei").expect("should parse");
    let buffer = Rc::new(RefCell::new(String::new()));
    runner
        .run(Box::new(NoLimitTracker::default()), Box::new(NoopTracer), Box::new(SharedOutput(Rc::clone(&buffer))))
        .expect("should run");
    buffer.borrow().clone()
}

#[test]
fn fibonacci_via_sequence() {
    let code = r"
sequence fib():
    designate a = 0
    designate b = 1
    cycle while true:
        yield a
        designate t = a + b
        a = b
        b = t
designate g = fib()
designate xs = []
cycle from 0 to 10 as _: push(xs, proceed(g))
declare xs
";
    let output = run_code(code);
    assert_eq!(output.trim(), "[0, 1, 1, 2, 3, 5, 8, 13, 21, 34]");
}

#[test]
fn nested_loops_in_a_generator() {
    let code = r"
sequence pairs():
    cycle from 0 to 2 as i:
        cycle from 0 to 2 as j: yield [i, j]
cycle through pairs() as p: declare p
";
    let output = run_code(code);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, vec!["[0, 0]", "[0, 1]", "[1, 0]", "[1, 1]"]);
}

#[test]
fn inheritance_and_super() {
    let code = r#"
entity A:
    protocol greet(): yield "A"
entity B inherits A:
    protocol greet():
        designate r = ascend greet()
        yield r + "B"
declare manifest B().greet()
"#;
    let output = run_code(code);
    assert_eq!(output.trim(), "AB");
}

#[test]
fn private_field_access_from_method_succeeds() {
    let code = r"
entity C:
    protocol construct(v): self._x = v
    protocol get(): yield self._x
designate c = manifest C(5)
declare c.get()
";
    let output = run_code(code);
    assert_eq!(output.trim(), "5");
}

#[test]
fn private_field_access_from_outside_fails() {
    let code = r"
entity C:
    protocol construct(v): self._x = v
    protocol get(): yield self._x
designate c = manifest C(5)
declare c._x
";
    let runner = Runner::new(code, "test.kei").unwrap();
    let err = runner.run_no_limits().unwrap_err();
    assert!(err.to_string().contains("PrivateAccess"));
}

#[test]
fn error_recovery_continues_after_division_by_zero() {
    let code = r"
attempt: designate x = 1 / 0
recover as e: declare e
declare 1
";
    let output = run_code(code);
    assert!(output.contains("DivisionByZero"), "expected DivisionByZero in output, got: {output}");
    assert!(output.contains('1'));
}

#[test]
fn match_picks_first_matching_alignment() {
    let code = r#"
designate x = 2
situation x:
    alignment 1: declare "one"
    alignment 2, 3: declare "two or three"
    otherwise: declare "other"
"#;
    let output = run_code(code);
    assert_eq!(output.trim(), "two or three");
}

#[test]
fn generator_status_is_done_after_exhaustion() {
    let code = r"
sequence two():
    yield 1
    yield 2
designate g = two()
declare proceed(g)
declare proceed(g)
declare proceed(g)
declare proceed(g)
";
    let output = run_code(code);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, vec!["1", "2", "void", "void"]);
}

#[test]
fn delegate_yields_a_sub_generators_values() {
    let code = r"
sequence inner():
    yield 1
    yield 2
sequence outer():
    delegate inner()
    yield 3
cycle through outer() as v: declare v
";
    let output = run_code(code);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, vec!["1", "2", "3"]);
}

#[test]
fn transmit_delivers_a_value_to_a_running_generator() {
    let code = r"
sequence echo():
    cycle while true:
        designate v = receive()
        yield v
designate g = echo()
proceed(g)
declare transmit(g, 42)
";
    let output = run_code(code);
    assert_eq!(output.trim(), "42");
}

#[test]
fn list_destructuring_assignment_fills_missing_with_void() {
    let code = r"
[a, b, c] = [1, 2]
declare a
declare b
declare c
";
    let output = run_code(code);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, vec!["1", "2", "void"]);
}

#[test]
fn override_forces_global_binding() {
    let code = r"
designate g = 1
protocol set_it():
    override g = 99
set_it()
declare g
";
    let output = run_code(code);
    assert_eq!(output.trim(), "99");
}
