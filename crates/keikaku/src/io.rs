//! Output sinks for `declare`/`announce`.
//!
//! Three concrete writers behind one trait, so `Runner` and `Evaluator` can
//! be generic over where program output goes the same way they are generic
//! over `Tracer` and `ResourceTracker`.

use std::borrow::Cow;
use std::io::{self, Write as _};

/// Receives output from `declare`/`announce`/`preview`/`scheme`'s bracketing
/// diagnostics.
pub trait PrintWriter {
    /// Writes one formatted value's text, without separators or a newline.
    fn write_str(&mut self, output: Cow<'_, str>);

    /// Writes a single separator/terminator character (space or newline).
    fn write_char(&mut self, end: char);

    fn write_line(&mut self, output: &str) {
        self.write_str(Cow::Borrowed(output));
        self.write_char('\n');
    }
}

/// Default writer: goes straight to stdout.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn write_str(&mut self, output: Cow<'_, str>) {
        let _ = io::stdout().write_all(output.as_bytes());
    }

    fn write_char(&mut self, end: char) {
        let mut buf = [0u8; 4];
        let _ = io::stdout().write_all(end.encode_utf8(&mut buf).as_bytes());
    }
}

/// Collects output into a string; used by the REPL's echo and by tests
/// that assert on `declare` output without touching real stdout.
#[derive(Debug, Default)]
pub struct CollectStringPrint(String);

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self(String::new())
    }

    #[must_use]
    pub fn output(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectStringPrint {
    fn write_str(&mut self, output: Cow<'_, str>) {
        self.0.push_str(&output);
    }

    fn write_char(&mut self, end: char) {
        self.0.push(end);
    }
}

/// Discards everything; used by benchmarking-style embeddings that only
/// care about a program's return value.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn write_str(&mut self, _output: Cow<'_, str>) {}
    fn write_char(&mut self, _end: char) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_string_print_accumulates_lines() {
        let mut w = CollectStringPrint::new();
        w.write_line("hello");
        w.write_line("world");
        assert_eq!(w.output(), "hello\nworld\n");
    }
}
