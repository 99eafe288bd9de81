//! Evaluator tracing infrastructure.
//!
//! Trait-based tracing with zero-cost abstraction: [`NoopTracer`]'s hooks
//! are empty functions that inline away entirely via monomorphization,
//! identical in spirit to how [`NoLimitTracker`](crate::resource::NoLimitTracker)
//! eliminates resource-check overhead when no limit is configured.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (default) |
//! | [`StderrTracer`] | Human-readable execution log to stderr |
//!
//! `Runner` is generic over `Tr: Tracer`, chosen at construction time.

use crate::ast::Line;
use crate::value::Value;

/// Hook points at the statement and call granularity rather than per-opcode,
/// since this evaluator has no opcodes to dispatch, only AST nodes.
pub trait Tracer {
    fn on_statement(&mut self, _line: Line) {}
    fn on_call_enter(&mut self, _name: &str) {}
    fn on_call_exit(&mut self, _name: &str) {}
    fn on_yield(&mut self, _generator_name: &str, _value: &Value) {}
    fn on_resume(&mut self, _generator_name: &str) {}
}

/// Production default: every hook is empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Prints one line to stderr per hook invocation; used by `keikaku --trace`.
#[derive(Debug, Default)]
pub struct StderrTracer {
    depth: usize,
}

impl Tracer for StderrTracer {
    fn on_statement(&mut self, line: Line) {
        eprintln!("{}line {line}", "  ".repeat(self.depth));
    }

    fn on_call_enter(&mut self, name: &str) {
        eprintln!("{}-> {name}", "  ".repeat(self.depth));
        self.depth += 1;
    }

    fn on_call_exit(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        eprintln!("{}<- {name}", "  ".repeat(self.depth));
    }

    fn on_yield(&mut self, generator_name: &str, value: &Value) {
        eprintln!("{}yield {generator_name}: {}", "  ".repeat(self.depth), value.display_string());
    }

    fn on_resume(&mut self, generator_name: &str) {
        eprintln!("{}resume {generator_name}", "  ".repeat(self.depth));
    }
}
