//! Keikaku: a tree-walking interpreter for the Keikaku language.
//!
//! The pipeline is [`lexer`] → [`parser`] → [`eval`]: source text becomes a
//! flat token stream, the parser turns that into an [`ast::Program`], and
//! [`eval::Evaluator`] walks the tree directly rather than compiling to
//! bytecode. [`run::Runner`] and [`repl::ReplSession`] are the two
//! higher-level entry points most callers want.

mod ast;
mod builtins;
mod eval;
mod exception;
mod function;
mod generator;
mod io;
mod lexer;
mod namespace;
mod parser;
mod repl;
mod repl_error;
mod resource;
mod run;
mod signature;
mod tracer;
mod value;

pub use crate::ast::{Program, Stmt};
pub use crate::eval::Evaluator;
pub use crate::exception::{ErrorKind, RaisedError, RunResult};
pub use crate::function::{BuiltinFn, Class, Function, Instance};
pub use crate::generator::{GenFrame, Generator, Status};
pub use crate::io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint};
pub use crate::parser::{ParseError, parse};
pub use crate::repl::ReplSession;
pub use crate::repl_error::ReplError;
pub use crate::resource::{NoLimitTracker, RecursionLimitTracker, ResourceError, ResourceTracker};
pub use crate::run::{Error as RunError, Runner};
pub use crate::tracer::{NoopTracer, StderrTracer, Tracer};
pub use crate::value::{PromiseState, Value};
