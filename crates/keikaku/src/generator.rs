//! The generator engine: suspend/resume for `sequence` functions.
//!
//! Grounded in `original_source/compiler/interpreter.c`'s `GenFrame`/
//! `interpreter_gen_next`: each generator owns a `resume_stack` of frame
//! variants identifying where execution was last interrupted. Advancing a
//! generator hands that stack to the [`crate::eval::Evaluator`], which
//! drains it top-down as it re-enters the function body, and rebuilds it
//! bottom-up if a nested `yield`/`delegate` suspends again.
//!
//! Stack convention: a suspending construct pushes its own frame *after*
//! whatever nested construct already pushed one, so frames end up ordered
//! outermost-last. Resumption pops from the same end, so the outermost
//! (the construct literally re-entered first, e.g. the function body's top
//! block) is popped first — each level peels back exactly the frame it
//! pushed, in the reverse order.

use std::rc::Rc;

use crate::function::Function;
use crate::namespace::NamespaceRef;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Suspended,
    Running,
    Done,
}

/// A resumption point left behind by a suspended construct.
#[derive(Debug, Clone)]
pub enum GenFrame {
    Block { next_index: usize },
    CycleWhile,
    CycleThrough { iterable: Value, next_index: usize, scope: NamespaceRef },
    CycleFromTo { current: i64, end: i64, scope: NamespaceRef },
    Delegate { iterable: Value, next_index: usize },
}

/// A *generator handle*: the suspended state of one `sequence` call.
#[derive(Debug)]
pub struct Generator {
    pub function: Rc<Function>,
    pub env: NamespaceRef,
    pub status: Status,
    pub resume_stack: Vec<GenFrame>,
    pub injected: Option<Value>,
    pub disrupted: Option<String>,
}

impl Generator {
    #[must_use]
    pub fn new(function: Rc<Function>, env: NamespaceRef) -> Self {
        Self { function, env, status: Status::Suspended, resume_stack: Vec::new(), injected: None, disrupted: None }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }
}
