//! Callable and object-model values: functions, classes, instances.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{Params, Stmt};
use crate::exception::RaisedError;
use crate::namespace::NamespaceRef;
use crate::value::Value;

/// A *function* value: name, params, body, captured environment, and the
/// three flags that change how a call behaves.
#[derive(Debug)]
pub struct Function {
    pub name: Rc<str>,
    pub params: Params,
    pub body: Rc<[Stmt]>,
    pub closure: NamespaceRef,
    pub is_lambda: bool,
    pub is_sequence: bool,
    pub is_async: bool,
}

/// A host-provided builtin: an opaque callable taking an already-evaluated
/// argument vector.
pub struct BuiltinFn {
    pub name: &'static str,
    #[allow(clippy::type_complexity)]
    pub call: Box<dyn Fn(&mut crate::eval::Evaluator, Vec<Value>) -> Result<Value, RaisedError>>,
}

impl std::fmt::Debug for BuiltinFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinFn").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A class: name, optional parent (resolved at `entity` evaluation time),
/// and a method table. Methods close over `method_scope`, a scope shared
/// by every method in the class so sibling methods can reference each
/// other directly.
#[derive(Debug)]
pub struct Class {
    pub name: Rc<str>,
    pub parent: Option<Rc<Class>>,
    pub methods: IndexMap<Rc<str>, Rc<Function>>,
    pub method_scope: NamespaceRef,
}

impl Class {
    /// Walks this class then its ancestors looking for `name`.
    #[must_use]
    pub fn resolve_method(self: &Rc<Self>, name: &str) -> Option<Rc<Function>> {
        if let Some(f) = self.methods.get(name) {
            return Some(Rc::clone(f));
        }
        self.parent.as_ref().and_then(|p| p.resolve_method(name))
    }
}

/// An *instance*: a class pointer plus an isolated field scope (null
/// parent).
#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    pub fields: NamespaceRef,
}
