//! Runtime value representation.
//!
//! `designate`/assignment bind a reference to the same underlying list/dict,
//! not a copy (`push(xs, …)` relies on this: every name bound to `xs` sees
//! the append). `deep_copy` exists for the cases that do need an
//! independent clone — a suspended generator's owned environment must not
//! alias the caller's — so heap-ish values use plain `Rc<RefCell<...>>`
//! rather than an arena-allocated, interned heap; there is no cycle
//! collector to write since Keikaku values only ever form acyclic
//! structures.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::function::{BuiltinFn, Class, Function, Instance};
use crate::generator::Generator;

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type DictRef = Rc<RefCell<IndexMap<Value, Value>>>;

#[derive(Clone)]
pub enum Value {
    Void,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(ListRef),
    Dict(DictRef),
    Function(Rc<Function>),
    Builtin(Rc<BuiltinFn>),
    Class(Rc<Class>),
    Instance(Rc<RefCell<Instance>>),
    Generator(Rc<RefCell<Generator>>),
    /// A deferred computation created by `defer`; `resolve` drains it.
    Promise(Rc<RefCell<PromiseState>>),
}

#[derive(Clone)]
pub enum PromiseState {
    Pending,
    Ready(Value),
    Rejected(Rc<str>),
}

impl Value {
    #[must_use]
    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn dict(items: IndexMap<Value, Value>) -> Self {
        Self::Dict(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Self::Str(s.into())
    }

    /// The name `classify` reports for this value's tag — a fixed set of
    /// names, not Rust's own variant names.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Function(_) => "protocol",
            Self::Builtin(_) => "builtin",
            Self::Class(_) => "entity",
            Self::Instance(_) => "instance",
            Self::Generator(_) => "sequence",
            Self::Promise(_) => "promise",
        }
    }

    /// Truthiness used by `foresee`/`cycle while`/`and`/`or`/`not`: `void`,
    /// `false`, `0`, `0.0`, `""` and empty list are falsy; every other
    /// type, dict included, is truthy regardless of content.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Void => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(l) => !l.borrow().is_empty(),
            Self::Dict(_)
            | Self::Function(_)
            | Self::Builtin(_)
            | Self::Class(_)
            | Self::Instance(_)
            | Self::Generator(_)
            | Self::Promise(_) => true,
        }
    }

    /// Deep-copies lists/dicts; every other variant is cheap to clone
    /// already (scalars, or a reference-counted handle to shared state
    /// that deliberately stays shared, like functions and instances).
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        match self {
            Self::List(items) => {
                let copied: Vec<Value> = items.borrow().iter().map(Self::deep_copy).collect();
                Self::list(copied)
            }
            Self::Dict(items) => {
                let copied: IndexMap<Value, Value> =
                    items.borrow().iter().map(|(k, v)| (k.deep_copy(), v.deep_copy())).collect();
                Self::dict(copied)
            }
            other => other.clone(),
        }
    }

    /// Structural equality used by `==`/`!=`, `situation`/`alignment`
    /// matching, and dict key lookup. False whenever the two tags differ —
    /// `3 == 3.0` is `false`, matching `original_source/compiler/
    /// interpreter.c`'s type check before any value comparison.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Void, Self::Void) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Self::Dict(a), Self::Dict(b)) => Rc::ptr_eq(a, b),
            (Self::Instance(a), Self::Instance(b)) => Rc::ptr_eq(a, b),
            (Self::Class(a), Self::Class(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Generator(a), Self::Generator(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `text`: the canonical string rendering used by `declare`/`announce`
    /// and string coercion.
    #[must_use]
    pub fn display_string(&self) -> String {
        match self {
            Self::Void => "void".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Str(s) => s.to_string(),
            Self::List(items) => {
                let parts: Vec<String> = items.borrow().iter().map(Value::repr_string).collect();
                format!("[{}]", parts.join(", "))
            }
            Self::Dict(items) => {
                let parts: Vec<String> =
                    items.borrow().iter().map(|(k, v)| format!("{}: {}", k.repr_string(), v.repr_string())).collect();
                format!("{{{}}}", parts.join(", "))
            }
            Self::Function(f) => format!("<protocol {}>", f.name),
            Self::Builtin(b) => format!("<builtin {}>", b.name),
            Self::Class(c) => format!("<entity {}>", c.name),
            Self::Instance(i) => format!("<manifestation of {}>", i.borrow().class.name),
            Self::Generator(g) => format!("<sequence {}>", g.borrow().function.name),
            Self::Promise(state) => match &*state.borrow() {
                PromiseState::Pending => "<promise pending>".to_string(),
                PromiseState::Ready(_) => "<promise resolved>".to_string(),
                PromiseState::Rejected(_) => "<promise rejected>".to_string(),
            },
        }
    }

    /// String rendering used for values nested inside lists/dicts, where
    /// strings are quoted so structure stays legible.
    #[must_use]
    pub fn repr_string(&self) -> String {
        match self {
            Self::Str(s) => format!("\"{s}\""),
            other => other.display_string(),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_string())
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Self::Void => 0u8.hash(state),
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Str(s) => s.hash(state),
            // Only scalars are expected as dict keys; anything else hashes
            // by identity-ish discriminant so insertion still works.
            other => other.type_name().hash(state),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}
impl Eq for Value {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec_falsy_set() {
        assert!(!Value::Void.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::Float(0.0).truthy());
        assert!(!Value::str("").truthy());
        assert!(!Value::list(vec![]).truthy());
        assert!(Value::Int(1).truthy());
        assert!(Value::str("x").truthy());
    }

    #[test]
    fn equals_is_false_across_differing_tags() {
        assert!(!Value::Int(3).equals(&Value::Float(3.0)));
        assert!(!Value::Int(3).equals(&Value::Float(3.1)));
        assert!(Value::Int(3).equals(&Value::Int(3)));
        assert!(Value::Float(3.0).equals(&Value::Float(3.0)));
    }

    #[test]
    fn deep_copy_is_independent() {
        let original = Value::list(vec![Value::Int(1)]);
        let copy = original.deep_copy();
        if let (Value::List(o), Value::List(c)) = (&original, &copy) {
            c.borrow_mut().push(Value::Int(2));
            assert_eq!(o.borrow().len(), 1);
            assert_eq!(c.borrow().len(), 2);
        }
    }
}
