//! Lexically scoped variable bindings.
//!
//! Each `Namespace` is one scope (module, protocol call, or block); scopes
//! chain to a parent via `Rc<RefCell<..>>` so closures can capture their
//! defining environment cheaply. Bindings preserve insertion order (an
//! `IndexMap`, since dict iteration order needs to stay stable) which
//! matters for `inquire`'s field listing on instances.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

pub type NamespaceRef = Rc<RefCell<Namespace>>;

#[derive(Debug)]
pub struct Namespace {
    bindings: IndexMap<Rc<str>, Value>,
    parent: Option<NamespaceRef>,
}

impl Namespace {
    #[must_use]
    pub fn root() -> NamespaceRef {
        Rc::new(RefCell::new(Self { bindings: IndexMap::new(), parent: None }))
    }

    #[must_use]
    pub fn child(parent: &NamespaceRef) -> NamespaceRef {
        Rc::new(RefCell::new(Self { bindings: IndexMap::new(), parent: Some(Rc::clone(parent)) }))
    }

    /// `designate name = value`: always binds in the current scope, even
    /// if an outer scope already has a binding of the same name.
    pub fn define(&mut self, name: Rc<str>, value: Value) {
        self.bindings.insert(name, value);
    }

    /// Plain `name = value`: rebinds the nearest scope (walking outward)
    /// that already defines `name`; falls back to defining a new binding
    /// in the current scope if none does ("assignment creates if absent"
    /// namespace semantics).
    pub fn assign(this: &NamespaceRef, name: &Rc<str>, value: Value) {
        let mut scope = Rc::clone(this);
        loop {
            if scope.borrow().bindings.contains_key(name) {
                scope.borrow_mut().bindings.insert(Rc::clone(name), value);
                return;
            }
            let next = scope.borrow().parent.clone();
            match next {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        this.borrow_mut().bindings.insert(Rc::clone(name), value);
    }

    /// `override name = value`: rebinds the *global* scope directly,
    /// regardless of which scope's lookup chain currently shadows it.
    pub fn force_global(this: &NamespaceRef, name: Rc<str>, value: Value) {
        let mut scope = Rc::clone(this);
        loop {
            let next = scope.borrow().parent.clone();
            match next {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        scope.borrow_mut().bindings.insert(name, value);
    }

    #[must_use]
    pub fn get(this: &NamespaceRef, name: &str) -> Option<Value> {
        if let Some(v) = this.borrow().bindings.get(name) {
            return Some(v.clone());
        }
        let parent = this.borrow().parent.clone();
        parent.and_then(|p| Self::get(&p, name))
    }

    #[must_use]
    pub fn contains(this: &NamespaceRef, name: &str) -> bool {
        Self::get(this, name).is_some()
    }

    /// Names bound directly in this scope, in insertion order (used by
    /// `inquire` on a module/instance namespace).
    #[must_use]
    pub fn own_names(&self) -> Vec<Rc<str>> {
        self.bindings.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_rebinds_outer_scope_when_present() {
        let root = Namespace::root();
        root.borrow_mut().define(Rc::from("x"), Value::Int(1));
        let child = Namespace::child(&root);
        Namespace::assign(&child, &Rc::from("x"), Value::Int(2));
        assert_eq!(Namespace::get(&root, "x"), Some(Value::Int(2)));
    }

    #[test]
    fn designate_always_shadows_in_current_scope() {
        let root = Namespace::root();
        root.borrow_mut().define(Rc::from("x"), Value::Int(1));
        let child = Namespace::child(&root);
        child.borrow_mut().define(Rc::from("x"), Value::Int(99));
        assert_eq!(Namespace::get(&child, "x"), Some(Value::Int(99)));
        assert_eq!(Namespace::get(&root, "x"), Some(Value::Int(1)));
    }

    #[test]
    fn force_global_reaches_past_shadowing_scopes() {
        let root = Namespace::root();
        root.borrow_mut().define(Rc::from("x"), Value::Int(1));
        let child = Namespace::child(&root);
        child.borrow_mut().define(Rc::from("x"), Value::Int(2));
        Namespace::force_global(&child, Rc::from("x"), Value::Int(42));
        assert_eq!(Namespace::get(&root, "x"), Some(Value::Int(42)));
        assert_eq!(Namespace::get(&child, "x"), Some(Value::Int(2)));
    }
}
