//! The expression and statement evaluator: the core of the interpreter.
//!
//! One `Evaluator` drives a whole run. It owns the global scope, the
//! currently-bound `self`/class (for method dispatch and `ascend`), the
//! generator resume stack (active only while advancing a `sequence`), and
//! the ambient services (`Tracer`, `ResourceTracker`, `PrintWriter`) that
//! `builtins` and `Runner` reach through it.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{Arg, AssignTarget, BinOp, Expr, Stmt, UnOp};
use crate::exception::{ErrorKind, RaisedError, RunResult};
use crate::function::{Class, Function, Instance};
use crate::generator::{GenFrame, Generator, Status};
use crate::namespace::{Namespace, NamespaceRef};
use crate::resource::ResourceTracker;
use crate::signature;
use crate::tracer::Tracer;
use crate::value::Value;

/// Outcome of executing a statement or block.
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
    /// Only produced while `in_generator` is true: a `yield`/`delegate`
    /// that must suspend the enclosing generator rather than return.
    Suspend(Value),
}

pub struct Evaluator {
    pub globals: NamespaceRef,
    current_self: Option<Value>,
    current_class: Option<Rc<Class>>,
    resume_stack: Vec<GenFrame>,
    in_generator: bool,
    current_generator: Option<Rc<RefCell<Generator>>>,
    pub resources: Box<dyn ResourceTracker>,
    pub tracer: Box<dyn Tracer>,
    pub print: Box<dyn crate::io::PrintWriter>,
    last_error_message: Option<String>,
    repeat_count: u32,
}

impl Evaluator {
    #[must_use]
    pub fn new(
        resources: Box<dyn ResourceTracker>,
        tracer: Box<dyn Tracer>,
        print: Box<dyn crate::io::PrintWriter>,
    ) -> Self {
        let globals = Namespace::root();
        let mut eval = Self {
            globals,
            current_self: None,
            current_class: None,
            resume_stack: Vec::new(),
            in_generator: false,
            current_generator: None,
            resources,
            tracer,
            print,
            last_error_message: None,
            repeat_count: 0,
        };
        crate::builtins::install(&mut eval);
        eval
    }

    fn resuming(&self) -> bool {
        !self.resume_stack.is_empty()
    }

    /// Records a top-level error message for the "repeat counter" the host
    /// diagnostic layer uses to escalate verbosity; purely observational
    /// bookkeeping, never consulted by core semantics.
    pub fn note_top_level_error(&mut self, message: &str) -> u32 {
        if self.last_error_message.as_deref() == Some(message) {
            self.repeat_count += 1;
        } else {
            self.repeat_count = 0;
            self.last_error_message = Some(message.to_string());
        }
        self.repeat_count
    }

    // ---- Program execution -------------------------------------------

    pub fn run_program(&mut self, statements: &[Stmt]) -> RunResult<Value> {
        let env = Rc::clone(&self.globals);
        match self.exec_block(statements, &env)? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Void),
        }
    }

    // ---- Statements -----------------------------------------------------

    pub(crate) fn exec_block(&mut self, stmts: &[Stmt], env: &NamespaceRef) -> RunResult<Flow> {
        let start = if self.resuming() {
            match self.resume_stack.pop() {
                Some(GenFrame::Block { next_index }) => next_index,
                Some(other) => {
                    self.resume_stack.push(other);
                    0
                }
                None => 0,
            }
        } else {
            0
        };
        for (i, stmt) in stmts.iter().enumerate().skip(start) {
            let depth_before = self.resume_stack.len();
            match self.exec_stmt(stmt, env)? {
                Flow::Normal => {}
                Flow::Suspend(v) => {
                    let next_index = if self.resume_stack.len() > depth_before { i } else { i + 1 };
                    self.resume_stack.push(GenFrame::Block { next_index });
                    return Ok(Flow::Suspend(v));
                }
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &NamespaceRef) -> RunResult<Flow> {
        self.tracer.on_statement(stmt_line(stmt));
        match stmt {
            Stmt::Designate { name, value, .. } => {
                let v = self.eval_expr(value, env)?;
                env.borrow_mut().define(Rc::clone(name), v);
                Ok(Flow::Normal)
            }
            Stmt::Override { name, value, .. } => {
                let v = self.eval_expr(value, env)?;
                Namespace::force_global(env, Rc::clone(name), v);
                Ok(Flow::Normal)
            }
            Stmt::Assign { target, value, line } => {
                let v = self.eval_expr(value, env)?;
                self.assign_target(target, v, env, *line)?;
                Ok(Flow::Normal)
            }
            Stmt::Foresee { branches, else_body, .. } => {
                for (cond, body) in branches {
                    if self.eval_expr(cond, env)?.truthy() {
                        let child = Namespace::child(env);
                        return self.exec_block(body, &child);
                    }
                }
                if let Some(body) = else_body {
                    let child = Namespace::child(env);
                    return self.exec_block(body, &child);
                }
                Ok(Flow::Normal)
            }
            Stmt::CycleWhile { cond, body, .. } => self.exec_cycle_while(cond, body, env),
            Stmt::CycleThrough { var, iterable, body, .. } => self.exec_cycle_through(var, iterable, body, env),
            Stmt::CycleFromTo { var, start, end, body, .. } => self.exec_cycle_from_to(var, start, end, body, env),
            Stmt::Break(_) => Ok(Flow::Break),
            Stmt::Continue(_) => Ok(Flow::Continue),
            Stmt::Protocol { name, params, body, is_sequence, is_async, .. } => {
                let function = Rc::new(Function {
                    name: Rc::clone(name),
                    params: params.clone(),
                    body: Rc::clone(body),
                    closure: Rc::clone(env),
                    is_lambda: false,
                    is_sequence: *is_sequence,
                    is_async: *is_async,
                });
                env.borrow_mut().define(Rc::clone(name), Value::Function(function));
                Ok(Flow::Normal)
            }
            Stmt::Yield { value, .. } => {
                let v = match value {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::Void,
                };
                if self.in_generator {
                    if let Some(gen) = &self.current_generator {
                        self.tracer.on_yield(&gen.borrow().function.name, &v);
                    }
                    Ok(Flow::Suspend(v))
                } else {
                    Ok(Flow::Return(v))
                }
            }
            Stmt::Delegate { iterable, .. } => self.exec_delegate(iterable, env),
            Stmt::Scheme { body, .. } => {
                let child = Namespace::child(env);
                self.exec_block(body, &child)
            }
            Stmt::Preview { value, .. } => {
                let v = self.eval_expr(value, env)?;
                self.print.write_line(&format!("[preview] {}", v.display_string()));
                Ok(Flow::Normal)
            }
            Stmt::Absolute { cond, .. } => {
                if !self.eval_expr(cond, env)?.truthy() {
                    self.print.write_line("[absolute] condition failed");
                }
                Ok(Flow::Normal)
            }
            Stmt::Anomaly { body, .. } => {
                self.print.write_line("[anomaly] entering");
                let child = Namespace::child(env);
                let result = self.exec_block(body, &child);
                self.print.write_line("[anomaly] leaving");
                result
            }
            Stmt::Entity { name, parent, methods, .. } => self.exec_entity(name, parent.as_ref(), methods, env),
            Stmt::Incorporate { path, line } => self.exec_incorporate(path, *line, env),
            Stmt::Attempt { body, error_name, recover_body, .. } => {
                let child = Namespace::child(env);
                match self.exec_block(body, &child) {
                    Ok(flow) => Ok(flow),
                    Err(err) => {
                        let recover_scope = Namespace::child(env);
                        if let Some(name) = error_name {
                            recover_scope.borrow_mut().define(Rc::clone(name), Value::str(err.display_message()));
                        }
                        self.exec_block(recover_body, &recover_scope)
                    }
                }
            }
            Stmt::Situation { scrutinee, alignments, otherwise, line } => {
                let scrutinee_value = self.eval_expr(scrutinee, env)?;
                for (values, body) in alignments {
                    for candidate in values {
                        let candidate_value = self.eval_expr(candidate, env)?;
                        if scrutinee_value.equals(&candidate_value) {
                            let child = Namespace::child(env);
                            return self.exec_block(body, &child);
                        }
                    }
                }
                if let Some(body) = otherwise {
                    let child = Namespace::child(env);
                    return self.exec_block(body, &child);
                }
                let _ = line;
                Ok(Flow::Normal)
            }
            Stmt::ExprStmt { value, .. } => {
                self.eval_expr(value, env)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn exec_cycle_while(&mut self, cond: &Expr, body: &[Stmt], env: &NamespaceRef) -> RunResult<Flow> {
        if self.resuming() {
            if let Some(GenFrame::CycleWhile) = self.resume_stack.last() {
                self.resume_stack.pop();
            }
        }
        loop {
            if !self.eval_expr(cond, env)?.truthy() {
                break;
            }
            let child = Namespace::child(env);
            let depth_before = self.resume_stack.len();
            match self.exec_block(body, &child)? {
                Flow::Normal => {}
                Flow::Break => break,
                Flow::Continue => continue,
                Flow::Suspend(v) => {
                    debug_assert!(self.resume_stack.len() > depth_before);
                    self.resume_stack.push(GenFrame::CycleWhile);
                    return Ok(Flow::Suspend(v));
                }
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_cycle_through(&mut self, var: &Rc<str>, iterable_expr: &Expr, body: &[Stmt], env: &NamespaceRef) -> RunResult<Flow> {
        let (iterable, mut index, mut resuming_body, mut scope) = if self.resuming() {
            match self.resume_stack.pop() {
                Some(GenFrame::CycleThrough { iterable, next_index, scope }) => (iterable, next_index, true, scope),
                Some(other) => {
                    self.resume_stack.push(other);
                    (self.eval_expr(iterable_expr, env)?, 0, false, Namespace::child(env))
                }
                None => (self.eval_expr(iterable_expr, env)?, 0, false, Namespace::child(env)),
            }
        } else {
            (self.eval_expr(iterable_expr, env)?, 0, false, Namespace::child(env))
        };

        loop {
            if !resuming_body {
                let Some(item) = self.next_iteration_item(&iterable, &mut index)? else { break };
                scope = Namespace::child(env);
                scope.borrow_mut().define(Rc::clone(var), item);
            }
            resuming_body = false;
            let depth_before = self.resume_stack.len();
            match self.exec_block(body, &scope)? {
                Flow::Normal => {}
                Flow::Break => break,
                Flow::Continue => continue,
                Flow::Suspend(v) => {
                    debug_assert!(self.resume_stack.len() > depth_before);
                    self.resume_stack.push(GenFrame::CycleThrough { iterable, next_index: index, scope });
                    return Ok(Flow::Suspend(v));
                }
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal)
    }

    /// Pulls the next element from a list or advances a sub-generator;
    /// returns `None` once the source is exhausted.
    fn next_iteration_item(&mut self, iterable: &Value, index: &mut usize) -> RunResult<Option<Value>> {
        match iterable {
            Value::List(items) => {
                let item = items.borrow().get(*index).cloned();
                if item.is_some() {
                    *index += 1;
                }
                Ok(item)
            }
            Value::Generator(gen) => {
                if gen.borrow().is_done() {
                    return Ok(None);
                }
                let v = self.advance_generator(gen)?;
                if gen.borrow().is_done() { Ok(None) } else { Ok(Some(v)) }
            }
            other => Err(RaisedError::new(ErrorKind::NotIterable, format!("{} is not iterable", other.type_name()))),
        }
    }

    fn exec_cycle_from_to(&mut self, var: &Rc<str>, start: &Expr, end: &Expr, body: &[Stmt], env: &NamespaceRef) -> RunResult<Flow> {
        let (mut current, end_value, mut resuming_body, mut scope) = if self.resuming() {
            match self.resume_stack.pop() {
                Some(GenFrame::CycleFromTo { current, end, scope }) => (current, end, true, scope),
                Some(other) => {
                    self.resume_stack.push(other);
                    (self.eval_int(start, env)?, self.eval_int(end, env)?, false, Namespace::child(env))
                }
                None => (self.eval_int(start, env)?, self.eval_int(end, env)?, false, Namespace::child(env)),
            }
        } else {
            (self.eval_int(start, env)?, self.eval_int(end, env)?, false, Namespace::child(env))
        };

        loop {
            if !resuming_body {
                if current >= end_value {
                    break;
                }
                scope = Namespace::child(env);
                scope.borrow_mut().define(Rc::clone(var), Value::Int(current));
            }
            resuming_body = false;
            let depth_before = self.resume_stack.len();
            match self.exec_block(body, &scope)? {
                Flow::Normal => {
                    current += 1;
                }
                Flow::Break => break,
                Flow::Continue => {
                    current += 1;
                }
                Flow::Suspend(v) => {
                    debug_assert!(self.resume_stack.len() > depth_before);
                    self.resume_stack.push(GenFrame::CycleFromTo { current, end: end_value, scope });
                    return Ok(Flow::Suspend(v));
                }
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_int(&mut self, expr: &Expr, env: &NamespaceRef) -> RunResult<i64> {
        match self.eval_expr(expr, env)? {
            Value::Int(i) => Ok(i),
            Value::Float(f) => Ok(f as i64),
            other => Err(RaisedError::new(ErrorKind::TypeMismatch, format!("expected an int, got {}", other.type_name()))),
        }
    }

    fn exec_delegate(&mut self, iterable_expr: &Expr, env: &NamespaceRef) -> RunResult<Flow> {
        let (iterable, mut index) = if self.resuming() {
            match self.resume_stack.pop() {
                Some(GenFrame::Delegate { iterable, next_index }) => (iterable, next_index),
                Some(other) => {
                    self.resume_stack.push(other);
                    (self.eval_expr(iterable_expr, env)?, 0)
                }
                None => (self.eval_expr(iterable_expr, env)?, 0),
            }
        } else {
            (self.eval_expr(iterable_expr, env)?, 0)
        };

        match self.next_iteration_item(&iterable, &mut index)? {
            Some(item) => {
                self.resume_stack.push(GenFrame::Delegate { iterable, next_index: index });
                Ok(Flow::Suspend(item))
            }
            None => Ok(Flow::Normal),
        }
    }

    fn exec_entity(&mut self, name: &Rc<str>, parent: Option<&Rc<str>>, methods: &[Stmt], env: &NamespaceRef) -> RunResult<Flow> {
        let parent_class = match parent {
            Some(parent_name) => match Namespace::get(&self.globals, parent_name) {
                Some(Value::Class(c)) => Some(c),
                Some(_) => return Err(RaisedError::new(ErrorKind::UndefinedParent, format!("{parent_name} is not an entity"))),
                None => return Err(RaisedError::new(ErrorKind::UndefinedParent, format!("undefined parent entity {parent_name}"))),
            },
            None => None,
        };
        let method_scope = Namespace::child(env);
        let mut table = IndexMap::new();
        for m in methods {
            if let Stmt::Protocol { name: method_name, params, body, is_sequence, is_async, .. } = m {
                let function = Rc::new(Function {
                    name: Rc::clone(method_name),
                    params: params.clone(),
                    body: Rc::clone(body),
                    closure: Rc::clone(&method_scope),
                    is_lambda: false,
                    is_sequence: *is_sequence,
                    is_async: *is_async,
                });
                table.insert(Rc::clone(method_name), Rc::clone(&function));
                method_scope.borrow_mut().define(Rc::clone(method_name), Value::Function(function));
            }
        }
        let class = Rc::new(Class { name: Rc::clone(name), parent: parent_class, methods: table, method_scope });
        Namespace::force_global(env, Rc::clone(name), Value::Class(class));
        Ok(Flow::Normal)
    }

    fn exec_incorporate(&mut self, path: &Rc<str>, line: u32, env: &NamespaceRef) -> RunResult<Flow> {
        let source = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RaisedError::new(ErrorKind::ImportFailed, format!("{path}: {e}")).at(line))?;
        let program = crate::parser::parse(&source)
            .map_err(|e| RaisedError::new(ErrorKind::SyntaxError, e.message).at(e.line))?;
        self.exec_block(&program.statements, env)
    }

    fn assign_target(&mut self, target: &AssignTarget, value: Value, env: &NamespaceRef, line: u32) -> RunResult<()> {
        match target {
            AssignTarget::Identifier(name) => {
                Namespace::assign(env, name, value);
                Ok(())
            }
            AssignTarget::ListPattern(names) => {
                let Value::List(items) = &value else {
                    return Err(RaisedError::new(ErrorKind::TypeMismatch, "list-pattern assignment requires a list").at(line));
                };
                let items = items.borrow();
                for (i, name) in names.iter().enumerate() {
                    let v = items.get(i).cloned().unwrap_or(Value::Void);
                    Namespace::assign(env, name, v);
                }
                Ok(())
            }
            AssignTarget::Member { object, name } => {
                let receiver = self.eval_expr(object, env)?;
                self.check_private_access(name, &receiver, line)?;
                match receiver {
                    Value::Instance(inst) => {
                        inst.borrow().fields.borrow_mut().define(Rc::clone(name), value);
                        Ok(())
                    }
                    other => Err(RaisedError::new(ErrorKind::NoSuchMember, format!("{} has no fields", other.type_name())).at(line)),
                }
            }
            AssignTarget::Index { object, index } => {
                let receiver = self.eval_expr(object, env)?;
                let index_value = self.eval_expr(index, env)?;
                match (receiver, index_value) {
                    (Value::List(items), Value::Int(i)) => {
                        let mut items = items.borrow_mut();
                        let i = usize::try_from(i).map_err(|_| RaisedError::new(ErrorKind::IndexOutOfBounds, "negative index").at(line))?;
                        if i >= items.len() {
                            return Err(RaisedError::new(ErrorKind::IndexOutOfBounds, format!("index {i} out of bounds")).at(line));
                        }
                        items[i] = value;
                        Ok(())
                    }
                    (Value::Dict(items), key) => {
                        items.borrow_mut().insert(key, value);
                        Ok(())
                    }
                    (other, _) => Err(RaisedError::new(ErrorKind::TypeMismatch, format!("cannot index into {}", other.type_name())).at(line)),
                }
            }
        }
    }

    fn check_private_access(&self, name: &Rc<str>, receiver: &Value, line: u32) -> RunResult<()> {
        if !name.starts_with('_') {
            return Ok(());
        }
        let permitted = match (&self.current_self, receiver) {
            (Some(Value::Instance(bound)), Value::Instance(target)) => Rc::ptr_eq(bound, target),
            _ => false,
        };
        if permitted {
            Ok(())
        } else {
            Err(RaisedError::new(ErrorKind::PrivateAccess, format!("{name} is private")).at(line))
        }
    }

    // ---- Expressions ------------------------------------------------------

    pub fn eval_expr(&mut self, expr: &Expr, env: &NamespaceRef) -> RunResult<Value> {
        match expr {
            Expr::IntLit(v) => Ok(Value::Int(*v)),
            Expr::FloatLit(v) => Ok(Value::Float(*v)),
            Expr::StringLit(s) => Ok(Value::Str(Rc::clone(s))),
            Expr::BoolLit(b) => Ok(Value::Bool(*b)),
            Expr::VoidLit => Ok(Value::Void),
            Expr::Identifier(name) => {
                Namespace::get(env, name).ok_or_else(|| RaisedError::new(ErrorKind::UndefinedName, format!("undefined name {name}")))
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, env),
            Expr::Unary { op, operand } => self.eval_unary(*op, operand, env),
            Expr::Call { callee, args } => self.eval_call(callee, args, env),
            Expr::MethodCall { receiver, method, args } => self.eval_method_call(receiver, method, args, env),
            Expr::Member { object, name } => self.eval_member(object, name, env),
            Expr::Index { object, index } => self.eval_index(object, index, env),
            Expr::Slice { object, start, end, step } => self.eval_slice(object, start.as_deref(), end.as_deref(), step.as_deref(), env),
            Expr::ListLit(items) => {
                let values = self.eval_args(items, env)?;
                Ok(Value::list(values))
            }
            Expr::DictLit(pairs) => {
                let mut map = IndexMap::new();
                for (k, v) in pairs {
                    let key = self.eval_expr(k, env)?;
                    let value = self.eval_expr(v, env)?;
                    map.insert(key, value);
                }
                Ok(Value::dict(map))
            }
            Expr::ListComprehension { element, var, iterable, filter } => self.eval_list_comprehension(element, var, iterable, filter.as_deref(), env),
            Expr::Ternary { cond, if_true, if_false } => {
                if self.eval_expr(cond, env)?.truthy() {
                    self.eval_expr(if_true, env)
                } else {
                    self.eval_expr(if_false, env)
                }
            }
            Expr::Lambda { params, body } => {
                let function = Function {
                    name: Rc::from("<lambda>"),
                    params: params.clone(),
                    body: Rc::from(vec![Stmt::Yield { value: Some((**body).clone()), line: 0 }]),
                    closure: Rc::clone(env),
                    is_lambda: true,
                    is_sequence: false,
                    is_async: false,
                };
                Ok(Value::Function(Rc::new(function)))
            }
            Expr::Await(inner) => self.eval_await(inner, env),
            Expr::SelfExpr => self.current_self.clone().ok_or_else(|| RaisedError::new(ErrorKind::SelfOutsideMethod, "self used outside a method")),
            Expr::Manifest { class_name, args } => self.eval_manifest(class_name, args, env),
            Expr::Ascend { method, args } => self.eval_ascend(method, args, env),
        }
    }

    fn eval_args(&mut self, args: &[Arg], env: &NamespaceRef) -> RunResult<Vec<Value>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Plain(e) => out.push(self.eval_expr(e, env)?),
                Arg::Spread(e) => match self.eval_expr(e, env)? {
                    Value::List(items) => out.extend(items.borrow().iter().cloned()),
                    other => return Err(RaisedError::new(ErrorKind::TypeMismatch, format!("cannot spread {}", other.type_name()))),
                },
            }
        }
        Ok(out)
    }

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr, env: &NamespaceRef) -> RunResult<Value> {
        if op == BinOp::And {
            let l = self.eval_expr(left, env)?;
            return if l.truthy() { Ok(Value::Bool(self.eval_expr(right, env)?.truthy())) } else { Ok(Value::Bool(false)) };
        }
        if op == BinOp::Or {
            let l = self.eval_expr(left, env)?;
            return if l.truthy() { Ok(Value::Bool(true)) } else { Ok(Value::Bool(self.eval_expr(right, env)?.truthy())) };
        }
        let l = self.eval_expr(left, env)?;
        let r = self.eval_expr(right, env)?;
        match op {
            BinOp::Eq => Ok(Value::Bool(l.equals(&r))),
            BinOp::NotEq => Ok(Value::Bool(!l.equals(&r))),
            BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => self.compare(op, &l, &r),
            BinOp::Add => self.add(&l, &r),
            BinOp::Sub => self.numeric(op, &l, &r),
            BinOp::Mul => self.mul(&l, &r),
            BinOp::Div => self.divide(&l, &r, false),
            BinOp::FloorDiv => self.divide(&l, &r, true),
            BinOp::Mod => self.modulo(&l, &r),
            BinOp::Pow => self.power(&l, &r),
            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
    }

    fn compare(&self, op: BinOp, l: &Value, r: &Value) -> RunResult<Value> {
        let ord = match (l, r) {
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => return Err(RaisedError::new(ErrorKind::TypeMismatch, format!("cannot compare {} and {}", l.type_name(), r.type_name()))),
        };
        let Some(ord) = ord else {
            return Err(RaisedError::new(ErrorKind::TypeMismatch, "comparison produced no ordering"));
        };
        use std::cmp::Ordering::{Equal, Greater, Less};
        let result = match (op, ord) {
            (BinOp::Lt, Less) | (BinOp::LtEq, Less | Equal) | (BinOp::Gt, Greater) | (BinOp::GtEq, Greater | Equal) => true,
            _ => false,
        };
        Ok(Value::Bool(result))
    }

    /// `+` with any string operand coerces the other side via `to_string`
    /// and concatenates (spec §4.3); only when neither side is a string does
    /// `+` fall back to numeric addition.
    fn add(&self, l: &Value, r: &Value) -> RunResult<Value> {
        match (l, r) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
            (Value::Str(a), other) => Ok(Value::str(format!("{a}{}", other.display_string()))),
            (other, Value::Str(b)) => Ok(Value::str(format!("{}{b}", other.display_string()))),
            _ => self.numeric(BinOp::Add, l, r),
        }
    }

    fn mul(&self, l: &Value, r: &Value) -> RunResult<Value> {
        match (l, r) {
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                let n = usize::try_from(*n).unwrap_or(0);
                Ok(Value::str(s.repeat(n)))
            }
            _ => self.numeric(BinOp::Mul, l, r),
        }
    }

    fn numeric(&self, op: BinOp, l: &Value, r: &Value) -> RunResult<Value> {
        match (l, r) {
            (Value::Int(a), Value::Int(b)) => {
                let result = match op {
                    BinOp::Add => a.wrapping_add(*b),
                    BinOp::Sub => a.wrapping_sub(*b),
                    BinOp::Mul => a.wrapping_mul(*b),
                    _ => unreachable!(),
                };
                Ok(Value::Int(result))
            }
            (a, b) => {
                let (a, b) = (as_f64(a)?, as_f64(b)?);
                let result = match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    _ => unreachable!(),
                };
                Ok(Value::Float(result))
            }
        }
    }

    fn divide(&self, l: &Value, r: &Value, floor: bool) -> RunResult<Value> {
        if floor {
            match (l, r) {
                (Value::Int(a), Value::Int(b)) => {
                    if *b == 0 {
                        return Err(RaisedError::new(ErrorKind::DivisionByZero, "integer division by zero"));
                    }
                    Ok(Value::Int(a.wrapping_div(*b)))
                }
                (a, b) => {
                    let b = as_f64(b)?;
                    if b == 0.0 {
                        return Err(RaisedError::new(ErrorKind::DivisionByZero, "integer division by zero"));
                    }
                    Ok(Value::Int((as_f64(a)? / b).trunc() as i64))
                }
            }
        } else {
            let b = as_f64(r)?;
            if b == 0.0 {
                return Err(RaisedError::new(ErrorKind::DivisionByZero, "division by zero"));
            }
            Ok(Value::Float(as_f64(l)? / b))
        }
    }

    fn modulo(&self, l: &Value, r: &Value) -> RunResult<Value> {
        match (l, r) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Err(RaisedError::new(ErrorKind::DivisionByZero, "modulo by zero"));
                }
                Ok(Value::Int(a.wrapping_rem(*b)))
            }
            (a, b) => {
                let (a, b) = (as_f64(a)?, as_f64(b)?);
                if b == 0.0 {
                    return Err(RaisedError::new(ErrorKind::DivisionByZero, "modulo by zero"));
                }
                Ok(Value::Float(a % b))
            }
        }
    }

    fn power(&self, l: &Value, r: &Value) -> RunResult<Value> {
        let (a, b) = (as_f64(l)?, as_f64(r)?);
        Ok(Value::Float(a.powf(b)))
    }

    fn eval_unary(&mut self, op: UnOp, operand: &Expr, env: &NamespaceRef) -> RunResult<Value> {
        let v = self.eval_expr(operand, env)?;
        match op {
            UnOp::Not => Ok(Value::Bool(!v.truthy())),
            UnOp::Neg => match v {
                Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(RaisedError::new(ErrorKind::TypeMismatch, format!("cannot negate {}", other.type_name()))),
            },
        }
    }

    fn eval_call(&mut self, callee: &str, args: &[Arg], env: &NamespaceRef) -> RunResult<Value> {
        let target = Namespace::get(env, callee).ok_or_else(|| RaisedError::new(ErrorKind::UndefinedName, format!("undefined name {callee}")))?;
        let arg_values = self.eval_args(args, env)?;
        self.call_value(&target, arg_values, None)
    }

    fn eval_method_call(&mut self, receiver: &Expr, method: &str, args: &[Arg], env: &NamespaceRef) -> RunResult<Value> {
        let receiver_value = self.eval_expr(receiver, env)?;
        let arg_values = self.eval_args(args, env)?;
        match &receiver_value {
            Value::Instance(inst) => {
                let class = Rc::clone(&inst.borrow().class);
                let function = class
                    .resolve_method(method)
                    .ok_or_else(|| RaisedError::new(ErrorKind::NoSuchMethod, format!("{} has no method {method}", class.name)))?;
                self.call_function(&function, arg_values, Some(receiver_value.clone()))
            }
            _ => Err(RaisedError::new(ErrorKind::NoSuchMethod, format!("{} has no method {method}", receiver_value.type_name()))),
        }
    }

    /// Dispatches a call to whatever callable variant `target` holds.
    pub fn call_value(&mut self, target: &Value, args: Vec<Value>, bound_self: Option<Value>) -> RunResult<Value> {
        match target {
            Value::Function(f) => self.call_function(f, args, bound_self),
            Value::Builtin(b) => {
                let b = Rc::clone(b);
                (b.call)(self, args)
            }
            other => Err(RaisedError::new(ErrorKind::NotCallable, format!("{} is not callable", other.type_name()))),
        }
    }

    fn call_function(&mut self, function: &Rc<Function>, args: Vec<Value>, bound_self: Option<Value>) -> RunResult<Value> {
        if function.is_sequence {
            let call_scope = Namespace::child(&function.closure);
            let bound = signature::bind_arguments(&function.params, args, |expr| self.eval_expr(expr, &call_scope))?;
            for (name, value) in bound {
                call_scope.borrow_mut().define(name, value);
            }
            if let Some(self_value) = bound_self {
                call_scope.borrow_mut().define(Rc::from("self"), self_value);
            }
            let generator = Generator::new(Rc::clone(function), call_scope);
            return Ok(Value::Generator(Rc::new(RefCell::new(generator))));
        }

        self.resources.enter_call().map_err(|e| RaisedError::new(ErrorKind::TypeMismatch, e.to_string()))?;
        self.tracer.on_call_enter(&function.name);

        let call_scope = Namespace::child(&function.closure);
        let bind_result = signature::bind_arguments(&function.params, args, |expr| self.eval_expr(expr, &call_scope));
        let result = bind_result.and_then(|bound| {
            for (name, value) in bound {
                call_scope.borrow_mut().define(name, value);
            }
            let saved_self = self.current_self.clone();
            if let Some(self_value) = bound_self {
                self.current_self = Some(self_value.clone());
                call_scope.borrow_mut().define(Rc::from("self"), self_value);
            }
            let outcome = self.exec_block(&function.body, &call_scope);
            self.current_self = saved_self;
            outcome
        });

        self.tracer.on_call_exit(&function.name);
        self.resources.exit_call();

        match result? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Void),
        }
    }

    fn eval_member(&mut self, object: &Expr, name: &str, env: &NamespaceRef) -> RunResult<Value> {
        let receiver = self.eval_expr(object, env)?;
        self.check_private_access(&Rc::from(name), &receiver, 0)?;
        match &receiver {
            Value::Instance(inst) => {
                if let Some(v) = Namespace::get(&inst.borrow().fields, name) {
                    return Ok(v);
                }
                let class = Rc::clone(&inst.borrow().class);
                if let Some(f) = class.resolve_method(name) {
                    return Ok(Value::Function(f));
                }
                Err(RaisedError::new(ErrorKind::NoSuchMember, format!("no member {name} on {}", class.name)))
            }
            Value::Class(class) => class
                .resolve_method(name)
                .map(Value::Function)
                .ok_or_else(|| RaisedError::new(ErrorKind::NoSuchMember, format!("no member {name} on {}", class.name))),
            other => Err(RaisedError::new(ErrorKind::NoSuchMember, format!("{} has no members", other.type_name()))),
        }
    }

    fn eval_index(&mut self, object: &Expr, index: &Expr, env: &NamespaceRef) -> RunResult<Value> {
        let receiver = self.eval_expr(object, env)?;
        let index_value = self.eval_expr(index, env)?;
        match (&receiver, &index_value) {
            (Value::List(items), Value::Int(i)) => {
                if *i < 0 {
                    return Ok(Value::Void);
                }
                Ok(items.borrow().get(*i as usize).cloned().unwrap_or(Value::Void))
            }
            (Value::Dict(items), key) => Ok(items.borrow().get(key).cloned().unwrap_or(Value::Void)),
            (Value::Str(s), Value::Int(i)) => {
                if *i < 0 {
                    return Ok(Value::Void);
                }
                Ok(s.chars().nth(*i as usize).map(|c| Value::str(c.to_string())).unwrap_or(Value::Void))
            }
            _ => Err(RaisedError::new(ErrorKind::TypeMismatch, format!("cannot index {}", receiver.type_name()))),
        }
    }

    fn eval_slice(&mut self, object: &Expr, start: Option<&Expr>, end: Option<&Expr>, step: Option<&Expr>, env: &NamespaceRef) -> RunResult<Value> {
        let receiver = self.eval_expr(object, env)?;
        let step_value = step.map(|e| self.eval_int(e, env)).transpose()?.unwrap_or(1);
        if step_value == 0 {
            return Err(RaisedError::new(ErrorKind::InvalidSlice, "slice step cannot be zero"));
        }
        let len = match &receiver {
            Value::List(items) => items.borrow().len(),
            Value::Str(s) => s.chars().count(),
            other => return Err(RaisedError::new(ErrorKind::InvalidSlice, format!("cannot slice {}", other.type_name()))),
        };
        let start_value = start.map(|e| self.eval_int(e, env)).transpose()?;
        let end_value = end.map(|e| self.eval_int(e, env)).transpose()?;
        let resolve = |v: i64, len: usize| -> usize {
            let v = if v < 0 { v + len as i64 } else { v };
            v.clamp(0, len as i64) as usize
        };

        let indices: Vec<usize> = if step_value > 0 {
            let s = start_value.map_or(0, |v| resolve(v, len));
            let e = end_value.map_or(len, |v| resolve(v, len));
            let mut out = Vec::new();
            let mut i = s;
            while i < e {
                out.push(i);
                i += step_value as usize;
            }
            out
        } else {
            let s = start_value.map_or(len.saturating_sub(1), |v| resolve(v, len).min(len.saturating_sub(1)));
            let e = end_value.map(|v| resolve(v, len));
            let mut out = Vec::new();
            let mut i = s as i64;
            loop {
                if let Some(e) = e {
                    if i <= e as i64 {
                        break;
                    }
                } else if i < 0 {
                    break;
                }
                if i < 0 || i as usize >= len {
                    break;
                }
                out.push(i as usize);
                i += step_value;
                if i < 0 {
                    break;
                }
            }
            out
        };

        match &receiver {
            Value::List(items) => {
                let items = items.borrow();
                Ok(Value::list(indices.into_iter().filter_map(|i| items.get(i).cloned()).collect()))
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                Ok(Value::str(indices.into_iter().filter_map(|i| chars.get(i)).collect::<String>()))
            }
            _ => unreachable!(),
        }
    }

    fn eval_list_comprehension(&mut self, element: &Expr, var: &Rc<str>, iterable: &Expr, filter: Option<&Expr>, env: &NamespaceRef) -> RunResult<Value> {
        let source = self.eval_expr(iterable, env)?;
        let Value::List(items) = source else {
            return Err(RaisedError::new(ErrorKind::NotIterable, "comprehension source must be a list"));
        };
        let mut out = Vec::new();
        for item in items.borrow().iter().cloned() {
            let scope = Namespace::child(env);
            scope.borrow_mut().define(Rc::clone(var), item);
            if let Some(cond) = filter {
                if !self.eval_expr(cond, &scope)?.truthy() {
                    continue;
                }
            }
            out.push(self.eval_expr(element, &scope)?);
        }
        Ok(Value::list(out))
    }

    fn eval_await(&mut self, inner: &Expr, env: &NamespaceRef) -> RunResult<Value> {
        let v = self.eval_expr(inner, env)?;
        match v {
            Value::Promise(state) => match &*state.borrow() {
                crate::value::PromiseState::Ready(value) => Ok(value.clone()),
                crate::value::PromiseState::Rejected(message) => {
                    Err(RaisedError::new(ErrorKind::PromiseRejected, message.to_string()))
                }
                // No event loop: a pending promise is returned unchanged
                // rather than blocking or erroring (see DESIGN.md).
                crate::value::PromiseState::Pending => Ok(Value::Promise(Rc::clone(&state))),
            },
            Value::Generator(gen) => self.advance_generator(&gen),
            other => Ok(other),
        }
    }

    fn eval_manifest(&mut self, class_name: &str, args: &[Arg], env: &NamespaceRef) -> RunResult<Value> {
        let Some(Value::Class(class)) = Namespace::get(&self.globals, class_name) else {
            return Err(RaisedError::new(ErrorKind::UndefinedName, format!("undefined entity {class_name}")));
        };
        let fields = Namespace::root();
        let instance = Rc::new(RefCell::new(Instance { class: Rc::clone(&class), fields }));
        let instance_value = Value::Instance(Rc::clone(&instance));
        if let Some(construct) = class.resolve_method("construct") {
            let arg_values = self.eval_args(args, env)?;
            let saved_class = self.current_class.take();
            self.current_class = Some(Rc::clone(&class));
            let result = self.call_function(&construct, arg_values, Some(instance_value.clone()));
            self.current_class = saved_class;
            result?;
        }
        Ok(instance_value)
    }

    fn eval_ascend(&mut self, method: &str, args: &[Arg], env: &NamespaceRef) -> RunResult<Value> {
        let self_value = self.current_self.clone().ok_or_else(|| RaisedError::new(ErrorKind::SelfOutsideMethod, "ascend used outside a method"))?;
        let Value::Instance(inst) = &self_value else {
            return Err(RaisedError::new(ErrorKind::SelfOutsideMethod, "ascend used outside a method"));
        };
        let class = Rc::clone(&inst.borrow().class);
        let parent = class.parent.clone().ok_or_else(|| RaisedError::new(ErrorKind::NoParent, format!("{} has no parent", class.name)))?;
        let function = parent.resolve_method(method).ok_or_else(|| RaisedError::new(ErrorKind::NoSuchMethod, format!("{} has no method {method}", parent.name)))?;
        let arg_values = self.eval_args(args, env)?;
        self.call_function(&function, arg_values, Some(self_value))
    }

    // ---- Generators ---------------------------------------------------

    pub fn advance_generator(&mut self, gen: &Rc<RefCell<Generator>>) -> RunResult<Value> {
        if gen.borrow().is_done() {
            return Ok(Value::Void);
        }
        self.tracer.on_resume(&gen.borrow().function.name);

        let (function, env, saved_resume_stack) = {
            let mut g = gen.borrow_mut();
            g.status = Status::Running;
            (Rc::clone(&g.function), Rc::clone(&g.env), std::mem::take(&mut g.resume_stack))
        };

        let outer_resume_stack = std::mem::replace(&mut self.resume_stack, saved_resume_stack);
        let outer_in_generator = self.in_generator;
        let outer_generator = self.current_generator.replace(Rc::clone(gen));
        self.in_generator = true;

        self.resources.enter_call().map_err(|e| RaisedError::new(ErrorKind::TypeMismatch, e.to_string()))?;
        let result = self.exec_block(&function.body, &env);
        self.resources.exit_call();

        let resulting_stack = std::mem::replace(&mut self.resume_stack, outer_resume_stack);
        self.in_generator = outer_in_generator;
        self.current_generator = outer_generator;

        match result {
            Ok(Flow::Suspend(v)) => {
                let mut g = gen.borrow_mut();
                g.status = Status::Suspended;
                g.resume_stack = resulting_stack;
                Ok(v)
            }
            Ok(_) => {
                gen.borrow_mut().status = Status::Done;
                Ok(Value::Void)
            }
            Err(e) => {
                gen.borrow_mut().status = Status::Done;
                Err(e)
            }
        }
    }

    #[must_use]
    pub fn current_generator(&self) -> Option<Rc<RefCell<Generator>>> {
        self.current_generator.clone()
    }
}

fn as_f64(v: &Value) -> RunResult<f64> {
    match v {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        other => Err(RaisedError::new(ErrorKind::TypeMismatch, format!("expected a number, got {}", other.type_name()))),
    }
}

fn stmt_line(stmt: &Stmt) -> u32 {
    match stmt {
        Stmt::Designate { line, .. }
        | Stmt::Assign { line, .. }
        | Stmt::Foresee { line, .. }
        | Stmt::CycleWhile { line, .. }
        | Stmt::CycleThrough { line, .. }
        | Stmt::CycleFromTo { line, .. }
        | Stmt::Break(line)
        | Stmt::Continue(line)
        | Stmt::Protocol { line, .. }
        | Stmt::Yield { line, .. }
        | Stmt::Delegate { line, .. }
        | Stmt::Scheme { line, .. }
        | Stmt::Preview { line, .. }
        | Stmt::Override { line, .. }
        | Stmt::Absolute { line, .. }
        | Stmt::Anomaly { line, .. }
        | Stmt::Entity { line, .. }
        | Stmt::Incorporate { line, .. }
        | Stmt::Attempt { line, .. }
        | Stmt::Situation { line, .. }
        | Stmt::ExprStmt { line, .. } => *line,
    }
}
