//! Abstract syntax tree produced by the parser and consumed by the evaluator.
//!
//! The evaluator works against this tree, not against the lexer or parser
//! that build it — any producer that emits a well-formed [`Program`] is a
//! conforming front end.

use std::rc::Rc;

/// A 1-based source line, kept on statements and a few expressions so that
/// raised errors and `attempt`/`recover` diagnostics can report a location.
pub type Line = u32;

/// A full parsed source file: a flat list of top-level statements.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// Function parameter list: positional parameters (some of which may carry
/// a default), plus an optional rest (`...name`) parameter.
#[derive(Debug, Clone, Default)]
pub struct Params {
    /// Parameter names in declaration order.
    pub names: Vec<Rc<str>>,
    /// Default value expressions, one per trailing parameter that has a
    /// default. `defaults.len() <= names.len()`; the defaults apply to the
    /// last `defaults.len()` entries of `names`.
    pub defaults: Vec<Expr>,
    /// Name of the rest parameter (`...name`), if declared.
    pub rest: Option<Rc<str>>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Designate {
        name: Rc<str>,
        value: Expr,
        line: Line,
    },
    Assign {
        target: AssignTarget,
        value: Expr,
        line: Line,
    },
    Foresee {
        /// (condition, body) pairs for `foresee` followed by any number of
        /// `alternate`; `otherwise`'s body is `else_body`.
        branches: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
        line: Line,
    },
    CycleWhile {
        cond: Expr,
        body: Vec<Stmt>,
        line: Line,
    },
    CycleThrough {
        var: Rc<str>,
        iterable: Expr,
        body: Vec<Stmt>,
        line: Line,
    },
    CycleFromTo {
        var: Rc<str>,
        start: Expr,
        end: Expr,
        body: Vec<Stmt>,
        line: Line,
    },
    Break(Line),
    Continue(Line),
    Protocol {
        name: Rc<str>,
        params: Params,
        body: Rc<[Stmt]>,
        is_sequence: bool,
        is_async: bool,
        line: Line,
    },
    Yield {
        value: Option<Expr>,
        line: Line,
    },
    Delegate {
        iterable: Expr,
        line: Line,
    },
    Scheme {
        body: Vec<Stmt>,
        line: Line,
    },
    Preview {
        value: Expr,
        line: Line,
    },
    Override {
        name: Rc<str>,
        value: Expr,
        line: Line,
    },
    Absolute {
        cond: Expr,
        line: Line,
    },
    Anomaly {
        body: Vec<Stmt>,
        line: Line,
    },
    Entity {
        name: Rc<str>,
        parent: Option<Rc<str>>,
        methods: Vec<Stmt>,
        line: Line,
    },
    Incorporate {
        path: Rc<str>,
        line: Line,
    },
    Attempt {
        body: Vec<Stmt>,
        error_name: Option<Rc<str>>,
        recover_body: Vec<Stmt>,
        line: Line,
    },
    Situation {
        scrutinee: Expr,
        alignments: Vec<(Vec<Expr>, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
        line: Line,
    },
    /// A bare expression evaluated for side effect (e.g. a call statement).
    ExprStmt {
        value: Expr,
        line: Line,
    },
}

#[derive(Debug, Clone)]
pub enum AssignTarget {
    Identifier(Rc<str>),
    ListPattern(Vec<Rc<str>>),
    Member { object: Box<Expr>, name: Rc<str> },
    Index { object: Box<Expr>, index: Box<Expr> },
}

#[derive(Debug, Clone)]
pub enum Expr {
    IntLit(i64),
    FloatLit(f64),
    StringLit(Rc<str>),
    BoolLit(bool),
    VoidLit,
    Identifier(Rc<str>),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Rc<str>,
        args: Vec<Arg>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: Rc<str>,
        args: Vec<Arg>,
    },
    Member {
        object: Box<Expr>,
        name: Rc<str>,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        object: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    ListLit(Vec<Arg>),
    DictLit(Vec<(Expr, Expr)>),
    ListComprehension {
        element: Box<Expr>,
        var: Rc<str>,
        iterable: Box<Expr>,
        filter: Option<Box<Expr>>,
    },
    Ternary {
        cond: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    Lambda {
        params: Params,
        body: Box<Expr>,
    },
    Await(Box<Expr>),
    SelfExpr,
    Manifest {
        class_name: Rc<str>,
        args: Vec<Arg>,
    },
    Ascend {
        method: Rc<str>,
        args: Vec<Arg>,
    },
}

/// An argument in a call or list literal: either a plain expression or a
/// spread (`...expr`) that is flattened into the surrounding vector at
/// evaluation time.
#[derive(Debug, Clone)]
pub enum Arg {
    Plain(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}
