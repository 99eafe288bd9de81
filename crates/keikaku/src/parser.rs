//! Recursive-descent parser: token stream -> [`Program`].
//!
//! A few grammar choices not pinned down by the token/keyword/precedence
//! tables alone are resolved here and recorded in `DESIGN.md`:
//!
//! - `declare`/`announce` are ordinary builtins (not keywords — see the
//!   keyword table), but idiomatic usage calls them without parentheses
//!   (`declare xs`). A bare identifier at the head of an expression
//!   statement that is followed directly by another expression (rather
//!   than an operator, `.`, `[`, `(`, or end of statement) is parsed as a
//!   single-argument call to that identifier.
//! - List comprehensions use the `cycle through ... as ... foresee ...`
//!   shape inside `[...]`; generator expressions use `for ... through ...
//!   where ...` inside `(...)`. Both parse to the same AST node
//!   (`Expr::ListComprehension`) since both materialize to a list eagerly
//!   in this minimum conforming implementation.
//! - Every colon-introduced body (`parse_block`) accepts either a full
//!   `NEWLINE INDENT ... DEDENT` block or a single statement inline on the
//!   same line, matching how the language's own example programs write
//!   short loop/match/try bodies on one line.

use std::rc::Rc;

use crate::ast::{Arg, AssignTarget, BinOp, Expr, Params, Program, Stmt, UnOp};
use crate::lexer::{Lexer, Spanned, Token};

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SyntaxError at line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(source)
        .tokenize()
        .map_err(|e| ParseError { message: e.message, line: e.line })?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_program()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).map_or(&Token::Eof, |s| &s.token)
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError { message: format!("expected {token:?}, found {:?}", self.peek()), line: self.line() })
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Token::Newline) {
            self.advance();
        }
    }

    fn ident(&mut self) -> Result<Rc<str>, ParseError> {
        match self.advance() {
            Token::Identifier(name) => Ok(name),
            other => Err(ParseError { message: format!("expected identifier, found {other:?}"), line: self.line() }),
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !matches!(self.peek(), Token::Eof) {
            statements.push(self.parse_stmt()?);
            self.skip_newlines();
        }
        Ok(Program { statements })
    }

    /// Parses the body after a `:`: either `NEWLINE INDENT stmt* DEDENT`, or
    /// a single statement on the same line (`cycle from 0 to 10 as _: push(xs,
    /// proceed(g))`, `attempt: designate x = 1 / 0`). Every colon-introduced
    /// body in the grammar — `cycle`, `foresee`/`alternate`/`otherwise`,
    /// `protocol`/`sequence`, `entity`, `attempt`/`recover`, `scheme`/
    /// `execute`, `anomaly` — goes through this so both forms are accepted
    /// uniformly.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.eat(&Token::Colon)?;
        if matches!(self.peek(), Token::Newline) {
            self.skip_newlines();
            self.eat(&Token::Indent)?;
            let mut out = Vec::new();
            self.skip_newlines();
            while !matches!(self.peek(), Token::Dedent) {
                out.push(self.parse_stmt()?);
                self.skip_newlines();
            }
            self.eat(&Token::Dedent)?;
            Ok(out)
        } else {
            Ok(vec![self.parse_stmt()?])
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        match self.peek().clone() {
            Token::Designate => {
                self.advance();
                let name = self.ident()?;
                self.eat(&Token::Assign)?;
                let value = self.parse_expr()?;
                Ok(Stmt::Designate { name, value, line })
            }
            Token::Override => {
                self.advance();
                let name = self.ident()?;
                self.eat(&Token::Assign)?;
                let value = self.parse_expr()?;
                Ok(Stmt::Override { name, value, line })
            }
            Token::Foresee => self.parse_foresee(),
            Token::Cycle => self.parse_cycle(),
            Token::Break => {
                self.advance();
                Ok(Stmt::Break(line))
            }
            Token::Continue => {
                self.advance();
                Ok(Stmt::Continue(line))
            }
            Token::Protocol | Token::Sequence => self.parse_protocol(),
            Token::Yield => {
                self.advance();
                let value = if matches!(self.peek(), Token::Newline | Token::Eof | Token::Dedent) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                Ok(Stmt::Yield { value, line })
            }
            Token::Delegate => {
                self.advance();
                let iterable = self.parse_expr()?;
                Ok(Stmt::Delegate { iterable, line })
            }
            Token::Scheme | Token::Execute => {
                self.advance();
                let body = self.parse_block()?;
                Ok(Stmt::Scheme { body, line })
            }
            Token::Preview => {
                self.advance();
                let value = self.parse_expr()?;
                Ok(Stmt::Preview { value, line })
            }
            Token::Absolute => {
                self.advance();
                let cond = self.parse_expr()?;
                Ok(Stmt::Absolute { cond, line })
            }
            Token::Anomaly => {
                self.advance();
                let body = self.parse_block()?;
                Ok(Stmt::Anomaly { body, line })
            }
            Token::Entity => self.parse_entity(),
            Token::Incorporate => {
                self.advance();
                let path = match self.advance() {
                    Token::Str(s) => s,
                    other => {
                        return Err(ParseError { message: format!("expected string path, found {other:?}"), line });
                    }
                };
                Ok(Stmt::Incorporate { path, line })
            }
            Token::Attempt => self.parse_attempt(),
            Token::Situation => self.parse_situation(),
            _ => self.parse_expr_or_assign_stmt(line),
        }
    }

    fn parse_foresee(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        let mut branches = vec![(cond, body)];
        let mut else_body = None;
        loop {
            self.skip_newlines();
            match self.peek() {
                Token::Alternate => {
                    self.advance();
                    let cond = self.parse_expr()?;
                    let body = self.parse_block()?;
                    branches.push((cond, body));
                }
                Token::Otherwise => {
                    self.advance();
                    else_body = Some(self.parse_block()?);
                    break;
                }
                _ => break,
            }
        }
        Ok(Stmt::Foresee { branches, else_body, line })
    }

    fn parse_cycle(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        match self.peek().clone() {
            Token::While => {
                self.advance();
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                Ok(Stmt::CycleWhile { cond, body, line })
            }
            Token::Through => {
                self.advance();
                let iterable = self.parse_expr()?;
                self.eat(&Token::As)?;
                let var = self.ident()?;
                let body = self.parse_block()?;
                Ok(Stmt::CycleThrough { var, iterable, body, line })
            }
            Token::From => {
                self.advance();
                let start = self.parse_expr()?;
                self.eat(&Token::To)?;
                let end = self.parse_expr()?;
                self.eat(&Token::As)?;
                let var = self.ident()?;
                let body = self.parse_block()?;
                Ok(Stmt::CycleFromTo { var, start, end, body, line })
            }
            other => Err(ParseError { message: format!("expected while/through/from after cycle, found {other:?}"), line }),
        }
    }

    fn parse_params(&mut self) -> Result<Params, ParseError> {
        self.eat(&Token::LParen)?;
        let mut params = Params::default();
        while !matches!(self.peek(), Token::RParen) {
            if matches!(self.peek(), Token::Ellipsis) {
                self.advance();
                params.rest = Some(self.ident()?);
            } else {
                let name = self.ident()?;
                if matches!(self.peek(), Token::Assign) {
                    self.advance();
                    params.defaults.push(self.parse_expr()?);
                } else if !params.defaults.is_empty() {
                    return Err(ParseError {
                        message: "parameter without default follows a parameter with one".into(),
                        line: self.line(),
                    });
                }
                params.names.push(name);
            }
            if matches!(self.peek(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.eat(&Token::RParen)?;
        Ok(params)
    }

    fn parse_protocol(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        let is_sequence = matches!(self.peek(), Token::Sequence);
        self.advance();
        let is_async = if matches!(self.peek(), Token::Async) {
            self.advance();
            true
        } else {
            false
        };
        let name = self.ident()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(Stmt::Protocol { name, params, body: Rc::from(body), is_sequence, is_async, line })
    }

    fn parse_entity(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let name = self.ident()?;
        let parent = if matches!(self.peek(), Token::Inherits) {
            self.advance();
            Some(self.ident()?)
        } else {
            None
        };
        let methods = self.parse_block()?;
        Ok(Stmt::Entity { name, parent, methods, line })
    }

    fn parse_attempt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let body = self.parse_block()?;
        self.skip_newlines();
        self.eat(&Token::Recover)?;
        let error_name = if matches!(self.peek(), Token::As) {
            self.advance();
            Some(self.ident()?)
        } else {
            None
        };
        let recover_body = self.parse_block()?;
        Ok(Stmt::Attempt { body, error_name, recover_body, line })
    }

    fn parse_situation(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let scrutinee = self.parse_expr()?;
        self.eat(&Token::Colon)?;
        self.skip_newlines();
        self.eat(&Token::Indent)?;
        self.skip_newlines();
        let mut alignments = Vec::new();
        let mut otherwise = None;
        while !matches!(self.peek(), Token::Dedent) {
            match self.peek() {
                Token::Alignment => {
                    self.advance();
                    let mut values = vec![self.parse_expr()?];
                    while matches!(self.peek(), Token::Comma) {
                        self.advance();
                        values.push(self.parse_expr()?);
                    }
                    let body = self.parse_block()?;
                    alignments.push((values, body));
                }
                Token::Otherwise => {
                    self.advance();
                    otherwise = Some(self.parse_block()?);
                }
                other => {
                    return Err(ParseError { message: format!("expected alignment/otherwise, found {other:?}"), line: self.line() });
                }
            }
            self.skip_newlines();
        }
        self.eat(&Token::Dedent)?;
        Ok(Stmt::Situation { scrutinee, alignments, otherwise, line })
    }

    fn parse_expr_or_assign_stmt(&mut self, line: u32) -> Result<Stmt, ParseError> {
        // Bare single-argument call sugar: IDENT <expr>, where IDENT is not
        // followed by an operator/assignment/postfix token.
        if let Token::Identifier(name) = self.peek().clone() {
            if self.starts_bare_call_argument(1) {
                self.advance();
                let arg = self.parse_expr()?;
                return Ok(Stmt::ExprStmt { value: Expr::Call { callee: name, args: vec![Arg::Plain(arg)] }, line });
            }
        }

        let expr = self.parse_expr()?;
        match self.peek() {
            Token::Assign => {
                self.advance();
                let value = self.parse_expr()?;
                let target = expr_to_assign_target(expr, line)?;
                Ok(Stmt::Assign { target, value, line })
            }
            _ => Ok(Stmt::ExprStmt { value: expr, line }),
        }
    }

    fn starts_bare_call_argument(&self, offset: usize) -> bool {
        matches!(
            self.peek_at(offset),
            Token::Int(_)
                | Token::Float(_)
                | Token::Str(_)
                | Token::True
                | Token::False
                | Token::Identifier(_)
                | Token::Manifest
                | Token::Ascend
                | Token::SelfKw
                | Token::Not
                | Token::Minus
                | Token::LBracket
                | Token::LBrace
                | Token::Ellipsis
        )
    }

    // ---- Expressions -----------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let if_true = self.parse_or()?;
        if matches!(self.peek(), Token::Foresee) {
            self.advance();
            let cond = self.parse_or()?;
            self.eat(&Token::Otherwise)?;
            let if_false = self.parse_ternary()?;
            return Ok(Expr::Ternary { cond: Box::new(cond), if_true: Box::new(if_true), if_false: Box::new(if_false) });
        }
        Ok(if_true)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary { op: BinOp::Or, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::Binary { op: BinOp::And, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Token::Not) {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::Unary { op: UnOp::Not, operand: Box::new(operand) });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Token::Equal => BinOp::Eq,
            Token::NotEqual => BinOp::NotEq,
            Token::Less => BinOp::Lt,
            Token::LessEqual => BinOp::LtEq,
            Token::Greater => BinOp::Gt,
            Token::GreaterEqual => BinOp::GtEq,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(Expr::Binary { op, left: Box::new(left), right: Box::new(right) })
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::DoubleSlash => BinOp::FloorDiv,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Token::Minus) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnOp::Neg, operand: Box::new(operand) });
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if matches!(self.peek(), Token::DoubleStar) {
            self.advance();
            // Right-associative.
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary { op: BinOp::Pow, left: Box::new(base), right: Box::new(exponent) });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = self.ident()?;
                    if matches!(self.peek(), Token::LParen) {
                        let args = self.parse_args()?;
                        expr = Expr::MethodCall { receiver: Box::new(expr), method: name, args };
                    } else {
                        expr = Expr::Member { object: Box::new(expr), name };
                    }
                }
                Token::LBracket => {
                    self.advance();
                    expr = self.parse_index_or_slice(expr)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_index_or_slice(&mut self, object: Expr) -> Result<Expr, ParseError> {
        let object = Box::new(object);
        if matches!(self.peek(), Token::Colon) {
            self.advance();
            return self.finish_slice(object, None);
        }
        let first = self.parse_expr()?;
        if matches!(self.peek(), Token::Colon) {
            self.advance();
            return self.finish_slice(object, Some(Box::new(first)));
        }
        self.eat(&Token::RBracket)?;
        Ok(Expr::Index { object, index: Box::new(first) })
    }

    fn finish_slice(&mut self, object: Box<Expr>, start: Option<Box<Expr>>) -> Result<Expr, ParseError> {
        let end = if matches!(self.peek(), Token::Colon | Token::RBracket) { None } else { Some(Box::new(self.parse_expr()?)) };
        let step = if matches!(self.peek(), Token::Colon) {
            self.advance();
            if matches!(self.peek(), Token::RBracket) { None } else { Some(Box::new(self.parse_expr()?)) }
        } else {
            None
        };
        self.eat(&Token::RBracket)?;
        Ok(Expr::Slice { object, start, end, step })
    }

    fn parse_args(&mut self) -> Result<Vec<Arg>, ParseError> {
        self.eat(&Token::LParen)?;
        let mut args = Vec::new();
        while !matches!(self.peek(), Token::RParen) {
            if matches!(self.peek(), Token::Ellipsis) {
                self.advance();
                args.push(Arg::Spread(self.parse_expr()?));
            } else {
                args.push(Arg::Plain(self.parse_expr()?));
            }
            if matches!(self.peek(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.eat(&Token::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        match self.advance() {
            Token::Int(v) => Ok(Expr::IntLit(v)),
            Token::Float(v) => Ok(Expr::FloatLit(v)),
            Token::Str(s) => Ok(Expr::StringLit(s)),
            Token::True => Ok(Expr::BoolLit(true)),
            Token::False => Ok(Expr::BoolLit(false)),
            Token::SelfKw => Ok(Expr::SelfExpr),
            Token::Ellipsis => {
                // Spread used in non-call position (e.g. inside a list literal body
                // already handled by parse_list_items); bare use is a syntax error.
                Err(ParseError { message: "unexpected spread outside argument/list position".into(), line })
            }
            Token::Await => {
                let inner = self.parse_postfix()?;
                Ok(Expr::Await(Box::new(inner)))
            }
            Token::Manifest => {
                let class_name = self.ident()?;
                let args = self.parse_args()?;
                Ok(Expr::Manifest { class_name, args })
            }
            Token::Ascend => {
                let method = self.ident()?;
                let args = self.parse_args()?;
                Ok(Expr::Ascend { method, args })
            }
            Token::Identifier(name) => {
                if matches!(self.peek(), Token::LParen) {
                    let args = self.parse_args()?;
                    Ok(Expr::Call { callee: name, args })
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            Token::LParen => {
                // Either a parenthesized expression or a generator expression.
                let first = self.parse_expr()?;
                if matches!(self.peek(), Token::For) {
                    let expr = self.finish_generator_expr(first)?;
                    self.eat(&Token::RParen)?;
                    return Ok(expr);
                }
                self.eat(&Token::RParen)?;
                Ok(first)
            }
            Token::LBracket => self.parse_list_literal_or_comprehension(),
            Token::LBrace => self.parse_dict_literal(),
            other => Err(ParseError { message: format!("unexpected token {other:?} in expression"), line }),
        }
    }

    fn finish_generator_expr(&mut self, element: Expr) -> Result<Expr, ParseError> {
        self.eat(&Token::For)?;
        let var = self.ident()?;
        self.eat(&Token::Through)?;
        let iterable = self.parse_expr()?;
        let filter = if matches!(self.peek(), Token::Where) {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        Ok(Expr::ListComprehension { element: Box::new(element), var, iterable: Box::new(iterable), filter })
    }

    fn parse_list_literal_or_comprehension(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Token::RBracket) {
            self.advance();
            return Ok(Expr::ListLit(Vec::new()));
        }
        let first_is_spread = matches!(self.peek(), Token::Ellipsis);
        let first = if first_is_spread {
            self.advance();
            self.parse_expr()?
        } else {
            self.parse_expr()?
        };
        if matches!(self.peek(), Token::Cycle) {
            self.advance();
            self.eat(&Token::Through)?;
            let iterable = self.parse_expr()?;
            self.eat(&Token::As)?;
            let var = self.ident()?;
            let filter = if matches!(self.peek(), Token::Foresee) {
                self.advance();
                Some(Box::new(self.parse_expr()?))
            } else {
                None
            };
            self.eat(&Token::RBracket)?;
            return Ok(Expr::ListComprehension { element: Box::new(first), var, iterable: Box::new(iterable), filter });
        }
        let mut items = vec![if first_is_spread { Arg::Spread(first) } else { Arg::Plain(first) }];
        while matches!(self.peek(), Token::Comma) {
            self.advance();
            if matches!(self.peek(), Token::RBracket) {
                break;
            }
            if matches!(self.peek(), Token::Ellipsis) {
                self.advance();
                items.push(Arg::Spread(self.parse_expr()?));
            } else {
                items.push(Arg::Plain(self.parse_expr()?));
            }
        }
        self.eat(&Token::RBracket)?;
        Ok(Expr::ListLit(items))
    }

    fn parse_dict_literal(&mut self) -> Result<Expr, ParseError> {
        let mut pairs = Vec::new();
        while !matches!(self.peek(), Token::RBrace) {
            let key = self.parse_expr()?;
            self.eat(&Token::Colon)?;
            let value = self.parse_expr()?;
            pairs.push((key, value));
            if matches!(self.peek(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.eat(&Token::RBrace)?;
        Ok(Expr::DictLit(pairs))
    }
}

fn expr_to_assign_target(expr: Expr, line: u32) -> Result<AssignTarget, ParseError> {
    match expr {
        Expr::Identifier(name) => Ok(AssignTarget::Identifier(name)),
        Expr::Member { object, name } => Ok(AssignTarget::Member { object, name }),
        Expr::Index { object, index } => Ok(AssignTarget::Index { object, index }),
        Expr::ListLit(items) => {
            let mut names = Vec::new();
            for item in items {
                match item {
                    Arg::Plain(Expr::Identifier(name)) => names.push(name),
                    _ => {
                        return Err(ParseError { message: "list-pattern assignment targets must be identifiers".into(), line });
                    }
                }
            }
            Ok(AssignTarget::ListPattern(names))
        }
        _ => Err(ParseError { message: "invalid assignment target".into(), line }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_designate_and_binary() {
        let program = parse("designate x = 1 + 2 * 3\n").unwrap();
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn parses_fibonacci_sequence() {
        let src = "sequence fib():\n    designate a = 0\n    designate b = 1\n    cycle while true:\n        yield a\n        designate t = a + b\n        a = b\n        b = t\n";
        let program = parse(src).unwrap();
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn parses_bare_declare_call() {
        let program = parse("declare xs\n").unwrap();
        match &program.statements[0] {
            Stmt::ExprStmt { value: Expr::Call { callee, args }, .. } => {
                assert_eq!(&**callee, "declare");
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn parses_entity_inherits_and_ascend() {
        let src = "entity A:\n    protocol greet():\n        yield \"A\"\nentity B inherits A:\n    protocol greet():\n        designate r = ascend greet()\n        yield r + \"B\"\n";
        let program = parse(src).unwrap();
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn parses_situation_match() {
        let src = "situation x:\n    alignment 1: declare \"one\"\n    alignment 2, 3: declare \"two or three\"\n    otherwise: declare \"other\"\n";
        let program = parse(src).unwrap();
        assert_eq!(program.statements.len(), 1);
    }
}
