//! Arithmetic expressions parsed into an arena.
//!
//! Every syntax node and identifier is allocated from the [`Arena`] passed
//! to [`parse`], so a whole tree is released by resetting that arena.
//!
//! ```
//! use strata_arena::{Arena, ArenaConfig};
//! use strata_bench::expr::{parse, Env};
//!
//! let arena = Arena::new(ArenaConfig::default()).unwrap();
//! let mut env = Env::new_in(&arena);
//! env.put("x", 4.0).unwrap();
//! let tree = parse(&arena, "-(x + 2) * 3").unwrap();
//! assert_eq!(tree.eval(&env).unwrap(), -18.0);
//! ```

use std::fmt;

use strata_arena::Arena;
use strata_collections::map::HashMap;
use strata_collections::DefaultHashBuilder;
use strata_core::{AllocError, Allocator};

/// Variable bindings used by [`Expr::eval`].
pub type Env<'a, A> = HashMap<&'a str, f64, DefaultHashBuilder, A>;

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl BinOp {
    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
        }
    }

    fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }
}

/// A syntax node borrowed from the arena it was parsed into.
#[derive(Debug, PartialEq)]
pub enum Expr<'a> {
    /// Numeric literal.
    Num(f64),
    /// Variable reference.
    Var(&'a str),
    /// Negation.
    Neg(&'a Expr<'a>),
    /// Binary operation.
    Bin(BinOp, &'a Expr<'a>, &'a Expr<'a>),
}

impl Expr<'_> {
    /// Evaluate against `env`.
    pub fn eval<A: Allocator>(&self, env: &Env<'_, A>) -> Result<f64, ExprError> {
        match *self {
            Expr::Num(n) => Ok(n),
            Expr::Var(name) => env
                .get(name)
                .copied()
                .ok_or_else(|| ExprError::UnknownVariable(name.to_owned())),
            Expr::Neg(inner) => Ok(-inner.eval(env)?),
            Expr::Bin(op, lhs, rhs) => Ok(op.apply(lhs.eval(env)?, rhs.eval(env)?)),
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Num(_) | Expr::Var(_) => 1,
            Expr::Neg(inner) => 1 + inner.node_count(),
            Expr::Bin(_, lhs, rhs) => 1 + lhs.node_count() + rhs.node_count(),
        }
    }
}

impl fmt::Display for Expr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{n}"),
            Expr::Var(name) => f.write_str(name),
            Expr::Neg(inner) => write!(f, "(-{inner})"),
            Expr::Bin(op, lhs, rhs) => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

/// Errors from parsing or evaluating an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprError {
    /// A character that cannot start or continue an expression.
    Unexpected {
        /// Byte offset in the source.
        pos: usize,
        /// The offending character.
        found: char,
    },
    /// The source ended mid-expression.
    UnexpectedEnd,
    /// A closing parenthesis is missing.
    Unclosed {
        /// Byte offset of the opening parenthesis.
        pos: usize,
    },
    /// Evaluation referenced an unbound variable.
    UnknownVariable(String),
    /// The arena could not hold the tree.
    Alloc(AllocError),
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unexpected { pos, found } => {
                write!(f, "unexpected '{found}' at offset {pos}")
            }
            Self::UnexpectedEnd => write!(f, "unexpected end of input"),
            Self::Unclosed { pos } => write!(f, "unclosed '(' at offset {pos}"),
            Self::UnknownVariable(name) => write!(f, "unknown variable '{name}'"),
            Self::Alloc(err) => write!(f, "allocation failed: {err}"),
        }
    }
}

impl std::error::Error for ExprError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Alloc(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AllocError> for ExprError {
    fn from(err: AllocError) -> Self {
        Self::Alloc(err)
    }
}

/// Parse `src` into a tree allocated from `arena`.
pub fn parse<'a, P: Allocator>(arena: &'a Arena<P>, src: &str) -> Result<&'a Expr<'a>, ExprError> {
    let mut parser = Parser { arena, src, pos: 0 };
    let expr = parser.expr()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(expr),
        Some(found) => Err(ExprError::Unexpected {
            pos: parser.pos,
            found,
        }),
    }
}

struct Parser<'a, 's, P: Allocator> {
    arena: &'a Arena<P>,
    src: &'s str,
    pos: usize,
}

impl<'a, P: Allocator> Parser<'a, '_, P> {
    fn node(&self, expr: Expr<'a>) -> Result<&'a Expr<'a>, ExprError> {
        let node: &'a Expr<'a> = self.arena.alloc_value(expr)?;
        Ok(node)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Consume `c` if it is the next non-space character.
    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<&'a Expr<'a>, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = if self.eat('+') {
                BinOp::Add
            } else if self.eat('-') {
                BinOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.term()?;
            lhs = self.node(Expr::Bin(op, lhs, rhs))?;
        }
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<&'a Expr<'a>, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat('*') {
                BinOp::Mul
            } else if self.eat('/') {
                BinOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = self.node(Expr::Bin(op, lhs, rhs))?;
        }
    }

    fn unary(&mut self) -> Result<&'a Expr<'a>, ExprError> {
        if self.eat('-') {
            let inner = self.unary()?;
            return self.node(Expr::Neg(inner));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<&'a Expr<'a>, ExprError> {
        self.skip_ws();
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Err(ExprError::UnexpectedEnd);
        };
        if c == '(' {
            self.pos += 1;
            let inner = self.expr()?;
            if !self.eat(')') {
                return Err(ExprError::Unclosed { pos: start });
            }
            return Ok(inner);
        }
        if c.is_ascii_digit() || c == '.' {
            let len = self.scan(|c| c.is_ascii_digit() || c == '.');
            let text = &self.src[start..start + len];
            let value = text
                .parse()
                .map_err(|_| ExprError::Unexpected { pos: start, found: c })?;
            return self.node(Expr::Num(value));
        }
        if c.is_alphabetic() || c == '_' {
            let len = self.scan(|c| c.is_alphanumeric() || c == '_');
            let name = self.arena.alloc_str(&self.src[start..start + len])?;
            return self.node(Expr::Var(name));
        }
        Err(ExprError::Unexpected { pos: start, found: c })
    }

    /// Advance over the run of characters matching `accept`; returns its
    /// byte length.
    fn scan(&mut self, accept: impl Fn(char) -> bool) -> usize {
        let rest = &self.src[self.pos..];
        let len = rest.find(|c| !accept(c)).unwrap_or(rest.len());
        self.pos += len;
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_arena::ArenaConfig;
    use strata_core::Heap;

    fn arena() -> Arena {
        Arena::new(ArenaConfig::default()).unwrap()
    }

    fn eval_src(src: &str) -> Result<f64, ExprError> {
        let arena = arena();
        let env: Env<'_, Heap> = Env::new();
        parse(&arena, src)?.eval(&env)
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval_src("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(eval_src("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(eval_src("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(eval_src("8 / 4 / 2").unwrap(), 1.0);
        assert_eq!(eval_src("--2.5").unwrap(), 2.5);
    }

    #[test]
    fn tree_lives_in_arena() {
        let arena = arena();
        let tree = parse(&arena, "a * (b + 1)").unwrap();
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.to_string(), "(a * (b + 1))");
        assert!(arena.allocated() > 0);
    }

    #[test]
    fn variables_resolve_through_env() {
        let arena = arena();
        let mut env = Env::new_in(&arena);
        env.put("rate", 0.5).unwrap();
        let tree = parse(&arena, "rate * 8").unwrap();
        assert_eq!(tree.eval(&env).unwrap(), 4.0);

        let missing = parse(&arena, "rate + other").unwrap();
        assert_eq!(
            missing.eval(&env).unwrap_err(),
            ExprError::UnknownVariable("other".into())
        );
    }

    #[test]
    fn syntax_errors_carry_offsets() {
        assert_eq!(eval_src("1 +").unwrap_err(), ExprError::UnexpectedEnd);
        assert_eq!(eval_src("(1 + 2").unwrap_err(), ExprError::Unclosed { pos: 0 });
        assert_eq!(
            eval_src("2 $ 3").unwrap_err(),
            ExprError::Unexpected { pos: 2, found: '$' }
        );
        assert_eq!(
            eval_src("1..2").unwrap_err(),
            ExprError::Unexpected { pos: 0, found: '1' }
        );
    }
}
