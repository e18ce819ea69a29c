//! Expressions

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal (attribute arguments only)
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(v) => write!(f, "{v}"),
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// One `Key = value` entry of an inline state block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    /// State key, e.g. `Filter`
    pub key: String,
    /// Assigned value
    pub value: StateValue,
    /// Location of the entry
    #[serde(default)]
    pub span: Span,
}

/// The value side of a state-block entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateValue {
    /// Bare word, e.g. `ANISOTROPIC`
    Word(String),
    /// Numeric value
    Scalar(f64),
    /// Tuple of numbers, e.g. a border color
    Tuple(Vec<f64>),
}

/// An expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value
    Literal(Literal),
    /// Name reference
    Ident {
        /// Referenced name
        name: String,
        /// Location of the reference, when the parser recorded one
        #[serde(default)]
        span: Span,
    },
    /// Member access `base.member`
    Member {
        /// Accessed value
        base: Box<Expr>,
        /// Member name
        member: String,
    },
    /// Index access `base[index]`
    Index {
        /// Indexed value
        base: Box<Expr>,
        /// Index expression
        index: Box<Expr>,
    },
    /// Call `callee(args...)`; constructors are calls on a type name
    Call {
        /// Called value
        callee: Box<Expr>,
        /// Arguments in order
        args: Vec<Expr>,
    },
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Inline state block initializer, e.g. a sampler-state description
    StateBlock(Vec<StateEntry>),
}

impl Expr {
    /// Shorthand for an identifier expression with no location.
    pub fn ident(name: impl Into<String>) -> Expr {
        Expr::Ident {
            name: name.into(),
            span: Span::default(),
        }
    }

    /// Shorthand for an identifier expression at a location.
    pub fn ident_at(name: impl Into<String>, span: Span) -> Expr {
        Expr::Ident {
            name: name.into(),
            span,
        }
    }

    /// Shorthand for a call on a named function.
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Call {
            callee: Box::new(Expr::ident(name)),
            args,
        }
    }

    /// Shorthand for member access on a named value.
    pub fn member(base: impl Into<String>, member: impl Into<String>) -> Expr {
        Expr::Member {
            base: Box::new(Expr::ident(base)),
            member: member.into(),
        }
    }

    /// The literal boolean value of this expression, if it is one.
    pub fn const_bool(&self) -> Option<bool> {
        match self {
            Expr::Literal(Literal::Bool(v)) => Some(*v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_const_bool() {
        assert_eq!(Expr::Literal(Literal::Bool(true)).const_bool(), Some(true));
        assert_eq!(Expr::ident("x").const_bool(), None);
    }
}
