//! Statements

use crate::expr::Expr;
use crate::types::TypeRef;
use serde::{Deserialize, Serialize};

/// A statement inside a method body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Local variable declaration
    Local {
        /// Variable name
        name: String,
        /// Variable type
        ty: TypeRef,
        /// Optional initializer
        init: Option<Expr>,
    },
    /// Expression statement
    Expr(Expr),
    /// Assignment
    Assign {
        /// Assignment target
        target: Expr,
        /// Assigned value
        value: Expr,
    },
    /// Conditional
    If {
        /// Condition
        cond: Expr,
        /// Taken when the condition holds
        then_branch: Vec<Stmt>,
        /// Taken otherwise
        else_branch: Option<Vec<Stmt>>,
    },
    /// Return from the method
    Return(Option<Expr>),
}

impl Stmt {
    /// Shorthand for a `return expr;` statement.
    pub fn ret(expr: Expr) -> Stmt {
        Stmt::Return(Some(expr))
    }
}
