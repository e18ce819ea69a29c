//! Syntax tree for the MixSL shading language
//!
//! This crate holds the data model the compiler consumes: declarations with
//! storage qualifiers and attributes, type references, a small expression
//! and statement tree, and the pipeline-stage enum. The token-level parser
//! that produces these trees from text is an external collaborator; the
//! [`ClassBuilder`] covers programmatic construction.
//!
//! # Example
//!
//! ```
//! use mixsl_ast::{ClassBuilder, Expr, ShaderStage, Stmt, TypeRef};
//!
//! let class = ClassBuilder::new("SolidColor")
//!     .bound_var("color", TypeRef::floatn(4), "SolidColor.Color")
//!     .entry_method(
//!         "psMain",
//!         ShaderStage::Pixel,
//!         TypeRef::floatn(4),
//!         vec![Stmt::ret(Expr::ident("color"))],
//!     )
//!     .build();
//!
//! assert_eq!(class.name, "SolidColor");
//! ```

mod attributes;
mod builder;
mod decl;
mod expr;
mod qualifiers;
mod span;
mod stage;
mod stmt;
mod types;

pub use attributes::{Attribute, AttributeError, AttributeNode, RESERVED_ATTRIBUTES};
pub use builder::{ClassBuilder, buffer_member};
pub use decl::{ClassDecl, DeclKind, Declaration, MethodDef, Param, StructField, VariableDef};
pub use expr::{BinaryOp, Expr, Literal, StateEntry, StateValue};
pub use qualifiers::StorageQualifiers;
pub use span::Span;
pub use stage::ShaderStage;
pub use stmt::Stmt;
pub use types::{ObjectType, ScalarKind, TypeRef};
