//! Fluent construction of shader classes
//!
//! The token-level parser is an external collaborator; tests, examples,
//! and embedders build class trees programmatically through this builder.

use crate::attributes::AttributeNode;
use crate::decl::{ClassDecl, DeclKind, Declaration, MethodDef, Param, StructField, VariableDef};
use crate::expr::{Expr, Literal};
use crate::qualifiers::StorageQualifiers;
use crate::span::Span;
use crate::stage::ShaderStage;
use crate::stmt::Stmt;
use crate::types::TypeRef;

/// Builder for a [`ClassDecl`]
///
/// # Example
/// ```
/// use mixsl_ast::{ClassBuilder, Expr, ShaderStage, Stmt, TypeRef};
///
/// let class = ClassBuilder::new("Sprite")
///     .bound_var("tint", TypeRef::floatn(4), "Sprite.Tint")
///     .entry_method(
///         "psMain",
///         ShaderStage::Pixel,
///         TypeRef::floatn(4),
///         vec![Stmt::ret(Expr::ident("tint"))],
///     )
///     .build();
/// assert_eq!(class.declarations.len(), 2);
/// ```
#[derive(Debug)]
pub struct ClassBuilder {
    class: ClassDecl,
}

impl ClassBuilder {
    /// Starts a class with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        ClassBuilder {
            class: ClassDecl {
                name: name.into(),
                bases: Vec::new(),
                declarations: Vec::new(),
                span: Span::default(),
            },
        }
    }

    /// Sets the class header location.
    pub fn span(mut self, span: Span) -> Self {
        self.class.span = span;
        self
    }

    /// Adds a base class.
    pub fn base(mut self, name: impl Into<String>) -> Self {
        self.class.bases.push(name.into());
        self
    }

    /// Adds a prebuilt declaration.
    pub fn decl(mut self, decl: Declaration) -> Self {
        self.class.declarations.push(decl);
        self
    }

    /// Adds an unqualified variable.
    pub fn var(self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.decl(Declaration {
            name: name.into(),
            span: Span::default(),
            qualifiers: StorageQualifiers::empty(),
            attributes: Vec::new(),
            kind: DeclKind::Variable(VariableDef {
                ty,
                init: None,
                buffer: None,
            }),
        })
    }

    /// Adds a variable bound to a resource slot or buffer member via `Link`.
    pub fn bound_var(self, name: impl Into<String>, ty: TypeRef, bind: impl Into<String>) -> Self {
        self.decl(Declaration {
            name: name.into(),
            span: Span::default(),
            qualifiers: StorageQualifiers::empty(),
            attributes: vec![AttributeNode::new("Link", vec![Literal::Str(bind.into())])],
            kind: DeclKind::Variable(VariableDef {
                ty,
                init: None,
                buffer: None,
            }),
        })
    }

    /// Adds a qualified variable with an optional initializer.
    pub fn qualified_var(
        self,
        name: impl Into<String>,
        ty: TypeRef,
        qualifiers: StorageQualifiers,
        init: Option<Expr>,
    ) -> Self {
        self.decl(Declaration {
            name: name.into(),
            span: Span::default(),
            qualifiers,
            attributes: Vec::new(),
            kind: DeclKind::Variable(VariableDef {
                ty,
                init,
                buffer: None,
            }),
        })
    }

    /// Adds a composition slot filled by the named class.
    pub fn compose(self, name: impl Into<String>, class: impl Into<String>) -> Self {
        self.qualified_var(
            name,
            TypeRef::Named(class.into()),
            StorageQualifiers::COMPOSE,
            None,
        )
    }

    /// Adds a composition slot accepting `len` implementations.
    pub fn compose_array(
        self,
        name: impl Into<String>,
        class: impl Into<String>,
        len: u32,
    ) -> Self {
        self.qualified_var(
            name,
            TypeRef::Array {
                elem: Box::new(TypeRef::Named(class.into())),
                len,
            },
            StorageQualifiers::COMPOSE,
            None,
        )
    }

    /// Adds a shared (stage) composition slot.
    pub fn stage_compose(self, name: impl Into<String>, class: impl Into<String>) -> Self {
        self.qualified_var(
            name,
            TypeRef::Named(class.into()),
            StorageQualifiers::COMPOSE | StorageQualifiers::STAGE,
            None,
        )
    }

    /// Adds a method.
    pub fn method(self, name: impl Into<String>, ret: TypeRef, body: Vec<Stmt>) -> Self {
        self.decl(Declaration {
            name: name.into(),
            span: Span::default(),
            qualifiers: StorageQualifiers::empty(),
            attributes: Vec::new(),
            kind: DeclKind::Method(MethodDef {
                params: Vec::new(),
                ret,
                body,
            }),
        })
    }

    /// Adds a method with parameters and qualifiers.
    pub fn full_method(
        self,
        name: impl Into<String>,
        qualifiers: StorageQualifiers,
        params: Vec<Param>,
        ret: TypeRef,
        body: Vec<Stmt>,
    ) -> Self {
        self.decl(Declaration {
            name: name.into(),
            span: Span::default(),
            qualifiers,
            attributes: Vec::new(),
            kind: DeclKind::Method(MethodDef { params, ret, body }),
        })
    }

    /// Adds a stage entry-point method.
    pub fn entry_method(
        self,
        name: impl Into<String>,
        stage: ShaderStage,
        ret: TypeRef,
        body: Vec<Stmt>,
    ) -> Self {
        self.decl(Declaration {
            name: name.into(),
            span: Span::default(),
            qualifiers: StorageQualifiers::empty(),
            attributes: vec![AttributeNode::new(
                "EntryPoint",
                vec![Literal::Str(stage.name().into())],
            )],
            kind: DeclKind::Method(MethodDef {
                params: Vec::new(),
                ret,
                body,
            }),
        })
    }

    /// Adds an explicit constant-buffer block.
    pub fn cbuffer(self, name: impl Into<String>, members: Vec<Declaration>) -> Self {
        let name = name.into();
        self.decl(Declaration {
            name: name.clone(),
            span: Span::default(),
            qualifiers: StorageQualifiers::empty(),
            attributes: vec![AttributeNode::new("Link", vec![Literal::Str(name)])],
            kind: DeclKind::ConstantBuffer { members },
        })
    }

    /// Adds a struct type.
    pub fn strukt(self, name: impl Into<String>, fields: Vec<StructField>) -> Self {
        self.decl(Declaration {
            name: name.into(),
            span: Span::default(),
            qualifiers: StorageQualifiers::empty(),
            attributes: Vec::new(),
            kind: DeclKind::Struct { fields },
        })
    }

    /// Finishes the class.
    pub fn build(self) -> ClassDecl {
        self.class
    }
}

/// Builds a constant-buffer member bound under the given name.
pub fn buffer_member(name: impl Into<String>, ty: TypeRef, bind: impl Into<String>) -> Declaration {
    Declaration {
        name: name.into(),
        span: Span::default(),
        qualifiers: StorageQualifiers::empty(),
        attributes: vec![AttributeNode::new("Link", vec![Literal::Str(bind.into())])],
        kind: DeclKind::Variable(VariableDef {
            ty,
            init: None,
            buffer: None,
        }),
    }
}
