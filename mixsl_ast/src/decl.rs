//! Declarations and shader classes

use crate::attributes::{Attribute, AttributeNode};
use crate::expr::Expr;
use crate::qualifiers::StorageQualifiers;
use crate::span::Span;
use crate::stage::ShaderStage;
use crate::stmt::Stmt;
use crate::types::TypeRef;
use serde::{Deserialize, Serialize};

/// A method parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: TypeRef,
}

/// A method definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    /// Parameters in order
    #[serde(default)]
    pub params: Vec<Param>,
    /// Return type
    pub ret: TypeRef,
    /// Body statements
    #[serde(default)]
    pub body: Vec<Stmt>,
}

/// A struct field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: TypeRef,
}

/// A variable definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    /// Variable type
    pub ty: TypeRef,
    /// Optional initializer
    #[serde(default)]
    pub init: Option<Expr>,
    /// Owning constant buffer, when the variable was declared inside one.
    /// `None` places a bound non-opaque variable in the default buffer.
    #[serde(default)]
    pub buffer: Option<String>,
}

/// The declaration-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclKind {
    /// Variable, resource, or composition slot
    Variable(VariableDef),
    /// Method
    Method(MethodDef),
    /// Explicit constant-buffer block with its member declarations
    ConstantBuffer {
        /// Members in declaration order
        members: Vec<Declaration>,
    },
    /// Struct type
    Struct {
        /// Fields in declaration order
        fields: Vec<StructField>,
    },
}

/// One declaration in a shader class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// Declared name
    pub name: String,
    /// Location of the declaration
    #[serde(default)]
    pub span: Span,
    /// Storage qualifiers
    #[serde(default)]
    pub qualifiers: StorageQualifiers,
    /// Attributes, as produced by the parser
    #[serde(default)]
    pub attributes: Vec<AttributeNode>,
    /// What is being declared
    pub kind: DeclKind,
}

impl Declaration {
    /// The bind name from a `Link` attribute, if one is present and well
    /// formed.
    pub fn link_name(&self) -> Option<&str> {
        self.attributes.iter().find_map(|node| {
            match Attribute::classify(node) {
                Ok(Attribute::Link(_)) => {}
                _ => return None,
            }
            // classify clones; read the argument straight off the node
            match node.args.first() {
                Some(crate::expr::Literal::Str(name)) => Some(name.as_str()),
                _ => None,
            }
        })
    }

    /// The pipeline stage from an `EntryPoint` attribute, if any.
    pub fn entry_stage(&self) -> Option<ShaderStage> {
        self.attributes
            .iter()
            .find_map(|node| match Attribute::classify(node) {
                Ok(Attribute::EntryPoint(stage)) => Some(stage),
                _ => None,
            })
    }

    /// Returns true if the declaration carries a `Color` attribute.
    pub fn is_color(&self) -> bool {
        self.attributes
            .iter()
            .any(|node| matches!(Attribute::classify(node), Ok(Attribute::Color)))
    }

    /// Returns true if this declaration is a composition slot.
    pub fn is_compose_slot(&self) -> bool {
        self.qualifiers.is_compose() && matches!(self.kind, DeclKind::Variable(_))
    }

    /// The method definition, when this declares a method.
    pub fn as_method(&self) -> Option<&MethodDef> {
        match &self.kind {
            DeclKind::Method(def) => Some(def),
            _ => None,
        }
    }

    /// The variable definition, when this declares a variable.
    pub fn as_variable(&self) -> Option<&VariableDef> {
        match &self.kind {
            DeclKind::Variable(def) => Some(def),
            _ => None,
        }
    }
}

/// A parsed shader class: the unit the loader caches and the mixer merges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    /// Class name
    pub name: String,
    /// Base classes in declaration order, least derived first
    #[serde(default)]
    pub bases: Vec<String>,
    /// Declarations in source order
    #[serde(default)]
    pub declarations: Vec<Declaration>,
    /// Location of the class header
    #[serde(default)]
    pub span: Span,
}

impl ClassDecl {
    /// Finds a declaration by name.
    pub fn find(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Literal;

    fn linked_var(name: &str, bind: &str) -> Declaration {
        Declaration {
            name: name.into(),
            span: Span::default(),
            qualifiers: StorageQualifiers::empty(),
            attributes: vec![AttributeNode::new("Link", vec![Literal::Str(bind.into())])],
            kind: DeclKind::Variable(VariableDef {
                ty: TypeRef::float(),
                init: None,
                buffer: None,
            }),
        }
    }

    #[test]
    fn test_link_name() {
        let decl = linked_var("intensity", "Light.Intensity");
        assert_eq!(decl.link_name(), Some("Light.Intensity"));
    }

    #[test]
    fn test_compose_slot_detection() {
        let mut decl = linked_var("light", "x");
        assert!(!decl.is_compose_slot());
        decl.qualifiers = StorageQualifiers::COMPOSE;
        assert!(decl.is_compose_slot());
    }

    #[test]
    fn test_class_round_trips_through_json() {
        let class = ClassDecl {
            name: "Base".into(),
            bases: vec!["Root".into()],
            declarations: vec![linked_var("intensity", "Intensity")],
            span: Span::default(),
        };
        let text = serde_json::to_string(&class).unwrap();
        let back: ClassDecl = serde_json::from_str(&text).unwrap();
        assert_eq!(class, back);
    }
}
