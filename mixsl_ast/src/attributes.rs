//! Declaration attributes
//!
//! The parser attaches attributes as raw name/argument nodes. The compiler
//! classifies each node once, during preprocessing, into the closed
//! [`Attribute`] set; anything outside the reserved names stays a
//! [`Attribute::Custom`] and passes through to the emitted tree.

use crate::expr::Literal;
use crate::span::Span;
use crate::stage::ShaderStage;
use serde::{Deserialize, Serialize};

/// Attribute names reserved by the compiler. These never reach the emitted
/// tree; the cleaner strips them.
pub const RESERVED_ATTRIBUTES: [&str; 4] = ["Link", "Color", "EntryPoint", "StreamOutput"];

/// A raw attribute as produced by the parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeNode {
    /// Attribute name
    pub name: String,
    /// Literal arguments in source order
    #[serde(default)]
    pub args: Vec<Literal>,
    /// Location of the attribute
    #[serde(default)]
    pub span: Span,
}

impl AttributeNode {
    /// Creates an attribute node with no location.
    pub fn new(name: impl Into<String>, args: Vec<Literal>) -> Self {
        AttributeNode {
            name: name.into(),
            args,
            span: Span::default(),
        }
    }
}

/// A classified attribute
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// Binds the declaration to a named resource slot or buffer member
    Link(String),
    /// Marks a vector as a color value
    Color,
    /// Marks a method as the entry point of a pipeline stage
    EntryPoint(ShaderStage),
    /// Declares the stream variables emitted to the output stream
    StreamOutput(Vec<String>),
    /// Any attribute the compiler does not interpret; passed through
    Custom {
        /// Attribute name
        name: String,
        /// Literal arguments
        args: Vec<Literal>,
    },
}

/// Why an attribute node failed classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// A reserved attribute carried the wrong number or kind of arguments
    BadArguments {
        /// The reserved attribute name
        name: String,
        /// What the attribute expects
        expected: &'static str,
    },
}

impl Attribute {
    /// Classifies a raw attribute node.
    ///
    /// Reserved names are validated strictly; a wrong argument count or
    /// kind is an error the compiler reports as fatal. Unreserved names
    /// always classify to [`Attribute::Custom`].
    pub fn classify(node: &AttributeNode) -> Result<Attribute, AttributeError> {
        match node.name.as_str() {
            "Link" => match node.args.as_slice() {
                [Literal::Str(name)] => Ok(Attribute::Link(name.clone())),
                _ => Err(AttributeError::BadArguments {
                    name: node.name.clone(),
                    expected: "one string argument",
                }),
            },
            "Color" => {
                if node.args.is_empty() {
                    Ok(Attribute::Color)
                } else {
                    Err(AttributeError::BadArguments {
                        name: node.name.clone(),
                        expected: "no arguments",
                    })
                }
            }
            "EntryPoint" => match node.args.as_slice() {
                [Literal::Str(stage)] => match ShaderStage::from_name(stage) {
                    Some(stage) => Ok(Attribute::EntryPoint(stage)),
                    None => Err(AttributeError::BadArguments {
                        name: node.name.clone(),
                        expected: "a pipeline stage name",
                    }),
                },
                _ => Err(AttributeError::BadArguments {
                    name: node.name.clone(),
                    expected: "one string argument",
                }),
            },
            "StreamOutput" => {
                let mut names = Vec::with_capacity(node.args.len());
                for arg in &node.args {
                    match arg {
                        Literal::Str(name) => names.push(name.clone()),
                        _ => {
                            return Err(AttributeError::BadArguments {
                                name: node.name.clone(),
                                expected: "string arguments",
                            });
                        }
                    }
                }
                Ok(Attribute::StreamOutput(names))
            }
            _ => Ok(Attribute::Custom {
                name: node.name.clone(),
                args: node.args.clone(),
            }),
        }
    }

    /// Returns true if the name belongs to the compiler's reserved set.
    pub fn is_reserved(name: &str) -> bool {
        RESERVED_ATTRIBUTES.contains(&name)
    }
}
