//! Type references

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    /// Boolean
    Bool,
    /// 32-bit signed integer
    Int,
    /// 32-bit unsigned integer
    Uint,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
}

impl ScalarKind {
    /// Byte size of one element under constant-buffer packing.
    pub fn byte_size(&self) -> u32 {
        match self {
            ScalarKind::Double => 8,
            _ => 4,
        }
    }
}

/// Opaque resource types that bind to top-level resource slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    /// Texture1D
    Texture1D,
    /// Texture1D array
    Texture1DArray,
    /// Texture2D
    Texture2D,
    /// Texture2D array
    Texture2DArray,
    /// Texture2D multisample
    Texture2DMs,
    /// Texture2D multisample array
    Texture2DMsArray,
    /// Texture3D
    Texture3D,
    /// TextureCube
    TextureCube,
    /// TextureCube array
    TextureCubeArray,
    /// Typed buffer
    Buffer,
    /// Read-write typed buffer
    RwBuffer,
    /// Structured buffer
    StructuredBuffer,
    /// Read-write structured buffer
    RwStructuredBuffer,
    /// Append structured buffer
    AppendStructuredBuffer,
    /// Consume structured buffer
    ConsumeStructuredBuffer,
    /// Byte address buffer
    ByteAddressBuffer,
    /// Read-write byte address buffer
    RwByteAddressBuffer,
    /// Texture buffer (tbuffer)
    TextureBuffer,
    /// Sampler state
    SamplerState,
    /// Comparison sampler state
    SamplerComparisonState,
}

impl ObjectType {
    /// Returns true for every texture variant.
    pub fn is_texture(&self) -> bool {
        matches!(
            self,
            ObjectType::Texture1D
                | ObjectType::Texture1DArray
                | ObjectType::Texture2D
                | ObjectType::Texture2DArray
                | ObjectType::Texture2DMs
                | ObjectType::Texture2DMsArray
                | ObjectType::Texture3D
                | ObjectType::TextureCube
                | ObjectType::TextureCubeArray
        )
    }

    /// Returns true for every buffer variant.
    pub fn is_buffer(&self) -> bool {
        matches!(
            self,
            ObjectType::Buffer
                | ObjectType::RwBuffer
                | ObjectType::StructuredBuffer
                | ObjectType::RwStructuredBuffer
                | ObjectType::AppendStructuredBuffer
                | ObjectType::ConsumeStructuredBuffer
                | ObjectType::ByteAddressBuffer
                | ObjectType::RwByteAddressBuffer
        )
    }

    /// Returns true for sampler variants.
    pub fn is_sampler(&self) -> bool {
        matches!(
            self,
            ObjectType::SamplerState | ObjectType::SamplerComparisonState
        )
    }
}

/// A reference to a type, as attached to declarations by the parser
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// No type (method with no return value)
    Void,
    /// Scalar type
    Scalar(ScalarKind),
    /// Vector type with 2-4 components
    Vector {
        /// Element type
        elem: ScalarKind,
        /// Component count
        dim: u32,
    },
    /// Matrix type
    Matrix {
        /// Element type
        elem: ScalarKind,
        /// Row count
        rows: u32,
        /// Column count
        cols: u32,
    },
    /// Named type: a struct declared in some class, or a shader class
    /// (the latter only on composition slots)
    Named(String),
    /// Fixed-size array
    Array {
        /// Element type
        elem: Box<TypeRef>,
        /// Element count
        len: u32,
    },
    /// Opaque resource type
    Object(ObjectType),
}

impl TypeRef {
    /// Shorthand for a float scalar.
    pub fn float() -> TypeRef {
        TypeRef::Scalar(ScalarKind::Float)
    }

    /// Shorthand for a float vector of the given dimension.
    pub fn floatn(dim: u32) -> TypeRef {
        TypeRef::Vector {
            elem: ScalarKind::Float,
            dim,
        }
    }

    /// Shorthand for a square float matrix.
    pub fn float_mat(rows: u32, cols: u32) -> TypeRef {
        TypeRef::Matrix {
            elem: ScalarKind::Float,
            rows,
            cols,
        }
    }

    /// The class name this type refers to, unwrapping arrays.
    ///
    /// Composition slots use a named (or array-of-named) type to pick the
    /// class filling the slot.
    pub fn named_class(&self) -> Option<&str> {
        match self {
            TypeRef::Named(name) => Some(name),
            TypeRef::Array { elem, .. } => elem.named_class(),
            _ => None,
        }
    }

    /// Array element count, 1 for non-arrays.
    pub fn array_len(&self) -> u32 {
        match self {
            TypeRef::Array { len, .. } => *len,
            _ => 1,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Scalar(k) => write!(f, "{k:?}"),
            TypeRef::Vector { elem, dim } => write!(f, "{elem:?}{dim}"),
            TypeRef::Matrix { elem, rows, cols } => write!(f, "{elem:?}{rows}x{cols}"),
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::Array { elem, len } => write!(f, "{elem}[{len}]"),
            TypeRef::Object(o) => write!(f, "{o:?}"),
        }
    }
}
