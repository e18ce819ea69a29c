//! Effect reflection description
//!
//! The compiler's externally visible output: constant-buffer layouts,
//! resource bindings, sampler states, per-stage entry points, and stream
//! outputs, all indexed by bind name and independent of any particular
//! graphics API. The mixer builds the empty skeleton; the linker fills
//! it; it never changes once compilation succeeds.

use mixsl_ast::{ObjectType, ShaderStage};
use serde::Serialize;

/// Classification of a bound declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BindingClass {
    /// Single scalar value
    Scalar,
    /// Vector value
    Vector,
    /// Vector tagged as a color
    ColorVector,
    /// Matrix value
    Matrix,
    /// Struct value, classified field by field for its size
    Struct,
    /// Explicit constant buffer
    ConstantBuffer,
    /// Texture buffer
    TextureBuffer,
    /// Texture resource, with its concrete dimension
    Texture(ObjectType),
    /// Buffer resource, with its concrete variant
    Buffer(ObjectType),
    /// Sampler state
    Sampler,
    /// Comparison sampler state
    SamplerComparison,
}

/// One member of a constant buffer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberDesc {
    /// Declared variable name in the flattened tree
    pub name: String,
    /// Bind name from the declaration's link attribute
    pub bind_name: String,
    /// Member classification
    pub class: BindingClass,
    /// Byte offset inside the buffer
    pub offset: u32,
    /// Byte size of the member
    pub size: u32,
}

/// One constant buffer and its packed member list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstantBufferDesc {
    /// Buffer name
    pub name: String,
    /// Members in declaration order
    pub members: Vec<MemberDesc>,
    /// Total size in bytes, rounded up to a 16-byte boundary
    pub size: u32,
}

/// One top-level resource binding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceBindingDesc {
    /// Bind name
    pub bind_name: String,
    /// Resource classification
    pub class: BindingClass,
    /// Number of consecutive slots (array dimension, 1 otherwise)
    pub slot_count: u32,
}

/// Texture filtering mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Filter {
    /// Nearest-neighbour filtering
    Point,
    /// Linear filtering (default)
    #[default]
    Linear,
    /// Anisotropic filtering
    Anisotropic,
}

/// Comparison function for comparison samplers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ComparisonFunc {
    /// Never passes (default)
    #[default]
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    /// Always passes
    Always,
}

/// Texture addressing mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AddressMode {
    /// Repeat the texture (default)
    #[default]
    Wrap,
    /// Mirror on each repeat
    Mirror,
    /// Clamp to the edge texel
    Clamp,
    /// Use the border color outside [0, 1]
    Border,
}

/// Parsed sampler-state description
///
/// Defaults: linear filter, comparison never, wrap addressing on all
/// axes, transparent black border, LOD range [0, f32::MAX], anisotropy 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplerStateDesc {
    /// Bind name of the sampler
    pub bind_name: String,
    /// Filtering mode
    pub filter: Filter,
    /// Comparison function
    pub comparison: ComparisonFunc,
    /// Addressing on U
    pub address_u: AddressMode,
    /// Addressing on V
    pub address_v: AddressMode,
    /// Addressing on W
    pub address_w: AddressMode,
    /// Border color used by [`AddressMode::Border`]
    pub border_color: [f32; 4],
    /// Smallest mip level
    pub min_lod: f32,
    /// Largest mip level
    pub max_lod: f32,
    /// Anisotropy clamp for [`Filter::Anisotropic`]
    pub max_anisotropy: u32,
}

impl SamplerStateDesc {
    /// A description with every field at its documented default.
    pub fn with_defaults(bind_name: impl Into<String>) -> Self {
        SamplerStateDesc {
            bind_name: bind_name.into(),
            filter: Filter::default(),
            comparison: ComparisonFunc::default(),
            address_u: AddressMode::default(),
            address_v: AddressMode::default(),
            address_w: AddressMode::default(),
            border_color: [0.0; 4],
            min_lod: 0.0,
            max_lod: f32::MAX,
            max_anisotropy: 1,
        }
    }
}

/// One stream-output declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamOutputDesc {
    /// Stream variable name
    pub name: String,
    /// Type, printed in source form
    pub ty: String,
}

/// One extracted entry point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryPoint {
    /// Pipeline stage
    pub stage: ShaderStage,
    /// Generated method name in the flattened tree
    pub name: String,
}

/// The complete reflection description of a compiled effect
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EffectReflection {
    /// Constant buffers, in order of first appearance
    pub constant_buffers: Vec<ConstantBufferDesc>,
    /// Top-level resource bindings, in declaration order
    pub resources: Vec<ResourceBindingDesc>,
    /// Parsed sampler states
    pub samplers: Vec<SamplerStateDesc>,
    /// Entry points per pipeline stage
    pub entry_points: Vec<EntryPoint>,
    /// Stream-output declarations
    pub stream_outputs: Vec<StreamOutputDesc>,
}

impl EffectReflection {
    /// Looks up a constant buffer by name.
    pub fn constant_buffer(&self, name: &str) -> Option<&ConstantBufferDesc> {
        self.constant_buffers.iter().find(|cb| cb.name == name)
    }

    /// Looks up a resource binding by bind name.
    pub fn resource(&self, bind_name: &str) -> Option<&ResourceBindingDesc> {
        self.resources.iter().find(|r| r.bind_name == bind_name)
    }

    /// The entry-point name for a stage, if one was extracted.
    pub fn entry_point(&self, stage: ShaderStage) -> Option<&str> {
        self.entry_points
            .iter()
            .find(|e| e.stage == stage)
            .map(|e| e.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_defaults() {
        let desc = SamplerStateDesc::with_defaults("LinearSampler");
        assert_eq!(desc.filter, Filter::Linear);
        assert_eq!(desc.comparison, ComparisonFunc::Never);
        assert_eq!(desc.address_u, AddressMode::Wrap);
        assert_eq!(desc.max_anisotropy, 1);
        assert_eq!(desc.max_lod, f32::MAX);
    }

    #[test]
    fn test_entry_point_lookup() {
        let mut reflection = EffectReflection::default();
        reflection.entry_points.push(EntryPoint {
            stage: ShaderStage::Pixel,
            name: "psMain".into(),
        });
        assert_eq!(reflection.entry_point(ShaderStage::Pixel), Some("psMain"));
        assert_eq!(reflection.entry_point(ShaderStage::Vertex), None);
    }
}
