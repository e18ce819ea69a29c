//! Pipeline stages

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage a shader entry point targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Compute shader
    Compute,
    /// Vertex shader
    Vertex,
    /// Hull (tessellation control) shader
    Hull,
    /// Domain (tessellation evaluation) shader
    Domain,
    /// Geometry shader
    Geometry,
    /// Pixel (fragment) shader
    Pixel,
}

impl ShaderStage {
    /// Every stage, in the fixed order entry-point extraction scans them.
    /// Compute comes first: a compute mixin never declares the others.
    pub const ALL: [ShaderStage; 6] = [
        ShaderStage::Compute,
        ShaderStage::Vertex,
        ShaderStage::Hull,
        ShaderStage::Domain,
        ShaderStage::Geometry,
        ShaderStage::Pixel,
    ];

    /// Returns the stage prefix (cs, vs, hs, ds, gs, ps)
    pub fn prefix(&self) -> &'static str {
        match self {
            ShaderStage::Compute => "cs",
            ShaderStage::Vertex => "vs",
            ShaderStage::Hull => "hs",
            ShaderStage::Domain => "ds",
            ShaderStage::Geometry => "gs",
            ShaderStage::Pixel => "ps",
        }
    }

    /// Returns the stage name as it appears in entry-point markers
    pub fn name(&self) -> &'static str {
        match self {
            ShaderStage::Compute => "compute",
            ShaderStage::Vertex => "vertex",
            ShaderStage::Hull => "hull",
            ShaderStage::Domain => "domain",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Pixel => "pixel",
        }
    }

    /// Parses a stage from its marker name.
    pub fn from_name(name: &str) -> Option<ShaderStage> {
        ShaderStage::ALL.iter().copied().find(|s| s.name() == name)
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
