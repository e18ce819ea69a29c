//! Compile-request sources, macros, and content hashes

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// A preprocessor macro definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderMacro {
    /// Macro name
    pub name: String,
    /// Definition text substituted for the name
    pub definition: String,
}

impl ShaderMacro {
    /// Creates a new macro definition.
    pub fn new(name: &str, definition: &str) -> Self {
        ShaderMacro {
            name: name.to_string(),
            definition: definition.to_string(),
        }
    }

    /// Creates a macro with an empty definition.
    pub fn flag(name: &str) -> Self {
        Self::new(name, "")
    }
}

/// SHA-1 digest identifying source text or a macro set
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 20]);

impl ContentHash {
    /// Hashes a piece of source text.
    pub fn of_text(text: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(text.as_bytes());
        ContentHash(hasher.finalize().into())
    }

    /// Hashes an ordered macro set. Order is significant: the same pairs
    /// in a different order are a different compilation environment.
    pub fn of_macros(macros: &[ShaderMacro]) -> Self {
        let mut hasher = Sha1::new();
        for m in macros {
            hasher.update(m.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(m.definition.as_bytes());
            hasher.update([0u8]);
        }
        ContentHash(hasher.finalize().into())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A class reference inside a compile request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSource {
    /// Name of the shader class
    pub class_name: String,
    /// Macro set the class is compiled under
    #[serde(default)]
    pub macros: Vec<ShaderMacro>,
}

impl ClassSource {
    /// References a class with no extra macros.
    pub fn new(class_name: impl Into<String>) -> Self {
        ClassSource {
            class_name: class_name.into(),
            macros: Vec::new(),
        }
    }
}

/// The root description of what to compile
///
/// Immutable once constructed. `Class` names a single shader class;
/// `Mixin` names a root class and fills its composition slots; `Array`
/// is an ordered sequence, used when a slot accepts multiple
/// implementations (order decides which element a numeric index selects).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShaderSource {
    /// A single class reference
    Class(ClassSource),
    /// A root class with slot-name to source composition fills
    Mixin {
        /// The root class
        root: ClassSource,
        /// Slot fills, in source order
        compositions: Vec<(String, ShaderSource)>,
    },
    /// An ordered sequence of sources filling one array slot
    Array(Vec<ShaderSource>),
}

impl ShaderSource {
    /// References a class with no compositions.
    pub fn class(name: impl Into<String>) -> Self {
        ShaderSource::Class(ClassSource::new(name))
    }

    /// Builds a mixin root over the named class.
    pub fn mixin(
        root: impl Into<String>,
        compositions: Vec<(String, ShaderSource)>,
    ) -> Self {
        ShaderSource::Mixin {
            root: ClassSource::new(root),
            compositions,
        }
    }
}
