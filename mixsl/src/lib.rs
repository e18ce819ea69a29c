//! Compiler for the MixSL composable, class-based shading language
//!
//! Shader classes can inherit from other classes, declare named
//! composition slots filled in at compile time with concrete
//! implementations, and share stage-qualified slots across every
//! reference within one compile. The compiler loads and caches parsed
//! classes, analyzes them, resolves the composition graph, flattens
//! everything into one declaration tree, links bind names into a
//! reflection description, and strips its internal metadata from the
//! emitted tree.
//!
//! # Example
//!
//! ```
//! use mixsl::{EffectCompiler, JsonParser, MemoryStore, ShaderSource};
//! use std::sync::Arc;
//!
//! let store = MemoryStore::new().with_class(
//!     "SolidColor",
//!     r#"{
//!         "name": "SolidColor",
//!         "declarations": [{
//!             "name": "psMain",
//!             "attributes": [{"name": "EntryPoint", "args": [{"Str": "pixel"}]}],
//!             "kind": {"Method": {"ret": {"Vector": {"elem": "Float", "dim": 4}}}}
//!         }]
//!     }"#,
//! );
//!
//! let compiler = EffectCompiler::new(Arc::new(store), Arc::new(JsonParser::new()));
//! let result = compiler
//!     .compile(&ShaderSource::class("SolidColor"), &[])
//!     .unwrap();
//! assert!(result.succeeded());
//! ```

mod clean;
mod compile;
mod compose;
mod context;
mod diag;
mod error;
mod link;
mod loader;
mod mixer;
mod parse;
mod reflection;
mod simplify;
mod source;
mod stages;
mod store;
mod unify;
mod visit;

pub use clean::clean;
pub use compile::{CompileResult, EffectCompiler};
pub use compose::{
    CompositionEntry, CompositionTable, MixinArena, MixinHandle, ResolvedMixin, Resolution, resolve,
};
pub use context::{Analysis, CompilationContext, Reference};
pub use diag::{Code, Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use link::{DEFAULT_BUFFER, link};
pub use loader::{LoadSet, Loader, MixinInfo};
pub use mixer::{ShaderIr, mix};
pub use parse::{ClassParser, JsonParser};
pub use reflection::{
    AddressMode, BindingClass, ComparisonFunc, ConstantBufferDesc, EffectReflection, EntryPoint,
    Filter, MemberDesc, ResourceBindingDesc, SamplerStateDesc, StreamOutputDesc,
};
pub use simplify::simplify;
pub use source::{ClassSource, ContentHash, ShaderMacro, ShaderSource};
pub use stages::extract_entry_points;
pub use store::{CLASS_EXTENSION, FileSystemStore, MemoryStore, SourceStore, SourceText};
pub use unify::unify_stage_compositions;
