//! Effect compilation driver

use crate::clean::clean;
use crate::compose::resolve;
use crate::context::CompilationContext;
use crate::diag::Diagnostics;
use crate::link::link;
use crate::loader::Loader;
use crate::mixer::{ShaderIr, mix};
use crate::parse::ClassParser;
use crate::reflection::{EffectReflection, EntryPoint};
use crate::simplify::simplify;
use crate::source::{ContentHash, ShaderMacro, ShaderSource};
use crate::stages::extract_entry_points;
use crate::store::SourceStore;
use crate::unify::unify_stage_compositions;
use crate::{Error, Result};
use mixsl_ast::Span;
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything one compile request produced
///
/// A failed compile (any error-severity diagnostic) carries no tree and
/// no reflection description, only the diagnostics and the source hashes
/// gathered before the failure.
#[derive(Debug)]
pub struct CompileResult {
    /// The cleaned, flattened tree; absent on failure
    pub shader: Option<ShaderIr>,
    /// The filled reflection description; absent on failure
    pub reflection: Option<EffectReflection>,
    /// Ordered diagnostics log
    pub diagnostics: Diagnostics,
    /// Per-class source hashes for caller-side incremental caching
    pub source_hashes: Vec<(String, ContentHash)>,
}

impl CompileResult {
    fn failed(diagnostics: Diagnostics, source_hashes: Vec<(String, ContentHash)>) -> Self {
        CompileResult {
            shader: None,
            reflection: None,
            diagnostics,
            source_hashes,
        }
    }

    /// Returns true if compilation produced outputs.
    pub fn succeeded(&self) -> bool {
        self.shader.is_some()
    }

    /// The extracted entry points, empty on failure.
    pub fn entry_points(&self) -> &[EntryPoint] {
        self.reflection
            .as_ref()
            .map(|r| r.entry_points.as_slice())
            .unwrap_or_default()
    }
}

/// The compiler: loads, analyzes, composes, mixes, links, and cleans
///
/// Independent `compile` calls may run concurrently from multiple
/// threads; the loader cache and the shared preprocessing step are the
/// only guarded regions, everything downstream works on request-local
/// state.
///
/// # Example
/// ```
/// use mixsl::{EffectCompiler, JsonParser, MemoryStore, ShaderSource};
/// use std::sync::Arc;
///
/// let store = MemoryStore::new().with_class("White", r#"{"name": "White"}"#);
/// let compiler = EffectCompiler::new(Arc::new(store), Arc::new(JsonParser::new()));
/// let result = compiler
///     .compile(&ShaderSource::class("White"), &[])
///     .unwrap();
/// assert!(result.succeeded());
/// ```
pub struct EffectCompiler {
    loader: Loader,
    preprocess_lock: Mutex<()>,
}

impl EffectCompiler {
    /// Creates a compiler over a source store and a parser.
    pub fn new(store: Arc<dyn SourceStore>, parser: Arc<dyn ClassParser>) -> Self {
        EffectCompiler {
            loader: Loader::new(store, parser),
            preprocess_lock: Mutex::new(()),
        }
    }

    /// Compiles a shader source tree under the given macro set.
    ///
    /// In-language failures are reported through the result's
    /// diagnostics; `Err` is reserved for malformed requests.
    pub fn compile(
        &self,
        source: &ShaderSource,
        macros: &[ShaderMacro],
    ) -> Result<CompileResult> {
        if matches!(source, ShaderSource::Array(_)) {
            return Err(Error::InvalidParameter(
                "an array source cannot be a compile root".to_string(),
            ));
        }

        let mut diagnostics = Diagnostics::new();
        let set = self.loader.load(source, macros, &mut diagnostics);
        let source_hashes = set.source_hashes();
        if diagnostics.has_errors() {
            return Ok(CompileResult::failed(diagnostics, source_hashes));
        }

        let ctx = CompilationContext::new(&set);
        {
            let _guard = self.preprocess_lock.lock();
            ctx.preprocess(&mut diagnostics);
        }
        for info in set.iter() {
            ctx.analyze(info, &mut diagnostics);
        }
        if diagnostics.has_errors() {
            return Ok(CompileResult::failed(diagnostics, source_hashes));
        }

        let mut resolution = resolve(&set, source, &mut diagnostics);
        unify_stage_compositions(&mut resolution.table, &resolution.arena, &mut diagnostics);
        if diagnostics.has_errors() {
            return Ok(CompileResult::failed(diagnostics, source_hashes));
        }
        let Some(&root) = resolution.roots.first() else {
            return Ok(CompileResult::failed(diagnostics, source_hashes));
        };

        let (mut ir, skeleton) = mix(root, &resolution.table, &resolution.arena, &mut diagnostics);
        if diagnostics.has_errors() {
            return Ok(CompileResult::failed(diagnostics, source_hashes));
        }

        simplify(&mut ir);
        let mut reflection = link(&ir, skeleton, &mut diagnostics);
        reflection.entry_points = extract_entry_points(&ir, &mut diagnostics);
        if diagnostics.has_errors() {
            return Ok(CompileResult::failed(diagnostics, source_hashes));
        }

        clean(&mut ir);
        log::debug!(
            "compiled {} with {} declarations",
            ir.name,
            ir.declarations.len()
        );
        Ok(CompileResult {
            shader: Some(ir),
            reflection: Some(reflection),
            diagnostics,
            source_hashes,
        })
    }

    /// Evicts cached classes affected by the given edits. See
    /// [`Loader::invalidate`].
    pub fn invalidate(&self, changed: &[&str]) -> usize {
        self.loader.invalidate(changed)
    }

    /// Names of currently cached classes, sorted.
    pub fn cached_classes(&self) -> Vec<String> {
        self.loader.cached_classes()
    }

    /// Navigation entry point: resolves the identifier at a position in
    /// the named class to its definition span.
    ///
    /// Reuses the loader cache and analysis reference tables; no mixing
    /// or linking runs.
    pub fn find_definition(&self, class_name: &str, line: u32, column: u32) -> Option<Span> {
        let mut diagnostics = Diagnostics::new();
        let set = self
            .loader
            .load(&ShaderSource::class(class_name), &[], &mut diagnostics);
        if diagnostics.has_errors() {
            return None;
        }

        let ctx = CompilationContext::new(&set);
        {
            let _guard = self.preprocess_lock.lock();
            ctx.preprocess(&mut diagnostics);
        }
        let info = set.get(class_name)?;
        ctx.analyze(info, &mut diagnostics);

        let analysis = info.analysis()?;
        for reference in &analysis.references {
            for span in &reference.spans {
                let len = reference.name.len() as u32;
                if span.line == line && column >= span.column && column < span.column + len {
                    return Some(reference.def_span.clone());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::JsonParser;
    use crate::store::MemoryStore;
    use mixsl_ast::{ClassBuilder, Expr, ShaderStage, Stmt, TypeRef};

    fn compiler_with(classes: &[(&str, &str)]) -> EffectCompiler {
        let store = MemoryStore::new();
        for (name, text) in classes {
            store.add(name, text);
        }
        EffectCompiler::new(Arc::new(store), Arc::new(JsonParser::new()))
    }

    #[test]
    fn test_array_root_is_rejected() {
        let compiler = compiler_with(&[]);
        let result = compiler.compile(&ShaderSource::Array(vec![]), &[]);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_failed_compile_has_no_outputs() {
        let compiler = compiler_with(&[]);
        let result = compiler
            .compile(&ShaderSource::class("Missing"), &[])
            .unwrap();
        assert!(!result.succeeded());
        assert!(result.shader.is_none());
        assert!(result.reflection.is_none());
        assert!(result.diagnostics.has_errors());
        assert!(result.entry_points().is_empty());
    }

    #[test]
    fn test_concurrent_compiles_share_the_cache() {
        let class = ClassBuilder::new("Shared")
            .bound_var("tint", TypeRef::floatn(4), "Shared.Tint")
            .entry_method(
                "psMain",
                ShaderStage::Pixel,
                TypeRef::floatn(4),
                vec![Stmt::ret(Expr::ident("tint"))],
            )
            .build();
        let compiler = compiler_with(&[(
            "Shared",
            &serde_json::to_string(&class).unwrap(),
        )]);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let result = compiler
                        .compile(&ShaderSource::class("Shared"), &[])
                        .unwrap();
                    assert!(result.succeeded());
                });
            }
        });
        assert_eq!(compiler.cached_classes(), vec!["Shared".to_string()]);
    }

    #[test]
    fn test_find_definition() {
        use mixsl_ast::Span;

        let class = ClassBuilder::new("Nav")
            .decl(mixsl_ast::Declaration {
                name: "tint".into(),
                span: Span::new("Nav", 2, 5),
                qualifiers: Default::default(),
                attributes: vec![],
                kind: mixsl_ast::DeclKind::Variable(mixsl_ast::VariableDef {
                    ty: TypeRef::floatn(4),
                    init: None,
                    buffer: None,
                }),
            })
            .method(
                "shade",
                TypeRef::floatn(4),
                vec![Stmt::ret(Expr::ident_at("tint", Span::new("Nav", 5, 16)))],
            )
            .build();
        let compiler = compiler_with(&[("Nav", &serde_json::to_string(&class).unwrap())]);

        let def = compiler.find_definition("Nav", 5, 17).unwrap();
        assert_eq!(def, Span::new("Nav", 2, 5));
        assert!(compiler.find_definition("Nav", 40, 1).is_none());
    }
}
