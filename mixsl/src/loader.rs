//! Class loading and caching
//!
//! The loader turns each class referenced by a compile request into a
//! parsed [`MixinInfo`], recursively pulling in base classes and the
//! classes referenced by composition slots. Infos are cached by
//! (class name, macro-set hash) and revalidated against the store's
//! content hash on every reuse, so an edited source is reparsed on the
//! next request without an explicit flush.

use crate::context::Analysis;
use crate::diag::{Code, Diagnostics};
use crate::parse::ClassParser;
use crate::source::{ContentHash, ShaderMacro, ShaderSource};
use crate::store::SourceStore;
use mixsl_ast::{ClassDecl, Span};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock};

/// The parsed, cacheable form of one (class, macro-set) pair
#[derive(Debug)]
pub struct MixinInfo {
    /// Class name
    pub class_name: String,
    /// Hash of the macro set the class was parsed under
    pub macro_hash: ContentHash,
    /// Hash of the source text the parse came from
    pub source_hash: ContentHash,
    /// The parsed declaration tree
    pub class: ClassDecl,
    /// Transitive closure of base classes needed to analyze this class.
    /// Invalidation of any name in here evicts this info.
    pub minimal_context: Vec<String>,
    /// Most-derived definition per method name, filled by preprocessing
    pub(crate) method_table: OnceLock<FxHashMap<String, String>>,
    /// Name-resolution output, filled by analysis
    pub(crate) analysis: OnceLock<Analysis>,
}

impl MixinInfo {
    /// The analysis output, if this info has been analyzed.
    pub(crate) fn analysis(&self) -> Option<&Analysis> {
        self.analysis.get()
    }
}

/// The closed set of mixins one compile request needs
#[derive(Default)]
pub struct LoadSet {
    mixins: Vec<Arc<MixinInfo>>,
    by_name: FxHashMap<String, Arc<MixinInfo>>,
}

impl LoadSet {
    /// Looks a mixin up by class name.
    pub fn get(&self, name: &str) -> Option<&Arc<MixinInfo>> {
        self.by_name.get(name)
    }

    /// All mixins, in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<MixinInfo>> {
        self.mixins.iter()
    }

    /// Number of loaded mixins.
    pub fn len(&self) -> usize {
        self.mixins.len()
    }

    /// Returns true if nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.mixins.is_empty()
    }

    /// (class name, source hash) pairs for caller-side caching.
    pub fn source_hashes(&self) -> Vec<(String, ContentHash)> {
        self.mixins
            .iter()
            .map(|m| (m.class_name.clone(), m.source_hash))
            .collect()
    }

    /// The linearized inheritance chain of a class, least derived first,
    /// the class itself last. Shared bases appear once, at their first
    /// (deepest) position.
    pub fn chain(&self, name: &str) -> Vec<Arc<MixinInfo>> {
        let mut out = Vec::new();
        let mut seen = Vec::new();
        self.chain_into(name, &mut out, &mut seen);
        out
    }

    fn chain_into(&self, name: &str, out: &mut Vec<Arc<MixinInfo>>, seen: &mut Vec<String>) {
        if seen.iter().any(|s| s == name) {
            return;
        }
        let Some(info) = self.by_name.get(name) else {
            return;
        };
        seen.push(name.to_string());
        for base in &info.class.bases {
            self.chain_into(base, out, seen);
        }
        out.push(info.clone());
    }

    /// Returns true if `ancestor` appears in the inheritance closure of
    /// `class`.
    pub fn is_ancestor(&self, ancestor: &str, class: &str) -> bool {
        self.by_name
            .get(class)
            .is_some_and(|info| info.minimal_context.iter().any(|c| c == ancestor))
    }

    fn insert(&mut self, info: Arc<MixinInfo>) {
        self.by_name.insert(info.class_name.clone(), info.clone());
        self.mixins.push(info);
    }
}

type CacheKey = (String, ContentHash);

/// Loads and caches parsed shader classes
pub struct Loader {
    store: Arc<dyn SourceStore>,
    parser: Arc<dyn ClassParser>,
    cache: RwLock<FxHashMap<CacheKey, Arc<MixinInfo>>>,
}

impl Loader {
    /// Creates a loader over a store and a parser.
    pub fn new(store: Arc<dyn SourceStore>, parser: Arc<dyn ClassParser>) -> Self {
        Loader {
            store,
            parser,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Loads every class the given source transitively needs.
    ///
    /// Problems are reported into `diags`; a fatal entry means the
    /// returned set is incomplete and the compile must stop.
    pub fn load(
        &self,
        root: &ShaderSource,
        macros: &[ShaderMacro],
        diags: &mut Diagnostics,
    ) -> LoadSet {
        let mut set = LoadSet::default();
        self.load_source(root, macros, &mut set, diags);
        set
    }

    fn load_source(
        &self,
        source: &ShaderSource,
        macros: &[ShaderMacro],
        set: &mut LoadSet,
        diags: &mut Diagnostics,
    ) {
        match source {
            ShaderSource::Class(class) => {
                let macros = merge_macros(macros, &class.macros);
                let mut visiting = Vec::new();
                self.load_class(&class.class_name, &macros, &mut visiting, set, diags);
            }
            ShaderSource::Mixin { root, compositions } => {
                let root_macros = merge_macros(macros, &root.macros);
                let mut visiting = Vec::new();
                self.load_class(&root.class_name, &root_macros, &mut visiting, set, diags);
                for (_slot, nested) in compositions {
                    self.load_source(nested, macros, set, diags);
                }
            }
            ShaderSource::Array(items) => {
                for item in items {
                    self.load_source(item, macros, set, diags);
                }
            }
        }
    }

    fn load_class(
        &self,
        name: &str,
        macros: &[ShaderMacro],
        visiting: &mut Vec<String>,
        set: &mut LoadSet,
        diags: &mut Diagnostics,
    ) -> Option<Arc<MixinInfo>> {
        if let Some(info) = set.get(name) {
            return Some(info.clone());
        }
        if visiting.iter().any(|v| v == name) {
            diags.report(
                Code::CyclicInheritance,
                Span::default(),
                format!("class {name} transitively inherits itself"),
            );
            return None;
        }

        let source = match self.store.load(name) {
            Ok(source) => source,
            Err(err) => {
                diags.report(
                    Code::ClassNotFound,
                    Span::default(),
                    format!("cannot load class {name}: {err}"),
                );
                return None;
            }
        };

        let macro_hash = ContentHash::of_macros(macros);
        let key = (name.to_string(), macro_hash);
        let cached = {
            let cache = self.cache.read();
            cache
                .get(&key)
                .filter(|info| info.source_hash == source.hash)
                .cloned()
        };

        if let Some(info) = cached {
            log::debug!("loader: cache hit for {name}");
            set.insert(info.clone());
            self.load_dependencies(&info, macros, visiting, set, diags);
            return Some(info);
        }

        log::debug!("loader: parsing {name}");
        let class = match self.parser.parse(name, &source.text, macros) {
            Ok(class) => class,
            Err(err) => {
                diags.report(Code::ParseFailed, Span::default(), err.to_string());
                return None;
            }
        };

        // Bases first: the minimal context folds in theirs.
        visiting.push(name.to_string());
        let mut minimal_context = Vec::new();
        let mut chain_ok = true;
        for base in &class.bases {
            match self.load_class(base, macros, visiting, set, diags) {
                Some(base_info) => {
                    if !minimal_context.contains(base) {
                        minimal_context.push(base.clone());
                    }
                    for dep in &base_info.minimal_context {
                        if !minimal_context.contains(dep) {
                            minimal_context.push(dep.clone());
                        }
                    }
                }
                None => chain_ok = false,
            }
        }
        visiting.pop();

        let info = Arc::new(MixinInfo {
            class_name: name.to_string(),
            macro_hash,
            source_hash: source.hash,
            class,
            minimal_context,
            method_table: OnceLock::new(),
            analysis: OnceLock::new(),
        });

        if chain_ok {
            self.cache.write().insert(key, info.clone());
        }
        set.insert(info.clone());
        self.load_dependencies(&info, macros, visiting, set, diags);
        // A broken chain propagates: nothing that inherits it gets cached,
        // so the next request re-detects the problem instead of silently
        // reusing a half-loaded class.
        chain_ok.then_some(info)
    }

    /// Loads the bases and slot-referenced classes of an info already in
    /// the set. Needed on cache hits, where the recursion that built the
    /// info originally did not run for this request.
    fn load_dependencies(
        &self,
        info: &Arc<MixinInfo>,
        macros: &[ShaderMacro],
        visiting: &mut Vec<String>,
        set: &mut LoadSet,
        diags: &mut Diagnostics,
    ) {
        visiting.push(info.class_name.clone());
        for base in &info.class.bases {
            self.load_class(base, macros, visiting, set, diags);
        }
        visiting.pop();

        for decl in &info.class.declarations {
            if !decl.is_compose_slot() {
                continue;
            }
            let Some(class) = decl.as_variable().and_then(|v| v.ty.named_class()) else {
                continue;
            };
            self.load_class(class, macros, visiting, set, diags);
        }
    }

    /// Evicts every cached info whose class name is in `changed`, or whose
    /// minimal context transitively includes one. Returns the eviction
    /// count; untouched entries are left byte-for-byte as they were.
    pub fn invalidate(&self, changed: &[&str]) -> usize {
        let mut cache = self.cache.write();
        let before = cache.len();
        cache.retain(|(name, _), info| {
            let affected = changed.iter().any(|c| c == name)
                || info
                    .minimal_context
                    .iter()
                    .any(|dep| changed.iter().any(|c| c == dep));
            !affected
        });
        let evicted = before - cache.len();
        if evicted > 0 {
            log::debug!("loader: evicted {evicted} cached classes");
        }
        evicted
    }

    /// Names of currently cached classes, sorted.
    pub fn cached_classes(&self) -> Vec<String> {
        let cache = self.cache.read();
        let mut names: Vec<String> = cache.keys().map(|(name, _)| name.clone()).collect();
        names.sort();
        names
    }
}

fn merge_macros(request: &[ShaderMacro], class: &[ShaderMacro]) -> Vec<ShaderMacro> {
    let mut merged = request.to_vec();
    merged.extend(class.iter().cloned());
    merged
}
