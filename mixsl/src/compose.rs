//! Composition resolution
//!
//! Walks a root [`ShaderSource`] and builds the table mapping each
//! composition-slot declaration to the concrete mixin instances filling
//! it. Every instantiation site gets its own deep copy of the class
//! chain, held in a request-local [`MixinArena`]; the table stores arena
//! handles, so two slots share an instance exactly when they hold the
//! same handle — a state only the stage unifier may create.

use crate::diag::{Code, Diagnostics};
use crate::loader::{LoadSet, MixinInfo};
use crate::source::ShaderSource;
use mixsl_ast::{ClassDecl, Span};
use std::sync::Arc;

/// Index of a [`ResolvedMixin`] in its request's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MixinHandle(pub usize);

/// One independently owned instantiation of a class for one composition
/// site. The chain holds deep copies; mutating one instance never touches
/// another.
#[derive(Debug)]
pub struct ResolvedMixin {
    /// The instantiated class
    pub class_name: String,
    /// Deep copies of the inheritance chain, least derived first, the
    /// class itself last
    pub chain: Vec<ClassDecl>,
    /// The cache-shared info the copy came from
    pub info: Arc<MixinInfo>,
}

/// Arena of resolved mixins for one compile request
#[derive(Debug, Default)]
pub struct MixinArena {
    mixins: Vec<ResolvedMixin>,
}

impl MixinArena {
    fn alloc(&mut self, mixin: ResolvedMixin) -> MixinHandle {
        self.mixins.push(mixin);
        MixinHandle(self.mixins.len() - 1)
    }

    /// The mixin behind a handle.
    pub fn get(&self, handle: MixinHandle) -> &ResolvedMixin {
        &self.mixins[handle.0]
    }

    /// Mutable access to the mixin behind a handle.
    pub fn get_mut(&mut self, handle: MixinHandle) -> &mut ResolvedMixin {
        &mut self.mixins[handle.0]
    }

    /// Every allocated handle, in allocation order.
    pub fn handles(&self) -> impl Iterator<Item = MixinHandle> {
        (0..self.mixins.len()).map(MixinHandle)
    }

    /// Number of instantiated mixins.
    pub fn len(&self) -> usize {
        self.mixins.len()
    }

    /// Returns true if nothing was instantiated.
    pub fn is_empty(&self) -> bool {
        self.mixins.is_empty()
    }
}

/// One slot binding: which instances fill a compose declaration
#[derive(Debug, Clone)]
pub struct CompositionEntry {
    /// Instance owning the slot declaration
    pub owner: MixinHandle,
    /// Slot name
    pub slot: String,
    /// Class in the owner's chain that declares the slot
    pub declaring_class: String,
    /// Whether the declaration is stage-qualified (shared)
    pub stage: bool,
    /// Location of the slot declaration
    pub span: Span,
    /// Instances filling the slot, in source order
    pub mixins: Vec<MixinHandle>,
}

/// Mapping from composition-slot declarations to their resolved mixins
#[derive(Debug, Default)]
pub struct CompositionTable {
    entries: Vec<CompositionEntry>,
}

impl CompositionTable {
    /// Looks up the binding of a slot on an instance.
    pub fn get(&self, owner: MixinHandle, slot: &str) -> Option<&CompositionEntry> {
        self.entries
            .iter()
            .find(|e| e.owner == owner && e.slot == slot)
    }

    pub(crate) fn get_mut(
        &mut self,
        owner: MixinHandle,
        slot: &str,
    ) -> Option<&mut CompositionEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.owner == owner && e.slot == slot)
    }

    pub(crate) fn insert(&mut self, entry: CompositionEntry) {
        self.entries.push(entry);
    }

    /// All entries, in insertion order.
    pub fn entries(&self) -> &[CompositionEntry] {
        &self.entries
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no slot was bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Output of composition resolution
#[derive(Debug)]
pub struct Resolution {
    /// Root instances, one per top-level source (always one for `Class`
    /// and `Mixin` roots)
    pub roots: Vec<MixinHandle>,
    /// All instantiated mixins
    pub arena: MixinArena,
    /// Slot bindings
    pub table: CompositionTable,
}

/// Resolves a root source against a loaded mixin set.
pub fn resolve(set: &LoadSet, source: &ShaderSource, diags: &mut Diagnostics) -> Resolution {
    let mut resolver = Resolver {
        set,
        arena: MixinArena::default(),
        table: CompositionTable::default(),
    };
    let roots = resolver.resolve_source(source, diags);
    Resolution {
        roots,
        arena: resolver.arena,
        table: resolver.table,
    }
}

struct Resolver<'a> {
    set: &'a LoadSet,
    arena: MixinArena,
    table: CompositionTable,
}

/// A slot declaration found in a chain, reduced to owned data so the
/// arena borrow can be released before recursing.
struct SlotMatch {
    declaring_class: String,
    stage: bool,
    span: Span,
}

impl Resolver<'_> {
    fn resolve_source(&mut self, source: &ShaderSource, diags: &mut Diagnostics) -> Vec<MixinHandle> {
        match source {
            ShaderSource::Class(class) => self
                .instantiate(&class.class_name, diags)
                .into_iter()
                .collect(),
            ShaderSource::Array(items) => {
                // order is significant: it decides which element a numeric
                // index selects downstream
                let mut handles = Vec::new();
                for item in items {
                    handles.extend(self.resolve_source(item, diags));
                }
                handles
            }
            ShaderSource::Mixin { root, compositions } => {
                let Some(handle) = self.instantiate(&root.class_name, diags) else {
                    return Vec::new();
                };
                for (slot, nested) in compositions {
                    self.fill_slot(handle, slot, nested, diags);
                }
                vec![handle]
            }
        }
    }

    fn fill_slot(
        &mut self,
        owner: MixinHandle,
        slot: &str,
        nested: &ShaderSource,
        diags: &mut Diagnostics,
    ) {
        let matches = self.find_slot_matches(owner, slot);
        match matches.len() {
            0 => {
                log::debug!("composition {slot} matches no slot declaration");
                diags.report(
                    Code::UnusedComposition,
                    Span::default(),
                    format!(
                        "composition {slot} matches no slot in {}",
                        self.arena.get(owner).class_name
                    ),
                );
            }
            1 => {
                let m = &matches[0];
                let (declaring_class, stage, span) =
                    (m.declaring_class.clone(), m.stage, m.span.clone());
                let mixins = self.resolve_source(nested, diags);
                self.table.insert(CompositionEntry {
                    owner,
                    slot: slot.to_string(),
                    declaring_class,
                    stage,
                    span,
                    mixins,
                });
            }
            _ => {
                diags.report(
                    Code::AmbiguousComposition,
                    matches[0].span.clone(),
                    format!(
                        "composition {slot} matches more than one slot declaration in {}",
                        self.arena.get(owner).class_name
                    ),
                );
            }
        }
    }

    /// Compose-qualified declarations named `slot` across the owner's
    /// chain. A declaration in a derived class shadows a same-named one in
    /// its own ancestors; matches from unrelated chain members stay and
    /// make the composition ambiguous.
    fn find_slot_matches(&self, owner: MixinHandle, slot: &str) -> Vec<SlotMatch> {
        let mixin = self.arena.get(owner);
        let mut matches: Vec<SlotMatch> = Vec::new();
        for class in &mixin.chain {
            let Some(decl) = class.find(slot).filter(|d| d.is_compose_slot()) else {
                continue;
            };
            // drop any earlier match this declaration shadows
            matches.retain(|m| !self.set.is_ancestor(&m.declaring_class, &class.name));
            matches.push(SlotMatch {
                declaring_class: class.name.clone(),
                stage: decl.qualifiers.is_stage_compose(),
                span: decl.span.clone(),
            });
        }
        matches
    }

    fn instantiate(&mut self, name: &str, diags: &mut Diagnostics) -> Option<MixinHandle> {
        let Some(info) = self.set.get(name) else {
            diags.report(
                Code::ClassNotFound,
                Span::default(),
                format!("class {name} was not loaded"),
            );
            return None;
        };
        let chain: Vec<ClassDecl> = self
            .set
            .chain(name)
            .iter()
            .map(|link| link.class.clone())
            .collect();
        Some(self.arena.alloc(ResolvedMixin {
            class_name: name.to_string(),
            chain,
            info: info.clone(),
        }))
    }
}
