//! Stage-composition unification
//!
//! A stage-qualified slot represents one logical shared choice (for
//! example "the active lighting model") that several otherwise unrelated
//! mixins may reference by name. Without unification each reference
//! would independently default to unbound. This pass propagates every
//! stage binding already in the table to each same-named compose slot on
//! every other instance, so all observers end up holding the same
//! resolved instances.

use crate::compose::{CompositionEntry, CompositionTable, MixinArena, MixinHandle};
use crate::diag::{Code, Diagnostics};
use mixsl_ast::Span;

/// A compose declaration found while scanning a chain for propagation
/// targets.
struct Target {
    declaring_class: String,
    stage: bool,
    span: Span,
}

enum Action {
    Bind,
    Fill,
    Conflict,
    Nothing,
}

/// Propagates stage-slot bindings across the table.
///
/// An unbound same-named slot is bound to the same instance list; an
/// identical existing binding is left alone; a different non-empty
/// binding is the fatal rebind conflict.
pub fn unify_stage_compositions(
    table: &mut CompositionTable,
    arena: &MixinArena,
    diags: &mut Diagnostics,
) {
    let stage_entries: Vec<(MixinHandle, String, Vec<MixinHandle>)> = table
        .entries()
        .iter()
        .filter(|e| e.stage)
        .map(|e| (e.owner, e.slot.clone(), e.mixins.clone()))
        .collect();

    for (owner, slot, mixins) in stage_entries {
        for handle in arena.handles() {
            if handle == owner {
                continue;
            }
            let Some(target) = find_compose_target(arena, handle, &slot) else {
                continue;
            };
            let action = match table.get(handle, &slot) {
                None => Action::Bind,
                Some(existing) if existing.mixins == mixins => Action::Nothing,
                Some(existing) if existing.mixins.is_empty() => Action::Fill,
                Some(_) => Action::Conflict,
            };
            match action {
                Action::Bind => {
                    log::debug!(
                        "unify: sharing stage slot {slot} with {}",
                        arena.get(handle).class_name
                    );
                    table.insert(CompositionEntry {
                        owner: handle,
                        slot: slot.clone(),
                        declaring_class: target.declaring_class,
                        stage: target.stage,
                        span: target.span,
                        mixins: mixins.clone(),
                    });
                }
                Action::Fill => {
                    if let Some(existing) = table.get_mut(handle, &slot) {
                        existing.mixins = mixins.clone();
                    }
                }
                Action::Conflict => {
                    diags.report(
                        Code::StageRebind,
                        target.span,
                        format!(
                            "stage slot {slot} in {} already has a different binding",
                            arena.get(handle).class_name
                        ),
                    );
                }
                Action::Nothing => {}
            }
        }
    }
}

/// Finds the compose declaration named `slot` on an instance's chain.
/// Scanned most-derived first, so a derived declaration wins over a
/// same-named one it shadows.
fn find_compose_target(arena: &MixinArena, handle: MixinHandle, slot: &str) -> Option<Target> {
    let mixin = arena.get(handle);
    for class in mixin.chain.iter().rev() {
        if let Some(decl) = class.find(slot).filter(|d| d.is_compose_slot()) {
            return Some(Target {
                declaring_class: class.name.clone(),
                stage: decl.qualifiers.is_stage_compose(),
                span: decl.span.clone(),
            });
        }
    }
    None
}
