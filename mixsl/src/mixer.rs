//! Mixing: flattening inheritance chains and resolved compositions
//!
//! The mixer merges the root's inheritance chain into one declaration
//! list (later same-named declarations replace earlier ones), inlines
//! every composition bound in the table under a generated name scope,
//! rewrites slot accessor expressions to the generated names, and
//! regroups scattered constant-buffer members into canonical per-buffer
//! lists. Stage-shared compositions are inlined exactly once, at root
//! scope, so every observer resolves to the same declarations.

use crate::compose::{CompositionTable, MixinArena, MixinHandle};
use crate::diag::{Code, Diagnostics};
use crate::reflection::EffectReflection;
use crate::simplify::live_decl_names;
use crate::visit::visit_decl_exprs_mut;
use mixsl_ast::{DeclKind, Declaration, Expr, Literal, TypeRef};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// The flattened shader tree produced by mixing one root
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShaderIr {
    /// Name of the root class the tree was mixed from
    pub name: String,
    /// Flattened declarations
    pub declarations: Vec<Declaration>,
}

impl ShaderIr {
    /// Finds a declaration by name.
    pub fn find(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }
}

/// Mixes the root instance into a flattened tree plus the reflection
/// skeleton the linker fills in.
pub fn mix(
    root: MixinHandle,
    table: &CompositionTable,
    arena: &MixinArena,
    diags: &mut Diagnostics,
) -> (ShaderIr, EffectReflection) {
    let mut mixing = Mixing {
        table,
        arena,
        inlined: FxHashMap::default(),
        unresolved: Vec::new(),
    };

    // Shared stage compositions first, once each, at root scope.
    let mut shared = Vec::new();
    for entry in table.entries().iter().filter(|e| e.stage) {
        let count = entry.mixins.len();
        for (i, &handle) in entry.mixins.iter().enumerate() {
            if mixing.inlined.contains_key(&handle) {
                continue;
            }
            let prefix = slot_prefix("", &entry.slot, i, count);
            mixing.inlined.insert(handle, prefix.clone());
            shared.extend(mixing.inline_instance(handle, &prefix, diags));
        }
    }

    let mut declarations = shared;
    declarations.extend(mixing.inline_instance(root, "", diags));

    // An unresolved slot is fatal only when live code can reach it.
    let live = live_decl_names(&declarations);
    for (name, span) in &mixing.unresolved {
        let reachable = live.as_ref().is_none_or(|live| live.contains(name));
        if reachable {
            diags.report(
                Code::MissingComposition,
                span.clone(),
                format!("composition slot {name} was never filled"),
            );
        } else {
            declarations.retain(|d| &d.name != name);
        }
    }

    let declarations = canonicalize_buffers(declarations);
    let ir = ShaderIr {
        name: arena.get(root).class_name.clone(),
        declarations,
    };
    (ir, EffectReflection::default())
}

struct Mixing<'a> {
    table: &'a CompositionTable,
    arena: &'a MixinArena,
    /// handle -> name prefix it was inlined under
    inlined: FxHashMap<MixinHandle, String>,
    /// final names and spans of slots left unbound
    unresolved: Vec<(String, mixsl_ast::Span)>,
}

impl Mixing<'_> {
    /// Flattens one instance under `prefix`, recursively inlining its
    /// bound compositions. Returns the renamed declarations.
    fn inline_instance(
        &mut self,
        handle: MixinHandle,
        prefix: &str,
        diags: &mut Diagnostics,
    ) -> Vec<Declaration> {
        let mut merged = self.flatten_chain(handle);

        // Resolve each slot: splice bound compositions in at the slot's
        // position, remember the prefix each element lives under.
        let mut splices: Vec<(usize, Vec<Declaration>)> = Vec::new();
        let mut resolved_slots: Vec<(String, Vec<String>)> = Vec::new();
        let mut drop_slots = Vec::new();
        for index in 0..merged.len() {
            if !merged[index].is_compose_slot() {
                continue;
            }
            let slot = merged[index].name.clone();
            let bound = self
                .table
                .get(handle, &slot)
                .filter(|e| !e.mixins.is_empty())
                .map(|e| e.mixins.clone());
            let Some(elements) = bound else {
                self.unresolved
                    .push((format!("{prefix}{slot}"), merged[index].span.clone()));
                continue;
            };

            let count = elements.len();
            let mut prefixes = Vec::with_capacity(count);
            for (i, element) in elements.into_iter().enumerate() {
                if let Some(existing) = self.inlined.get(&element) {
                    // stage-shared: already emitted elsewhere
                    prefixes.push(existing.clone());
                    continue;
                }
                let element_prefix = slot_prefix(prefix, &slot, i, count);
                self.inlined.insert(element, element_prefix.clone());
                let decls = self.inline_instance(element, &element_prefix, diags);
                splices.push((index, decls));
                prefixes.push(element_prefix);
            }
            resolved_slots.push((slot, prefixes));
            drop_slots.push(index);
        }

        // Route accessor expressions through the generated names.
        for (slot, prefixes) in &resolved_slots {
            for decl in &mut merged {
                rewrite_slot_access(decl, slot, prefixes);
            }
        }

        // Rename this instance's own declarations into its scope.
        if !prefix.is_empty() {
            let map: FxHashMap<String, String> = merged
                .iter()
                .map(|d| (d.name.clone(), format!("{prefix}{}", d.name)))
                .collect();
            for decl in &mut merged {
                rename_decl(decl, &map);
            }
        }

        // Assemble: resolved slot declarations are consumed by their
        // compositions; everything else keeps its position.
        let mut out = Vec::new();
        for (index, decl) in merged.into_iter().enumerate() {
            for (_, decls) in splices.iter_mut().filter(|(at, _)| *at == index) {
                out.append(decls);
            }
            if !drop_slots.contains(&index) {
                out.push(decl);
            }
        }
        out
    }

    /// Merges the instance's chain, least derived first. A later
    /// declaration with an already-seen name is an override and replaces
    /// the earlier one in place.
    fn flatten_chain(&self, handle: MixinHandle) -> Vec<Declaration> {
        let mut merged: Vec<Declaration> = Vec::new();
        for class in &self.arena.get(handle).chain {
            for decl in &class.declarations {
                match merged.iter().position(|d| d.name == decl.name) {
                    Some(existing) => merged[existing] = decl.clone(),
                    None => merged.push(decl.clone()),
                }
            }
        }
        merged
    }
}

fn slot_prefix(outer: &str, slot: &str, index: usize, count: usize) -> String {
    if count > 1 {
        format!("{outer}{slot}{index}_")
    } else {
        format!("{outer}{slot}_")
    }
}

/// Rewrites `slot.m` (and `slot[i].m`) into references to the inlined
/// declarations.
fn rewrite_slot_access(decl: &mut Declaration, slot: &str, prefixes: &[String]) {
    visit_decl_exprs_mut(decl, &mut |expr| {
        let Expr::Member { base, member } = expr else {
            return;
        };
        let replacement = match &**base {
            Expr::Ident { name, .. } if name == slot => prefixes.first(),
            Expr::Index { base, index } => match (&**base, &**index) {
                (Expr::Ident { name, .. }, Expr::Literal(Literal::Int(i)))
                    if name == slot && *i >= 0 =>
                {
                    prefixes.get(*i as usize)
                }
                _ => None,
            },
            _ => None,
        };
        if let Some(prefix) = replacement {
            *expr = Expr::ident(format!("{prefix}{member}"));
        }
    });
}

/// Renames a declaration and every internal reference per `map`.
fn rename_decl(decl: &mut Declaration, map: &FxHashMap<String, String>) {
    if let Some(new_name) = map.get(&decl.name) {
        decl.name = new_name.clone();
    }
    rename_types(decl, map);
    visit_decl_exprs_mut(decl, &mut |expr| {
        if let Expr::Ident { name, .. } = expr {
            if let Some(new_name) = map.get(name) {
                *name = new_name.clone();
            }
        }
    });
}

fn rename_types(decl: &mut Declaration, map: &FxHashMap<String, String>) {
    match &mut decl.kind {
        DeclKind::Variable(var) => rename_type(&mut var.ty, map),
        DeclKind::Method(method) => {
            rename_type(&mut method.ret, map);
            for param in &mut method.params {
                rename_type(&mut param.ty, map);
            }
        }
        DeclKind::ConstantBuffer { members } => {
            for member in members {
                rename_types(member, map);
            }
        }
        DeclKind::Struct { fields } => {
            for field in fields {
                rename_type(&mut field.ty, map);
            }
        }
    }
}

fn rename_type(ty: &mut TypeRef, map: &FxHashMap<String, String>) {
    match ty {
        TypeRef::Named(name) => {
            if let Some(new_name) = map.get(name) {
                *name = new_name.clone();
            }
        }
        TypeRef::Array { elem, .. } => rename_type(elem, map),
        _ => {}
    }
}

/// Regroups buffer-tagged variables into canonical per-buffer member
/// lists, preserving declaration order within each buffer. Order affects
/// memory layout, so members are never reordered across a buffer.
fn canonicalize_buffers(decls: Vec<Declaration>) -> Vec<Declaration> {
    let mut out: Vec<Declaration> = Vec::new();
    let mut buffer_at: FxHashMap<String, usize> = FxHashMap::default();

    for decl in decls {
        let Declaration {
            name,
            span,
            qualifiers,
            attributes,
            kind,
        } = decl;
        match kind {
            DeclKind::ConstantBuffer { members } => {
                if let Some(&at) = buffer_at.get(&name) {
                    if let DeclKind::ConstantBuffer { members: existing } = &mut out[at].kind {
                        existing.extend(members);
                    }
                } else {
                    buffer_at.insert(name.clone(), out.len());
                    out.push(Declaration {
                        name,
                        span,
                        qualifiers,
                        attributes,
                        kind: DeclKind::ConstantBuffer { members },
                    });
                }
            }
            DeclKind::Variable(var) if var.buffer.is_some() => {
                let buffer = var.buffer.clone().unwrap_or_default();
                let member = Declaration {
                    name,
                    span: span.clone(),
                    qualifiers,
                    attributes,
                    kind: DeclKind::Variable(var),
                };
                if let Some(&at) = buffer_at.get(&buffer) {
                    if let DeclKind::ConstantBuffer { members } = &mut out[at].kind {
                        members.push(member);
                    }
                } else {
                    buffer_at.insert(buffer.clone(), out.len());
                    out.push(Declaration {
                        name: buffer,
                        span,
                        qualifiers: mixsl_ast::StorageQualifiers::empty(),
                        attributes: Vec::new(),
                        kind: DeclKind::ConstantBuffer {
                            members: vec![member],
                        },
                    });
                }
            }
            kind => out.push(Declaration {
                name,
                span,
                qualifiers,
                attributes,
                kind,
            }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::resolve;
    use crate::loader::Loader;
    use crate::parse::JsonParser;
    use crate::source::ShaderSource;
    use crate::store::MemoryStore;
    use crate::unify::unify_stage_compositions;
    use mixsl_ast::{ClassBuilder, ClassDecl, ShaderStage, Stmt};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn mixed(classes: Vec<ClassDecl>, source: &ShaderSource) -> (ShaderIr, Diagnostics) {
        let store = MemoryStore::new();
        for class in &classes {
            store.add(&class.name, &serde_json::to_string(class).unwrap());
        }
        let loader = Loader::new(Arc::new(store), Arc::new(JsonParser::new()));
        let mut diags = Diagnostics::new();
        let set = loader.load(source, &[], &mut diags);
        let mut resolution = resolve(&set, source, &mut diags);
        unify_stage_compositions(&mut resolution.table, &resolution.arena, &mut diags);
        let (ir, _skeleton) = mix(
            resolution.roots[0],
            &resolution.table,
            &resolution.arena,
            &mut diags,
        );
        (ir, diags)
    }

    #[test]
    fn test_mix_is_idempotent_for_plain_classes() {
        let class = ClassBuilder::new("Plain")
            .var("color", TypeRef::floatn(4))
            .entry_method(
                "psMain",
                ShaderStage::Pixel,
                TypeRef::floatn(4),
                vec![Stmt::ret(Expr::ident("color"))],
            )
            .build();
        let source = ShaderSource::class("Plain");
        let (first, diags) = mixed(vec![class.clone()], &source);
        assert!(!diags.has_errors());
        let (second, _) = mixed(vec![class], &source);
        assert_eq!(first, second);
    }

    #[test]
    fn test_override_appears_once() {
        let base = ClassBuilder::new("A")
            .method(
                "shade",
                TypeRef::floatn(4),
                vec![Stmt::ret(Expr::call("float4", vec![]))],
            )
            .build();
        let derived = ClassBuilder::new("B")
            .base("A")
            .full_method(
                "shade",
                mixsl_ast::StorageQualifiers::OVERRIDE,
                vec![],
                TypeRef::floatn(4),
                vec![Stmt::Return(None)],
            )
            .build();
        let (ir, diags) = mixed(vec![derived, base], &ShaderSource::class("B"));
        assert!(!diags.has_errors());

        let shades: Vec<&Declaration> = ir
            .declarations
            .iter()
            .filter(|d| d.name == "shade")
            .collect();
        assert_eq!(shades.len(), 1);
        // the override's body won
        assert_eq!(
            shades[0].as_method().unwrap().body,
            vec![Stmt::Return(None)]
        );
    }

    #[test]
    fn test_composition_inlined_and_rewritten() {
        let light = ClassBuilder::new("PointLight")
            .var("radius", TypeRef::float())
            .method(
                "intensity",
                TypeRef::float(),
                vec![Stmt::ret(Expr::ident("radius"))],
            )
            .build();
        let root = ClassBuilder::new("R")
            .compose("light", "PointLight")
            .entry_method(
                "psMain",
                ShaderStage::Pixel,
                TypeRef::float(),
                vec![Stmt::ret(Expr::call(
                    "saturate",
                    vec![Expr::Call {
                        callee: Box::new(Expr::member("light", "intensity")),
                        args: vec![],
                    }],
                )),],
            )
            .build();

        let source = ShaderSource::mixin(
            "R",
            vec![("light".into(), ShaderSource::class("PointLight"))],
        );
        let (ir, diags) = mixed(vec![root, light], &source);
        assert!(!diags.has_errors());

        // the slot is consumed, the composition lives under its scope
        assert!(ir.find("light").is_none());
        assert!(ir.find("light_radius").is_some());
        let method = ir.find("light_intensity").unwrap().as_method().unwrap();
        assert_eq!(method.body, vec![Stmt::ret(Expr::ident("light_radius"))]);

        // the accessor call now routes to the generated name
        let entry = ir.find("psMain").unwrap().as_method().unwrap();
        let body_text = serde_json::to_string(&entry.body).unwrap();
        assert!(body_text.contains("light_intensity"));
    }

    #[test]
    fn test_missing_reachable_composition_is_fatal() {
        let light_base = ClassBuilder::new("LightBase").build();
        let root = ClassBuilder::new("R")
            .compose("light", "LightBase")
            .entry_method(
                "psMain",
                ShaderStage::Pixel,
                TypeRef::float(),
                vec![Stmt::ret(Expr::Call {
                    callee: Box::new(Expr::member("light", "intensity")),
                    args: vec![],
                })],
            )
            .build();
        let (_, diags) = mixed(vec![root, light_base], &ShaderSource::class("R"));
        assert!(diags.has_errors());
        assert_eq!(diags.with_code(Code::MissingComposition).count(), 1);
    }

    #[test]
    fn test_missing_unreachable_composition_is_dropped() {
        let light_base = ClassBuilder::new("LightBase").build();
        let root = ClassBuilder::new("R")
            .compose("light", "LightBase")
            .entry_method(
                "psMain",
                ShaderStage::Pixel,
                TypeRef::floatn(4),
                vec![Stmt::ret(Expr::call("float4", vec![]))],
            )
            .build();
        let (ir, diags) = mixed(vec![root, light_base], &ShaderSource::class("R"));
        assert!(!diags.has_errors());
        assert!(ir.find("light").is_none());
    }

    #[test]
    fn test_stage_shared_composition_inlined_once() {
        let env_base = ClassBuilder::new("EnvBase").build();
        let sky = ClassBuilder::new("Sky")
            .var("horizon", TypeRef::floatn(4))
            .build();
        let effect = ClassBuilder::new("Effect")
            .stage_compose("env", "EnvBase")
            .method(
                "apply",
                TypeRef::floatn(4),
                vec![Stmt::ret(Expr::Call {
                    callee: Box::new(Expr::member("env", "horizon")),
                    args: vec![],
                })],
            )
            .build();
        let root = ClassBuilder::new("R")
            .stage_compose("env", "EnvBase")
            .compose("effect", "Effect")
            .entry_method(
                "psMain",
                ShaderStage::Pixel,
                TypeRef::floatn(4),
                vec![Stmt::ret(Expr::Call {
                    callee: Box::new(Expr::member("effect", "apply")),
                    args: vec![],
                })],
            )
            .build();

        let source = ShaderSource::mixin(
            "R",
            vec![
                ("env".into(), ShaderSource::class("Sky")),
                ("effect".into(), ShaderSource::class("Effect")),
            ],
        );
        let (ir, diags) = mixed(vec![root, env_base, sky, effect], &source);
        assert!(!diags.has_errors());

        // the shared environment exists exactly once
        let horizons: Vec<&Declaration> = ir
            .declarations
            .iter()
            .filter(|d| d.name.ends_with("horizon"))
            .collect();
        assert_eq!(horizons.len(), 1);
        assert_eq!(horizons[0].name, "env_horizon");

        // the nested observer routes to the same instance
        let apply = ir.find("effect_apply").unwrap().as_method().unwrap();
        let body_text = serde_json::to_string(&apply.body).unwrap();
        assert!(body_text.contains("env_horizon"));
    }

    #[test]
    fn test_buffer_members_are_grouped_in_order() {
        let class = ClassBuilder::new("Mat")
            .decl(Declaration {
                name: "x".into(),
                span: Default::default(),
                qualifiers: Default::default(),
                attributes: vec![mixsl_ast::AttributeNode::new(
                    "Link",
                    vec![Literal::Str("Mat.X".into())],
                )],
                kind: DeclKind::Variable(mixsl_ast::VariableDef {
                    ty: TypeRef::float(),
                    init: None,
                    buffer: Some("PerMaterial".into()),
                }),
            })
            .var("unrelated", TypeRef::float())
            .decl(Declaration {
                name: "y".into(),
                span: Default::default(),
                qualifiers: Default::default(),
                attributes: vec![mixsl_ast::AttributeNode::new(
                    "Link",
                    vec![Literal::Str("Mat.Y".into())],
                )],
                kind: DeclKind::Variable(mixsl_ast::VariableDef {
                    ty: TypeRef::floatn(3),
                    init: None,
                    buffer: Some("PerMaterial".into()),
                }),
            })
            .build();
        let (ir, diags) = mixed(vec![class], &ShaderSource::class("Mat"));
        assert!(!diags.has_errors());

        let buffer = ir.find("PerMaterial").unwrap();
        let DeclKind::ConstantBuffer { members } = &buffer.kind else {
            panic!("expected a canonical buffer");
        };
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }
}
