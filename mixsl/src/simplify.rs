//! Tree simplification
//!
//! Two rewrites run after mixing: literal-condition branches are folded
//! (the untaken side disappears), and declarations unreachable from every
//! entry point are removed. Link-bound non-method declarations are part
//! of the effect's public binding surface and always survive; a shader
//! with no entry points keeps everything, since nothing can be proven
//! dead.

use crate::mixer::ShaderIr;
use crate::visit::collect_referenced_names;
use mixsl_ast::{DeclKind, Declaration, Stmt};
use rustc_hash::FxHashSet;

/// Names of declarations reachable from the entry points, transitively
/// through identifier and type references. `None` when the tree has no
/// entry points.
pub(crate) fn live_decl_names(decls: &[Declaration]) -> Option<FxHashSet<String>> {
    let mut queue: Vec<&Declaration> = decls
        .iter()
        .filter(|d| d.entry_stage().is_some())
        .collect();
    if queue.is_empty() {
        return None;
    }

    let mut live: FxHashSet<String> = queue.iter().map(|d| d.name.clone()).collect();
    while let Some(decl) = queue.pop() {
        let mut referenced = Vec::new();
        collect_referenced_names(decl, &mut referenced);
        for name in referenced {
            if !live.insert(name.clone()) {
                continue;
            }
            if let Some(next) = find_decl(decls, &name) {
                queue.push(next);
            }
        }
    }
    Some(live)
}

fn find_decl<'a>(decls: &'a [Declaration], name: &str) -> Option<&'a Declaration> {
    for decl in decls {
        if decl.name == name {
            return Some(decl);
        }
        if let DeclKind::ConstantBuffer { members } = &decl.kind {
            if let Some(member) = members.iter().find(|m| m.name == name) {
                return Some(member);
            }
        }
    }
    None
}

/// Folds dead branches and removes unreachable declarations.
pub fn simplify(ir: &mut ShaderIr) {
    for decl in &mut ir.declarations {
        if let DeclKind::Method(method) = &mut decl.kind {
            method.body = fold_stmts(std::mem::take(&mut method.body));
        }
    }

    let Some(live) = live_decl_names(&ir.declarations) else {
        return;
    };
    let before = ir.declarations.len();
    ir.declarations.retain(|decl| keep_decl(decl, &live));
    let removed = before - ir.declarations.len();
    if removed > 0 {
        log::debug!("simplify: removed {removed} unreachable declarations");
    }
}

fn keep_decl(decl: &Declaration, live: &FxHashSet<String>) -> bool {
    if live.contains(&decl.name) {
        return true;
    }
    match &decl.kind {
        // the binding surface stays even when nothing references it
        DeclKind::Variable(_) => decl.link_name().is_some(),
        DeclKind::ConstantBuffer { members } => members
            .iter()
            .any(|m| m.link_name().is_some() || live.contains(&m.name)),
        DeclKind::Method(_) | DeclKind::Struct { .. } => false,
    }
}

fn fold_stmts(stmts: Vec<Stmt>) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        match stmt {
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => match cond.const_bool() {
                Some(true) => out.extend(fold_stmts(then_branch)),
                Some(false) => {
                    if let Some(else_branch) = else_branch {
                        out.extend(fold_stmts(else_branch));
                    }
                }
                None => out.push(Stmt::If {
                    cond,
                    then_branch: fold_stmts(then_branch),
                    else_branch: else_branch.map(fold_stmts),
                }),
            },
            other => out.push(other),
        }
    }
    out
}
