//! Cleaning: stripping compiler-internal metadata
//!
//! The emitted tree must only carry information meaningful to a
//! downstream native compiler. This pass removes the mixing qualifiers
//! (stream, stage, patch-stream, override, clone) and every attribute in
//! the compiler's reserved set; custom attributes pass through.

use crate::mixer::ShaderIr;
use mixsl_ast::{Attribute, DeclKind, Declaration, StorageQualifiers};

/// Strips internal qualifiers and reserved attributes from the tree.
pub fn clean(ir: &mut ShaderIr) {
    for decl in &mut ir.declarations {
        clean_decl(decl);
    }
}

fn clean_decl(decl: &mut Declaration) {
    decl.qualifiers.remove(StorageQualifiers::INTERNAL);
    decl.attributes
        .retain(|node| !Attribute::is_reserved(&node.name));
    if let DeclKind::ConstantBuffer { members } = &mut decl.kind {
        for member in members {
            clean_decl(member);
        }
    }
}
