//! Entry-point extraction

use crate::diag::{Code, Diagnostics};
use crate::mixer::ShaderIr;
use crate::reflection::EntryPoint;
use mixsl_ast::ShaderStage;

/// Scans the flattened tree for one entry-point method per pipeline
/// stage, in the fixed order compute, vertex, hull, domain, geometry,
/// pixel. More than one match per stage is fatal and records nothing for
/// that stage. A compute entry short-circuits the scan: a compute mixin
/// never declares the raster stages.
pub fn extract_entry_points(ir: &ShaderIr, diags: &mut Diagnostics) -> Vec<EntryPoint> {
    let mut entry_points = Vec::new();

    for stage in ShaderStage::ALL {
        let matches: Vec<&mixsl_ast::Declaration> = ir
            .declarations
            .iter()
            .filter(|d| d.as_method().is_some() && d.entry_stage() == Some(stage))
            .collect();

        match matches.as_slice() {
            [] => {}
            [decl] => {
                entry_points.push(EntryPoint {
                    stage,
                    name: decl.name.clone(),
                });
                if stage == ShaderStage::Compute {
                    break;
                }
            }
            [first, ..] => {
                diags.report(
                    Code::DuplicateEntryPoint,
                    first.span.clone(),
                    format!("more than one {stage} entry point"),
                );
            }
        }
    }
    entry_points
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixsl_ast::{ClassBuilder, Stmt, TypeRef};

    fn ir_of(class: mixsl_ast::ClassDecl) -> ShaderIr {
        ShaderIr {
            name: class.name.clone(),
            declarations: class.declarations,
        }
    }

    #[test]
    fn test_vertex_and_pixel_extracted() {
        let ir = ir_of(
            ClassBuilder::new("S")
                .entry_method("vsMain", ShaderStage::Vertex, TypeRef::floatn(4), vec![])
                .entry_method("psMain", ShaderStage::Pixel, TypeRef::floatn(4), vec![])
                .build(),
        );
        let mut diags = Diagnostics::new();
        let entries = extract_entry_points(&ir, &mut diags);
        assert!(!diags.has_errors());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].stage, ShaderStage::Vertex);
        assert_eq!(entries[1].name, "psMain");
    }

    #[test]
    fn test_compute_short_circuits() {
        let ir = ir_of(
            ClassBuilder::new("S")
                .entry_method("csMain", ShaderStage::Compute, TypeRef::Void, vec![])
                // stray raster entry; never reached once compute is found
                .entry_method("psMain", ShaderStage::Pixel, TypeRef::floatn(4), vec![])
                .build(),
        );
        let mut diags = Diagnostics::new();
        let entries = extract_entry_points(&ir, &mut diags);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stage, ShaderStage::Compute);
    }

    #[test]
    fn test_duplicate_pixel_entry_is_fatal() {
        let ir = ir_of(
            ClassBuilder::new("S")
                .entry_method("a", ShaderStage::Pixel, TypeRef::floatn(4), vec![Stmt::Return(None)])
                .entry_method("b", ShaderStage::Pixel, TypeRef::floatn(4), vec![Stmt::Return(None)])
                .build(),
        );
        let mut diags = Diagnostics::new();
        let entries = extract_entry_points(&ir, &mut diags);
        assert!(diags.has_errors());
        assert!(entries.iter().all(|e| e.stage != ShaderStage::Pixel));
    }
}
