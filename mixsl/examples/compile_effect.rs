//! Example: compile a composed effect and print its reflection
//!
//! Run with: cargo run --example compile_effect

use mixsl::{EffectCompiler, JsonParser, MemoryStore, ShaderSource};
use mixsl_ast::{ClassBuilder, Expr, ShaderStage, Stmt, TypeRef};
use std::sync::Arc;

fn main() {
    env_logger::init();

    // A small class library: a lighting interface, one implementation,
    // and a root that composes it.
    let light_base = ClassBuilder::new("LightBase")
        .method(
            "intensity",
            TypeRef::float(),
            vec![Stmt::ret(Expr::Literal(mixsl_ast::Literal::Float(0.0)))],
        )
        .build();
    let point_light = ClassBuilder::new("PointLight")
        .base("LightBase")
        .bound_var("radius", TypeRef::float(), "PointLight.Radius")
        .full_method(
            "intensity",
            mixsl_ast::StorageQualifiers::OVERRIDE,
            vec![],
            TypeRef::float(),
            vec![Stmt::ret(Expr::ident("radius"))],
        )
        .build();
    let scene = ClassBuilder::new("Scene")
        .compose("light", "LightBase")
        .bound_var("tint", TypeRef::floatn(4), "Scene.Tint")
        .entry_method(
            "psMain",
            ShaderStage::Pixel,
            TypeRef::floatn(4),
            vec![Stmt::ret(Expr::Binary {
                op: mixsl_ast::BinaryOp::Mul,
                lhs: Box::new(Expr::ident("tint")),
                rhs: Box::new(Expr::Call {
                    callee: Box::new(Expr::member("light", "intensity")),
                    args: vec![],
                }),
            })],
        )
        .build();

    let store = MemoryStore::new();
    for class in [&light_base, &point_light, &scene] {
        store.add(&class.name, &serde_json::to_string(class).unwrap());
    }
    let compiler = EffectCompiler::new(Arc::new(store), Arc::new(JsonParser::new()));

    let source = ShaderSource::mixin(
        "Scene",
        vec![("light".into(), ShaderSource::class("PointLight"))],
    );
    let result = compiler.compile(&source, &[]).expect("valid request");

    for diagnostic in result.diagnostics.entries() {
        eprintln!("{diagnostic}");
    }
    let reflection = result.reflection.expect("compile succeeded");

    println!("entry points:");
    for entry in &reflection.entry_points {
        println!("  {}: {}", entry.stage, entry.name);
    }
    println!("constant buffers:");
    for buffer in &reflection.constant_buffers {
        println!("  {} ({} bytes)", buffer.name, buffer.size);
        for member in &buffer.members {
            println!(
                "    {} -> {} at {} ({} bytes)",
                member.name, member.bind_name, member.offset, member.size
            );
        }
    }
}
