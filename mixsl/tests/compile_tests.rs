//! End-to-end compilation tests

use mixsl::{
    BindingClass, Code, EffectCompiler, Filter, JsonParser, MemoryStore, ShaderMacro,
    ShaderSource,
};
use mixsl_ast::{
    AttributeNode, ClassBuilder, ClassDecl, DeclKind, Declaration, Expr, Literal, ObjectType,
    ShaderStage, StateEntry, StateValue, Stmt, StorageQualifiers, TypeRef, VariableDef,
    buffer_member,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn compiler_for(classes: Vec<ClassDecl>) -> EffectCompiler {
    let store = MemoryStore::new();
    for class in &classes {
        store.add(&class.name, &serde_json::to_string(class).unwrap());
    }
    EffectCompiler::new(Arc::new(store), Arc::new(JsonParser::new()))
}

fn solid_entry(name: &str, stage: ShaderStage) -> ClassBuilder {
    ClassBuilder::new(name).entry_method(
        "psMain",
        stage,
        TypeRef::floatn(4),
        vec![Stmt::ret(Expr::call("float4", vec![]))],
    )
}

#[test]
fn compiling_the_same_class_twice_yields_identical_trees() {
    let class = ClassBuilder::new("Plain")
        .bound_var("tint", TypeRef::floatn(4), "Plain.Tint")
        .entry_method(
            "psMain",
            ShaderStage::Pixel,
            TypeRef::floatn(4),
            vec![Stmt::ret(Expr::ident("tint"))],
        )
        .build();
    let compiler = compiler_for(vec![class]);

    let first = compiler
        .compile(&ShaderSource::class("Plain"), &[])
        .unwrap();
    let second = compiler
        .compile(&ShaderSource::class("Plain"), &[])
        .unwrap();
    assert_eq!(first.shader.unwrap(), second.shader.unwrap());
    assert_eq!(first.reflection.unwrap(), second.reflection.unwrap());
}

#[test]
fn constant_buffer_packing_pads_vectors_forward() {
    let class = ClassBuilder::new("A")
        .cbuffer(
            "PerDraw",
            vec![
                buffer_member("x", TypeRef::float(), "A.X"),
                buffer_member("y", TypeRef::floatn(3), "A.Y"),
            ],
        )
        .entry_method(
            "psMain",
            ShaderStage::Pixel,
            TypeRef::floatn(4),
            vec![Stmt::ret(Expr::call(
                "float4",
                vec![Expr::ident("x"), Expr::ident("y")],
            ))],
        )
        .build();
    let compiler = compiler_for(vec![class]);

    let result = compiler.compile(&ShaderSource::class("A"), &[]).unwrap();
    assert!(result.succeeded(), "{:?}", result.diagnostics);

    let reflection = result.reflection.unwrap();
    let buffer = reflection.constant_buffer("PerDraw").unwrap();
    assert_eq!(buffer.members[1].bind_name, "A.Y");
    assert_eq!(buffer.members[1].offset, 16);
    assert!(buffer.size >= 28);
}

#[test]
fn composition_resolves_one_slot_without_ambiguity() {
    let light_base = ClassBuilder::new("LightBase")
        .method(
            "intensity",
            TypeRef::float(),
            vec![Stmt::ret(Expr::Literal(Literal::Float(0.0)))],
        )
        .build();
    let point = ClassBuilder::new("PointLight")
        .base("LightBase")
        .bound_var("radius", TypeRef::float(), "PointLight.Radius")
        .full_method(
            "intensity",
            StorageQualifiers::OVERRIDE,
            vec![],
            TypeRef::float(),
            vec![Stmt::ret(Expr::ident("radius"))],
        )
        .build();
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
    let compiler = compiler_for(vec![root, light_base, point]);

    let source = ShaderSource::mixin(
        "R",
        vec![("light".into(), ShaderSource::class("PointLight"))],
    );
    let result = compiler.compile(&source, &[]).unwrap();
    assert!(result.succeeded(), "{:?}", result.diagnostics);
    assert_eq!(
        result.diagnostics.with_code(Code::AmbiguousComposition).count(),
        0
    );

    // the composed override was inlined and the accessor rewritten
    let shader = result.shader.unwrap();
    assert!(shader.find("light_intensity").is_some());
    assert!(shader.find("light").is_none());
}

#[test]
fn duplicate_pixel_entry_points_fail_with_no_outputs() {
    let class = ClassBuilder::new("Twice")
        .entry_method("a", ShaderStage::Pixel, TypeRef::floatn(4), vec![])
        .entry_method("b", ShaderStage::Pixel, TypeRef::floatn(4), vec![])
        .build();
    let compiler = compiler_for(vec![class]);

    let result = compiler.compile(&ShaderSource::class("Twice"), &[]).unwrap();
    assert!(!result.succeeded());
    assert!(result.shader.is_none());
    assert!(result.reflection.is_none());
    assert_eq!(
        result.diagnostics.with_code(Code::DuplicateEntryPoint).count(),
        1
    );
}

#[test]
fn override_wins_and_appears_once() {
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
            StorageQualifiers::OVERRIDE,
            vec![],
            TypeRef::floatn(4),
            vec![Stmt::Return(None)],
        )
        .entry_method(
            "psMain",
            ShaderStage::Pixel,
            TypeRef::floatn(4),
            vec![Stmt::ret(Expr::call("shade", vec![]))],
        )
        .build();
    let compiler = compiler_for(vec![derived, base]);

    let result = compiler.compile(&ShaderSource::class("B"), &[]).unwrap();
    assert!(result.succeeded(), "{:?}", result.diagnostics);

    let shader = result.shader.unwrap();
    let shades: Vec<&Declaration> = shader
        .declarations
        .iter()
        .filter(|d| d.name == "shade")
        .collect();
    assert_eq!(shades.len(), 1);
    assert_eq!(shades[0].as_method().unwrap().body, vec![Stmt::Return(None)]);
}

#[test]
fn sampler_state_block_parses_with_defaults() {
    let class = ClassBuilder::new("Tex")
        .decl(Declaration {
            name: "aniso".into(),
            span: Default::default(),
            qualifiers: StorageQualifiers::empty(),
            attributes: vec![AttributeNode::new(
                "Link",
                vec![Literal::Str("Tex.Aniso".into())],
            )],
            kind: DeclKind::Variable(VariableDef {
                ty: TypeRef::Object(ObjectType::SamplerState),
                init: Some(Expr::StateBlock(vec![
                    StateEntry {
                        key: "Filter".into(),
                        value: StateValue::Word("ANISOTROPIC".into()),
                        span: Default::default(),
                    },
                    StateEntry {
                        key: "MaxAnisotropy".into(),
                        value: StateValue::Scalar(4.0),
                        span: Default::default(),
                    },
                ])),
                buffer: None,
            }),
        })
        .entry_method("psMain", ShaderStage::Pixel, TypeRef::floatn(4), vec![])
        .build();
    let compiler = compiler_for(vec![class]);

    let result = compiler.compile(&ShaderSource::class("Tex"), &[]).unwrap();
    assert!(result.succeeded());
    assert_eq!(result.diagnostics.entries().len(), 0);

    let reflection = result.reflection.unwrap();
    let sampler = &reflection.samplers[0];
    assert_eq!(sampler.filter, Filter::Anisotropic);
    assert_eq!(sampler.max_anisotropy, 4);
    assert_eq!(sampler.min_lod, 0.0);
    assert_eq!(sampler.max_lod, f32::MAX);
    assert_eq!(
        reflection.resource("Tex.Aniso").unwrap().class,
        BindingClass::Sampler
    );
}

#[test]
fn invalidating_an_unrelated_class_leaves_the_cache_alone() {
    let compiler = compiler_for(vec![
        solid_entry("Kept", ShaderStage::Pixel).build(),
    ]);
    compiler
        .compile(&ShaderSource::class("Kept"), &[])
        .unwrap();
    let before = compiler.cached_classes();

    assert_eq!(compiler.invalidate(&["SomethingElse"]), 0);
    assert_eq!(compiler.cached_classes(), before);

    assert_eq!(compiler.invalidate(&["Kept"]), 1);
    assert!(compiler.cached_classes().is_empty());
}

#[test]
fn entry_points_are_recorded_per_stage() {
    let class = ClassBuilder::new("Full")
        .entry_method("vsMain", ShaderStage::Vertex, TypeRef::floatn(4), vec![])
        .entry_method("psMain", ShaderStage::Pixel, TypeRef::floatn(4), vec![])
        .build();
    let compiler = compiler_for(vec![class]);

    let result = compiler.compile(&ShaderSource::class("Full"), &[]).unwrap();
    let reflection = result.reflection.unwrap();
    assert_eq!(reflection.entry_point(ShaderStage::Vertex), Some("vsMain"));
    assert_eq!(reflection.entry_point(ShaderStage::Pixel), Some("psMain"));
    assert_eq!(reflection.entry_point(ShaderStage::Compute), None);
}

#[test]
fn cleaned_tree_carries_no_internal_metadata() {
    let class = ClassBuilder::new("S")
        .qualified_var(
            "normal",
            TypeRef::floatn(3),
            StorageQualifiers::STREAM,
            None,
        )
        .bound_var("tint", TypeRef::floatn(4), "S.Tint")
        .entry_method(
            "psMain",
            ShaderStage::Pixel,
            TypeRef::floatn(4),
            vec![Stmt::ret(Expr::Binary {
                op: mixsl_ast::BinaryOp::Mul,
                lhs: Box::new(Expr::ident("tint")),
                rhs: Box::new(Expr::call("float4", vec![Expr::ident("normal")])),
            })],
        )
        .build();
    let compiler = compiler_for(vec![class]);

    let result = compiler.compile(&ShaderSource::class("S"), &[]).unwrap();
    assert!(result.succeeded());

    let shader = result.shader.unwrap();
    for decl in &shader.declarations {
        assert!(
            !decl.qualifiers.intersects(StorageQualifiers::INTERNAL),
            "{} still carries internal qualifiers",
            decl.name
        );
        for attr in &decl.attributes {
            assert!(!mixsl_ast::Attribute::is_reserved(&attr.name));
        }
    }

    // the stream variable reached reflection before cleaning
    let reflection = result.reflection.unwrap();
    assert_eq!(reflection.stream_outputs.len(), 1);
}

#[test]
fn macros_select_a_different_base() {
    // the same class text compiles against two different bases depending
    // on the macro set
    let fast = ClassBuilder::new("FastLight")
        .method("intensity", TypeRef::float(), vec![Stmt::Return(None)])
        .build();
    let rich = ClassBuilder::new("RichLight")
        .method("intensity", TypeRef::float(), vec![Stmt::Return(None)])
        .build();
    let store = MemoryStore::new();
    store.add(
        "Shading",
        r#"{"name": "Shading", "bases": ["${LIGHT_MODEL}"]}"#,
    );
    store.add("FastLight", &serde_json::to_string(&fast).unwrap());
    store.add("RichLight", &serde_json::to_string(&rich).unwrap());
    let compiler = EffectCompiler::new(Arc::new(store), Arc::new(JsonParser::new()));

    let fast_result = compiler
        .compile(
            &ShaderSource::class("Shading"),
            &[ShaderMacro::new("LIGHT_MODEL", "FastLight")],
        )
        .unwrap();
    assert!(fast_result.succeeded(), "{:?}", fast_result.diagnostics);
    assert!(
        fast_result
            .source_hashes
            .iter()
            .any(|(name, _)| name == "FastLight")
    );

    let rich_result = compiler
        .compile(
            &ShaderSource::class("Shading"),
            &[ShaderMacro::new("LIGHT_MODEL", "RichLight")],
        )
        .unwrap();
    assert!(rich_result.succeeded(), "{:?}", rich_result.diagnostics);
    assert!(
        rich_result
            .source_hashes
            .iter()
            .any(|(name, _)| name == "RichLight")
    );
}

#[test]
fn stage_slots_resolve_to_one_shared_instance() {
    let env_base = ClassBuilder::new("EnvBase").build();
    let sky = ClassBuilder::new("Sky")
        .bound_var("horizon", TypeRef::floatn(4), "Sky.Horizon")
        .build();
    let fog = ClassBuilder::new("Fog")
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
    let root = ClassBuilder::new("Scene")
        .stage_compose("env", "EnvBase")
        .compose("fog", "Fog")
        .entry_method(
            "psMain",
            ShaderStage::Pixel,
            TypeRef::floatn(4),
            vec![Stmt::ret(Expr::Call {
                callee: Box::new(Expr::member("fog", "apply")),
                args: vec![],
            })],
        )
        .build();
    let compiler = compiler_for(vec![root, env_base, sky, fog]);

    let source = ShaderSource::mixin(
        "Scene",
        vec![
            ("env".into(), ShaderSource::class("Sky")),
            ("fog".into(), ShaderSource::class("Fog")),
        ],
    );
    let result = compiler.compile(&source, &[]).unwrap();
    assert!(result.succeeded(), "{:?}", result.diagnostics);

    // exactly one copy of the shared environment in the final tree
    let shader = result.shader.unwrap();
    let horizons: Vec<&Declaration> = shader
        .declarations
        .iter()
        .filter(|d| d.name.ends_with("horizon"))
        .collect();
    assert_eq!(horizons.len(), 1);
}
