//! Linking: binding classification and constant-buffer layout
//!
//! Walks the simplified tree and fills the reflection description. Every
//! declaration carrying a bind name is classified; non-opaque types pack
//! into the member list of the constant buffer implied by their
//! declaration context (the default buffer when none is named), opaque
//! types become top-level resource bindings, and inline sampler-state
//! initializers are parsed key by key into structured descriptions.
//!
//! Packing reproduces standard constant-buffer rules: scalars are 4
//! bytes (8 for doubles), vectors are dimension times element size with
//! two-component vectors aligned to twice the element and wider vectors
//! to a full register, matrices are `4*(cols-1)+rows` words, and a
//! member that would land past a 16-byte boundary is padded forward to
//! the next one before being placed.

use crate::diag::{Code, Diagnostics};
use crate::mixer::ShaderIr;
use crate::reflection::{
    AddressMode, BindingClass, ComparisonFunc, ConstantBufferDesc, EffectReflection, Filter,
    MemberDesc, ResourceBindingDesc, SamplerStateDesc, StreamOutputDesc,
};
use mixsl_ast::{
    DeclKind, Declaration, Expr, ObjectType, StateEntry, StateValue, StorageQualifiers, StructField,
    TypeRef,
};
use rustc_hash::FxHashMap;

/// Name of the constant buffer collecting loose bound variables
pub const DEFAULT_BUFFER: &str = "Globals";

/// Fills the reflection skeleton from the simplified tree.
pub fn link(
    ir: &ShaderIr,
    mut reflection: EffectReflection,
    diags: &mut Diagnostics,
) -> EffectReflection {
    let structs = collect_structs(ir);
    let mut default_members: Vec<&Declaration> = Vec::new();

    for decl in &ir.declarations {
        if decl
            .qualifiers
            .intersects(StorageQualifiers::STREAM | StorageQualifiers::PATCH_STREAM)
        {
            if let Some(var) = decl.as_variable() {
                reflection.stream_outputs.push(StreamOutputDesc {
                    name: decl.name.clone(),
                    ty: var.ty.to_string(),
                });
            }
        }

        match &decl.kind {
            DeclKind::ConstantBuffer { members } => {
                let bind_name = decl.link_name().unwrap_or(&decl.name).to_string();
                let desc = pack_buffer(&decl.name, members, &structs, diags);
                reflection.constant_buffers.push(desc);
                reflection.resources.push(ResourceBindingDesc {
                    bind_name,
                    class: BindingClass::ConstantBuffer,
                    slot_count: 1,
                });
            }
            DeclKind::Variable(var) => {
                let Some(bind_name) = decl.link_name() else {
                    continue;
                };
                let (elem, slots) = unwrap_array(&var.ty);
                match elem {
                    TypeRef::Object(object) => {
                        link_object(
                            &mut reflection,
                            decl,
                            *object,
                            bind_name,
                            slots,
                            diags,
                        );
                    }
                    _ => match classify_value(elem, decl.is_color(), &structs) {
                        Some(_) => default_members.push(decl),
                        None => diags.report(
                            Code::UnclassifiedType,
                            decl.span.clone(),
                            format!("cannot classify type {} of {}", var.ty, decl.name),
                        ),
                    },
                }
            }
            _ => {}
        }
    }

    if !default_members.is_empty() {
        let members: Vec<Declaration> = default_members.into_iter().cloned().collect();
        let desc = pack_buffer(DEFAULT_BUFFER, &members, &structs, diags);
        reflection.constant_buffers.push(desc);
        reflection.resources.push(ResourceBindingDesc {
            bind_name: DEFAULT_BUFFER.to_string(),
            class: BindingClass::ConstantBuffer,
            slot_count: 1,
        });
    }

    reflection
}

fn link_object(
    reflection: &mut EffectReflection,
    decl: &Declaration,
    object: ObjectType,
    bind_name: &str,
    slots: u32,
    diags: &mut Diagnostics,
) {
    let class = match object {
        ObjectType::SamplerState => {
            reflection
                .samplers
                .push(parse_sampler_state(decl, bind_name, diags));
            BindingClass::Sampler
        }
        ObjectType::SamplerComparisonState => {
            reflection
                .samplers
                .push(parse_sampler_state(decl, bind_name, diags));
            BindingClass::SamplerComparison
        }
        ObjectType::TextureBuffer => BindingClass::TextureBuffer,
        o if o.is_texture() => BindingClass::Texture(o),
        o => BindingClass::Buffer(o),
    };
    reflection.resources.push(ResourceBindingDesc {
        bind_name: bind_name.to_string(),
        class,
        slot_count: slots,
    });
}

fn collect_structs(ir: &ShaderIr) -> FxHashMap<String, Vec<StructField>> {
    let mut structs = FxHashMap::default();
    for decl in &ir.declarations {
        if let DeclKind::Struct { fields } = &decl.kind {
            structs.insert(decl.name.clone(), fields.clone());
        }
    }
    structs
}

fn unwrap_array(ty: &TypeRef) -> (&TypeRef, u32) {
    match ty {
        TypeRef::Array { elem, len } => (elem, *len),
        _ => (ty, 1),
    }
}

/// Classifies a non-opaque type, `None` when it cannot be classified.
fn classify_value(
    ty: &TypeRef,
    is_color: bool,
    structs: &FxHashMap<String, Vec<StructField>>,
) -> Option<BindingClass> {
    match ty {
        TypeRef::Scalar(_) => Some(BindingClass::Scalar),
        TypeRef::Vector { .. } if is_color => Some(BindingClass::ColorVector),
        TypeRef::Vector { .. } => Some(BindingClass::Vector),
        TypeRef::Matrix { .. } => Some(BindingClass::Matrix),
        TypeRef::Named(name) => structs.contains_key(name).then_some(BindingClass::Struct),
        TypeRef::Array { elem, .. } => classify_value(elem, is_color, structs),
        TypeRef::Void | TypeRef::Object(_) => None,
    }
}

fn round_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// Byte size of a non-opaque type under constant-buffer packing.
fn byte_size(ty: &TypeRef, structs: &FxHashMap<String, Vec<StructField>>) -> Option<u32> {
    match ty {
        TypeRef::Scalar(kind) => Some(kind.byte_size()),
        TypeRef::Vector { elem, dim } => Some(dim * elem.byte_size()),
        TypeRef::Matrix { elem, rows, cols } => Some((4 * (cols - 1) + rows) * elem.byte_size()),
        TypeRef::Named(name) => {
            let fields = structs.get(name)?;
            let mut cursor = 0;
            for field in fields {
                let size = byte_size(&field.ty, structs)?;
                let align = align_of(&field.ty, structs);
                cursor = round_up(cursor, align) + size;
            }
            Some(round_up(cursor, 16))
        }
        TypeRef::Array { elem, len } => {
            let elem_size = byte_size(elem, structs)?;
            let stride = round_up(elem_size, 16);
            Some(stride * (len - 1) + elem_size)
        }
        TypeRef::Void | TypeRef::Object(_) => None,
    }
}

/// Packing alignment of a non-opaque type. Scalars align to their own
/// size, two-component vectors to twice the element, anything wider to a
/// full 16-byte register.
fn align_of(ty: &TypeRef, _structs: &FxHashMap<String, Vec<StructField>>) -> u32 {
    match ty {
        TypeRef::Scalar(kind) => kind.byte_size(),
        TypeRef::Vector { elem, dim } => {
            if *dim == 2 {
                2 * elem.byte_size()
            } else {
                4 * elem.byte_size()
            }
        }
        _ => 16,
    }
}

fn pack_buffer(
    name: &str,
    members: &[Declaration],
    structs: &FxHashMap<String, Vec<StructField>>,
    diags: &mut Diagnostics,
) -> ConstantBufferDesc {
    let mut packed = Vec::with_capacity(members.len());
    let mut cursor: u32 = 0;

    for member in members {
        let Some(var) = member.as_variable() else {
            continue;
        };
        let Some(class) = classify_value(&var.ty, member.is_color(), structs) else {
            diags.report(
                Code::UnclassifiedType,
                member.span.clone(),
                format!("cannot place {} in constant buffer {name}", member.name),
            );
            continue;
        };
        let Some(size) = byte_size(&var.ty, structs) else {
            diags.report(
                Code::UnclassifiedType,
                member.span.clone(),
                format!("cannot size {} in constant buffer {name}", member.name),
            );
            continue;
        };
        let offset = round_up(cursor, align_of(&var.ty, structs));
        cursor = offset + size;
        packed.push(MemberDesc {
            name: member.name.clone(),
            bind_name: member.link_name().unwrap_or(&member.name).to_string(),
            class,
            offset,
            size,
        });
    }

    ConstantBufferDesc {
        name: name.to_string(),
        members: packed,
        size: round_up(cursor, 16),
    }
}

fn parse_sampler_state(
    decl: &Declaration,
    bind_name: &str,
    diags: &mut Diagnostics,
) -> SamplerStateDesc {
    let mut desc = SamplerStateDesc::with_defaults(bind_name);
    let entries = match decl.as_variable().and_then(|v| v.init.as_ref()) {
        Some(Expr::StateBlock(entries)) => entries,
        _ => return desc,
    };

    for entry in entries {
        parse_sampler_entry(&mut desc, entry, diags);
    }
    desc
}

fn parse_sampler_entry(desc: &mut SamplerStateDesc, entry: &StateEntry, diags: &mut Diagnostics) {
    let bad_value = |diags: &mut Diagnostics| {
        diags.report(
            Code::BadSamplerValue,
            entry.span.clone(),
            format!("invalid value for sampler-state key {}", entry.key),
        );
    };

    match entry.key.as_str() {
        "Filter" => match word(&entry.value).and_then(parse_filter) {
            Some(filter) => desc.filter = filter,
            None => bad_value(diags),
        },
        "ComparisonFunc" => match word(&entry.value).and_then(parse_comparison) {
            Some(func) => desc.comparison = func,
            None => bad_value(diags),
        },
        "AddressU" => match word(&entry.value).and_then(parse_address) {
            Some(mode) => desc.address_u = mode,
            None => bad_value(diags),
        },
        "AddressV" => match word(&entry.value).and_then(parse_address) {
            Some(mode) => desc.address_v = mode,
            None => bad_value(diags),
        },
        "AddressW" => match word(&entry.value).and_then(parse_address) {
            Some(mode) => desc.address_w = mode,
            None => bad_value(diags),
        },
        "BorderColor" => match &entry.value {
            StateValue::Tuple(values) if values.len() == 4 => {
                for (slot, value) in desc.border_color.iter_mut().zip(values) {
                    *slot = *value as f32;
                }
            }
            _ => bad_value(diags),
        },
        "MinLOD" => match &entry.value {
            StateValue::Scalar(v) => desc.min_lod = *v as f32,
            _ => bad_value(diags),
        },
        "MaxLOD" => match &entry.value {
            StateValue::Scalar(v) => desc.max_lod = *v as f32,
            _ => bad_value(diags),
        },
        "MaxAnisotropy" => match &entry.value {
            StateValue::Scalar(v) if *v >= 1.0 => desc.max_anisotropy = *v as u32,
            _ => bad_value(diags),
        },
        _ => {
            diags.report(
                Code::UnknownSamplerKey,
                entry.span.clone(),
                format!("unrecognized sampler-state key {}", entry.key),
            );
        }
    }
}

fn word(value: &StateValue) -> Option<&str> {
    match value {
        StateValue::Word(word) => Some(word),
        _ => None,
    }
}

fn parse_filter(word: &str) -> Option<Filter> {
    match word {
        "POINT" | "MIN_MAG_MIP_POINT" => Some(Filter::Point),
        "LINEAR" | "MIN_MAG_MIP_LINEAR" => Some(Filter::Linear),
        "ANISOTROPIC" => Some(Filter::Anisotropic),
        _ => None,
    }
}

fn parse_comparison(word: &str) -> Option<ComparisonFunc> {
    match word {
        "NEVER" => Some(ComparisonFunc::Never),
        "LESS" => Some(ComparisonFunc::Less),
        "EQUAL" => Some(ComparisonFunc::Equal),
        "LESS_EQUAL" => Some(ComparisonFunc::LessEqual),
        "GREATER" => Some(ComparisonFunc::Greater),
        "NOT_EQUAL" => Some(ComparisonFunc::NotEqual),
        "GREATER_EQUAL" => Some(ComparisonFunc::GreaterEqual),
        "ALWAYS" => Some(ComparisonFunc::Always),
        _ => None,
    }
}

fn parse_address(word: &str) -> Option<AddressMode> {
    match word {
        "WRAP" => Some(AddressMode::Wrap),
        "MIRROR" => Some(AddressMode::Mirror),
        "CLAMP" => Some(AddressMode::Clamp),
        "BORDER" => Some(AddressMode::Border),
        _ => None,
    }
}
