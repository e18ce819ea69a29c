//! Shared preprocessing and semantic analysis
//!
//! Preprocessing validates attributes and builds the per-mixin
//! virtual-method tables that resolve calls across inheritance
//! boundaries. Analysis resolves identifiers, checks storage qualifiers,
//! and records the reference lists the navigation entry point reuses.
//!
//! Diagnostics re-run for every request; only the computed tables are
//! cached, inside each mixin's own once-cell, so concurrent requests
//! sharing the loader cache never observe a half-built table.

use crate::diag::{Code, Diagnostics};
use crate::loader::{LoadSet, MixinInfo};
use mixsl_ast::{
    Attribute, DeclKind, Declaration, Expr, Span, StorageQualifiers, Stmt,
};
use rustc_hash::FxHashMap;

/// Names resolvable in any shader without a declaration: intrinsic
/// functions and vector/matrix constructors.
const BUILTINS: &[&str] = &[
    "abs", "clamp", "cos", "cross", "dot", "exp", "floor", "frac", "length", "lerp", "log", "mad",
    "max", "min", "mul", "normalize", "pow", "reflect", "saturate", "sample", "sin", "smoothstep",
    "sqrt", "step", "tan", "transpose", "bool2", "bool3", "bool4", "int2", "int3", "int4", "uint2",
    "uint3", "uint4", "float2", "float3", "float4", "float2x2", "float3x3", "float4x4", "double2",
    "double3", "double4",
];

/// One name's definition and the places referring to it
#[derive(Debug, Clone)]
pub struct Reference {
    /// Referenced declaration name
    pub name: String,
    /// Where the declaration lives
    pub def_span: Span,
    /// Every recorded use site
    pub spans: Vec<Span>,
}

/// Per-mixin analysis output
#[derive(Debug, Default)]
pub struct Analysis {
    /// Reference records for tooling (go-to-definition)
    pub references: Vec<Reference>,
}

/// Type and qualifier processing shared by one compile request
pub struct CompilationContext<'a> {
    set: &'a LoadSet,
}

impl<'a> CompilationContext<'a> {
    /// Creates a context over the closed mixin set of one request.
    pub fn new(set: &'a LoadSet) -> Self {
        CompilationContext { set }
    }

    /// Validates attributes and builds the virtual-method tables.
    ///
    /// The caller serializes this step across requests; analysis may then
    /// run for independent mixins in parallel.
    pub fn preprocess(&self, diags: &mut Diagnostics) {
        for info in self.set.iter() {
            self.check_attributes(&info.class.declarations, diags);
            info.method_table
                .get_or_init(|| self.build_method_table(info));
        }
    }

    fn check_attributes(&self, decls: &[Declaration], diags: &mut Diagnostics) {
        for decl in decls {
            for node in &decl.attributes {
                if let Err(err) = Attribute::classify(node) {
                    diags.report(
                        Code::MalformedAttribute,
                        node.span.clone(),
                        format!("{err:?} on declaration {}", decl.name),
                    );
                }
            }
            if let DeclKind::ConstantBuffer { members } = &decl.kind {
                self.check_attributes(members, diags);
            }
        }
    }

    fn build_method_table(&self, info: &MixinInfo) -> FxHashMap<String, String> {
        let mut table = FxHashMap::default();
        for link in self.set.chain(&info.class_name) {
            for decl in &link.class.declarations {
                if decl.as_method().is_some() {
                    table.insert(decl.name.clone(), link.class_name.clone());
                }
            }
        }
        table
    }

    /// The most-derived class defining `method` as visible from `class`.
    pub fn resolve_method(&self, class: &str, method: &str) -> Option<String> {
        let info = self.set.get(class)?;
        info.method_table.get()?.get(method).cloned()
    }

    /// Resolves names, checks storage qualifiers, and records reference
    /// lists for one mixin. Safe to run for independent mixins in
    /// parallel once preprocessing completed.
    pub fn analyze(&self, info: &MixinInfo, diags: &mut Diagnostics) {
        self.check_qualifiers(info, diags);
        self.check_overloads(info, diags);

        let scope = self.chain_scope(info);
        let mut references: FxHashMap<String, Reference> = FxHashMap::default();

        for decl in &info.class.declarations {
            match &decl.kind {
                DeclKind::Method(method) => {
                    let mut locals: Vec<String> =
                        method.params.iter().map(|p| p.name.clone()).collect();
                    for stmt in &method.body {
                        self.analyze_stmt(stmt, &scope, &mut locals, &mut references, diags);
                    }
                }
                DeclKind::Variable(var) => {
                    if let Some(init) = &var.init {
                        self.analyze_expr(init, &scope, &[], &mut references, diags);
                    }
                }
                _ => {}
            }
        }

        let mut references: Vec<Reference> = references.into_values().collect();
        references.sort_by(|a, b| a.name.cmp(&b.name));
        let _ = info.analysis.set(Analysis { references });
    }

    /// Every name declared across the class's inheritance chain, with its
    /// definition span.
    fn chain_scope(&self, info: &MixinInfo) -> FxHashMap<String, Span> {
        let mut scope = FxHashMap::default();
        for link in self.set.chain(&info.class_name) {
            for decl in &link.class.declarations {
                scope.insert(decl.name.clone(), decl.span.clone());
                if let DeclKind::ConstantBuffer { members } = &decl.kind {
                    for member in members {
                        scope.insert(member.name.clone(), member.span.clone());
                    }
                }
            }
        }
        scope
    }

    fn check_qualifiers(&self, info: &MixinInfo, diags: &mut Diagnostics) {
        for decl in &info.class.declarations {
            let q = decl.qualifiers;
            let misuse = |diags: &mut Diagnostics, what: &str| {
                diags.report(
                    Code::QualifierMisuse,
                    decl.span.clone(),
                    format!("{what} on declaration {}", decl.name),
                );
            };
            match &decl.kind {
                DeclKind::Variable(var) => {
                    if q.is_compose() && var.ty.named_class().is_none() {
                        misuse(diags, "compose qualifier without a class type");
                    }
                    if q.contains(StorageQualifiers::STREAM) && var.buffer.is_some() {
                        misuse(diags, "stream qualifier inside a constant buffer");
                    }
                }
                DeclKind::Method(_) => {
                    if q.intersects(
                        StorageQualifiers::STREAM
                            | StorageQualifiers::PATCH_STREAM
                            | StorageQualifiers::GROUPSHARED
                            | StorageQualifiers::COMPOSE,
                    ) {
                        misuse(diags, "variable-only qualifier");
                    }
                    let inherited = self
                        .set
                        .chain(&info.class_name)
                        .iter()
                        .filter(|link| link.class_name != info.class_name)
                        .any(|link| {
                            link.class
                                .find(&decl.name)
                                .is_some_and(|d| d.as_method().is_some())
                        });
                    if q.contains(StorageQualifiers::OVERRIDE) && !inherited {
                        misuse(diags, "override qualifier with no inherited method");
                    }
                    if !q.contains(StorageQualifiers::OVERRIDE) && inherited {
                        diags.report(
                            Code::OverrideNotMarked,
                            decl.span.clone(),
                            format!(
                                "method {} replaces an inherited definition without the override qualifier",
                                decl.name
                            ),
                        );
                    }
                }
                DeclKind::ConstantBuffer { members } => {
                    for member in members {
                        if member
                            .qualifiers
                            .intersects(StorageQualifiers::STREAM | StorageQualifiers::PATCH_STREAM)
                        {
                            diags.report(
                                Code::QualifierMisuse,
                                member.span.clone(),
                                format!(
                                    "stream qualifier inside constant buffer {}",
                                    decl.name
                                ),
                            );
                        }
                    }
                }
                DeclKind::Struct { .. } => {
                    if q.intersects(StorageQualifiers::INTERNAL) {
                        misuse(diags, "storage qualifier on a struct type");
                    }
                }
            }
        }
    }

    fn check_overloads(&self, info: &MixinInfo, diags: &mut Diagnostics) {
        let methods: Vec<&Declaration> = info
            .class
            .declarations
            .iter()
            .filter(|d| d.as_method().is_some())
            .collect();
        for (i, a) in methods.iter().enumerate() {
            if methods[..i].iter().any(|b| b.name == a.name) {
                diags.report(
                    Code::AmbiguousOverload,
                    a.span.clone(),
                    format!("method {} declared more than once in {}", a.name, info.class_name),
                );
            }
        }
    }

    fn analyze_stmt(
        &self,
        stmt: &Stmt,
        scope: &FxHashMap<String, Span>,
        locals: &mut Vec<String>,
        references: &mut FxHashMap<String, Reference>,
        diags: &mut Diagnostics,
    ) {
        match stmt {
            Stmt::Local { name, init, .. } => {
                if let Some(init) = init {
                    self.analyze_expr(init, scope, locals, references, diags);
                }
                locals.push(name.clone());
            }
            Stmt::Expr(expr) => self.analyze_expr(expr, scope, locals, references, diags),
            Stmt::Assign { target, value } => {
                self.analyze_expr(target, scope, locals, references, diags);
                self.analyze_expr(value, scope, locals, references, diags);
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.analyze_expr(cond, scope, locals, references, diags);
                let depth = locals.len();
                for stmt in then_branch {
                    self.analyze_stmt(stmt, scope, locals, references, diags);
                }
                locals.truncate(depth);
                if let Some(else_branch) = else_branch {
                    for stmt in else_branch {
                        self.analyze_stmt(stmt, scope, locals, references, diags);
                    }
                    locals.truncate(depth);
                }
            }
            Stmt::Return(Some(expr)) => self.analyze_expr(expr, scope, locals, references, diags),
            Stmt::Return(None) => {}
        }
    }

    fn analyze_expr(
        &self,
        expr: &Expr,
        scope: &FxHashMap<String, Span>,
        locals: &[String],
        references: &mut FxHashMap<String, Reference>,
        diags: &mut Diagnostics,
    ) {
        match expr {
            Expr::Ident { name, span } => {
                if let Some(def_span) = scope.get(name) {
                    if !span.is_unknown() {
                        references
                            .entry(name.clone())
                            .or_insert_with(|| Reference {
                                name: name.clone(),
                                def_span: def_span.clone(),
                                spans: Vec::new(),
                            })
                            .spans
                            .push(span.clone());
                    }
                } else if !locals.iter().any(|l| l == name) && !BUILTINS.contains(&name.as_str()) {
                    diags.report(
                        Code::UnresolvedIdentifier,
                        span.clone(),
                        format!("unresolved identifier {name}"),
                    );
                }
            }
            Expr::Member { base, .. } => {
                // members resolve against the base's type (or, for slots,
                // the composed class) at mix time; only the base is checked
                self.analyze_expr(base, scope, locals, references, diags);
            }
            Expr::Index { base, index } => {
                self.analyze_expr(base, scope, locals, references, diags);
                self.analyze_expr(index, scope, locals, references, diags);
            }
            Expr::Call { callee, args } => {
                self.analyze_expr(callee, scope, locals, references, diags);
                for arg in args {
                    self.analyze_expr(arg, scope, locals, references, diags);
                }
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.analyze_expr(lhs, scope, locals, references, diags);
                self.analyze_expr(rhs, scope, locals, references, diags);
            }
            Expr::Literal(_) | Expr::StateBlock(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Diagnostics;
    use crate::loader::Loader;
    use crate::parse::JsonParser;
    use crate::source::ShaderSource;
    use crate::store::MemoryStore;
    use mixsl_ast::{ClassBuilder, ClassDecl, Expr, Stmt, StorageQualifiers, TypeRef};
    use std::sync::Arc;

    fn load(classes: Vec<ClassDecl>) -> (crate::loader::LoadSet, Diagnostics) {
        let store = MemoryStore::new();
        let root = classes[0].name.clone();
        for class in &classes {
            store.add(&class.name, &serde_json::to_string(class).unwrap());
        }
        let loader = Loader::new(Arc::new(store), Arc::new(JsonParser::new()));
        let mut diags = Diagnostics::new();
        let set = loader.load(&ShaderSource::class(&root), &[], &mut diags);
        (set, diags)
    }

    #[test]
    fn test_method_table_prefers_most_derived() {
        let base = ClassBuilder::new("Base")
            .method("shade", TypeRef::floatn(4), vec![])
            .build();
        let derived = ClassBuilder::new("Derived")
            .base("Base")
            .full_method(
                "shade",
                StorageQualifiers::OVERRIDE,
                vec![],
                TypeRef::floatn(4),
                vec![],
            )
            .build();
        let (set, mut diags) = load(vec![derived, base]);
        let ctx = CompilationContext::new(&set);
        ctx.preprocess(&mut diags);
        assert_eq!(
            ctx.resolve_method("Derived", "shade").as_deref(),
            Some("Derived")
        );
        assert_eq!(
            ctx.resolve_method("Base", "shade").as_deref(),
            Some("Base")
        );
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_unresolved_identifier_reported() {
        let class = ClassBuilder::new("Bad")
            .method(
                "run",
                TypeRef::float(),
                vec![Stmt::ret(Expr::ident("missing"))],
            )
            .build();
        let (set, mut diags) = load(vec![class]);
        let ctx = CompilationContext::new(&set);
        ctx.preprocess(&mut diags);
        ctx.analyze(set.get("Bad").unwrap(), &mut diags);
        assert_eq!(diags.with_code(Code::UnresolvedIdentifier).count(), 1);
    }

    #[test]
    fn test_builtins_resolve() {
        let class = ClassBuilder::new("Ok")
            .var("color", TypeRef::floatn(4))
            .method(
                "run",
                TypeRef::floatn(4),
                vec![Stmt::ret(Expr::call(
                    "normalize",
                    vec![Expr::ident("color")],
                ))],
            )
            .build();
        let (set, mut diags) = load(vec![class]);
        let ctx = CompilationContext::new(&set);
        ctx.preprocess(&mut diags);
        ctx.analyze(set.get("Ok").unwrap(), &mut diags);
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_override_without_marker_warns() {
        let base = ClassBuilder::new("Base")
            .method("shade", TypeRef::floatn(4), vec![])
            .build();
        let derived = ClassBuilder::new("Derived")
            .base("Base")
            .method("shade", TypeRef::floatn(4), vec![])
            .build();
        let (set, mut diags) = load(vec![derived, base]);
        let ctx = CompilationContext::new(&set);
        ctx.preprocess(&mut diags);
        ctx.analyze(set.get("Derived").unwrap(), &mut diags);
        assert_eq!(diags.with_code(Code::OverrideNotMarked).count(), 1);
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_duplicate_method_is_ambiguous() {
        let class = ClassBuilder::new("Twice")
            .method("f", TypeRef::float(), vec![])
            .method("f", TypeRef::float(), vec![])
            .build();
        let (set, mut diags) = load(vec![class]);
        let ctx = CompilationContext::new(&set);
        ctx.preprocess(&mut diags);
        ctx.analyze(set.get("Twice").unwrap(), &mut diags);
        assert_eq!(diags.with_code(Code::AmbiguousOverload).count(), 1);
    }

    #[test]
    fn test_compose_needs_class_type() {
        let class = ClassBuilder::new("Bad")
            .qualified_var(
                "slot",
                TypeRef::float(),
                StorageQualifiers::COMPOSE,
                None,
            )
            .build();
        let (set, mut diags) = load(vec![class]);
        let ctx = CompilationContext::new(&set);
        ctx.preprocess(&mut diags);
        ctx.analyze(set.get("Bad").unwrap(), &mut diags);
        assert_eq!(diags.with_code(Code::QualifierMisuse).count(), 1);
    }
}
