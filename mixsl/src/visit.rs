//! Small tree-walking helpers shared by the mixer, simplifier, and linker

use mixsl_ast::{DeclKind, Declaration, Expr, Stmt};

/// Applies `f` to every expression under a declaration, bottom-up.
pub(crate) fn visit_decl_exprs_mut(decl: &mut Declaration, f: &mut dyn FnMut(&mut Expr)) {
    match &mut decl.kind {
        DeclKind::Variable(var) => {
            if let Some(init) = &mut var.init {
                visit_expr_mut(init, f);
            }
        }
        DeclKind::Method(method) => {
            for stmt in &mut method.body {
                visit_stmt_mut(stmt, f);
            }
        }
        DeclKind::ConstantBuffer { members } => {
            for member in members {
                visit_decl_exprs_mut(member, f);
            }
        }
        DeclKind::Struct { .. } => {}
    }
}

pub(crate) fn visit_stmt_mut(stmt: &mut Stmt, f: &mut dyn FnMut(&mut Expr)) {
    match stmt {
        Stmt::Local { init, .. } => {
            if let Some(init) = init {
                visit_expr_mut(init, f);
            }
        }
        Stmt::Expr(expr) => visit_expr_mut(expr, f),
        Stmt::Assign { target, value } => {
            visit_expr_mut(target, f);
            visit_expr_mut(value, f);
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            visit_expr_mut(cond, f);
            for stmt in then_branch {
                visit_stmt_mut(stmt, f);
            }
            if let Some(else_branch) = else_branch {
                for stmt in else_branch {
                    visit_stmt_mut(stmt, f);
                }
            }
        }
        Stmt::Return(Some(expr)) => visit_expr_mut(expr, f),
        Stmt::Return(None) => {}
    }
}

pub(crate) fn visit_expr_mut(expr: &mut Expr, f: &mut dyn FnMut(&mut Expr)) {
    match expr {
        Expr::Member { base, .. } => visit_expr_mut(base, f),
        Expr::Index { base, index } => {
            visit_expr_mut(base, f);
            visit_expr_mut(index, f);
        }
        Expr::Call { callee, args } => {
            visit_expr_mut(callee, f);
            for arg in args {
                visit_expr_mut(arg, f);
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            visit_expr_mut(lhs, f);
            visit_expr_mut(rhs, f);
        }
        Expr::Literal(_) | Expr::Ident { .. } | Expr::StateBlock(_) => {}
    }
    f(expr);
}

/// Collects every identifier referenced under a declaration into `out`.
pub(crate) fn collect_referenced_names(decl: &Declaration, out: &mut Vec<String>) {
    let mut record = |expr: &Expr| {
        if let Expr::Ident { name, .. } = expr {
            if !out.iter().any(|n| n == name) {
                out.push(name.clone());
            }
        }
    };
    visit_decl_exprs(decl, &mut record);

    // type references count as uses too (structs, nested arrays)
    match &decl.kind {
        DeclKind::Variable(var) => collect_type_names(&var.ty, out),
        DeclKind::Method(method) => {
            collect_type_names(&method.ret, out);
            for param in &method.params {
                collect_type_names(&param.ty, out);
            }
            for stmt in &method.body {
                collect_stmt_type_names(stmt, out);
            }
        }
        DeclKind::ConstantBuffer { members } => {
            for member in members {
                collect_referenced_names(member, out);
            }
        }
        DeclKind::Struct { fields } => {
            for field in fields {
                collect_type_names(&field.ty, out);
            }
        }
    }
}

fn collect_stmt_type_names(stmt: &Stmt, out: &mut Vec<String>) {
    match stmt {
        Stmt::Local { ty, .. } => collect_type_names(ty, out),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            for stmt in then_branch {
                collect_stmt_type_names(stmt, out);
            }
            if let Some(else_branch) = else_branch {
                for stmt in else_branch {
                    collect_stmt_type_names(stmt, out);
                }
            }
        }
        _ => {}
    }
}

fn collect_type_names(ty: &mixsl_ast::TypeRef, out: &mut Vec<String>) {
    match ty {
        mixsl_ast::TypeRef::Named(name) => {
            if !out.iter().any(|n| n == name) {
                out.push(name.clone());
            }
        }
        mixsl_ast::TypeRef::Array { elem, .. } => collect_type_names(elem, out),
        _ => {}
    }
}

pub(crate) fn visit_decl_exprs(decl: &Declaration, f: &mut dyn FnMut(&Expr)) {
    match &decl.kind {
        DeclKind::Variable(var) => {
            if let Some(init) = &var.init {
                visit_expr(init, f);
            }
        }
        DeclKind::Method(method) => {
            for stmt in &method.body {
                visit_stmt(stmt, f);
            }
        }
        DeclKind::ConstantBuffer { members } => {
            for member in members {
                visit_decl_exprs(member, f);
            }
        }
        DeclKind::Struct { .. } => {}
    }
}

fn visit_stmt(stmt: &Stmt, f: &mut dyn FnMut(&Expr)) {
    match stmt {
        Stmt::Local { init, .. } => {
            if let Some(init) = init {
                visit_expr(init, f);
            }
        }
        Stmt::Expr(expr) => visit_expr(expr, f),
        Stmt::Assign { target, value } => {
            visit_expr(target, f);
            visit_expr(value, f);
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            visit_expr(cond, f);
            for stmt in then_branch {
                visit_stmt(stmt, f);
            }
            if let Some(else_branch) = else_branch {
                for stmt in else_branch {
                    visit_stmt(stmt, f);
                }
            }
        }
        Stmt::Return(Some(expr)) => visit_expr(expr, f),
        Stmt::Return(None) => {}
    }
}

fn visit_expr(expr: &Expr, f: &mut dyn FnMut(&Expr)) {
    match expr {
        Expr::Member { base, .. } => visit_expr(base, f),
        Expr::Index { base, index } => {
            visit_expr(base, f);
            visit_expr(index, f);
        }
        Expr::Call { callee, args } => {
            visit_expr(callee, f);
            for arg in args {
                visit_expr(arg, f);
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            visit_expr(lhs, f);
            visit_expr(rhs, f);
        }
        Expr::Literal(_) | Expr::Ident { .. } | Expr::StateBlock(_) => {}
    }
    f(expr);
}
