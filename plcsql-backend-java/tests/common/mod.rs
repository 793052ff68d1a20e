#![allow(dead_code)]

use std::sync::Arc;

use plcsql_ast::{
    Body, Decl, DeclKind, Declaration, Routine, RoutineSig, Scope, Span, SqlType, Stmt, StmtKind,
    Unit, span,
};

pub fn at() -> Span {
    span(0, 0)
}

pub fn var(scope: &Arc<Scope>, name: &str, ty: SqlType) -> Arc<Decl> {
    Decl::new(
        name,
        scope,
        at(),
        DeclKind::Var { ty, not_null: false, init: None },
    )
}

pub fn label(scope: &Arc<Scope>, name: &str) -> Arc<Decl> {
    Decl::new(name, scope, at(), DeclKind::Label)
}

pub fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(at(), kind)
}

/// Parameterless routine `name`, declared in `decl_scope`, whose body runs
/// in `scope`.
pub fn routine(
    decl_scope: &Arc<Scope>,
    scope: &Arc<Scope>,
    name: &str,
    ret: Option<SqlType>,
    decls: Vec<Declaration>,
    body: Body,
) -> Routine {
    let decl = Decl::new(
        name,
        decl_scope,
        at(),
        DeclKind::Routine(RoutineSig { params: vec![], ret }),
    );
    Routine {
        decl,
        scope: scope.clone(),
        decls,
        body,
    }
}

/// Top-level procedure `p` in scope `unit`.
pub fn procedure(
    unit: &Arc<Scope>,
    decls: Vec<Declaration>,
    stmts: Vec<Stmt>,
    connection_required: bool,
) -> Unit {
    Unit {
        routine: routine(
            unit,
            unit,
            &unit.routine,
            None,
            decls,
            Body { stmts, handlers: vec![] },
        ),
        connection_required,
        autonomous_transaction: false,
    }
}
