//! Import collection: every Java type the unit's code names.

use std::collections::BTreeSet;

use plcsql_ast::{
    Body, Call, CallArg, Coercion, Decl, DeclKind, Declaration, Expr, ExprKind, IntoTarget,
    Routine, SqlType, Stmt, StmtKind, Unit,
};

const ALWAYS: [&str; 3] = [
    "com.cubrid.jsp.Server",
    "com.cubrid.plcsql.predefined.PlcsqlRuntimeError",
    "java.util.List",
];

/// Sorted `import` lines for `unit`, without the static runtime import.
pub fn imports(unit: &Unit) -> Vec<String> {
    let mut c = Collector::default();
    c.names.extend(ALWAYS.iter().map(|s| s.to_string()));
    if unit.connection_required {
        c.names.insert("java.sql.*".to_string());
    }
    c.routine(&unit.routine);

    c.names
        .into_iter()
        .filter(|n| needs_import(n))
        .map(|n| format!("import {n};"))
        .collect()
}

fn needs_import(full: &str) -> bool {
    let java_lang = full
        .strip_prefix("java.lang.")
        .is_some_and(|rest| !rest.contains('.'));
    !java_lang
        && full != SqlType::Null.java_full_type()
        && full != SqlType::Cursor.java_full_type()
}

#[derive(Default)]
struct Collector {
    names: BTreeSet<String>,
}

impl Collector {
    fn ty(&mut self, ty: SqlType) {
        self.names.insert(ty.java_full_type().to_string());
    }

    fn coercion(&mut self, c: &Coercion) {
        let mut tys = Vec::new();
        c.mentioned_types(&mut tys);
        for t in tys {
            self.ty(t);
        }
    }

    fn routine(&mut self, r: &Routine) {
        let sig = r.sig();
        if let Some(ret) = sig.ret {
            self.ty(ret);
        }
        for p in &sig.params {
            self.decl(p);
        }
        self.declarations(&r.decls);
        self.body(&r.body);
    }

    fn declarations(&mut self, decls: &[Declaration]) {
        for d in decls {
            match d {
                Declaration::Item(item) => self.decl(item),
                Declaration::Routine(r) => self.routine(r),
            }
        }
    }

    fn decl(&mut self, d: &Decl) {
        if let Some(ty) = d.ty() {
            self.ty(ty);
        }
        match &d.kind {
            DeclKind::Const { value, .. } => self.expr(value),
            DeclKind::Var { init: Some(v), .. } => self.expr(v),
            DeclKind::Cursor(c) => {
                for hv in &c.host_values {
                    self.expr(hv);
                }
            }
            _ => {}
        }
    }

    fn body(&mut self, b: &Body) {
        self.stmts(&b.stmts);
        for h in &b.handlers {
            self.stmts(&h.stmts);
        }
    }

    fn stmts(&mut self, list: &[Stmt]) {
        for s in list {
            self.stmt(s);
        }
    }

    fn stmt(&mut self, s: &Stmt) {
        s.for_each_expr(|e| self.expr(e));
        s.for_each_child_list(|l| self.stmts(l));
        match &s.kind {
            StmtKind::Case { selector_ty, .. } => self.ty(*selector_ty),
            StmtKind::CursorFetch { into, .. } => self.into(into),
            StmtKind::Sql(sql) => {
                if let Some(into) = &sql.into {
                    self.into(into);
                }
            }
            StmtKind::Block(b) => {
                self.declarations(&b.decls);
                self.body(&b.body);
            }
            StmtKind::ProcCall(call) => self.call(call),
            _ => {}
        }
    }

    fn into(&mut self, targets: &[IntoTarget]) {
        for t in targets {
            if let Some(col) = t.column {
                self.ty(col);
            }
            self.coercion(&t.coercion);
        }
    }

    fn call(&mut self, call: &Call) {
        if let Some(ret) = call.callee.ret() {
            self.ty(ret);
        }
        for p in call.callee.params().unwrap_or_default() {
            self.ty(p.ty);
        }
        for a in &call.args {
            if let CallArg::Out {
                target,
                to_param,
                from_param,
            } = a
            {
                if let Some(ty) = target.decl.ty() {
                    self.ty(ty);
                }
                self.coercion(to_param);
                self.coercion(from_param);
            }
        }
    }

    fn expr(&mut self, e: &Expr) {
        if let Some(c) = &e.coercion {
            self.coercion(c);
        }
        match &e.kind {
            ExprKind::Num { ty, .. } => self.ty(*ty),
            ExprKind::Date(_) => self.ty(SqlType::Date),
            ExprKind::Time(_) => self.ty(SqlType::Time),
            ExprKind::Datetime(_) | ExprKind::Timestamp(_) => self.ty(SqlType::Timestamp),
            ExprKind::Field { ty, .. } => self.ty(*ty),
            ExprKind::CursorAttr { attr, .. } => self.ty(attr.result_ty()),
            ExprKind::Case {
                selector_ty,
                result_ty,
                ..
            } => {
                self.ty(*selector_ty);
                self.ty(*result_ty);
            }
            ExprKind::Cond { result_ty, .. } => self.ty(*result_ty),
            ExprKind::Call(call) => self.call(call),
            ExprKind::SerialVal { .. } => self.ty(SqlType::Numeric),
            _ => {}
        }
        e.for_each_child(|child| self.expr(child));
    }
}
