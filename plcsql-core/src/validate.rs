//! Input-contract check.
//!
//! The generator trusts semantic analysis for names, types and coercions.
//! What it does check, before emitting anything, are the structural facts
//! rendering depends on: argument arity, holder-ness of written targets,
//! cursor usage arrays, per-path level uniqueness and jump targets.

use std::sync::Arc;

use plcsql_ast::{
    Body, Call, CallArg, CursorDecl, Decl, DeclKind, Declaration, ExHandler, ExName, Expr,
    ExprKind, IdRef, IntoTarget, ParamMode, RaiseTarget, Routine, Span, SqlType, Stmt, StmtKind,
    Unit, span,
};
use tracing::warn;

use crate::cursor::param_of_entry;
use crate::error::ContractViolation;

type Result<T> = std::result::Result<T, ContractViolation>;

pub fn validate_unit(unit: &Unit) -> Result<()> {
    let mut v = Validator::default();
    v.routine(&unit.routine).inspect_err(|e| {
        warn!(routine = unit.routine.name(), error = %e.message, "rejecting unit");
    })
}

#[derive(Default)]
struct Validator {
    /// Levels of statements enclosing the current one.
    levels: Vec<u32>,
    /// Enclosing loops, innermost last.
    loops: Vec<Option<Arc<Decl>>>,
    handler_depths: Vec<u32>,
    /// Return type of each routine being checked; `None` for procedures.
    returns: Vec<Option<SqlType>>,
}

fn violation(span: Span, message: impl Into<String>) -> ContractViolation {
    ContractViolation::new(span, message)
}

impl Validator {
    fn routine(&mut self, r: &Routine) -> Result<()> {
        let Some(sig) = r.decl.as_routine() else {
            return Err(violation(
                r.decl.span,
                format!("routine '{}' carries a {} declaration", r.name(), r.decl.kind_name()),
            ));
        };

        for p in &sig.params {
            if !matches!(p.kind, DeclKind::ParamIn { .. } | DeclKind::ParamOut { .. }) {
                return Err(violation(
                    p.span,
                    format!("parameter '{}' of '{}' is a {}", p.name, r.name(), p.kind_name()),
                ));
            }
            if p.scope != r.scope {
                return Err(violation(
                    p.span,
                    format!("parameter '{}' is not scoped to routine '{}'", p.name, r.name()),
                ));
            }
        }

        // A routine becomes its own Java method: jumps and generated locals of
        // the enclosing routine are not visible there.
        let levels = std::mem::take(&mut self.levels);
        let loops = std::mem::take(&mut self.loops);
        let depths = std::mem::take(&mut self.handler_depths);
        self.returns.push(sig.ret);

        let res = self
            .declarations(&r.decls)
            .and_then(|()| self.body(&r.body));

        self.returns.pop();
        self.levels = levels;
        self.loops = loops;
        self.handler_depths = depths;
        res
    }

    fn declarations(&mut self, decls: &[Declaration]) -> Result<()> {
        for d in decls {
            match d {
                Declaration::Routine(r) => self.routine(r)?,
                Declaration::Item(d) => self.item(d)?,
            }
        }
        Ok(())
    }

    fn item(&mut self, d: &Arc<Decl>) -> Result<()> {
        match &d.kind {
            DeclKind::Const { value, .. } => self.expr(value),
            DeclKind::Var { init, .. } => match init {
                Some(e) => self.expr(e),
                None => Ok(()),
            },
            DeclKind::Cursor(c) => self.cursor(d, c),
            DeclKind::Exception => Ok(()),
            DeclKind::Routine(_) => Err(violation(
                d.span,
                format!("routine '{}' declared without a body", d.name),
            )),
            _ => Err(violation(
                d.span,
                format!("a {} cannot appear in a declaration section", d.kind_name()),
            )),
        }
    }

    fn cursor(&self, d: &Decl, c: &CursorDecl) -> Result<()> {
        if c.param_ref_counts.len() != c.params.len() {
            return Err(violation(
                d.span,
                format!(
                    "cursor '{}': {} reference counts for {} parameters",
                    d.name,
                    c.param_ref_counts.len(),
                    c.params.len()
                ),
            ));
        }
        if c.used_values_map.len() != c.host_values.len() {
            return Err(violation(
                d.span,
                format!(
                    "cursor '{}': {} map entries for {} host values",
                    d.name,
                    c.used_values_map.len(),
                    c.host_values.len()
                ),
            ));
        }

        let mut seen = vec![0u32; c.params.len()];
        for (i, (&entry, hv)) in c.used_values_map.iter().zip(&c.host_values).enumerate() {
            match param_of_entry(entry) {
                Some(k) => {
                    let Some(p) = c.params.get(k) else {
                        return Err(violation(
                            hv.span,
                            format!("cursor '{}': host value {i} maps to missing parameter {k}", d.name),
                        ));
                    };
                    if !hv.as_id().is_some_and(|r| r.refers_to(p)) {
                        return Err(violation(
                            hv.span,
                            format!("cursor '{}': host value {i} is not parameter '{}'", d.name, p.name),
                        ));
                    }
                    seen[k] += 1;
                }
                None => {
                    if entry as usize != i {
                        return Err(violation(
                            hv.span,
                            format!("cursor '{}': host value {i} maps to position {entry}", d.name),
                        ));
                    }
                    if mentions_any(hv, &c.params) {
                        return Err(violation(
                            hv.span,
                            format!("cursor '{}': host value {i} uses a parameter inside an expression", d.name),
                        ));
                    }
                    self.expr(hv)?;
                }
            }
        }

        for (k, (&count, &actual)) in c.param_ref_counts.iter().zip(&seen).enumerate() {
            if count != actual {
                return Err(violation(
                    d.span,
                    format!(
                        "cursor '{}': parameter {k} counted {count} times but used {actual} times",
                        d.name
                    ),
                ));
            }
        }
        Ok(())
    }

    fn body(&mut self, body: &Body) -> Result<()> {
        self.stmts(&body.stmts)?;

        for h in &body.handlers {
            if h.names.is_empty() {
                return Err(violation(
                    handler_span(h),
                    "exception handler without exception names",
                ));
            }
            if h.names.len() > 1 && h.names.iter().any(|n| matches!(n, ExName::Others)) {
                return Err(violation(
                    handler_span(h),
                    "OTHERS combined with other exception names",
                ));
            }
            for name in &h.names {
                if let ExName::Declared(r) = name {
                    expect_kind(r, "exception", |k| matches!(k, DeclKind::Exception))?;
                }
            }
            if self.handler_depths.last().is_some_and(|&d| d >= h.depth) || h.depth == 0 {
                return Err(violation(
                    handler_span(h),
                    format!("handler depth {} does not exceed its enclosing handler", h.depth),
                ));
            }
            self.handler_depths.push(h.depth);
            let res = self.stmts(&h.stmts);
            self.handler_depths.pop();
            res?;
        }
        Ok(())
    }

    fn stmts(&mut self, stmts: &[Stmt]) -> Result<()> {
        stmts.iter().try_for_each(|s| self.stmt(s))
    }

    fn stmt(&mut self, s: &Stmt) -> Result<()> {
        let level = s.level();
        if let Some(l) = level {
            if self.levels.contains(&l) {
                return Err(violation(
                    s.span,
                    format!("level {l} is already used by an enclosing statement"),
                ));
            }
            self.levels.push(l);
        }

        let res = self.stmt_inner(s);

        if level.is_some() {
            self.levels.pop();
        }
        res
    }

    fn stmt_inner(&mut self, s: &Stmt) -> Result<()> {
        try_each_expr(s, |e| self.expr(e))?;

        match &s.kind {
            StmtKind::Assign { target, .. } => expect_holder(target, s.span)?,
            StmtKind::ForIter { iter, .. } => {
                if !matches!(iter.kind, DeclKind::ForIter) {
                    return Err(violation(s.span, format!("'{}' is not a loop iterator", iter.name)));
                }
            }
            StmtKind::ForCursor {
                record,
                cursor,
                args,
                ..
            } => {
                expect_record(record, s.span)?;
                cursor_args(cursor, args.len(), s.span)?;
            }
            StmtKind::ForSql { record, .. } => expect_record(record, s.span)?,
            StmtKind::CursorOpen { cursor, args, .. } => cursor_args(cursor, args.len(), s.span)?,
            StmtKind::CursorFetch { cursor, into } => {
                expect_kind(cursor, "cursor", |k| matches!(k, DeclKind::Cursor(_)))?;
                into_targets(into, false, s.span)?;
            }
            StmtKind::CursorClose { cursor } => {
                expect_kind(cursor, "cursor", |k| matches!(k, DeclKind::Cursor(_)))?;
            }
            StmtKind::Block(b) => {
                self.declarations(&b.decls)?;
                self.body(&b.body)?;
            }
            StmtKind::Exit { label, .. } | StmtKind::Continue { label, .. } => {
                self.jump_target(label.as_ref(), s.span)?;
            }
            StmtKind::Return(v) => {
                let function = self.returns.last().copied().flatten().is_some();
                match (function, v) {
                    (true, None) => {
                        return Err(violation(s.span, "function returns without a value"));
                    }
                    (false, Some(_)) => {
                        return Err(violation(s.span, "procedure returns a value"));
                    }
                    _ => {}
                }
            }
            StmtKind::Raise(RaiseTarget::Declared(r)) => {
                expect_kind(r, "exception", |k| matches!(k, DeclKind::Exception))?;
            }
            StmtKind::Raise(RaiseTarget::Reraise { depth }) => {
                if !self.handler_depths.contains(depth) {
                    return Err(violation(
                        s.span,
                        format!("re-raise of handler depth {depth} outside that handler"),
                    ));
                }
            }
            StmtKind::Sql(sql) => {
                if let Some(into) = &sql.into {
                    into_targets(into, sql.text.is_dynamic(), s.span)?;
                }
            }
            StmtKind::ProcCall(call) => {
                check_call(call, s.span)?;
                if call.callee.ret().is_some() {
                    return Err(violation(
                        s.span,
                        format!("function '{}' called as a procedure", call.callee.name()),
                    ));
                }
            }
            _ => {}
        }

        let is_loop = s.is_loop();
        if is_loop {
            self.loops.push(s.label().cloned());
        }
        let mut res = Ok(());
        s.for_each_child_list(|list| {
            if res.is_ok() {
                res = self.stmts(list);
            }
        });
        if is_loop {
            self.loops.pop();
        }
        res
    }

    fn jump_target(&self, label: Option<&Arc<Decl>>, span: Span) -> Result<()> {
        match label {
            None if self.loops.is_empty() => Err(violation(span, "EXIT/CONTINUE outside a loop")),
            None => Ok(()),
            Some(l) => {
                let encloses = self
                    .loops
                    .iter()
                    .any(|lp| lp.as_ref().is_some_and(|d| Arc::ptr_eq(d, l)));
                if encloses {
                    Ok(())
                } else {
                    Err(violation(
                        span,
                        format!("label '{}' does not name an enclosing loop", l.name),
                    ))
                }
            }
        }
    }

    fn expr(&self, e: &Expr) -> Result<()> {
        match &e.kind {
            ExprKind::Num { ty, .. } => {
                let numeric = matches!(
                    ty,
                    SqlType::Short
                        | SqlType::Int
                        | SqlType::Bigint
                        | SqlType::Numeric
                        | SqlType::Float
                        | SqlType::Double
                );
                if !numeric {
                    return Err(violation(
                        e.span,
                        format!("numeric literal typed {}", ty.plc_name()),
                    ));
                }
            }
            ExprKind::Id(r) => {
                if matches!(
                    r.decl.kind,
                    DeclKind::Label | DeclKind::Exception | DeclKind::Routine(_) | DeclKind::ForRecord
                ) {
                    return Err(violation(
                        e.span,
                        format!("{} '{}' used as a value", r.decl.kind_name(), r.decl.name),
                    ));
                }
            }
            ExprKind::Field {
                record,
                column,
                position,
                ..
            } => {
                expect_record(&record.decl, e.span)?;
                if *position == 0 {
                    return Err(violation(
                        e.span,
                        format!("field '{}.{column}' has no select-list position", record.decl.name),
                    ));
                }
            }
            ExprKind::CursorAttr { cursor, .. } => {
                expect_kind(cursor, "cursor", |k| matches!(k, DeclKind::Cursor(_)))?;
            }
            ExprKind::Call(call) => {
                check_call(call, e.span)?;
                if call.callee.ret().is_none() {
                    return Err(violation(
                        e.span,
                        format!("procedure '{}' called as a function", call.callee.name()),
                    ));
                }
            }
            _ => {}
        }

        let mut res = Ok(());
        e.for_each_child(|c| {
            if res.is_ok() {
                res = self.expr(c);
            }
        });
        res
    }
}

fn handler_span(h: &ExHandler) -> Span {
    h.stmts.first().map_or(span(0, 0), |s| s.span)
}

fn try_each_expr<'a>(
    s: &'a Stmt,
    mut f: impl FnMut(&'a Expr) -> Result<()>,
) -> Result<()> {
    let mut res = Ok(());
    s.for_each_expr(|e| {
        if res.is_ok() {
            res = f(e);
        }
    });
    res
}

fn expect_kind(r: &IdRef, what: &str, ok: impl Fn(&DeclKind) -> bool) -> Result<()> {
    if ok(&r.decl.kind) {
        Ok(())
    } else {
        Err(violation(
            r.decl.span,
            format!("'{}' is a {}, expected a {what}", r.decl.name, r.decl.kind_name()),
        ))
    }
}

fn expect_holder(r: &IdRef, span: Span) -> Result<()> {
    if r.decl.is_holder() {
        Ok(())
    } else {
        Err(violation(
            span,
            format!("{} '{}' is not assignable", r.decl.kind_name(), r.decl.name),
        ))
    }
}

fn expect_record(d: &Decl, span: Span) -> Result<()> {
    if matches!(d.kind, DeclKind::ForRecord) {
        Ok(())
    } else {
        Err(violation(span, format!("'{}' is not a loop record", d.name)))
    }
}

fn cursor_args(cursor: &IdRef, given: usize, span: Span) -> Result<()> {
    let Some(c) = cursor.decl.as_cursor() else {
        return Err(violation(span, format!("'{}' is not a cursor", cursor.decl.name)));
    };
    if c.params.len() != given {
        return Err(violation(
            span,
            format!(
                "cursor '{}' takes {} arguments, {given} given",
                cursor.decl.name,
                c.params.len()
            ),
        ));
    }
    Ok(())
}

fn into_targets(into: &[IntoTarget], dynamic: bool, span: Span) -> Result<()> {
    if into.is_empty() {
        return Err(violation(span, "empty INTO list"));
    }
    for t in into {
        expect_holder(&t.target, span)?;
        if !dynamic && t.column.is_none() {
            return Err(violation(
                span,
                format!("INTO target '{}' has no column type", t.target.decl.name),
            ));
        }
    }
    Ok(())
}

fn check_call(call: &Call, span: Span) -> Result<()> {
    let Some(params) = call.callee.params() else {
        return Err(violation(span, format!("'{}' is not a routine", call.callee.name())));
    };
    if params.len() != call.args.len() {
        return Err(violation(
            span,
            format!(
                "'{}' takes {} arguments, {} given",
                call.callee.name(),
                params.len(),
                call.args.len()
            ),
        ));
    }
    for (i, (p, a)) in params.iter().zip(&call.args).enumerate() {
        match (p.mode, a) {
            (ParamMode::In, CallArg::In(_)) => {}
            (ParamMode::Out | ParamMode::InOut, CallArg::Out { target, .. }) => {
                expect_holder(target, span)?;
            }
            (mode, _) => {
                return Err(violation(
                    span,
                    format!(
                        "argument {} of '{}' does not match its {mode:?} parameter",
                        i + 1,
                        call.callee.name()
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn mentions_any(e: &Expr, decls: &[Arc<Decl>]) -> bool {
    let hit = match &e.kind {
        ExprKind::Id(r) => decls.iter().any(|d| r.refers_to(d)),
        _ => false,
    };
    let mut found = hit;
    e.for_each_child(|c| found = found || mentions_any(c, decls));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use plcsql_ast::{RoutineSig, Scope, Site};

    fn procedure(body: Vec<Stmt>) -> Unit {
        let unit = Scope::unit("p");
        let decl = Decl::new(
            "p",
            &unit,
            span(0, 0),
            DeclKind::Routine(RoutineSig { params: vec![], ret: None }),
        );
        Unit {
            routine: Routine {
                decl,
                scope: unit,
                decls: vec![],
                body: Body { stmts: body, handlers: vec![] },
            },
            connection_required: false,
            autonomous_transaction: false,
        }
    }

    #[test]
    fn rejects_exit_outside_loop() {
        let u = procedure(vec![Stmt::new(
            span(3, 4),
            StmtKind::Exit { label: None, when: None },
        )]);
        let err = validate_unit(&u).expect_err("must reject");
        assert!(err.message.contains("outside a loop"));
    }

    #[test]
    fn rejects_value_return_from_procedure() {
        let u = procedure(vec![Stmt::new(
            span(0, 0),
            StmtKind::Return(Some(Expr::int(span(0, 0), 1))),
        )]);
        assert!(validate_unit(&u).is_err());
    }

    #[test]
    fn rejects_assignment_to_constant() {
        let scope = Scope::unit("p");
        let c = Decl::new(
            "c",
            &scope,
            span(0, 0),
            DeclKind::Const { ty: SqlType::Int, not_null: false, value: Expr::int(span(0, 0), 1) },
        );
        let u = procedure(vec![Stmt::new(
            span(0, 0),
            StmtKind::Assign {
                target: IdRef::new(&c, &Site::body(&scope)),
                value: Expr::int(span(0, 0), 2),
            },
        )]);
        let err = validate_unit(&u).expect_err("must reject");
        assert!(err.message.contains("not assignable"));
    }

    #[test]
    fn rejects_record_field_without_position() {
        let scope = Scope::unit("p");
        let lp = scope.nested("for_sql");
        let rec = Decl::new("r", &lp, span(0, 0), DeclKind::ForRecord);
        let x = Decl::new(
            "x",
            &scope,
            span(0, 0),
            DeclKind::Var { ty: SqlType::Int, not_null: false, init: None },
        );
        let u = procedure(vec![Stmt::new(
            span(0, 0),
            StmtKind::Assign {
                target: IdRef::new(&x, &Site::body(&scope)),
                value: Expr::new(
                    span(7, 3),
                    ExprKind::Field {
                        record: IdRef::new(&rec, &Site::body(&lp)),
                        column: "a".into(),
                        position: 0,
                        ty: SqlType::Int,
                    },
                ),
            },
        )]);
        let err = validate_unit(&u).expect_err("must reject");
        assert!(err.message.contains("'r.a' has no select-list position"), "{}", err.message);
    }
}
