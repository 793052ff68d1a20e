//! Statement rendering.
//!
//! Every statement's code is marked with its source span so the unit can
//! map Java lines back to source positions. Java locals introduced by a
//! statement carry its level, which is unique along any statement path.

use plcsql_ast::{
    Block, Body, CursorDecl, ExHandler, ExName, Expr, ExprKind, IdRef, IntoTarget, RaiseTarget,
    SqlStmt, SqlText, Stmt, StmtKind,
};
use plcsql_core::{OpenPlan, Slot, resite};
use tracing::trace;

use crate::code::Code;
use crate::decl;
use crate::expr::{SQL_ERROR_CATCH, coerce, expr, java_string, sql_guarded};
use crate::names;
use crate::render::{JavaList, ToJava};

const NOT_NULL_VIOLATED: &str = "\"NOT NULL constraint violated\"";

pub fn stmts(list: &[Stmt]) -> Code {
    JavaList::new(list).to_java()
}

pub fn stmt(s: &Stmt) -> Code {
    render(s).mark(s.span)
}

fn render(s: &Stmt) -> Code {
    match &s.kind {
        StmtKind::Assign { target, value } => assign(target, value),
        StmtKind::If { arms, otherwise } => {
            let parts = arms
                .iter()
                .map(|(c, body)| braced(condition("if (", expr(c), ") {"), stmts(body)))
                .collect();
            let mut c = Code::chain(parts, " else ");
            if let Some(body) = otherwise {
                c.glue(" else ", Code::wrap("{", stmts(body), "}"));
            }
            c
        }
        StmtKind::Case {
            level,
            selector,
            selector_ty,
            whens,
            otherwise,
        } => {
            let selector_var = format!("selector_{level}");
            let otherwise = match otherwise {
                Some(body) => stmts(body),
                None => Code::text("throw new CASE_NOT_FOUND();"),
            };

            let mut inner = Code::hang(
                format!("{} {selector_var} =", selector_ty.java_type()),
                expr(selector),
                ";",
            );
            if whens.is_empty() {
                inner.append(otherwise);
            } else {
                let parts = whens
                    .iter()
                    .map(|(v, body)| {
                        let test = Code::call("opEq", vec![Code::text(&selector_var), expr(v)]);
                        braced(condition("if (", test, ") {"), stmts(body))
                    })
                    .collect();
                let mut chain = Code::chain(parts, " else ");
                chain.glue(" else ", Code::wrap("{", otherwise, "}"));
                inner.append(chain);
            }
            Code::wrap("{", inner, "}")
        }
        StmtKind::BasicLoop { label, stmts: body } => {
            let mut c = label_line(label.as_deref());
            c.append(Code::wrap("while (opNot(false)) {", stmts(body), "}"));
            c
        }
        StmtKind::While {
            label,
            cond,
            stmts: body,
        } => {
            let test = if matches!(cond.kind, ExprKind::Bool(true)) && cond.coercion.is_none() {
                Code::text("opNot(Boolean.FALSE)")
            } else {
                expr(cond)
            };
            let mut c = label_line(label.as_deref());
            c.append(braced(condition("while (", test, ") {"), stmts(body)));
            c
        }
        StmtKind::ForIter {
            label,
            iter,
            reverse,
            lower,
            upper,
            step,
            stmts: body,
        } => {
            let l = iter.scope.level;
            let i = format!("{}_i{l}[0]", iter.name);
            let step = step.as_ref().map_or_else(|| Code::text("1"), expr);

            let mut inner = Code::hang(format!("int l{l} ="), expr(lower), ";");
            inner.append(Code::hang(format!("int u{l} ="), expr(upper), ";"));
            inner.append(
                Code::call(&format!("int s{l} = checkForLoopIterStep"), vec![step]).suffix(";"),
            );
            inner.line(format!("int[] {}_i{l} = new int[1];", iter.name));
            inner.append(label_line(label.as_deref()));
            let head = if *reverse {
                format!("for ({i} = u{l}; {i} >= l{l}; {i} -= s{l}) {{")
            } else {
                format!("for ({i} = l{l}; {i} <= u{l}; {i} += s{l}) {{")
            };
            inner.append(Code::wrap(head, stmts(body), "}"));

            let comment = if *reverse {
                "{ // for loop with integer iterator (reverse)"
            } else {
                "{ // for loop with integer iterator"
            };
            Code::wrap(comment, inner, "}")
        }
        StmtKind::ForCursor {
            label,
            record,
            cursor,
            args,
            stmts: body,
        } => {
            let level = record.scope.level;
            let rows = names::record_rows(record);
            let c = names::value(cursor);

            let mut rows_loop = Code::text(format!("ResultSet {rows} = {c}.rs;"));
            rows_loop.append(label_line(label.as_deref()));
            let mut each = Code::text(format!("{c}.updateRowCount();"));
            each.append(stmts(body));
            rows_loop.append(Code::wrap(format!("while ({rows}.next()) {{"), each, "}"));

            // closes on every way out of the rows loop, not only exhaustion
            let mut inner = cursor_open(cursor, args, level);
            inner.append(Code::wrap("try {", rows_loop, "} finally {"));
            inner.nest(Code::wrap(
                format!("if ({c}.isOpen()) {{"),
                Code::text(format!("{c}.close();")),
                "}",
            ));
            inner.line("}");

            let mut out = Code::text("try { // for loop with a cursor");
            out.nest(inner);
            out.append(Code::template(SQL_ERROR_CATCH));
            out
        }
        StmtKind::ForSql {
            label,
            record,
            sql,
            used_values,
            stmts: body,
        } => {
            let level = record.scope.level;
            let rows = names::record_rows(record);
            let stmt_var = format!("stmt_{level}");

            let mut inner = sql_text(sql, level);
            inner.line(format!("{stmt_var} = conn.prepareStatement(sql_{level});"));
            if sql.is_dynamic() {
                inner.append(require_columns(level, "not a SELECT statement"));
            }
            inner.append(bind_values(&stmt_var, used_values));
            if sql.is_dynamic() {
                inner.append(Code::wrap(
                    format!("if (!{stmt_var}.execute()) {{"),
                    Code::text("throw new SQL_ERROR(\"use a SELECT statement\");"),
                    "}",
                ));
                inner.line(format!("ResultSet {rows} = {stmt_var}.getResultSet();"));
                inner.append(Code::wrap(
                    format!("if ({rows} == null) {{"),
                    Code::text("throw new SQL_ERROR(\"no result set\");"),
                    "}",
                ));
            } else {
                inner.line(format!("ResultSet {rows} = {stmt_var}.executeQuery();"));
            }
            inner.append(label_line(label.as_deref()));
            inner.append(Code::wrap(format!("while ({rows}.next()) {{"), stmts(body), "}"));

            let kind = if sql.is_dynamic() { "dynamic" } else { "static" };
            prepared(level, &format!("{{ // for loop with {kind} SQL"), inner)
        }
        StmtKind::CursorOpen {
            level,
            cursor,
            args,
        } => Code::wrap("{ // cursor open", cursor_open(cursor, args, *level), "}"),
        StmtKind::CursorFetch { cursor, into } => {
            let c = names::value(cursor);
            let mut inner = Code::wrap(
                format!("if ({c} == null || !{c}.isOpen()) {{"),
                Code::text("throw new INVALID_CURSOR(\"tried to fetch values with an unopened cursor\");"),
                "}",
            );
            inner.line(format!("ResultSet rs = {c}.rs;"));
            let mut row = Code::text(format!("{c}.updateRowCount();"));
            row.append(set_into_targets("rs", into));
            inner.append(Code::wrap("if (rs.next()) {", row, "}"));
            Code::wrap("{ // cursor fetch", inner, "}")
        }
        StmtKind::CursorClose { cursor } => {
            let c = names::value(cursor);
            Code::template([
                format!("if ({c} != null && {c}.isOpen()) {{"),
                format!("  {c}.close();"),
                "} else {".to_string(),
                "  throw new INVALID_CURSOR(\"tried to close an unopened cursor\");".to_string(),
                "}".to_string(),
            ])
        }
        StmtKind::Block(b) => block(b),
        StmtKind::Exit { label, when } => jump("break", label.as_deref(), when.as_ref()),
        StmtKind::Continue { label, when } => jump("continue", label.as_deref(), when.as_ref()),
        StmtKind::Return(None) => Code::text("return;"),
        StmtKind::Return(Some(v)) => Code::hang("return", expr(v), ";"),
        StmtKind::Commit => {
            sql_guarded(Code::template(["conn.commit();", "sql_rowcount[0] = 0L;"]))
        }
        StmtKind::Rollback => {
            sql_guarded(Code::template(["conn.rollback();", "sql_rowcount[0] = 0L;"]))
        }
        StmtKind::Null => Code::text(";"),
        StmtKind::Raise(target) => Code::text(match target {
            RaiseTarget::Declared(r) => format!("throw {};", names::exception_new(r)),
            RaiseTarget::Predefined(name) => format!("throw new {name}();"),
            RaiseTarget::Reraise { depth } => format!("throw e{depth};"),
        }),
        StmtKind::RaiseAppError { code, message } => {
            Code::call("throw new $APP_ERROR", vec![expr(code), expr(message)]).suffix(";")
        }
        StmtKind::Sql(s) => sql_stmt(s),
        StmtKind::ProcCall(call) => crate::expr::call_code(call, false),
    }
}

/// `head` / indented `body` / `}` for a head that may span lines.
fn braced(head: Code, body: Code) -> Code {
    let mut c = head;
    c.nest(body);
    c.line("}");
    c
}

/// `open Boolean.TRUE.equals(cond) close`.
fn condition(open: &str, cond: Code, close: &str) -> Code {
    Code::call("Boolean.TRUE.equals", vec![cond])
        .prefix(open)
        .suffix(close)
}

fn label_line(label: Option<&plcsql_ast::Decl>) -> Code {
    match label {
        Some(l) => Code::text(format!("{}:", names::label(l))),
        None => Code::new(),
    }
}

fn jump(keyword: &str, label: Option<&plcsql_ast::Decl>, when: Option<&Expr>) -> Code {
    let text = match label {
        Some(l) => format!("{keyword} {};", names::label(l)),
        None => format!("{keyword};"),
    };
    match when {
        Some(cond) => braced(condition("if (", expr(cond), ") {"), Code::text(text)),
        None => Code::text(text),
    }
}

fn assign(target: &IdRef, value: &Expr) -> Code {
    let lhs = format!("{} =", names::value(target));
    if target.decl.is_not_null() {
        Code::hang(lhs, not_null(expr(value)), ";")
    } else {
        Code::hang(lhs, expr(value), ";")
    }
}

fn not_null(value: Code) -> Code {
    Code::call("checkNotNull", vec![value, Code::text(NOT_NULL_VIOLATED)])
}

pub fn block(b: &Block) -> Code {
    trace!(block = %b.scope.block, decls = b.decls.len(), "rendering block");
    let mut inner = decl::decl_class(&b.scope, &b.decls);
    if !inner.is_empty() {
        inner.blank();
    }
    inner.append(body(&b.body));
    Code::wrap("{", inner, "}")
}

/// Statements of a routine or block, with exception handlers when present.
pub fn body(b: &Body) -> Code {
    if b.handlers.is_empty() {
        return stmts(&b.stmts);
    }

    let mut guarded = Code::text("try {");
    guarded.nest(stmts(&b.stmts));
    guarded.append(Code::template([
        "} catch (PlcsqlRuntimeError e) {",
        "  throw e;",
        "} catch (OutOfMemoryError e) {",
        "  Server.log(e);",
        "  throw new STORAGE_ERROR().initCause(e);",
        "} catch (Throwable e) {",
        "  Server.log(e);",
        "  throw new PROGRAM_ERROR().initCause(e);",
        "}",
    ]));

    let mut c = Code::wrap("try {", guarded, "}");
    for h in &b.handlers {
        c.glue(" ", handler(h));
    }
    c
}

fn handler(h: &ExHandler) -> Code {
    let names: Vec<String> = h
        .names
        .iter()
        .map(|n| match n {
            ExName::Others => "PlcsqlRuntimeError".to_string(),
            ExName::Predefined(name) => name.clone(),
            ExName::Declared(r) => names::exception_type(r),
        })
        .collect();
    Code::wrap(
        format!("catch ({} e{}) {{", names.join(" | "), h.depth),
        stmts(&h.stmts),
        "}",
    )
}

/// Evaluates repeated cursor arguments into temporaries and opens the cursor.
fn cursor_open(cursor: &IdRef, args: &[Expr], level: u32) -> Code {
    let Some(decl) = cursor.decl.as_cursor() else {
        unreachable!("'{}' is not a cursor", cursor.decl.name);
    };
    assert_eq!(
        args.len(),
        decl.params.len(),
        "argument count mismatch for cursor '{}'",
        cursor.decl.name
    );

    let plan = OpenPlan::new(decl, level);
    let mut c = Code::new();
    for (k, temp) in plan.temps() {
        c.append(Code::hang(format!("Object {temp} ="), expr(&args[k]), ";"));
    }

    let mut open_args = vec![Code::text("conn")];
    open_args.extend(host_values(decl, &plan, cursor, args));
    c.append(Code::call(&format!("{}.open", names::value(cursor)), open_args).suffix(";"));
    c
}

fn host_values(decl: &CursorDecl, plan: &OpenPlan, cursor: &IdRef, args: &[Expr]) -> Vec<Code> {
    plan.slots
        .iter()
        .map(|slot| match slot {
            Slot::Temp(t) => Code::text(t),
            Slot::Arg(k) => expr(&args[*k]),
            Slot::Host(i) => expr(&resite(&decl.host_values[*i], &cursor.site)),
        })
        .collect()
}

fn sql_text(sql: &SqlText, level: u32) -> Code {
    match sql {
        SqlText::Static(text) => Code::text(format!("String sql_{level} = {};", java_string(text))),
        SqlText::Dynamic(e) => Code::hang(
            format!("String sql_{level} ="),
            Code::call(
                "checkNotNull",
                vec![expr(e), Code::text("\"SQL part was evaluated to NULL\"")],
            ),
            ";",
        ),
    }
}

fn bind_values(stmt_var: &str, values: &[Expr]) -> Code {
    let mut c = Code::new();
    for (i, v) in values.iter().enumerate() {
        c.append(
            Code::call(
                &format!("{stmt_var}.setObject"),
                vec![Code::text((i + 1).to_string()), expr(v)],
            )
            .suffix(";"),
        );
    }
    c
}

fn require_columns(level: u32, message: &str) -> Code {
    Code::template([
        format!("ResultSetMetaData rsmd_{level} = stmt_{level}.getMetaData();"),
        format!("if (rsmd_{level} == null || rsmd_{level}.getColumnCount() < 1) {{"),
        format!("  throw new SQL_ERROR({});", java_string(message)),
        "}".to_string(),
    ])
}

/// A prepared statement declared null, used by `inner` and closed on every path.
fn prepared(level: u32, head: &str, inner: Code) -> Code {
    let stmt_var = format!("stmt_{level}");
    let mut body = Code::text(format!("PreparedStatement {stmt_var} = null;"));
    body.line("try {");
    body.nest(inner);
    body.append(Code::template(SQL_ERROR_CATCH).suffix(" finally {"));
    body.nest(Code::wrap(
        format!("if ({stmt_var} != null) {{"),
        Code::text(format!("{stmt_var}.close();")),
        "}",
    ));
    body.line("}");
    Code::wrap(head, body, "}")
}

/// Assigns row columns `1..` of `rows` to the INTO targets.
fn set_into_targets(rows: &str, into: &[IntoTarget]) -> Code {
    let mut c = Code::new();
    for (i, t) in into.iter().enumerate() {
        let target = names::value(&t.target);
        let column = match t.column {
            Some(ty) => format!("({}) {rows}.getObject({})", ty.java_type(), i + 1),
            None => format!("{rows}.getObject({})", i + 1),
        };
        c.append(Code::hang(
            format!("{target} ="),
            coerce(Some(&t.coercion), Code::text(column)),
            ";",
        ));
        c.line(format!(
            "if ({target} != null && {rows}.wasNull()) {{ {target} = null; }}"
        ));
        if t.target.decl.is_not_null() {
            c.line(format!("checkNotNull({target}, {NOT_NULL_VIOLATED});"));
        }
    }
    c
}

fn sql_stmt(s: &SqlStmt) -> Code {
    let level = s.level;
    let stmt_var = format!("stmt_{level}");

    let mut inner = sql_text(&s.text, level);
    inner.line(format!("{stmt_var} = conn.prepareStatement(sql_{level});"));
    if s.into.is_some() {
        inner.append(require_columns(
            level,
            "INTO clause must be used with a SELECT statement",
        ));
    }
    inner.append(bind_values(&stmt_var, &s.used_values));

    let mut query = Code::text("sql_rowcount[0] = 0L;");
    if let Some(into) = &s.into {
        query.append(single_row_into(level, into));
    }
    let mut exec = Code::wrap(format!("if ({stmt_var}.execute()) {{"), query, "}");
    exec.glue(
        " ",
        Code::wrap(
            "else {",
            Code::text(format!("sql_rowcount[0] = (long) {stmt_var}.getUpdateCount();")),
            "}",
        ),
    );
    inner.append(exec);

    let kind = if s.text.is_dynamic() { "dynamic" } else { "static" };
    prepared(level, &format!("{{ // {kind} SQL statement"), inner)
}

/// Fetches exactly one row into the targets. The row count is left at 1
/// when more than one row arrives.
fn single_row_into(level: u32, into: &[IntoTarget]) -> Code {
    let rows = format!("r{level}");
    let count = format!("i{level}");

    let mut c = Code::text(format!("ResultSet {rows} = stmt_{level}.getResultSet();"));
    c.append(Code::wrap(
        format!("if ({rows} == null) {{"),
        Code::text("throw new SQL_ERROR(\"no result set\");"),
        "}",
    ));
    c.line(format!("int {count} = 0;"));

    let mut each = Code::text(format!("{count}++;"));
    let mut first = Code::wrap(format!("if ({count} > 1) {{"), Code::text("break;"), "}");
    first.glue(" ", Code::wrap("else {", set_into_targets(&rows, into), "}"));
    each.append(first);
    c.append(Code::wrap(format!("while ({rows}.next()) {{"), each, "}"));

    c.append(Code::template([
        format!("if ({count} == 0) {{"),
        "  throw new NO_DATA_FOUND();".to_string(),
        format!("}} else if ({count} == 1) {{"),
        "  sql_rowcount[0] = 1L;".to_string(),
        "} else {".to_string(),
        "  sql_rowcount[0] = 1L;".to_string(),
        "  throw new TOO_MANY_ROWS();".to_string(),
        "}".to_string(),
    ]));
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use plcsql_ast::{Decl, DeclKind, Scope, Site, SqlType, span};

    #[test]
    fn exit_when_guards_the_break() {
        let unit = Scope::unit("p");
        let lp = unit.nested("loop");
        let l = Decl::new("outer", &lp, span(0, 0), DeclKind::Label);
        let s = Stmt::new(
            span(0, 0),
            StmtKind::Exit {
                label: Some(l),
                when: Some(Expr::bool(span(0, 0), true)),
            },
        );
        assert_eq!(
            stmt(&s).render(2),
            "if (Boolean.TRUE.equals(true)) {\n  break outer_2;\n}\n"
        );
    }

    #[test]
    fn not_null_assignment_is_checked() {
        let unit = Scope::unit("p");
        let x = Decl::new(
            "x",
            &unit,
            span(0, 0),
            DeclKind::Var { ty: SqlType::Int, not_null: true, init: None },
        );
        let s = Stmt::new(
            span(0, 0),
            StmtKind::Assign {
                target: IdRef::new(&x, &Site::body(&unit)),
                value: Expr::int(span(0, 0), 3),
            },
        );
        assert_eq!(
            stmt(&s).render(2),
            "p_1.x[0] = checkNotNull(Integer.valueOf(3), \"NOT NULL constraint violated\");\n"
        );
    }

    #[test]
    fn while_true_avoids_constant_condition() {
        let s = Stmt::new(
            span(0, 0),
            StmtKind::While {
                label: None,
                cond: Expr::bool(span(0, 0), true),
                stmts: vec![Stmt::new(span(0, 0), StmtKind::Null)],
            },
        );
        assert_eq!(
            stmt(&s).render(2),
            "while (Boolean.TRUE.equals(opNot(Boolean.FALSE))) {\n  ;\n}\n"
        );
    }

    #[test]
    fn dml_records_update_count_and_closes() {
        let s = Stmt::new(
            span(0, 0),
            StmtKind::Sql(SqlStmt {
                level: 2,
                text: SqlText::Static("delete from t".into()),
                into: None,
                used_values: vec![],
            }),
        );
        let text = stmt(&s).render(2);
        assert!(text.starts_with("{ // static SQL statement\n  PreparedStatement stmt_2 = null;\n"));
        assert!(text.contains("sql_rowcount[0] = (long) stmt_2.getUpdateCount();"));
        assert!(text.contains("  } finally {\n    if (stmt_2 != null) {\n      stmt_2.close();"));
        assert!(!text.contains("rsmd_2"));
    }

    #[test]
    fn close_of_unopened_cursor_raises() {
        let unit = Scope::unit("p");
        let cur = Decl::new(
            "c",
            &unit,
            span(0, 0),
            DeclKind::Cursor(plcsql_core::cursor_decl(vec![], "select 1", vec![])),
        );
        let s = Stmt::new(
            span(0, 0),
            StmtKind::CursorClose {
                cursor: IdRef::new(&cur, &Site::body(&unit)),
            },
        );
        let text = stmt(&s).render(2);
        assert!(text.starts_with("if (p_1.c != null && p_1.c.isOpen()) {\n  p_1.c.close();\n"));
        assert!(text.contains("tried to close an unopened cursor"));
    }
}
