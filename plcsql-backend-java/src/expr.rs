//! Expression rendering. Every function here is pure: the same node always
//! yields the same text.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use plcsql_ast::{
    Call, CallArg, Callee, Coercion, CursorAttr, Expr, ExprKind, ParamMode, SerialVal, SqlType,
    Temporal,
};

use crate::code::Code;
use crate::names;

pub const SQL_ERROR_CATCH: [&str; 4] = [
    "} catch (SQLException e) {",
    "  Server.log(e);",
    "  throw new SQL_ERROR(e.getMessage());",
    "}",
];

pub fn expr(e: &Expr) -> Code {
    coerce(e.coercion.as_ref(), bare(e))
}

fn bare(e: &Expr) -> Code {
    match &e.kind {
        ExprKind::Null => Code::text("null"),
        ExprKind::Bool(b) => Code::text(if *b { "true" } else { "false" }),
        ExprKind::Num { text, ty } => Code::text(number(text, *ty)),
        ExprKind::Str(s) => Code::text(java_string(s)),
        ExprKind::Date(d) => Code::text(date(*d)),
        ExprKind::Time(t) => Code::text(format!(
            "new Time({}, {}, {})",
            t.hour(),
            t.minute(),
            t.second()
        )),
        ExprKind::Datetime(dt) => Code::text(timestamp(*dt, true)),
        ExprKind::Timestamp(dt) => Code::text(timestamp(*dt, false)),
        ExprKind::Id(r) => Code::text(names::value(r)),
        ExprKind::Field {
            record,
            position,
            ty,
            ..
        } => Code::text(format!(
            "(({}) {}.getObject({position}))",
            ty.java_type(),
            names::record_rows(&record.decl)
        )),
        ExprKind::CursorAttr { cursor, attr } => {
            let c = names::value(cursor);
            let text = match attr {
                CursorAttr::IsOpen => {
                    format!("(({c} == null) ? Boolean.FALSE : {c}.{}())", attr.method())
                }
                _ => format!(
                    "(({c} == null) ? ({}) throwInvalidCursor(\"tried to retrieve an attribute from an unopened cursor\") : {c}.{}())",
                    attr.result_ty().java_type(),
                    attr.method()
                ),
            };
            Code::text(text)
        }
        ExprKind::Unary { op, operand } => {
            Code::call(&format!("op{}", op.name()), vec![expr(operand)])
        }
        ExprKind::Binary { op, left, right } => Code::call(
            &format!("op{}", op.name()),
            vec![expr(left), expr(right)],
        ),
        ExprKind::Between {
            target,
            lower,
            upper,
        } => Code::call("opBetween", vec![expr(target), expr(lower), expr(upper)]),
        ExprKind::In { target, elements } => {
            let mut args = vec![expr(target)];
            args.extend(elements.iter().map(expr));
            Code::call("opIn", args)
        }
        ExprKind::Like {
            target,
            pattern,
            escape,
        } => {
            let esc = escape
                .as_deref()
                .map_or_else(|| "null".to_string(), java_string);
            Code::call("opLike", vec![expr(target), expr(pattern), Code::text(esc)])
        }
        ExprKind::Case {
            selector,
            selector_ty,
            result_ty,
            whens,
            otherwise,
        } => {
            if *result_ty == SqlType::Null {
                // every branch is NULL
                return Code::text("null");
            }
            let mut arms: Vec<Code> = whens
                .iter()
                .map(|(v, e)| {
                    let test = Code::call(
                        "Boolean.TRUE.equals",
                        vec![Code::call("opEq", vec![Code::text("selector"), expr(v)])],
                    );
                    ternary_arm(test, expr(e))
                })
                .collect();
            arms.push(otherwise.as_deref().map_or_else(|| Code::text("null"), expr).suffix(";"));

            let mut method = Code::text("return");
            method.nest(Code::join(arms, ""));
            let mut c = Code::text("(new Object() { // simple case expression");
            c.nest(Code::wrap(
                format!(
                    "{} invoke({} selector) throws Exception {{",
                    result_ty.java_type(),
                    selector_ty.java_type()
                ),
                method,
                "}",
            ));
            c.append(Code::call("}.invoke", vec![expr(selector)]).suffix(")"));
            c
        }
        ExprKind::Cond {
            result_ty,
            arms,
            otherwise,
        } => {
            if *result_ty == SqlType::Null {
                return Code::text("null");
            }
            let mut parts: Vec<Code> = arms
                .iter()
                .map(|(c, e)| ternary_arm(Code::call("Boolean.TRUE.equals", vec![expr(c)]), expr(e)))
                .collect();
            parts.push(otherwise.as_deref().map_or_else(|| Code::text("null"), expr).suffix(")"));
            let mut c = Code::text("(");
            c.nest(Code::join(parts, ""));
            c
        }
        ExprKind::Call(call) => call_code(call, true),
        ExprKind::SerialVal { serial, which } => serial_val(serial, *which),
        ExprKind::RowCount => Code::text("sql_rowcount[0]"),
    }
}

fn ternary_arm(test: Code, value: Code) -> Code {
    let mut c = test.suffix(" ?");
    let value = value.suffix(" :");
    if c.is_single_line() && value.is_single_line() {
        c.glue(" ", value);
    } else {
        c.nest(value);
    }
    c
}

/// Wraps rendered code with the conversion chosen for it.
pub fn coerce(c: Option<&Coercion>, code: Code) -> Code {
    match c {
        None | Some(Coercion::Identity) => code,
        Some(Coercion::Cast(ty)) => Code::hang(format!("({})", ty.java_type()), code, ""),
        Some(Coercion::Conversion { src, dst }) => Code::call(
            &format!("conv{}To{}", src.plc_name(), dst.plc_name()),
            vec![code],
        ),
        Some(Coercion::CheckPrecision {
            precision,
            scale,
            inner,
        }) => Code::call(
            "checkPrecision",
            vec![
                Code::text(precision.to_string()),
                Code::text(format!("(short) {scale}")),
                coerce(Some(inner), code),
            ],
        ),
        Some(Coercion::CheckStrLength {
            is_char,
            length,
            inner,
        }) => Code::call(
            "checkStrLength",
            vec![
                Code::text(is_char.to_string()),
                Code::text(length.to_string()),
                coerce(Some(inner), code),
            ],
        ),
    }
}

fn number(text: &str, ty: SqlType) -> String {
    match ty {
        SqlType::Short => format!("Short.valueOf((short) {text})"),
        SqlType::Int => format!("Integer.valueOf({text})"),
        SqlType::Bigint => format!("Long.valueOf({text}L)"),
        SqlType::Numeric => format!("new BigDecimal(\"{text}\")"),
        SqlType::Float => format!("Float.valueOf(\"{text}\")"),
        SqlType::Double => format!("Double.valueOf(\"{text}\")"),
        other => unreachable!("numeric literal of type {}", other.plc_name()),
    }
}

fn date(d: Temporal<NaiveDate>) -> String {
    match d {
        Temporal::Zero => "new Date(0 - 1900, 0 - 1, 0)".to_string(),
        Temporal::At(d) => format!(
            "new Date({} - 1900, {} - 1, {})",
            d.year(),
            d.month(),
            d.day()
        ),
    }
}

fn timestamp(dt: Temporal<NaiveDateTime>, with_millis: bool) -> String {
    match dt {
        Temporal::Zero => "new Timestamp(0 - 1900, 0 - 1, 0, 0, 0, 0, 0)".to_string(),
        Temporal::At(dt) => {
            let nanos = if with_millis {
                (dt.nanosecond() / 1_000_000) * 1_000_000
            } else {
                0
            };
            format!(
                "new Timestamp({} - 1900, {} - 1, {}, {}, {}, {}, {nanos})",
                dt.year(),
                dt.month(),
                dt.day(),
                dt.hour(),
                dt.minute(),
                dt.second()
            )
        }
    }
}

/// Java string literal with the contents of `s`.
pub fn java_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn serial_val(serial: &str, which: SerialVal) -> Code {
    let attr = match which {
        SerialVal::Current => "CURRENT_VALUE",
        SerialVal::Next => "NEXT_VALUE",
    };
    let body = Code::template([
        "BigDecimal ret;".to_string(),
        format!("String dynSql = {};", java_string(&format!("select {serial}.{attr}"))),
        "PreparedStatement stmt = conn.prepareStatement(dynSql);".to_string(),
        "ResultSet r = stmt.executeQuery();".to_string(),
        "if (r.next()) {".to_string(),
        format!("  ret = r.{}(1);", SqlType::Numeric.result_accessor()),
        "  if (ret != null && r.wasNull()) {".to_string(),
        "    ret = null;".to_string(),
        "  }".to_string(),
        "} else {".to_string(),
        "  ret = null;".to_string(),
        "}".to_string(),
        "stmt.close();".to_string(),
        "return ret;".to_string(),
    ]);
    let mut c = Code::text("(new Object() {");
    c.nest(Code::wrap(
        "BigDecimal getSerialVal() throws Exception {",
        sql_guarded(body),
        "}",
    ));
    c.line("}.getSerialVal())");
    c
}

/// `try { body }` turning any `SQLException` into the runtime's `SQL_ERROR`.
pub fn sql_guarded(body: Code) -> Code {
    let mut c = Code::text("try {");
    c.nest(body);
    c.append(Code::template(SQL_ERROR_CATCH));
    c
}

/// Java type of wrapper parameter `i` and the code passed for it.
fn wrapper_param(arg: &CallArg, param_ty: SqlType, i: usize) -> (String, Code) {
    match arg {
        CallArg::In(e) => (format!("{} o{i}", param_ty.java_type()), expr(e)),
        CallArg::Out { target, .. } => {
            let ty = target.decl.ty().unwrap_or(param_ty);
            (format!("{}[] o{i}", ty.java_type()), Code::text(names::holder(target)))
        }
    }
}

/// A call of a local or remote routine. `as_expr` renders a function call
/// expression, otherwise a procedure call statement.
pub fn call_code(call: &Call, as_expr: bool) -> Code {
    let params = call.callee.params().unwrap_or_default();
    assert_eq!(
        params.len(),
        call.args.len(),
        "argument count mismatch for '{}'",
        call.callee.name()
    );

    let has_out = call.args.iter().any(|a| matches!(a, CallArg::Out { .. }));

    match &call.callee {
        Callee::Local(r) if !has_out => {
            let args = call
                .args
                .iter()
                .map(|a| match a {
                    CallArg::In(e) => expr(e),
                    CallArg::Out { .. } => unreachable!("OUT argument in a direct call"),
                })
                .collect();
            let c = Code::call(&names::qualified(r), args);
            if as_expr { c } else { c.suffix(";") }
        }
        Callee::Local(r) => wrapper(call, as_expr, local_invoke_body(call, &names::qualified(r))),
        Callee::Remote(_) => wrapper(call, as_expr, remote_invoke_body(call, as_expr)),
    }
}

fn wrapper(call: &Call, as_expr: bool, body: Code) -> Code {
    let params = call.callee.params().unwrap_or_default();
    let mut decl_params = Vec::with_capacity(params.len());
    let mut args = Vec::with_capacity(params.len());
    for (i, (a, p)) in call.args.iter().zip(&params).enumerate() {
        let (decl, arg) = wrapper_param(a, p.ty, i);
        decl_params.push(decl);
        args.push(arg);
    }

    let ret = if as_expr {
        call.callee.ret().map_or("Object", SqlType::java_type)
    } else {
        "void"
    };
    let kind = match (&call.callee, as_expr) {
        (Callee::Local(_), true) => "local function call",
        (Callee::Local(_), false) => "local procedure call",
        (Callee::Remote(_), true) => "global function call",
        (Callee::Remote(_), false) => "global procedure call",
    };

    let mut c = Code::text(format!(
        "{}new Object() {{ // {kind}: {}",
        if as_expr { "(" } else { "" },
        call.callee.name()
    ));
    c.nest(Code::wrap(
        format!("{ret} invoke({}) throws Exception {{", decl_params.join(", ")),
        body,
        "}",
    ));
    c.append(Code::call("}.invoke", args).suffix(if as_expr { ")" } else { ";" }));
    c
}

fn local_invoke_body(call: &Call, callee: &str) -> Code {
    let params = call.callee.params().unwrap_or_default();
    let mut body = Code::new();
    let mut passed = Vec::with_capacity(params.len());
    let mut update = Code::new();

    for (i, (a, p)) in call.args.iter().zip(&params).enumerate() {
        match a {
            CallArg::In(_) => passed.push(format!("o{i}")),
            CallArg::Out {
                target,
                to_param,
                from_param,
            } => {
                if to_param.is_identity() {
                    passed.push(format!("o{i}"));
                } else {
                    let pty = p.ty.java_type();
                    let init = coerce(Some(to_param), Code::text(format!("o{i}[0]")));
                    body.append(Code::hang(
                        format!("{pty}[] p{i} = new {pty}[] {{"),
                        init,
                        " };",
                    ));
                    passed.push(format!("p{i}"));
                    update.append(Code::hang(
                        format!("o{i}[0] ="),
                        coerce(Some(from_param), Code::text(format!("p{i}[0]"))),
                        ";",
                    ));
                }
                if target.decl.is_not_null() {
                    update.line(format!(
                        "checkNotNull(o{i}[0], \"a not-null variable {} was set NULL by this function call\");",
                        target.decl.name
                    ));
                }
            }
        }
    }

    let invocation = format!("{callee}({})", passed.join(", "));
    match call.callee.ret() {
        Some(ret) => {
            body.line(format!("{} ret = {invocation};", ret.java_type()));
            body.append(update);
            body.line("return ret;");
        }
        None => {
            body.line(format!("{invocation};"));
            body.append(update);
        }
    }
    body
}

fn remote_invoke_body(call: &Call, as_expr: bool) -> Code {
    let params = call.callee.params().unwrap_or_default();
    let marks = vec!["?"; params.len()].join(", ");
    let (sql, offset) = if as_expr {
        (format!("?= call {}({marks})", call.callee.name()), 2)
    } else {
        (format!("call {}({marks})", call.callee.name()), 1)
    };

    let mut set_args = Code::new();
    let mut update = Code::new();
    for (i, (a, p)) in call.args.iter().zip(&params).enumerate() {
        let pos = i + offset;
        match a {
            CallArg::In(_) => {
                set_args.line(format!("stmt.setObject({pos}, o{i});"));
            }
            CallArg::Out {
                target,
                to_param,
                from_param,
            } => {
                set_args.line(format!("stmt.registerOutParameter({pos}, java.sql.Types.OTHER);"));
                if p.mode == ParamMode::InOut {
                    set_args.append(
                        Code::call(
                            "stmt.setObject",
                            vec![
                                Code::text(pos.to_string()),
                                coerce(Some(to_param), Code::text(format!("o{i}[0]"))),
                            ],
                        )
                        .suffix(";"),
                    );
                }
                let out_val = Code::text(format!(
                    "({}) stmt.getObject({pos})",
                    p.ty.java_type()
                ));
                update.append(Code::hang(
                    format!("o{i}[0] ="),
                    coerce(Some(from_param), out_val),
                    ";",
                ));
                if target.decl.is_not_null() {
                    update.line(format!(
                        "checkNotNull(o{i}[0], \"a not-null variable {} was set NULL by this call\");",
                        target.decl.name
                    ));
                }
            }
        }
    }

    let mut body = Code::new();
    body.line(format!("String dynSql = {};", java_string(&sql)));
    body.line("CallableStatement stmt = conn.prepareCall(dynSql);");
    if as_expr {
        body.line("stmt.registerOutParameter(1, java.sql.Types.OTHER);");
    }
    body.append(set_args);
    body.line("stmt.execute();");
    let ret = call.callee.ret().filter(|_| as_expr);
    if let Some(ret) = ret {
        let ty = ret.java_type();
        body.line(format!("{ty} ret = ({ty}) stmt.getObject(1);"));
    }
    body.append(update);
    body.line("stmt.close();");
    if ret.is_some() {
        body.line("return ret;");
    }

    sql_guarded(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plcsql_ast::{BinaryOp, Decl, DeclKind, ExternParam, ExternRoutine, IdRef, Scope, Site, span};
    use std::sync::Arc;

    fn render(e: &Expr) -> String {
        expr(e).render(2)
    }

    #[test]
    fn numeric_literals_keep_their_digits() {
        let s = span(0, 0);
        assert_eq!(render(&Expr::num(s, "7", SqlType::Short)), "Short.valueOf((short) 7)\n");
        assert_eq!(render(&Expr::num(s, "10", SqlType::Bigint)), "Long.valueOf(10L)\n");
        assert_eq!(
            render(&Expr::num(s, "1.250", SqlType::Numeric)),
            "new BigDecimal(\"1.250\")\n"
        );
    }

    #[test]
    fn zero_date_is_an_explicit_constructor() {
        let e = Expr::new(span(0, 0), ExprKind::Date(Temporal::Zero));
        assert_eq!(render(&e), "new Date(0 - 1900, 0 - 1, 0)\n");
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(java_string("a\"b\\c\n\u{1}"), "\"a\\\"b\\\\c\\n\\u0001\"");
    }

    #[test]
    fn operators_call_the_runtime() {
        let s = span(0, 0);
        let e = Expr::binary(s, BinaryOp::Add, Expr::int(s, 1), Expr::int(s, 2))
            .with_coercion(Coercion::Conversion {
                src: SqlType::Int,
                dst: SqlType::Numeric,
            });
        assert_eq!(
            render(&e),
            "convIntToNumeric(opAdd(Integer.valueOf(1), Integer.valueOf(2)))\n"
        );
    }

    #[test]
    fn length_check_wraps_inner_coercion() {
        let c = Coercion::CheckStrLength {
            is_char: false,
            length: 8,
            inner: Box::new(Coercion::Identity),
        };
        let e = Expr::str(span(0, 0), "abc").with_coercion(c);
        assert_eq!(render(&e), "checkStrLength(false, 8, \"abc\")\n");
    }

    #[test]
    fn unopened_cursor_attribute_raises() {
        let unit = Scope::unit("p");
        let cur = Decl::new(
            "c",
            &unit,
            span(0, 0),
            DeclKind::Cursor(plcsql_ast::CursorDecl {
                params: vec![],
                sql: "select 1".into(),
                host_values: vec![],
                param_ref_counts: vec![],
                used_values_map: vec![],
            }),
        );
        let r = IdRef::new(&cur, &Site::body(&unit));
        let open = Expr::new(
            span(0, 0),
            ExprKind::CursorAttr { cursor: r.clone(), attr: CursorAttr::IsOpen },
        );
        assert_eq!(render(&open), "((p_1.c == null) ? Boolean.FALSE : p_1.c.isOpen())\n");
        let count = Expr::new(
            span(0, 0),
            ExprKind::CursorAttr { cursor: r, attr: CursorAttr::RowCount },
        );
        assert!(render(&count).contains("(Long) throwInvalidCursor("));
    }

    #[test]
    fn null_typed_case_is_null() {
        let s = span(0, 0);
        let e = Expr::new(
            s,
            ExprKind::Cond {
                result_ty: SqlType::Null,
                arms: vec![(Expr::bool(s, true), Expr::null(s))],
                otherwise: None,
            },
        );
        assert_eq!(render(&e), "null\n");
    }

    #[test]
    fn global_function_offsets_arguments_past_the_return_value() {
        let unit = Scope::unit("p");
        let x = Decl::new(
            "x",
            &unit,
            span(0, 0),
            DeclKind::Var { ty: SqlType::Int, not_null: true, init: None },
        );
        let ext = Arc::new(ExternRoutine {
            name: "g".into(),
            params: vec![
                ExternParam { name: "a".into(), ty: SqlType::Int, mode: ParamMode::In },
                ExternParam { name: "b".into(), ty: SqlType::Int, mode: ParamMode::InOut },
            ],
            ret: Some(SqlType::String),
        });
        let call = Call {
            callee: Callee::Remote(ext),
            args: vec![
                CallArg::In(Expr::int(span(0, 0), 3)),
                CallArg::Out {
                    target: IdRef::new(&x, &Site::body(&unit)),
                    to_param: Coercion::Identity,
                    from_param: Coercion::Identity,
                },
            ],
        };
        let text = call_code(&call, true).render(2);
        assert!(text.starts_with("(new Object() { // global function call: g\n"));
        assert!(text.contains("String dynSql = \"?= call g(?, ?)\";"));
        assert!(text.contains("stmt.setObject(2, o0);"));
        assert!(text.contains("stmt.registerOutParameter(3, java.sql.Types.OTHER);"));
        assert!(text.contains("stmt.setObject(3, o1[0]);"));
        assert!(text.contains("o1[0] = (Integer) stmt.getObject(3);"));
        assert!(text.contains("a not-null variable x was set NULL by this call"));
        assert!(text.ends_with("}.invoke(Integer.valueOf(3), p_1.x))\n"));
    }
}
