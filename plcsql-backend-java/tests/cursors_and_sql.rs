use std::sync::Arc;

use plcsql_ast::{
    Coercion, Decl, DeclKind, Declaration, Expr, ExprKind, IdRef, IntoTarget, Scope, Site,
    SqlStmt, SqlText, SqlType, StmtKind, Unit,
};
use plcsql_backend_java::{EmitConfig, emit_unit, stmt};
use plcsql_core::cursor_decl;

mod common;
use common::{at, label, procedure, stmt as node, var};

fn param(scope: &Arc<Scope>, name: &str) -> Arc<Decl> {
    Decl::new(name, scope, at(), DeclKind::ParamIn { ty: SqlType::Int })
}

/// Cursor `c(p1, p2)` over `select ?, ?, ?` using p1, p2, p1.
fn repeated_param_cursor(unit: &Arc<Scope>) -> Arc<Decl> {
    let cs = unit.nested("cursor");
    let site = Site::declarations(&cs);
    let p1 = param(&cs, "p1");
    let p2 = param(&cs, "p2");
    let hv = vec![
        Expr::id(at(), &p1, &site),
        Expr::id(at(), &p2, &site),
        Expr::id(at(), &p1, &site),
    ];
    Decl::new(
        "c",
        unit,
        at(),
        DeclKind::Cursor(cursor_decl(vec![p1, p2], "select ?, ?, ? from t", hv)),
    )
}

#[test]
fn repeated_parameter_is_evaluated_once_into_a_temporary() {
    let unit = Scope::unit("p");
    let c = repeated_param_cursor(&unit);
    let open = node(StmtKind::CursorOpen {
        level: 2,
        cursor: IdRef::new(&c, &Site::body(&unit)),
        args: vec![Expr::int(at(), 10), Expr::int(at(), 20)],
    });

    assert_eq!(
        stmt::stmt(&open).render(2),
        "{ // cursor open\n  Object a0_2 = Integer.valueOf(10);\n  p_1.c.open(conn, a0_2, Integer.valueOf(20), a0_2);\n}\n"
    );
}

#[test]
fn cursor_declaration_records_usage_arrays() {
    let unit = Scope::unit("p");
    let c = repeated_param_cursor(&unit);
    let u = procedure(&unit, vec![Declaration::Item(c)], vec![], true);

    let java = emit_unit(&u, &EmitConfig::default(), None).expect("emit").text;
    assert!(
        java.contains(
            "final Query c = new Query(\"select ?, ?, ? from t\"); // param-ref-counts: [2, 1], used-values-map: [-1, -2, -1]"
        ),
        "{java}"
    );
}

#[test]
fn unused_parameter_argument_is_not_evaluated() {
    let unit = Scope::unit("p");
    let cs = unit.nested("cursor");
    let c = Decl::new(
        "c",
        &unit,
        at(),
        DeclKind::Cursor(cursor_decl(vec![param(&cs, "unused")], "select 1 from t", vec![])),
    );
    let open = node(StmtKind::CursorOpen {
        level: 2,
        cursor: IdRef::new(&c, &Site::body(&unit)),
        args: vec![Expr::int(at(), 5)],
    });

    let text = stmt::stmt(&open).render(2);
    assert_eq!(text, "{ // cursor open\n  p_1.c.open(conn);\n}\n");
}

#[test]
fn host_value_is_requalified_at_the_open_site() {
    let unit = Scope::unit("p");
    let x = var(&unit, "x", SqlType::Int);
    let c = Decl::new(
        "c",
        &unit,
        at(),
        DeclKind::Cursor(cursor_decl(
            vec![],
            "select a from t where b = ?",
            vec![Expr::id(at(), &x, &Site::declarations(&unit))],
        )),
    );
    let open = node(StmtKind::CursorOpen {
        level: 2,
        cursor: IdRef::new(&c, &Site::body(&unit)),
        args: vec![],
    });

    assert!(stmt::stmt(&open).render(2).contains("p_1.c.open(conn, p_1.x[0]);"));
}

#[test]
fn cursor_loop_binds_record_rows() {
    let unit = Scope::unit("p");
    let lp = unit.nested("for_cursor");
    let c = repeated_param_cursor(&unit);
    let rec = Decl::new("r", &lp, at(), DeclKind::ForRecord);
    let y = var(&unit, "y", SqlType::Int);

    let body = vec![node(StmtKind::Assign {
        target: IdRef::new(&y, &Site::body(&lp)),
        value: Expr::new(
            at(),
            ExprKind::Field {
                record: IdRef::new(&rec, &Site::body(&lp)),
                column: "a".into(),
                position: 1,
                ty: SqlType::Int,
            },
        ),
    })];
    let s = node(StmtKind::ForCursor {
        label: None,
        record: rec,
        cursor: IdRef::new(&c, &Site::body(&unit)),
        args: vec![Expr::int(at(), 1), Expr::int(at(), 2)],
        stmts: body,
    });

    let text = stmt::stmt(&s).render(2);
    assert!(text.starts_with("try { // for loop with a cursor\n  Object a0_2 = Integer.valueOf(1);\n"), "{text}");
    assert!(
        text.contains("  p_1.c.open(conn, a0_2, Integer.valueOf(2), a0_2);\n  try {\n    ResultSet r_r2 = p_1.c.rs;\n    while (r_r2.next()) {\n      p_1.c.updateRowCount();\n"),
        "{text}"
    );
    assert!(text.contains("p_1.y[0] = ((Integer) r_r2.getObject(1));"), "{text}");
    assert!(
        text.contains("  } finally {\n    if (p_1.c.isOpen()) {\n      p_1.c.close();\n    }\n  }\n} catch (SQLException e) {\n"),
        "{text}"
    );
    assert_eq!(text.matches("p_1.c.close();").count(), 1);
}

/// `outer: loop for r in c loop <jump>; end loop; end loop;`
fn cursor_loop_left_by(jump: impl FnOnce(&Arc<Decl>) -> StmtKind) -> (Unit, String) {
    let unit = Scope::unit("p");
    let outer = unit.nested("loop");
    let lp = outer.nested("for_cursor");
    let c = repeated_param_cursor(&unit);
    let l = label(&outer, "outer");
    let rec = Decl::new("r", &lp, at(), DeclKind::ForRecord);

    let cursor_loop = node(StmtKind::ForCursor {
        label: None,
        record: rec,
        cursor: IdRef::new(&c, &Site::body(&lp)),
        args: vec![Expr::int(at(), 1), Expr::int(at(), 2)],
        stmts: vec![node(jump(&l))],
    });
    let s = node(StmtKind::BasicLoop { label: Some(l), stmts: vec![cursor_loop] });
    let text = stmt::stmt(&s).render(2);
    (procedure(&unit, vec![Declaration::Item(c)], vec![s], true), text)
}

#[test]
fn cursor_is_closed_when_its_loop_is_left_early() {
    let leave: [(&str, fn(&Arc<Decl>) -> StmtKind); 3] = [
        ("break outer_2;", |l| StmtKind::Exit { label: Some(l.clone()), when: None }),
        ("continue outer_2;", |l| StmtKind::Continue { label: Some(l.clone()), when: None }),
        ("return;", |_| StmtKind::Return(None)),
    ];

    for (jump, kind) in leave {
        let (u, text) = cursor_loop_left_by(kind);
        let at_jump = text.find(jump).unwrap_or_else(|| panic!("no {jump:?} in\n{text}"));
        let finally = text.find("} finally {").expect("cursor loop has a finally");
        let close = text.find("p_1.c.close();").expect("cursor is closed");
        assert!(at_jump < finally && finally < close, "{text}");
        assert!(text.contains(&format!("        {jump}\n")), "{text}");
        assert!(
            text.contains("    } finally {\n      if (p_1.c.isOpen()) {\n        p_1.c.close();\n      }\n    }\n  } catch (SQLException e) {\n"),
            "{text}"
        );
        assert_eq!(text.matches("p_1.c.close();").count(), 1, "{text}");

        emit_unit(&u, &EmitConfig::default(), None).expect("valid unit");
    }
}

#[test]
fn record_fields_are_read_by_select_list_position() {
    let unit = Scope::unit("p");
    let lp = unit.nested("for_sql");
    let rec = Decl::new("r", &lp, at(), DeclKind::ForRecord);
    let x = var(&unit, "x", SqlType::Int);
    let y = var(&unit, "y", SqlType::Int);
    let field = |position| {
        Expr::new(
            at(),
            ExprKind::Field {
                record: IdRef::new(&rec, &Site::body(&lp)),
                column: "a".into(),
                position,
                ty: SqlType::Int,
            },
        )
    };
    let assign = |target: &Arc<Decl>, position| {
        node(StmtKind::Assign {
            target: IdRef::new(target, &Site::body(&lp)),
            value: field(position),
        })
    };

    let s = node(StmtKind::ForSql {
        label: None,
        record: rec.clone(),
        sql: SqlText::Static("select t1.a, t2.a from t1, t2".into()),
        used_values: vec![],
        stmts: vec![assign(&x, 1), assign(&y, 2)],
    });

    let text = stmt::stmt(&s).render(2);
    assert!(text.contains("ResultSet r_r2 = stmt_2.executeQuery();"), "{text}");
    assert!(
        text.contains("p_1.x[0] = ((Integer) r_r2.getObject(1));\n      p_1.y[0] = ((Integer) r_r2.getObject(2));"),
        "{text}"
    );
    assert!(!text.contains("getObject(\"a\")"), "{text}");

    let u = procedure(
        &unit,
        vec![Declaration::Item(x.clone()), Declaration::Item(y.clone())],
        vec![s],
        true,
    );
    emit_unit(&u, &EmitConfig::default(), None).expect("valid unit");
}

#[test]
fn select_into_fetches_exactly_one_row() {
    let unit = Scope::unit("p");
    let x = var(&unit, "x", SqlType::Int);
    let y = var(&unit, "y", SqlType::String);
    let site = Site::body(&unit);
    let s = node(StmtKind::Sql(SqlStmt {
        level: 2,
        text: SqlText::Static("select a, b from t where c = ?".into()),
        into: Some(vec![
            IntoTarget {
                target: IdRef::new(&x, &site),
                column: Some(SqlType::Int),
                coercion: Coercion::Identity,
            },
            IntoTarget {
                target: IdRef::new(&y, &site),
                column: Some(SqlType::String),
                coercion: Coercion::Identity,
            },
        ]),
        used_values: vec![Expr::int(at(), 1)],
    }));

    let text = stmt::stmt(&s).render(2);
    for expected in [
        "{ // static SQL statement\n",
        "String sql_2 = \"select a, b from t where c = ?\";",
        "stmt_2 = conn.prepareStatement(sql_2);",
        "ResultSetMetaData rsmd_2 = stmt_2.getMetaData();",
        "throw new SQL_ERROR(\"INTO clause must be used with a SELECT statement\");",
        "stmt_2.setObject(1, Integer.valueOf(1));",
        "p_1.x[0] = (Integer) r2.getObject(1);",
        "if (p_1.x[0] != null && r2.wasNull()) { p_1.x[0] = null; }",
        "p_1.y[0] = (String) r2.getObject(2);",
    ] {
        assert!(text.contains(expected), "missing {expected:?} in\n{text}");
    }

    // the count is reset before any row is read; a second row stops the fetch
    assert!(
        text.contains(
            "    if (stmt_2.execute()) {\n      sql_rowcount[0] = 0L;\n      ResultSet r2 = stmt_2.getResultSet();\n"
        ),
        "{text}"
    );
    assert!(
        text.contains("      while (r2.next()) {\n        i2++;\n        if (i2 > 1) {\n          break;\n        } else {\n"),
        "{text}"
    );
    // zero rows keep the count at 0; two or more set it to 1 before raising
    assert!(
        text.contains(concat!(
            "      if (i2 == 0) {\n",
            "        throw new NO_DATA_FOUND();\n",
            "      } else if (i2 == 1) {\n",
            "        sql_rowcount[0] = 1L;\n",
            "      } else {\n",
            "        sql_rowcount[0] = 1L;\n",
            "        throw new TOO_MANY_ROWS();\n",
            "      }\n",
            "    } else {\n",
            "      sql_rowcount[0] = (long) stmt_2.getUpdateCount();\n",
            "    }\n",
        )),
        "{text}"
    );
    assert_eq!(text.matches("sql_rowcount[0] =").count(), 4, "{text}");
}

#[test]
fn dynamic_sql_text_must_not_be_null() {
    let unit = Scope::unit("p");
    let q = var(&unit, "q", SqlType::String);
    let s = node(StmtKind::Sql(SqlStmt {
        level: 3,
        text: SqlText::Dynamic(Expr::id(at(), &q, &Site::body(&unit))),
        into: None,
        used_values: vec![],
    }));

    let text = stmt::stmt(&s).render(2);
    assert!(text.starts_with("{ // dynamic SQL statement\n"));
    assert!(text.contains(
        "String sql_3 = checkNotNull(p_1.q[0], \"SQL part was evaluated to NULL\");"
    ));
    assert!(!text.contains("rsmd_3"));
}

#[test]
fn fetch_into_not_null_target_is_checked() {
    let unit = Scope::unit("p");
    let c = repeated_param_cursor(&unit);
    let z = Decl::new(
        "z",
        &unit,
        at(),
        DeclKind::Var { ty: SqlType::Int, not_null: true, init: Some(Expr::int(at(), 0)) },
    );
    let s = node(StmtKind::CursorFetch {
        cursor: IdRef::new(&c, &Site::body(&unit)),
        into: vec![IntoTarget {
            target: IdRef::new(&z, &Site::body(&unit)),
            column: Some(SqlType::Int),
            coercion: Coercion::Identity,
        }],
    });

    let text = stmt::stmt(&s).render(2);
    assert!(text.contains("if (p_1.c == null || !p_1.c.isOpen()) {"), "{text}");
    assert!(text.contains("checkNotNull(p_1.z[0], \"NOT NULL constraint violated\");"), "{text}");
}
