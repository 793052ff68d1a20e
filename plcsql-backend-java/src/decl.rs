//! Declarations, declaration classes and local routines.

use std::sync::Arc;

use plcsql_ast::{Decl, DeclKind, Declaration, Routine, Scope};
use tracing::trace;

use crate::code::Code;
use crate::expr::{expr, java_string};
use crate::names;
use crate::stmt;

/// The declaration class of a block and its single instance, or nothing
/// when the block declares nothing.
///
/// Members initialize in declaration order when the instance is created,
/// before any statement of the block runs.
pub fn decl_class(scope: &Scope, decls: &[Declaration]) -> Code {
    if decls.is_empty() {
        return Code::new();
    }
    let class = names::decl_class(&scope.block);

    let mut members = Code::text(format!("{class}() throws Exception {{}};"));
    for d in decls {
        members.append(match d {
            Declaration::Item(item) => self::item(item),
            Declaration::Routine(r) => routine(r),
        });
    }

    let mut c = Code::wrap(format!("class {class} {{"), members, "}");
    c.line(format!("{class} {} = new {class}();", scope.block));
    c
}

fn item(d: &Decl) -> Code {
    match &d.kind {
        DeclKind::Var { ty, not_null, init } => {
            let ty = ty.java_type();
            let head = format!("{ty}[] {} = new {ty}[] {{", d.name);
            match init {
                None => Code::text(format!("{head} null }};")),
                Some(v) if *not_null => Code::hang(
                    head,
                    Code::call(
                        "checkNotNull",
                        vec![expr(v), Code::text("\"NOT NULL constraint violated\"")],
                    ),
                    " };",
                ),
                Some(v) => Code::hang(head, expr(v), " };"),
            }
        }
        DeclKind::Const {
            ty,
            not_null,
            value,
        } => {
            let head = format!("final {} {} =", ty.java_type(), d.name);
            let value = if *not_null {
                Code::call(
                    "checkNotNull",
                    vec![expr(value), Code::text("\"NOT NULL constraint violated\"")],
                )
            } else {
                expr(value)
            };
            Code::hang(head, value, ";")
        }
        DeclKind::Cursor(c) => Code::text(format!(
            "final Query {} = new Query({}); // param-ref-counts: {:?}, used-values-map: {:?}",
            d.name,
            java_string(&c.sql),
            c.param_ref_counts,
            c.used_values_map
        )),
        DeclKind::Exception => Code::text(format!("class {} extends $APP_ERROR {{}}", d.name)),
        _ => unreachable!("{} '{}' in a declaration section", d.kind_name(), d.name),
    }
}

/// Java parameter declarations: IN parameters by value, OUT parameters as
/// holder arrays shared with the caller.
pub fn params(params: &[Arc<Decl>]) -> Vec<Code> {
    params
        .iter()
        .map(|p| {
            Code::text(match &p.kind {
                DeclKind::ParamIn { ty } => format!("{} {}", ty.java_type(), p.name),
                DeclKind::ParamOut { ty, .. } => format!("{}[] {}", ty.java_type(), p.name),
                _ => unreachable!("{} '{}' in a parameter list", p.kind_name(), p.name),
            })
        })
        .collect()
}

/// OUT-only parameters start as NULL whatever the caller passed in.
pub fn nullify_out_params(params: &[Arc<Decl>]) -> Code {
    let mut c = Code::new();
    for p in params {
        if let DeclKind::ParamOut { also_in: false, .. } = p.kind {
            c.line(format!("{}[0] = null;", p.name));
        }
    }
    c
}

/// A local function or procedure, as a method of the enclosing declaration
/// class.
pub fn routine(r: &Routine) -> Code {
    trace!(routine = %r.scope.routine, level = r.scope.level, "rendering local routine");
    let sig = r.sig();
    let ret = sig.ret.map_or("void", |t| t.java_type());

    let head = Code::call(&format!("{ret} {}", r.name()), params(&sig.params))
        .suffix(" throws Exception {");
    let mut c = head;
    c.nest(routine_body(r));
    c.line("}");
    c
}

/// Parameter reset, declaration class and statements of a routine.
pub fn routine_body(r: &Routine) -> Code {
    let mut c = nullify_out_params(&r.sig().params);
    c.append(decl_class(&r.scope, &r.decls));
    c.append(stmt::body(&r.body));
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use plcsql_ast::{Expr, Site, SqlType, span};

    #[test]
    fn not_null_variable_checks_its_initializer() {
        let unit = Scope::unit("p");
        let x = Decl::new(
            "x",
            &unit,
            span(0, 0),
            DeclKind::Var {
                ty: SqlType::Int,
                not_null: true,
                init: Some(Expr::int(span(0, 0), 1)),
            },
        );
        assert_eq!(
            item(&x).render(2),
            "Integer[] x = new Integer[] { checkNotNull(Integer.valueOf(1), \"NOT NULL constraint violated\") };\n"
        );
    }

    #[test]
    fn declaration_class_is_instantiated_once() {
        let unit = Scope::unit("p");
        let e = Decl::new("e", &unit, span(0, 0), DeclKind::Exception);
        let text = decl_class(&unit, &[Declaration::Item(e)]).render(2);
        assert_eq!(
            text,
            "class Decl_of_p_1 {\n  Decl_of_p_1() throws Exception {};\n  class e extends $APP_ERROR {}\n}\nDecl_of_p_1 p_1 = new Decl_of_p_1();\n"
        );
    }

    #[test]
    fn empty_declarations_render_nothing() {
        assert!(decl_class(&Scope::unit("p"), &[]).is_empty());
    }

    #[test]
    fn constant_refers_to_earlier_member_by_bare_name() {
        let unit = Scope::unit("p");
        let a = Decl::new(
            "a",
            &unit,
            span(0, 0),
            DeclKind::Var { ty: SqlType::Int, not_null: false, init: None },
        );
        let b = Decl::new(
            "b",
            &unit,
            span(0, 0),
            DeclKind::Const {
                ty: SqlType::Int,
                not_null: false,
                value: Expr::id(span(0, 0), &a, &Site::declarations(&unit)),
            },
        );
        assert_eq!(item(&b).render(2), "final Integer b = a[0];\n");
    }
}
