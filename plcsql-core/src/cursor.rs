//! Cursor host-value resolution.
//!
//! A cursor's SQL refers to its formal parameters through host values. When
//! the cursor is opened, each parameter that feeds more than one host value
//! is evaluated once into a temporary so argument side effects happen once.

use std::sync::Arc;

use plcsql_ast::{Call, CallArg, Callee, CursorDecl, Decl, Expr, ExprKind, IdRef, Site};

/// Per-cursor arrays: how often each parameter is used, and what each host
/// value is bound to (`-(k + 1)` for parameter `k`, its own index otherwise).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostValueUsage {
    pub param_ref_counts: Vec<u32>,
    pub used_values_map: Vec<i32>,
}

pub fn analyze(params: &[Arc<Decl>], host_values: &[Expr]) -> HostValueUsage {
    let mut param_ref_counts = vec![0u32; params.len()];
    let mut used_values_map = Vec::with_capacity(host_values.len());

    for (i, hv) in host_values.iter().enumerate() {
        let param = hv
            .as_id()
            .and_then(|r| params.iter().position(|p| r.refers_to(p)));
        match param {
            Some(k) => {
                param_ref_counts[k] += 1;
                used_values_map.push(-(k as i32) - 1);
            }
            None => used_values_map.push(i as i32),
        }
    }

    HostValueUsage {
        param_ref_counts,
        used_values_map,
    }
}

/// Builds a cursor declaration with its usage arrays filled in.
pub fn cursor_decl(
    params: Vec<Arc<Decl>>,
    sql: impl Into<String>,
    host_values: Vec<Expr>,
) -> CursorDecl {
    let usage = analyze(&params, &host_values);
    CursorDecl {
        params,
        sql: sql.into(),
        host_values,
        param_ref_counts: usage.param_ref_counts,
        used_values_map: usage.used_values_map,
    }
}

/// Decodes a negative map entry into a parameter index.
pub fn param_of_entry(entry: i32) -> Option<usize> {
    (entry < 0).then(|| (-(entry + 1)) as usize)
}

pub fn temp_name(param: usize, level: u32) -> String {
    format!("a{param}_{level}")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamUse {
    pub count: u32,
    /// Set when the argument is evaluated once ahead of the open call.
    pub temp: Option<String>,
}

/// What to pass for one host value at an open site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    /// A parameter used more than once: read its temporary.
    Temp(String),
    /// A parameter used exactly once: evaluate the argument in place.
    Arg(usize),
    /// Not a parameter: the cursor's own host value, re-sited to the open.
    Host(usize),
}

/// How one open of a cursor binds its host values, for statement level `level`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenPlan {
    pub params: Vec<ParamUse>,
    pub slots: Vec<Slot>,
}

impl OpenPlan {
    pub fn new(cursor: &CursorDecl, level: u32) -> OpenPlan {
        assert_eq!(
            cursor.param_ref_counts.len(),
            cursor.params.len(),
            "cursor parameter usage array out of sync"
        );

        let params: Vec<ParamUse> = cursor
            .param_ref_counts
            .iter()
            .enumerate()
            .map(|(k, &count)| ParamUse {
                count,
                temp: (count > 1).then(|| temp_name(k, level)),
            })
            .collect();

        let slots = cursor
            .used_values_map
            .iter()
            .enumerate()
            .map(|(i, &entry)| match param_of_entry(entry) {
                Some(k) => match &params[k].temp {
                    Some(t) => Slot::Temp(t.clone()),
                    None => Slot::Arg(k),
                },
                None => Slot::Host(i),
            })
            .collect();

        OpenPlan { params, slots }
    }

    /// Parameters to evaluate into temporaries, in parameter order.
    pub fn temps(&self) -> impl Iterator<Item = (usize, &str)> {
        self.params
            .iter()
            .enumerate()
            .filter_map(|(k, u)| u.temp.as_deref().map(|t| (k, t)))
    }
}

/// Rebinds every identifier in `expr` to `site`, so that a host value
/// written in a declaration section renders correctly at an open statement.
pub fn resite(expr: &Expr, site: &Site) -> Expr {
    let r = |e: &Expr| Box::new(resite(e, site));
    let id = |i: &IdRef| IdRef::new(&i.decl, site);

    let kind = match &expr.kind {
        ExprKind::Id(i) => ExprKind::Id(id(i)),
        ExprKind::Field {
            record,
            column,
            position,
            ty,
        } => ExprKind::Field {
            record: id(record),
            column: column.clone(),
            position: *position,
            ty: *ty,
        },
        ExprKind::CursorAttr { cursor, attr } => ExprKind::CursorAttr {
            cursor: id(cursor),
            attr: *attr,
        },
        ExprKind::Unary { op, operand } => ExprKind::Unary {
            op: *op,
            operand: r(operand),
        },
        ExprKind::Binary { op, left, right } => ExprKind::Binary {
            op: *op,
            left: r(left),
            right: r(right),
        },
        ExprKind::Between {
            target,
            lower,
            upper,
        } => ExprKind::Between {
            target: r(target),
            lower: r(lower),
            upper: r(upper),
        },
        ExprKind::In { target, elements } => ExprKind::In {
            target: r(target),
            elements: elements.iter().map(|e| resite(e, site)).collect(),
        },
        ExprKind::Like {
            target,
            pattern,
            escape,
        } => ExprKind::Like {
            target: r(target),
            pattern: r(pattern),
            escape: escape.clone(),
        },
        ExprKind::Case {
            selector,
            selector_ty,
            result_ty,
            whens,
            otherwise,
        } => ExprKind::Case {
            selector: r(selector),
            selector_ty: *selector_ty,
            result_ty: *result_ty,
            whens: whens
                .iter()
                .map(|(v, e)| (resite(v, site), resite(e, site)))
                .collect(),
            otherwise: otherwise.as_deref().map(r),
        },
        ExprKind::Cond {
            result_ty,
            arms,
            otherwise,
        } => ExprKind::Cond {
            result_ty: *result_ty,
            arms: arms
                .iter()
                .map(|(c, e)| (resite(c, site), resite(e, site)))
                .collect(),
            otherwise: otherwise.as_deref().map(r),
        },
        ExprKind::Call(call) => ExprKind::Call(Call {
            callee: match &call.callee {
                Callee::Local(i) => Callee::Local(id(i)),
                Callee::Remote(ext) => Callee::Remote(ext.clone()),
            },
            args: call
                .args
                .iter()
                .map(|a| match a {
                    CallArg::In(e) => CallArg::In(resite(e, site)),
                    CallArg::Out {
                        target,
                        to_param,
                        from_param,
                    } => CallArg::Out {
                        target: id(target),
                        to_param: to_param.clone(),
                        from_param: from_param.clone(),
                    },
                })
                .collect(),
        }),
        other => other.clone(),
    };

    Expr {
        span: expr.span,
        kind,
        coercion: expr.coercion.clone(),
    }
}
