use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::decl::{Callee, Decl};
use crate::scope::Site;
use crate::types::{Coercion, SqlType};
use crate::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
    /// Applied around the rendered value; `None` behaves as identity.
    pub coercion: Option<Coercion>,
}

/// A resolved identifier occurrence: the declaration and the place it is
/// referenced from. Both decide how the name is qualified in Java.
#[derive(Clone, Debug, PartialEq)]
pub struct IdRef {
    pub decl: Arc<Decl>,
    pub site: Site,
}

impl IdRef {
    pub fn new(decl: &Arc<Decl>, site: &Site) -> IdRef {
        IdRef {
            decl: decl.clone(),
            site: site.clone(),
        }
    }

    pub fn refers_to(&self, decl: &Arc<Decl>) -> bool {
        Arc::ptr_eq(&self.decl, decl)
    }
}

/// Date/time literal value; `Zero` is the all-zero date the database accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Temporal<T> {
    Zero,
    At(T),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Null,
    Bool(bool),
    /// Numeric literal; `text` is the exact digit sequence from the source.
    Num {
        text: String,
        ty: SqlType,
    },
    Str(String),
    Date(Temporal<NaiveDate>),
    Time(NaiveTime),
    Datetime(Temporal<NaiveDateTime>),
    Timestamp(Temporal<NaiveDateTime>),
    Id(IdRef),
    /// Column of the current row bound by a cursor or query for-loop.
    /// `position` is the 1-based index in the select list; `column` is the
    /// name as written and only appears in diagnostics.
    Field {
        record: IdRef,
        column: String,
        position: u32,
        ty: SqlType,
    },
    CursorAttr {
        cursor: IdRef,
        attr: CursorAttr,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Between {
        target: Box<Expr>,
        lower: Box<Expr>,
        upper: Box<Expr>,
    },
    In {
        target: Box<Expr>,
        elements: Vec<Expr>,
    },
    Like {
        target: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<String>,
    },
    /// Simple CASE: the selector is evaluated once and compared with each
    /// `when` value in order.
    Case {
        selector: Box<Expr>,
        selector_ty: SqlType,
        result_ty: SqlType,
        whens: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    /// Searched CASE.
    Cond {
        result_ty: SqlType,
        arms: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    Call(Call),
    SerialVal {
        serial: String,
        which: SerialVal,
    },
    RowCount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorAttr {
    IsOpen,
    Found,
    NotFound,
    RowCount,
}

impl CursorAttr {
    pub fn method(self) -> &'static str {
        match self {
            CursorAttr::IsOpen => "isOpen",
            CursorAttr::Found => "found",
            CursorAttr::NotFound => "notFound",
            CursorAttr::RowCount => "rowCount",
        }
    }

    pub fn result_ty(self) -> SqlType {
        match self {
            CursorAttr::RowCount => SqlType::Bigint,
            _ => SqlType::Boolean,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerialVal {
    Current,
    Next,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitCompli,
    IsNull,
    IsNotNull,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Mult,
    Div,
    DivInt,
    Mod,
    Concat,
    Eq,
    NullSafeEq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
    BitAnd,
    BitOr,
    BitXor,
    BitShiftLeft,
    BitShiftRight,
}

macro_rules! op_names {
    ($ty:ident { $($v:ident),* $(,)? }) => {
        impl $ty {
            /// Suffix of the runtime operator (`op<Name>`).
            pub fn name(self) -> &'static str {
                match self {
                    $($ty::$v => stringify!($v),)*
                }
            }
        }
    };
}

op_names!(UnaryOp { Neg, Not, BitCompli, IsNull, IsNotNull });
op_names!(BinaryOp {
    Add, Subtract, Mult, Div, DivInt, Mod, Concat, Eq, NullSafeEq, Neq, Lt, Le, Gt, Ge, And, Or,
    Xor, BitAnd, BitOr, BitXor, BitShiftLeft, BitShiftRight,
});

#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub callee: Callee,
    pub args: Vec<CallArg>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CallArg {
    In(Expr),
    /// Argument for an OUT or IN OUT parameter: the holder it writes back to,
    /// the coercion into the parameter type and the one back out of it.
    Out {
        target: IdRef,
        to_param: Coercion,
        from_param: Coercion,
    },
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Expr {
        Expr {
            span,
            kind,
            coercion: None,
        }
    }

    pub fn with_coercion(mut self, coercion: Coercion) -> Expr {
        self.coercion = Some(coercion);
        self
    }

    pub fn null(span: Span) -> Expr {
        Expr::new(span, ExprKind::Null)
    }

    pub fn bool(span: Span, v: bool) -> Expr {
        Expr::new(span, ExprKind::Bool(v))
    }

    pub fn num(span: Span, text: impl Into<String>, ty: SqlType) -> Expr {
        Expr::new(
            span,
            ExprKind::Num {
                text: text.into(),
                ty,
            },
        )
    }

    pub fn int(span: Span, v: i32) -> Expr {
        Expr::num(span, v.to_string(), SqlType::Int)
    }

    pub fn str(span: Span, s: impl Into<String>) -> Expr {
        Expr::new(span, ExprKind::Str(s.into()))
    }

    pub fn id(span: Span, decl: &Arc<Decl>, site: &Site) -> Expr {
        Expr::new(span, ExprKind::Id(IdRef::new(decl, site)))
    }

    pub fn unary(span: Span, op: UnaryOp, operand: Expr) -> Expr {
        Expr::new(
            span,
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        )
    }

    pub fn binary(span: Span, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::new(
            span,
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    pub fn as_id(&self) -> Option<&IdRef> {
        match &self.kind {
            ExprKind::Id(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Null
                | ExprKind::Bool(_)
                | ExprKind::Num { .. }
                | ExprKind::Str(_)
                | ExprKind::Date(_)
                | ExprKind::Time(_)
                | ExprKind::Datetime(_)
                | ExprKind::Timestamp(_)
        )
    }

    /// Calls `f` on every direct subexpression.
    pub fn for_each_child<'a>(&'a self, mut f: impl FnMut(&'a Expr)) {
        match &self.kind {
            ExprKind::Unary { operand, .. } => f(operand),
            ExprKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            ExprKind::Between {
                target,
                lower,
                upper,
            } => {
                f(target);
                f(lower);
                f(upper);
            }
            ExprKind::In { target, elements } => {
                f(target);
                for e in elements {
                    f(e);
                }
            }
            ExprKind::Like {
                target, pattern, ..
            } => {
                f(target);
                f(pattern);
            }
            ExprKind::Case {
                selector,
                whens,
                otherwise,
                ..
            } => {
                f(selector);
                for (v, e) in whens {
                    f(v);
                    f(e);
                }
                if let Some(e) = otherwise {
                    f(e);
                }
            }
            ExprKind::Cond {
                arms, otherwise, ..
            } => {
                for (c, e) in arms {
                    f(c);
                    f(e);
                }
                if let Some(e) = otherwise {
                    f(e);
                }
            }
            ExprKind::Call(call) => {
                for a in &call.args {
                    if let CallArg::In(e) = a {
                        f(e);
                    }
                }
            }
            _ => {}
        }
    }
}
