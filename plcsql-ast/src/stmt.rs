use std::sync::Arc;

use crate::decl::{Decl, Declaration, Routine};
use crate::expr::{Call, CallArg, Expr, IdRef};
use crate::scope::Scope;
use crate::types::{Coercion, SqlType};
use crate::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Assign {
        target: IdRef,
        value: Expr,
    },
    If {
        arms: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    /// Simple CASE statement; without `otherwise` a miss raises CASE_NOT_FOUND.
    Case {
        level: u32,
        selector: Expr,
        selector_ty: SqlType,
        whens: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    BasicLoop {
        label: Option<Arc<Decl>>,
        stmts: Vec<Stmt>,
    },
    While {
        label: Option<Arc<Decl>>,
        cond: Expr,
        stmts: Vec<Stmt>,
    },
    ForIter {
        label: Option<Arc<Decl>>,
        iter: Arc<Decl>,
        reverse: bool,
        lower: Expr,
        upper: Expr,
        step: Option<Expr>,
        stmts: Vec<Stmt>,
    },
    ForCursor {
        label: Option<Arc<Decl>>,
        record: Arc<Decl>,
        cursor: IdRef,
        args: Vec<Expr>,
        stmts: Vec<Stmt>,
    },
    ForSql {
        label: Option<Arc<Decl>>,
        record: Arc<Decl>,
        sql: SqlText,
        used_values: Vec<Expr>,
        stmts: Vec<Stmt>,
    },
    CursorOpen {
        level: u32,
        cursor: IdRef,
        args: Vec<Expr>,
    },
    CursorFetch {
        cursor: IdRef,
        into: Vec<IntoTarget>,
    },
    CursorClose {
        cursor: IdRef,
    },
    Block(Block),
    Exit {
        label: Option<Arc<Decl>>,
        when: Option<Expr>,
    },
    Continue {
        label: Option<Arc<Decl>>,
        when: Option<Expr>,
    },
    Return(Option<Expr>),
    Commit,
    Rollback,
    Null,
    Raise(RaiseTarget),
    RaiseAppError {
        code: Expr,
        message: Expr,
    },
    Sql(SqlStmt),
    ProcCall(Call),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub scope: Arc<Scope>,
    pub decls: Vec<Declaration>,
    pub body: Body,
}

/// Static or dynamic SQL executed in place (DML, SELECT INTO, EXECUTE IMMEDIATE).
#[derive(Clone, Debug, PartialEq)]
pub struct SqlStmt {
    pub level: u32,
    pub text: SqlText,
    pub into: Option<Vec<IntoTarget>>,
    /// Bound in order to the statement's `?` markers.
    pub used_values: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SqlText {
    /// Rewritten SQL with host values replaced by `?`.
    Static(String),
    /// A string expression evaluated at run time.
    Dynamic(Expr),
}

impl SqlText {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, SqlText::Dynamic(_))
    }
}

/// One INTO target. `column` is the statically known column type; dynamic
/// SQL leaves it `None` and extracts a plain `Object`.
#[derive(Clone, Debug, PartialEq)]
pub struct IntoTarget {
    pub target: IdRef,
    pub column: Option<SqlType>,
    pub coercion: Coercion,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RaiseTarget {
    Declared(IdRef),
    Predefined(String),
    /// Bare RAISE inside a handler of the given depth.
    Reraise { depth: u32 },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Body {
    pub stmts: Vec<Stmt>,
    pub handlers: Vec<ExHandler>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExHandler {
    pub names: Vec<ExName>,
    /// Nesting depth of handlers; the caught exception is bound as `e<depth>`.
    pub depth: u32,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExName {
    Others,
    Predefined(String),
    Declared(IdRef),
}

/// One compilation unit: a top-level function or procedure.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    pub routine: Routine,
    pub connection_required: bool,
    pub autonomous_transaction: bool,
}

impl Unit {
    pub fn class_name(&self, function_prefix: &str, procedure_prefix: &str) -> String {
        let prefix = if self.routine.is_function() {
            function_prefix
        } else {
            procedure_prefix
        };
        format!("{prefix}{}", self.routine.name())
    }
}

impl Stmt {
    pub fn new(span: Span, kind: StmtKind) -> Stmt {
        Stmt { span, kind }
    }

    /// Level used to suffix the Java locals this statement introduces.
    pub fn level(&self) -> Option<u32> {
        match &self.kind {
            StmtKind::Case { level, .. } | StmtKind::CursorOpen { level, .. } => Some(*level),
            StmtKind::Sql(s) => Some(s.level),
            StmtKind::ForIter { iter, .. } => Some(iter.scope.level),
            StmtKind::ForCursor { record, .. } | StmtKind::ForSql { record, .. } => {
                Some(record.scope.level)
            }
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&Arc<Decl>> {
        match &self.kind {
            StmtKind::BasicLoop { label, .. }
            | StmtKind::While { label, .. }
            | StmtKind::ForIter { label, .. }
            | StmtKind::ForCursor { label, .. }
            | StmtKind::ForSql { label, .. } => label.as_ref(),
            _ => None,
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::BasicLoop { .. }
                | StmtKind::While { .. }
                | StmtKind::ForIter { .. }
                | StmtKind::ForCursor { .. }
                | StmtKind::ForSql { .. }
        )
    }

    /// Calls `f` on every expression owned directly by this statement.
    pub fn for_each_expr<'a>(&'a self, mut f: impl FnMut(&'a Expr)) {
        match &self.kind {
            StmtKind::Assign { value, .. } => f(value),
            StmtKind::If { arms, .. } => arms.iter().for_each(|(c, _)| f(c)),
            StmtKind::Case {
                selector, whens, ..
            } => {
                f(selector);
                whens.iter().for_each(|(v, _)| f(v));
            }
            StmtKind::While { cond, .. } => f(cond),
            StmtKind::ForIter {
                lower, upper, step, ..
            } => {
                f(lower);
                f(upper);
                if let Some(s) = step {
                    f(s);
                }
            }
            StmtKind::ForCursor { args, .. } | StmtKind::CursorOpen { args, .. } => {
                args.iter().for_each(f)
            }
            StmtKind::ForSql {
                sql, used_values, ..
            } => {
                if let SqlText::Dynamic(e) = sql {
                    f(e);
                }
                used_values.iter().for_each(f);
            }
            StmtKind::Exit { when, .. } | StmtKind::Continue { when, .. } => {
                if let Some(w) = when {
                    f(w);
                }
            }
            StmtKind::Return(Some(e)) => f(e),
            StmtKind::RaiseAppError { code, message } => {
                f(code);
                f(message);
            }
            StmtKind::Sql(s) => {
                if let SqlText::Dynamic(e) = &s.text {
                    f(e);
                }
                s.used_values.iter().for_each(f);
            }
            StmtKind::ProcCall(call) => {
                for a in &call.args {
                    if let CallArg::In(e) = a {
                        f(e);
                    }
                }
            }
            _ => {}
        }
    }

    /// Calls `f` on every statement list nested directly in this statement.
    /// Blocks are not entered; their declarations need separate treatment.
    pub fn for_each_child_list<'a>(&'a self, mut f: impl FnMut(&'a [Stmt])) {
        match &self.kind {
            StmtKind::If { arms, otherwise } => {
                arms.iter().for_each(|(_, s)| f(s.as_slice()));
                if let Some(s) = otherwise {
                    f(s.as_slice());
                }
            }
            StmtKind::Case {
                whens, otherwise, ..
            } => {
                whens.iter().for_each(|(_, s)| f(s.as_slice()));
                if let Some(s) = otherwise {
                    f(s.as_slice());
                }
            }
            StmtKind::BasicLoop { stmts, .. }
            | StmtKind::While { stmts, .. }
            | StmtKind::ForIter { stmts, .. }
            | StmtKind::ForCursor { stmts, .. }
            | StmtKind::ForSql { stmts, .. } => f(stmts.as_slice()),
            _ => {}
        }
    }
}
