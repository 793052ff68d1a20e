#![forbid(unsafe_code)]

//! Resolved syntax tree of a PL/CSQL stored routine, as handed over by semantic
//! analysis: every identifier carries its declaration, every expression its
//! chosen coercion, every cursor its host-value usage arrays.

pub mod decl;
pub mod expr;
pub mod scope;
pub mod source;
pub mod stmt;
pub mod types;

use miette::SourceSpan;

pub use decl::{
    Callee, CursorDecl, Decl, DeclKind, Declaration, ExternParam, ExternRoutine, ParamMode,
    ParamSig, Routine, RoutineSig,
};
pub use expr::{
    BinaryOp, Call, CallArg, CursorAttr, Expr, ExprKind, IdRef, SerialVal, Temporal, UnaryOp,
};
pub use scope::{Scope, Section, Site};
pub use source::{LineCol, SourceMap};
pub use stmt::{
    Block, Body, ExHandler, ExName, IntoTarget, RaiseTarget, SqlStmt, SqlText, Stmt, StmtKind,
    Unit,
};
pub use types::{Coercion, SqlType};

pub type Span = SourceSpan;

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}
