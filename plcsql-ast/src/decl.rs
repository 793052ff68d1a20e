use std::sync::Arc;

use crate::expr::{Expr, IdRef};
use crate::scope::Scope;
use crate::stmt::Body;
use crate::types::SqlType;
use crate::Span;

/// A named entity. Immutable once built; its owning scope is fixed at
/// construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Decl {
    pub name: String,
    pub scope: Arc<Scope>,
    pub span: Span,
    pub kind: DeclKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeclKind {
    Const {
        ty: SqlType,
        not_null: bool,
        value: Expr,
    },
    /// Realized as a one-element holder array.
    Var {
        ty: SqlType,
        not_null: bool,
        init: Option<Expr>,
    },
    ParamIn {
        ty: SqlType,
    },
    /// Realized as a one-element holder array shared with the caller.
    ParamOut {
        ty: SqlType,
        also_in: bool,
    },
    Cursor(CursorDecl),
    Exception,
    Label,
    ForIter,
    ForRecord,
    Routine(RoutineSig),
}

/// A declared cursor.
///
/// `param_ref_counts[k]` is the number of host values that are exactly a
/// reference to parameter `k`. `used_values_map[i]` is `-(k + 1)` when host
/// value `i` is parameter `k`, and `i` itself otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct CursorDecl {
    pub params: Vec<Arc<Decl>>,
    pub sql: String,
    pub host_values: Vec<Expr>,
    pub param_ref_counts: Vec<u32>,
    pub used_values_map: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoutineSig {
    pub params: Vec<Arc<Decl>>,
    /// `None` for a procedure.
    pub ret: Option<SqlType>,
}

impl Decl {
    pub fn new(
        name: impl Into<String>,
        scope: &Arc<Scope>,
        span: Span,
        kind: DeclKind,
    ) -> Arc<Decl> {
        Arc::new(Decl {
            name: name.into(),
            scope: scope.clone(),
            span,
            kind,
        })
    }

    pub fn ty(&self) -> Option<SqlType> {
        match &self.kind {
            DeclKind::Const { ty, .. }
            | DeclKind::Var { ty, .. }
            | DeclKind::ParamIn { ty }
            | DeclKind::ParamOut { ty, .. } => Some(*ty),
            DeclKind::ForIter => Some(SqlType::Int),
            DeclKind::Cursor(_) => Some(SqlType::Cursor),
            _ => None,
        }
    }

    /// Variables and OUT parameters are one-element arrays; a reference to
    /// the value reads element 0.
    pub fn is_holder(&self) -> bool {
        matches!(self.kind, DeclKind::Var { .. } | DeclKind::ParamOut { .. })
    }

    /// Members of a block's declaration class, as opposed to parameters and
    /// loop-introduced names that live directly in the Java method body.
    pub fn is_block_member(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::Const { .. }
                | DeclKind::Var { .. }
                | DeclKind::Cursor(_)
                | DeclKind::Exception
                | DeclKind::Routine(_)
        )
    }

    pub fn is_not_null(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::Var { not_null: true, .. } | DeclKind::Const { not_null: true, .. }
        )
    }

    pub fn as_cursor(&self) -> Option<&CursorDecl> {
        match &self.kind {
            DeclKind::Cursor(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_routine(&self) -> Option<&RoutineSig> {
        match &self.kind {
            DeclKind::Routine(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            DeclKind::Const { .. } => "constant",
            DeclKind::Var { .. } => "variable",
            DeclKind::ParamIn { .. } => "IN parameter",
            DeclKind::ParamOut { .. } => "OUT parameter",
            DeclKind::Cursor(_) => "cursor",
            DeclKind::Exception => "exception",
            DeclKind::Label => "label",
            DeclKind::ForIter => "loop iterator",
            DeclKind::ForRecord => "loop record",
            DeclKind::Routine(_) => "routine",
        }
    }
}

/// A routine defined in this unit: the unit's own routine or a local one.
#[derive(Clone, Debug, PartialEq)]
pub struct Routine {
    /// Carries the signature (`DeclKind::Routine`) and the declaring scope.
    pub decl: Arc<Decl>,
    /// Scope of parameters, declarations and body.
    pub scope: Arc<Scope>,
    pub decls: Vec<Declaration>,
    pub body: Body,
}

impl Routine {
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn sig(&self) -> &RoutineSig {
        match &self.decl.kind {
            DeclKind::Routine(sig) => sig,
            _ => unreachable!("routine '{}' without a routine signature", self.decl.name),
        }
    }

    pub fn is_function(&self) -> bool {
        self.sig().ret.is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Declaration {
    Item(Arc<Decl>),
    Routine(Routine),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamMode {
    In,
    Out,
    InOut,
}

impl ParamMode {
    pub fn is_out(self) -> bool {
        !matches!(self, ParamMode::In)
    }
}

/// A stored routine living outside this unit, called through the SQL layer.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternRoutine {
    pub name: String,
    pub params: Vec<ExternParam>,
    pub ret: Option<SqlType>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExternParam {
    pub name: String,
    pub ty: SqlType,
    pub mode: ParamMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamSig {
    pub ty: SqlType,
    pub mode: ParamMode,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Callee {
    /// A routine of this unit, referenced from the call site.
    Local(IdRef),
    Remote(Arc<ExternRoutine>),
}

impl Callee {
    pub fn name(&self) -> &str {
        match self {
            Callee::Local(r) => &r.decl.name,
            Callee::Remote(ext) => &ext.name,
        }
    }

    /// Parameter shapes, or `None` when a local callee is not a routine.
    pub fn params(&self) -> Option<Vec<ParamSig>> {
        match self {
            Callee::Local(r) => {
                let sig = r.decl.as_routine()?;
                let mut out = Vec::with_capacity(sig.params.len());
                for p in &sig.params {
                    let sig = match &p.kind {
                        DeclKind::ParamIn { ty } => ParamSig { ty: *ty, mode: ParamMode::In },
                        DeclKind::ParamOut { ty, also_in } => ParamSig {
                            ty: *ty,
                            mode: if *also_in { ParamMode::InOut } else { ParamMode::Out },
                        },
                        _ => return None,
                    };
                    out.push(sig);
                }
                Some(out)
            }
            Callee::Remote(ext) => Some(
                ext.params
                    .iter()
                    .map(|p| ParamSig { ty: p.ty, mode: p.mode })
                    .collect(),
            ),
        }
    }

    pub fn ret(&self) -> Option<SqlType> {
        match self {
            Callee::Local(r) => r.decl.as_routine().and_then(|s| s.ret),
            Callee::Remote(ext) => ext.ret,
        }
    }
}
