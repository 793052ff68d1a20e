#![allow(unused_assignments)]

use miette::Diagnostic;
use plcsql_ast::Span;
use thiserror::Error;

/// The tree handed to the generator breaks an invariant semantic analysis
/// is supposed to establish.
#[derive(Debug, Error, Diagnostic)]
#[error("contract violation: {message}")]
#[diagnostic(
    code(plcsql::contract),
    help("this indicates a bug in the semantic analysis that produced the tree")
)]
#[allow(unused_assignments)]
pub struct ContractViolation {
    pub message: String,
    #[label]
    pub span: Span,
}

impl ContractViolation {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}
