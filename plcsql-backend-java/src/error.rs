use miette::Diagnostic;
use plcsql_core::ContractViolation;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error, Diagnostic)]
pub enum JavaBackendError {
    #[error("input contract violated before Java emission: {0}")]
    #[diagnostic(code(plcsql::backend_java::contract))]
    Contract(#[from] ContractViolation),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}
