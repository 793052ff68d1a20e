#![forbid(unsafe_code)]

//! Analyses shared by the code generators: cursor host-value resolution and
//! the input-contract check run before any text is produced.

pub mod cursor;
pub mod error;
pub mod validate;

pub use cursor::{HostValueUsage, OpenPlan, ParamUse, Slot, analyze, cursor_decl, resite};
pub use error::ContractViolation;
pub use validate::validate_unit;
