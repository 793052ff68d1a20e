#![forbid(unsafe_code)]

//! Java code generation for resolved PL/CSQL stored routines.
//!
//! Each top-level routine becomes one Java class whose single static method
//! runs inside the database server against the `SpLib` runtime.

pub mod code;
pub mod config;
pub mod decl;
pub mod error;
pub mod expr;
pub mod imports;
pub mod names;
pub mod render;
pub mod stmt;
pub mod unit;

use plcsql_ast::{SourceMap, Unit};
use rayon::prelude::*;
use tracing::{debug, info_span};

pub use code::{Code, Mark};
pub use config::{ConfigError, EmitConfig};
pub use error::JavaBackendError;
pub use render::{JavaList, ToJava};
pub use unit::{JavaSource, code_range_markers};

/// Generates the Java class for `unit`.
///
/// The tree is checked against the generator's input contract first unless
/// `config.validate` is off; a violation yields no text at all. With a
/// `source` map and `config.line_markers`, the class also maps its lines back
/// to statement positions in the source.
pub fn emit_unit(
    unit: &Unit,
    config: &EmitConfig,
    source: Option<&SourceMap>,
) -> Result<JavaSource, JavaBackendError> {
    let _span = info_span!("emit_unit", routine = unit.routine.name()).entered();

    if config.validate {
        plcsql_core::validate_unit(unit)?;
    }

    let java = unit::assemble(unit, config, source);
    debug!(
        class = %java.class_name,
        lines = java.text.lines().count(),
        "emitted Java class"
    );
    Ok(java)
}

/// Generates independent units in parallel. Results keep the order of `jobs`.
pub fn emit_units(
    jobs: &[(&Unit, Option<&SourceMap>)],
    config: &EmitConfig,
) -> Vec<Result<JavaSource, JavaBackendError>> {
    jobs.par_iter()
        .map(|(unit, source)| emit_unit(unit, config, *source))
        .collect()
}
