use std::fs;
use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(plcsql::config))]
#[allow(unused_assignments)]
pub struct ConfigError {
    pub message: String,
}

/// Emitter settings, read from the `[emit]` table of `plcsql.toml`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmitConfig {
    /// Spaces per indentation level.
    pub indent_width: usize,
    pub class_prefix_function: String,
    pub class_prefix_procedure: String,
    /// Check the input contract before emitting.
    pub validate: bool,
    /// Embed the Java line to source position table when a source map is given.
    pub line_markers: bool,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            indent_width: 2,
            class_prefix_function: "Func_".to_string(),
            class_prefix_procedure: "Proc_".to_string(),
            validate: true,
            line_markers: true,
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct ConfigFile {
    #[serde(default)]
    emit: Option<EmitConfig>,
}

impl EmitConfig {
    /// Parses a `plcsql.toml`; a missing `[emit]` table yields the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let parsed: ConfigFile = toml::from_str(raw).map_err(|e| ConfigError {
            message: format!("failed to parse emitter config: {e}"),
        })?;
        let config = parsed.emit.unwrap_or_default();
        if config.indent_width == 0 {
            return Err(ConfigError {
                message: "indent_width must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&raw).map_err(|e| ConfigError {
            message: format!("{}: {}", path.display(), e.message),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_gives_defaults() {
        assert_eq!(EmitConfig::from_toml_str("").unwrap(), EmitConfig::default());
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let c = EmitConfig::from_toml_str("[emit]\nindent_width = 4\nline_markers = false\n")
            .unwrap();
        assert_eq!(c.indent_width, 4);
        assert!(!c.line_markers);
        assert_eq!(c.class_prefix_function, "Func_");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EmitConfig::from_toml_str("[emit]\nindent = 4\n").unwrap_err();
        assert!(err.message.contains("indent"), "{}", err.message);
    }

    #[test]
    fn zero_indent_is_rejected() {
        assert!(EmitConfig::from_toml_str("[emit]\nindent_width = 0\n").is_err());
    }
}
