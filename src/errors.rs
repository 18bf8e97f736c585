use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::{Diagnostic, Severity, T001, T002, T003, T004, T005, T006};

/// Errors that can occur while loading catalogs, snapshots, and configuration.
#[derive(Error, Debug)]
pub enum PlugcheckError {
    /// A file could not be read or was rejected before parsing.
    #[error("cannot read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Exports snapshot deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Configuration is well-formed but unusable.
    #[error("config error: {message}")]
    Config { message: String },
}

/// Convenience alias for `Result<T, PlugcheckError>`.
pub type Result<T> = std::result::Result<T, PlugcheckError>;

/// A plugin's source or exports do not have the expected shape.
///
/// Structural errors are fatal for the pass that raised them: no metadata
/// checks run after a tokenizer or block error, and no contract checks run
/// after a missing export.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// The source contains no token at all.
    #[error("source does not contain any token")]
    NoToken,

    /// The first token is something other than a string literal.
    #[error("first token is a {kind}, not a string literal")]
    NotStringLiteral { kind: &'static str, line: usize },

    /// The first string literal never terminates.
    #[error("unterminated string literal")]
    UnterminatedString { line: usize },

    /// The leading string literal is not a `"""\n...\n"""` block.
    #[error("leading string is not a properly formatted metadata block")]
    MalformedBlock,

    /// A line inside the block does not follow `$key value`.
    #[error("metadata line is not formatted as '$key value': {text:?}")]
    MalformedLine { position: usize, text: String },

    /// The module does not export a plugin class under the export slot.
    #[error("module does not export a class under `{slot}`")]
    MissingExport { slot: String },
}

impl StructuralError {
    /// Stable diagnostic code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            StructuralError::NoToken => T001,
            StructuralError::NotStringLiteral { .. } => T002,
            StructuralError::UnterminatedString { .. } => T003,
            StructuralError::MalformedBlock => T004,
            StructuralError::MalformedLine { .. } => T005,
            StructuralError::MissingExport { .. } => T006,
        }
    }
}

impl From<StructuralError> for Diagnostic {
    fn from(err: StructuralError) -> Self {
        let diag = Diagnostic::new(Severity::Error, err.code(), err.to_string());
        match err {
            StructuralError::NotStringLiteral { line, .. }
            | StructuralError::UnterminatedString { line } => diag.with_position(line),
            StructuralError::MalformedBlock => diag.with_suggestion(
                "Start the module with a \"\"\" block holding one `$key value` line per row",
            ),
            StructuralError::MalformedLine { position, text } => {
                diag.with_position(position).with_value(text)
            }
            StructuralError::MissingExport { .. } => {
                diag.with_suggestion("Assign the plugin class to the module's export slot")
            }
            StructuralError::NoToken => diag,
        }
    }
}
