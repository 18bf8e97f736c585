pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod parser;
pub mod plugin;
pub mod report;
pub mod runner;
pub mod schema;
pub mod tokenizer;
pub mod validator;

// Re-export key types at crate root for convenience.
pub use catalog::{Catalog, PluginEntry, PluginModule};
pub use config::Config;
pub use diagnostics::{Category, Diagnostic, Severity};
pub use errors::{PlugcheckError, Result, StructuralError};
pub use parser::{parse_source, read_file_checked, MetadataEntry};
pub use report::{PluginReport, Report};
pub use runner::Checks;
pub use schema::{KeySchema, STANDARD_SCHEMA};
pub use validator::{validate_metadata, validate_source};

pub use plugin::{
    validate_class, validate_cross_reference, validate_exports, Capability, ClassInfo,
    ClassIntrospection, CrossReferenceSet, ModuleExports, PLUGIN_CAPABILITY,
};
