//! Plugin-level checks: the exported class contract and plugin/test
//! cross-referencing.

pub mod contract;
pub mod cross;

pub use contract::{
    validate_class, validate_exports, Capability, ClassInfo, ClassIntrospection, ExportedValue,
    ModuleExports, PLUGIN_CAPABILITY,
};
pub use cross::{validate_cross_reference, CrossReferenceSet};
