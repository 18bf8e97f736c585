//! Cross-reference checks between plugin modules and their test modules.

use std::collections::BTreeSet;

use crate::diagnostics::{Diagnostic, Severity, W001, X001, X002};

/// Plugin names, test-module names (with the `test_` prefix stripped), and
/// names excluded from pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossReferenceSet {
    pub plugins: BTreeSet<String>,
    pub tests: BTreeSet<String>,
    pub ignore: BTreeSet<String>,
}

impl CrossReferenceSet {
    /// Build a set from any iterables of names.
    pub fn new<P, T, I>(plugins: P, tests: T, ignore: I) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            plugins: plugins.into_iter().map(Into::into).collect(),
            tests: tests.into_iter().map(Into::into).collect(),
            ignore: ignore.into_iter().map(Into::into).collect(),
        }
    }
}

/// Check that plugins and test modules pair up one-to-one.
///
/// Ignored names are removed from both sides first. Each plugin without a
/// test module and each test module without a plugin gets its own
/// diagnostic, in name order.
#[must_use]
pub fn validate_cross_reference(set: &CrossReferenceSet) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    // X001: plugin without tests
    for name in set.plugins.difference(&set.tests) {
        if set.ignore.contains(name) {
            continue;
        }
        diags.push(
            Diagnostic::new(
                Severity::Error,
                X001,
                format!("plugin \"{name}\" has no test module"),
            )
            .with_key(name)
            .with_suggestion(format!("Add a `test_{name}` module")),
        );
    }

    // X002: tests without a plugin
    for name in set.tests.difference(&set.plugins) {
        if set.ignore.contains(name) {
            continue;
        }
        diags.push(
            Diagnostic::new(
                Severity::Error,
                X002,
                format!("test module \"test_{name}\" has no matching plugin"),
            )
            .with_key(name)
            .with_suggestion("Remove the test module or rename it after its plugin"),
        );
    }

    // W001: stale ignore entries
    for name in &set.ignore {
        if !set.plugins.contains(name) && !set.tests.contains(name) {
            diags.push(
                Diagnostic::new(
                    Severity::Warning,
                    W001,
                    format!("ignored name \"{name}\" matches no plugin or test module"),
                )
                .with_key(name),
            );
        }
    }

    diags
}
