//! Catalog reports: findings grouped per plugin, then per category.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::diagnostics::{Category, Diagnostic};

/// Findings for one plugin.
#[derive(Debug, Clone, Serialize)]
pub struct PluginReport {
    pub name: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl PluginReport {
    #[must_use]
    pub fn new(name: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            name: name.into(),
            diagnostics,
        }
    }

    /// Returns `true` if any finding is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Findings keyed by category, each group in check order.
    #[must_use]
    pub fn by_category(&self) -> BTreeMap<Category, Vec<&Diagnostic>> {
        group_by_category(&self.diagnostics)
    }
}

/// Outcome of checking a whole catalog.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// Per-plugin findings, sorted by plugin name. Plugins without findings
    /// are included.
    pub plugins: Vec<PluginReport>,
    /// Catalog-level plugin/test pairing findings.
    pub cross_reference: Vec<Diagnostic>,
}

impl Report {
    fn all(&self) -> impl Iterator<Item = &Diagnostic> {
        self.plugins
            .iter()
            .flat_map(|p| p.diagnostics.iter())
            .chain(self.cross_reference.iter())
    }

    /// Returns `true` if any finding is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.all().any(Diagnostic::is_error)
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.all().filter(|d| d.is_error()).count()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.all().filter(|d| d.is_warning()).count()
    }

    /// Number of plugins with at least one error.
    #[must_use]
    pub fn failing_plugins(&self) -> usize {
        self.plugins.iter().filter(|p| p.has_errors()).count()
    }
}

fn group_by_category(diags: &[Diagnostic]) -> BTreeMap<Category, Vec<&Diagnostic>> {
    let mut groups: BTreeMap<Category, Vec<&Diagnostic>> = BTreeMap::new();
    for d in diags {
        groups.entry(d.category).or_default().push(d);
    }
    groups
}

fn push_diagnostic(out: &mut String, indent: &str, d: &Diagnostic) {
    out.push_str(&format!("{indent}{d}\n"));
    if let Some(suggestion) = &d.suggestion {
        out.push_str(&format!("{indent}  -> {suggestion}\n"));
    }
}

/// Format a [`Report`] as human-readable text.
///
/// Only plugins with findings are listed. The last line is a summary.
#[must_use]
pub fn format_text(report: &Report) -> String {
    let mut out = String::new();

    for plugin in &report.plugins {
        if plugin.diagnostics.is_empty() {
            continue;
        }
        out.push_str(&format!("{}:\n", plugin.name));
        for (category, diags) in plugin.by_category() {
            out.push_str(&format!("  {category}:\n"));
            for d in diags {
                push_diagnostic(&mut out, "    ", d);
            }
        }
    }

    if !report.cross_reference.is_empty() {
        out.push_str(&format!("<{}>:\n", Category::CrossReference));
        for d in &report.cross_reference {
            push_diagnostic(&mut out, "  ", d);
        }
    }

    let errors = report.error_count();
    let warnings = report.warning_count();
    if errors == 0 && warnings == 0 {
        out.push_str(&format!(
            "Catalog check passed ({} plugins).\n",
            report.plugins.len()
        ));
    } else {
        out.push_str(&format!(
            "\n{errors} error(s), {warnings} warning(s); {failing} of {total} plugins failing\n",
            failing = report.failing_plugins(),
            total = report.plugins.len(),
        ));
    }

    out
}
