//! Catalog-wide checking.
//!
//! Each plugin is checked independently, so the catalog is split across
//! scoped worker threads and the per-plugin reports are merged by name.

use std::num::NonZeroUsize;
use std::thread;

use crate::catalog::{Catalog, PluginEntry, PluginModule};
use crate::config::Config;
use crate::diagnostics::{Diagnostic, Severity, E000};
use crate::plugin::{validate_cross_reference, validate_exports, Capability};
use crate::report::{PluginReport, Report};
use crate::schema::KeySchema;
use crate::validator::validate_source;

/// Schemas applied to every plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct Checks {
    pub schema: KeySchema,
    pub capability: Capability,
}

impl Checks {
    /// Check one plugin.
    ///
    /// Protocol plugins skip the metadata block check. The contract check
    /// runs only when the entry carries exports.
    #[must_use]
    pub fn check_entry(&self, entry: &PluginEntry, protocol: bool) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        if protocol {
            tracing::debug!(plugin = %entry.name, "protocol plugin, skipping metadata");
        } else {
            diags.extend(validate_source(&entry.source, &self.schema));
        }
        if let Some(exports) = &entry.exports {
            diags.extend(validate_exports(exports, &self.capability));
        }
        diags
    }

    /// Read and check one discovered module.
    ///
    /// An unreadable source file yields a single `E000` finding.
    #[must_use]
    pub fn check_module(
        &self,
        catalog: &Catalog,
        module: &PluginModule,
        config: &Config,
    ) -> PluginReport {
        let diags = match catalog.entry(module) {
            Ok(entry) => self.check_entry(&entry, config.is_protocol_plugin(&module.name)),
            Err(e) => vec![Diagnostic::new(Severity::Error, E000, e.to_string())],
        };
        tracing::debug!(plugin = %module.name, findings = diags.len(), "checked plugin");
        PluginReport::new(&module.name, diags)
    }

    /// Check every plugin in the catalog, then the plugin/test pairing.
    #[must_use]
    pub fn check_catalog(&self, catalog: &Catalog, config: &Config) -> Report {
        if catalog.exports.is_none() {
            tracing::warn!("no exports snapshot configured; skipping class contract checks");
        }

        let jobs = worker_count(config.jobs, catalog.plugins.len());
        let mut plugins = if jobs <= 1 {
            catalog
                .plugins
                .iter()
                .map(|m| self.check_module(catalog, m, config))
                .collect()
        } else {
            self.check_parallel(catalog, config, jobs)
        };
        plugins.sort_by(|a, b| a.name.cmp(&b.name));

        let cross_reference =
            validate_cross_reference(&catalog.cross_reference_set(&config.ignore));

        Report {
            plugins,
            cross_reference,
        }
    }

    fn check_parallel(&self, catalog: &Catalog, config: &Config, jobs: usize) -> Vec<PluginReport> {
        let chunk = catalog.plugins.len().div_ceil(jobs);
        tracing::debug!(jobs, chunk, "checking plugins in parallel");
        thread::scope(|scope| {
            let handles: Vec<_> = catalog
                .plugins
                .chunks(chunk)
                .map(|modules| {
                    scope.spawn(move || {
                        modules
                            .iter()
                            .map(|m| self.check_module(catalog, m, config))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }
}

/// Number of worker threads for `plugins` modules.
fn worker_count(requested: Option<usize>, plugins: usize) -> usize {
    let available = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    requested.unwrap_or(available).clamp(1, plugins.max(1))
}
