//! Plugin catalog discovery.
//!
//! A catalog is a plugins directory, a tests directory, and optionally an
//! exports snapshot written by the host loader. Discovery only looks at
//! names on disk; nothing is imported or executed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::errors::{PlugcheckError, Result};
use crate::parser::read_file_checked;
use crate::plugin::{CrossReferenceSet, ModuleExports};

/// Exports of every plugin module, keyed by module name.
pub type ExportsSnapshot = BTreeMap<String, ModuleExports>;

/// Python source suffix.
const SOURCE_EXT: &str = "py";

/// Package initializer, both as a module name and a file name.
const PACKAGE_INIT: &str = "__init__";

/// What a directory entry is, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

fn entry_kind(path: &Path) -> EntryKind {
    match path.symlink_metadata() {
        Ok(m) if m.file_type().is_symlink() => EntryKind::Symlink,
        Ok(m) if m.is_file() => EntryKind::File,
        Ok(m) if m.is_dir() => EntryKind::Dir,
        _ => EntryKind::Other,
    }
}

/// A plugin module found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginModule {
    pub name: String,
    /// The module's source file (`<name>.py` or `<name>/__init__.py`).
    pub path: PathBuf,
}

/// Everything one validation pass needs about a single plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEntry {
    pub name: String,
    /// Source text with line endings normalized to `\n`.
    pub source: String,
    /// Exports snapshot for this module; `None` when no snapshot was provided.
    pub exports: Option<ModuleExports>,
}

/// Discovered plugin modules, test modules and exports.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Plugin modules, sorted by name.
    pub plugins: Vec<PluginModule>,
    /// Test-module names with the test prefix stripped, sorted.
    pub tests: Vec<String>,
    pub exports: Option<ExportsSnapshot>,
}

impl Catalog {
    /// Discover the catalog described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be listed or the exports
    /// snapshot cannot be loaded.
    pub fn load(config: &Config) -> Result<Self> {
        let plugins = discover_plugins(&config.plugins_dir, config)?;
        let tests = discover_tests(&config.tests_dir, &config.test_prefix)?;
        let exports = config.exports.as_deref().map(load_exports).transpose()?;
        tracing::info!(
            plugins = plugins.len(),
            tests = tests.len(),
            snapshot = exports.is_some(),
            "discovered catalog"
        );
        Ok(Self {
            plugins,
            tests,
            exports,
        })
    }

    /// Names to pair up for the cross-reference check.
    #[must_use]
    pub fn cross_reference_set(&self, ignore: &[String]) -> CrossReferenceSet {
        CrossReferenceSet::new(
            self.plugins.iter().map(|p| p.name.as_str()),
            self.tests.iter().map(String::as_str),
            ignore.iter().map(String::as_str),
        )
    }

    /// Read a plugin's source and attach its exports.
    ///
    /// A module absent from a provided snapshot gets an empty export set, so
    /// the contract check reports it rather than silently skipping it.
    ///
    /// # Errors
    ///
    /// Returns an error if the source file cannot be read.
    pub fn entry(&self, module: &PluginModule) -> Result<PluginEntry> {
        let source = read_file_checked(&module.path)?;
        let exports = self
            .exports
            .as_ref()
            .map(|snapshot| snapshot.get(&module.name).cloned().unwrap_or_default());
        Ok(PluginEntry {
            name: module.name.clone(),
            source,
            exports,
        })
    }

    /// Look up a plugin module by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&PluginModule> {
        self.plugins.iter().find(|p| p.name == name)
    }
}

/// List plugin modules in `dir`.
///
/// Modules are `<name>.py` files and `<name>/` packages containing
/// `__init__.py`. The package initializer of `dir` itself and helper modules
/// (see [`Config::is_helper_module`]) are skipped. Symlinks are not followed.
///
/// # Errors
///
/// Returns [`PlugcheckError::Read`] if `dir` is not a directory or cannot be
/// listed.
pub fn discover_plugins(dir: &Path, config: &Config) -> Result<Vec<PluginModule>> {
    let mut plugins = Vec::new();
    for path in list_dir(dir)? {
        let Some((name, source)) = module_source(&path) else {
            continue;
        };
        if name == PACKAGE_INIT || config.is_helper_module(&name) {
            tracing::debug!(module = %name, "skipping non-plugin module");
            continue;
        }
        plugins.push(PluginModule { name, path: source });
    }
    plugins.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(plugins)
}

/// List test modules in `dir`, returning their names with `prefix` stripped.
///
/// # Errors
///
/// Returns [`PlugcheckError::Read`] if `dir` is not a directory or cannot be
/// listed.
pub fn discover_tests(dir: &Path, prefix: &str) -> Result<Vec<String>> {
    let mut tests: Vec<String> = list_dir(dir)?
        .iter()
        .filter_map(|path| module_source(path))
        .filter_map(|(name, _)| {
            name.strip_prefix(prefix)
                .filter(|rest| !rest.is_empty())
                .map(str::to_string)
        })
        .collect();
    tests.sort();
    tests.dedup();
    Ok(tests)
}

/// Load an exports snapshot file.
///
/// # Errors
///
/// Returns [`PlugcheckError::Read`] if the file cannot be read, or
/// [`PlugcheckError::Json`] if it does not match the snapshot format.
pub fn load_exports(path: &Path) -> Result<ExportsSnapshot> {
    let raw = std::fs::read_to_string(path).map_err(|e| PlugcheckError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let snapshot: ExportsSnapshot = serde_json::from_str(&raw)?;
    tracing::debug!(path = %path.display(), modules = snapshot.len(), "loaded exports snapshot");
    Ok(snapshot)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    if entry_kind(dir) != EntryKind::Dir {
        return Err(PlugcheckError::Read {
            path: dir.to_path_buf(),
            message: "not a directory".into(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|e| PlugcheckError::Read {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(entries.flatten().map(|e| e.path()).collect())
}

/// Module name and source file for a directory entry, if it is a module.
fn module_source(path: &Path) -> Option<(String, PathBuf)> {
    match entry_kind(path) {
        EntryKind::File => {
            if path.extension().and_then(|ext| ext.to_str()) != Some(SOURCE_EXT) {
                return None;
            }
            let name = path.file_stem()?.to_str()?;
            Some((name.to_string(), path.to_path_buf()))
        }
        EntryKind::Dir => {
            let init = path.join(format!("{PACKAGE_INIT}.{SOURCE_EXT}"));
            if entry_kind(&init) != EntryKind::File {
                return None;
            }
            let name = path.file_name()?.to_str()?;
            Some((name.to_string(), init))
        }
        EntryKind::Symlink => {
            tracing::debug!(path = %path.display(), "not following symlink");
            None
        }
        EntryKind::Other => None,
    }
}
