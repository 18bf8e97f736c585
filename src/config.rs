//! Catalog layout configuration (`plugcheck.yml`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PlugcheckError, Result};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "plugcheck.yml";

/// Where the catalog lives and which names get special treatment.
///
/// Relative paths in a loaded file are resolved against the file's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding plugin modules.
    pub plugins_dir: PathBuf,
    /// Directory holding plugin test modules.
    pub tests_dir: PathBuf,
    /// Exports snapshot produced by the host loader. Contract checks are
    /// skipped when unset.
    pub exports: Option<PathBuf>,
    /// Plugins that implement a protocol rather than a site; they carry no
    /// metadata block.
    pub protocol_plugins: Vec<String>,
    /// Module-name prefixes of shared helper modules that are not plugins.
    pub helper_prefixes: Vec<String>,
    /// Prefix identifying test modules.
    pub test_prefix: String,
    /// Names excluded from plugin/test pairing.
    pub ignore: Vec<String>,
    /// Worker threads; defaults to the available parallelism.
    pub jobs: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from("plugins"),
            tests_dir: PathBuf::from("tests/plugins"),
            exports: None,
            protocol_plugins: vec!["http".into(), "hls".into(), "dash".into()],
            helper_prefixes: vec!["common_".into()],
            test_prefix: "test_".into(),
            ignore: vec!["stream".into()],
            jobs: None,
        }
    }
}

impl Config {
    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML for
    /// this schema, or fails [`Config::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| PlugcheckError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config: Config = serde_yaml_ng::from_str(&raw)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load `plugcheck.yml` from `dir` if present, otherwise use defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject configurations that cannot describe a catalog.
    ///
    /// # Errors
    ///
    /// Returns [`PlugcheckError::Config`] for an empty test prefix or a zero
    /// job count.
    pub fn validate(&self) -> Result<()> {
        if self.test_prefix.is_empty() {
            return Err(PlugcheckError::Config {
                message: "test_prefix must not be empty".into(),
            });
        }
        if self.jobs == Some(0) {
            return Err(PlugcheckError::Config {
                message: "jobs must be at least 1".into(),
            });
        }
        Ok(())
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &Path| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.to_path_buf()
            }
        };
        self.plugins_dir = resolve(&self.plugins_dir);
        self.tests_dir = resolve(&self.tests_dir);
        self.exports = self.exports.as_deref().map(resolve);
    }

    /// Returns `true` if `name` is a protocol plugin.
    #[must_use]
    pub fn is_protocol_plugin(&self, name: &str) -> bool {
        self.protocol_plugins.iter().any(|p| p == name)
    }

    /// Returns `true` if `name` is a shared helper module rather than a plugin.
    #[must_use]
    pub fn is_helper_module(&self, name: &str) -> bool {
        self.helper_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}
