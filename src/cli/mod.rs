use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use plugcheck::Config;

mod check;
mod cross;
mod metadata;
mod parse;

#[derive(Parser)]
#[command(
    name = "plugcheck",
    version,
    about = "Conformance checker for streaming plugin catalogs"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Show project information
    #[arg(long)]
    about: bool,

    /// Log filter, e.g. `info` or `plugcheck=debug`
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Configuration file [default: ./plugcheck.yml if present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Output format for check results.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum Format {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// JSON document
    Json,
}

/// Catalog location flags; each overrides the configuration file.
#[derive(Args, Debug, Default)]
struct CatalogArgs {
    /// Directory holding plugin modules
    #[arg(long)]
    plugins_dir: Option<PathBuf>,
    /// Directory holding `test_<plugin>` modules
    #[arg(long)]
    tests_dir: Option<PathBuf>,
    /// Names excluded from plugin/test pairing (repeatable; replaces the configured list)
    #[arg(long = "ignore", value_name = "NAME")]
    ignore: Vec<String>,
}

impl CatalogArgs {
    fn apply(self, config: &mut Config) {
        if let Some(dir) = self.plugins_dir {
            config.plugins_dir = dir;
        }
        if let Some(dir) = self.tests_dir {
            config.tests_dir = dir;
        }
        if !self.ignore.is_empty() {
            config.ignore = self.ignore;
        }
    }
}

#[derive(Subcommand)]
#[command(next_display_order = None)]
enum Commands {
    /// Check the whole catalog: metadata, class contracts, plugin/test pairing
    Check {
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Exports snapshot written by the host loader (enables class checks)
        #[arg(long)]
        exports: Option<PathBuf>,
        /// Worker threads [default: available parallelism]
        #[arg(long, short)]
        jobs: Option<usize>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Check the metadata block of plugin source files
    Metadata {
        /// Plugin source files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the parsed metadata block of a plugin source file as JSON
    Parse {
        /// Plugin source file
        file: PathBuf,
    },
    /// Check that plugins and test modules pair up
    Cross {
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

/// Install the stderr log subscriber.
///
/// An invalid filter falls back to `warn`.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

pub fn run(cli: Cli) {
    if cli.about {
        print_about();
        return;
    }

    let config_path = cli.config;
    match cli.command {
        Some(Commands::Check {
            catalog,
            exports,
            jobs,
            format,
        }) => {
            let mut config = load_config(config_path.as_deref());
            catalog.apply(&mut config);
            if exports.is_some() {
                config.exports = exports;
            }
            if jobs.is_some() {
                config.jobs = jobs;
            }
            check::run(config, format)
        }
        Some(Commands::Metadata { files, format }) => metadata::run(files, format),
        Some(Commands::Parse { file }) => parse::run(file),
        Some(Commands::Cross { catalog, format }) => {
            let mut config = load_config(config_path.as_deref());
            catalog.apply(&mut config);
            cross::run(config, format)
        }
        None => {
            eprintln!("Usage: plugcheck <command> [args]");
            eprintln!("Run `plugcheck --help` for details.");
            std::process::exit(1);
        }
    }
}

fn print_about() {
    println!(
        "plugcheck: plugin catalog conformance checker\n\
         ├─ version:    {}\n\
         └─ licence:    {} https://www.apache.org/licenses/LICENSE-2.0",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_LICENSE"),
    );
}

/// Load `--config`, or `plugcheck.yml` from the working directory, or defaults.
fn load_config(path: Option<&Path>) -> Config {
    let loaded = match path {
        Some(path) => Config::load(path),
        None => Config::discover(Path::new(".")),
    };
    match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("plugcheck: {e}");
            std::process::exit(1);
        }
    }
}

/// Print `value` as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("plugcheck: {e}");
            std::process::exit(1);
        }
    }
}
