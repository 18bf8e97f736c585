use std::path::PathBuf;

use plugcheck::diagnostics::{Diagnostic, Severity, E000};
use plugcheck::{read_file_checked, validate_source, STANDARD_SCHEMA};

pub(crate) fn run(files: Vec<PathBuf>, format: super::Format) {
    let all_diags: Vec<(PathBuf, Vec<Diagnostic>)> = files
        .into_iter()
        .map(|path| {
            let diags = match read_file_checked(&path) {
                Ok(source) => validate_source(&source, &STANDARD_SCHEMA),
                Err(e) => vec![Diagnostic::new(Severity::Error, E000, e.to_string())],
            };
            (path, diags)
        })
        .collect();

    let has_errors = all_diags
        .iter()
        .any(|(_, d)| d.iter().any(|d| d.is_error()));

    match format {
        super::Format::Text => {
            let multi = all_diags.len() > 1;
            for (path, diags) in &all_diags {
                if multi && !diags.is_empty() {
                    eprintln!("{}:", path.display());
                }
                for d in diags {
                    if multi {
                        eprintln!("  {d}");
                    } else {
                        eprintln!("{d}");
                    }
                }
            }
            if multi {
                let total = all_diags.len();
                let failing = all_diags
                    .iter()
                    .filter(|(_, d)| d.iter().any(|d| d.is_error()))
                    .count();
                eprintln!("\n{total} files: {} ok, {failing} failing", total - failing);
            } else if all_diags.iter().all(|(_, d)| d.is_empty()) {
                eprintln!("ok");
            }
        }
        super::Format::Json => {
            let entries: Vec<serde_json::Value> = all_diags
                .iter()
                .map(|(path, diags)| {
                    serde_json::json!({
                        "path": path.display().to_string(),
                        "diagnostics": diags,
                    })
                })
                .collect();
            super::print_json(&entries);
        }
    }

    if has_errors {
        std::process::exit(1);
    }
}
