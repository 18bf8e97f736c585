use plugcheck::catalog::{discover_plugins, discover_tests};
use plugcheck::{validate_cross_reference, Config, CrossReferenceSet};

pub(crate) fn run(config: Config, format: super::Format) {
    let names = discover_plugins(&config.plugins_dir, &config).and_then(|plugins| {
        discover_tests(&config.tests_dir, &config.test_prefix).map(|tests| (plugins, tests))
    });
    let (plugins, tests) = match names {
        Ok(names) => names,
        Err(e) => {
            eprintln!("plugcheck cross: {e}");
            std::process::exit(1);
        }
    };

    let set = CrossReferenceSet::new(
        plugins.into_iter().map(|p| p.name),
        tests,
        config.ignore.iter().cloned(),
    );
    let diags = validate_cross_reference(&set);

    match format {
        super::Format::Text => {
            for d in &diags {
                eprintln!("{d}");
            }
            if diags.is_empty() {
                eprintln!(
                    "Cross-reference check passed ({} plugins, {} test modules).",
                    set.plugins.len(),
                    set.tests.len()
                );
            }
        }
        super::Format::Json => super::print_json(&diags),
    }

    if diags.iter().any(|d| d.is_error()) {
        std::process::exit(1);
    }
}
