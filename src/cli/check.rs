use plugcheck::report::format_text;
use plugcheck::{Catalog, Checks, Config};

pub(crate) fn run(config: Config, format: super::Format) {
    if let Err(e) = config.validate() {
        eprintln!("plugcheck check: {e}");
        std::process::exit(1);
    }
    let catalog = match Catalog::load(&config) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("plugcheck check: {e}");
            std::process::exit(1);
        }
    };

    let report = Checks::default().check_catalog(&catalog, &config);

    match format {
        super::Format::Text => eprint!("{}", format_text(&report)),
        super::Format::Json => super::print_json(&report),
    }

    if report.has_errors() {
        std::process::exit(1);
    }
}
