use std::path::PathBuf;

use plugcheck::{parse_source, read_file_checked, Diagnostic};

pub(crate) fn run(file: PathBuf) {
    let source = match read_file_checked(&file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("plugcheck parse: {e}");
            std::process::exit(1);
        }
    };
    match parse_source(&source) {
        Ok(entries) => super::print_json(&entries),
        Err(e) => {
            eprintln!("{}", Diagnostic::from(e));
            std::process::exit(1);
        }
    }
}
