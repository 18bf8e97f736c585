use clap::Parser;

mod cli;

fn main() {
    let cli = cli::Cli::parse();
    cli::init_tracing(&cli.log_level);
    cli::run(cli);
}
