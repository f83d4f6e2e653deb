//! sprig CLI entry point.

mod cli;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = cli.target_config();
    match sprig::lower_file(&cli.file, &config) {
        Ok(lowered) => {
            if cli.dump_hir {
                println!("{}", lowered.hir);
            }
            print!("{}", lowered.lir);
        }
        Err(e) => {
            eprintln!("{}: {e}", cli.file.display());
            std::process::exit(1);
        }
    }
}
