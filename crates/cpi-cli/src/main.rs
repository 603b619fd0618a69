//! `cpi2prism` binary entry point. See `lib.rs` for the command driver.

use clap::Parser;
use cpi_cli::{init_logging, install_sigint_handler, run, Cli};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    install_sigint_handler();

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
