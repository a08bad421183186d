use clap::Parser;

use cytokb::cli::{run, Cli};
use cytokb::observability::init_logging;

fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
