//! oasregex CLI entry point.

use clap::Parser;
use oasregex::cli::{self, Cli, Commands, EXIT_ERROR};
use oasregex::logging;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    let result = match &cli.command {
        Commands::Audit(args) => cli::run_audit(args),
        Commands::Show(args) => cli::run_show(args),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
