use clap::Parser;
use log::error;
use qtunnel::cli::CliArgs;
use std::process::exit;

/// Parses the command line, sets up logging and runs the requested command
pub fn main() {
    let args = CliArgs::parse();

    let mut logger = env_logger::Builder::from_default_env();
    // the command line takes precedence over RUST_LOG
    if let Some(level) = args.get_log_level() {
        logger.filter_level(level);
    }
    logger.init();

    match args.run() {
        Ok(_) => {}
        Err(e) => {
            error!("{e:?}");
            exit(1);
        }
    }
}
