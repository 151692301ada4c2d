//! Contains the code used to parse command line parameters for qtunnel.
//!
//! [CliArgs::run] holds the logic of every subcommand; the main function only sets up
//! logging and reports errors.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{ensure, Context as _};
use clap::{Parser, Subcommand};
use qtunnel_ciphers::{engine, Key};
use zeroize::Zeroizing;

use crate::config::TunnelConfig;

/// Command line arguments to the qtunnel binary.
///
/// Used for parsing with [clap].
#[derive(Parser, Debug)]
#[command(author, version, about, long_about, arg_required_else_help = true)]
pub struct CliArgs {
    /// Lowest log level to show
    #[arg(long = "log-level", value_name = "LOG_LEVEL", group = "log-level")]
    log_level: Option<log::LevelFilter>,

    /// Show verbose log output – sets log level to "info"
    #[arg(short, long, group = "log-level")]
    verbose: bool,

    /// Show less log output – sets log level to "warn"
    #[arg(short, long, group = "log-level")]
    quiet: bool,

    /// The subcommand to be invoked
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

impl CliArgs {
    /// returns the log level filter set by CLI args
    /// returns `None` if the user did not specify any log level filter via CLI
    ///
    /// The argument group `log-level` ensures that at most one of the flags is given.
    pub fn get_log_level(&self) -> Option<log::LevelFilter> {
        if self.verbose {
            return Some(log::LevelFilter::Info);
        }
        if self.quiet {
            return Some(log::LevelFilter::Warn);
        }
        self.log_level
    }
}

/// represents a command specified via CLI
#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Parse and instantiate a scheme, print its properties
    ///
    /// A scheme has the form `ALGORITHM[-VARIANT][:INITKEY_HEX[:STATE_HEX[:BLOCKS]]]`,
    /// e.g. `evhash-96:02cc942de299f4b0d86ffd53`.
    Scheme { scheme: String },

    /// Compute the tag of a file, or of stdin if no file is given
    Tag {
        /// Scheme of the authentication context
        #[clap(short, long)]
        scheme: String,

        /// Final key as hex
        #[clap(short, long)]
        final_key: String,

        file: Option<PathBuf>,
    },

    /// Validate tunnel configuration files
    ///
    /// Prints the key material each protocol round consumes for every valid file.
    Validate { config_files: Vec<PathBuf> },

    /// Generate a tunnel config file with fresh init keys
    GenConfig {
        config_file: PathBuf,

        /// Forcefully overwrite existing config file
        #[clap(short, long)]
        force: bool,
    },
}

impl CliArgs {
    /// Run qtunnel with the given command line parameters
    pub fn run(self) -> anyhow::Result<()> {
        use CliCommand::*;
        match &self.command {
            Some(Scheme { scheme }) => {
                let ctx = engine::create(scheme)?;
                println!("scheme:          {}", ctx.scheme());
                println!("init key size:   {}", ctx.init_key_size());
                println!("final key size:  {}", ctx.final_key_size());
                println!("result size:     {}", ctx.result_size());
                println!("cloneable:       {}", ctx.is_cloneable());
                println!("reuses init key: {}", ctx.reuses_init_key());
                println!("key per byte:    {}", ctx.consumes_key_per_byte());
            }

            Some(Tag {
                scheme,
                final_key,
                file,
            }) => {
                let mut ctx = engine::create(scheme)?;
                let final_key = Key::from_hex(final_key).context("final key is not valid hex")?;
                ensure!(
                    ctx.is_valid_final_key(&final_key),
                    "{} needs a final key of {} bytes, got {}",
                    ctx.name(),
                    ctx.final_key_size(),
                    final_key.len()
                );

                let data = match file {
                    Some(path) => std::fs::read(path)
                        .with_context(|| format!("could not read {path:?}"))?,
                    None => {
                        let mut buf = Vec::new();
                        std::io::stdin().read_to_end(&mut buf)?;
                        buf
                    }
                };
                let data = Zeroizing::new(data);

                ctx.add(&data)?;
                let tag = ctx.finalize(&final_key)?;
                println!("{}", hex::encode(tag));
            }

            Some(Validate { config_files }) => {
                for file in config_files {
                    match TunnelConfig::load(file) {
                        Ok(config) => {
                            eprintln!("{file:?} is valid TOML and conforms to the expected schema");
                            match config.validate().and_then(|_| config.key_consumption()) {
                                Ok(kc) => {
                                    eprintln!("{file:?} has passed all logical checks");
                                    println!(
                                        "{file:?}: {} bytes incoming, {} bytes outgoing per round, \
                                         plus {} key bytes per payload byte",
                                        kc.incoming,
                                        kc.outgoing,
                                        kc.incoming_per_byte + kc.outgoing_per_byte
                                    );
                                }
                                Err(err) => eprintln!("{file:?} contains logical errors: '{err:#}'"),
                            }
                        }
                        Err(e) => eprintln!("{file:?} is not valid: {e}"),
                    }
                }
            }

            Some(GenConfig { config_file, force }) => {
                ensure!(
                    *force || !config_file.exists(),
                    "config file {config_file:?} already exists"
                );

                TunnelConfig::example_config().store(config_file)?;
                log::info!("wrote example configuration to {config_file:?}");
            }

            None => {} // clap prints the help if no command is given
        }

        Ok(())
    }
}
