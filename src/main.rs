use clap::Parser;
use std::process::ExitCode;
use stmtcat::args::{Args, Command};
use stmtcat::extract::ExtractorRegistry;
use stmtcat::{commands, Config, Result};
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init => commands::init(home)?.print(),

        Command::Activity(activity_args) => {
            let out_dir = match activity_args.out_dir() {
                Some(dir) => dir.to_path_buf(),
                None => Config::load(home)?.out_dir(),
            };
            commands::activity(
                &ExtractorRegistry::with_defaults(),
                activity_args.statement_type(),
                activity_args.pdf(),
                &out_dir,
            )?
            .print()
        }

        Command::Learn(learn_args) => {
            let config = Config::load(home)?;
            commands::learn(&config, learn_args)?.print()
        }

        Command::Categorize(categorize_args) => {
            let config = Config::load(home)?;
            commands::categorize(&config, categorize_args)?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
