//! ConfigBridge launcher
//!
//! Resolves configuration values from the machine-wide store and forwards
//! them to a target application as command-line flags or environment
//! variables.

mod cli;

use clap::error::ErrorKind;
use clap::Parser;
use cli::error::HelpfulError;
use cli::Cli;
use configbridge_core::error::EXIT_INVALID_INPUT;
use configbridge_core::{BridgeError, RuntimeEnv};
use configbridge_logging::{init_logging, LogConfig};
use std::process::ExitCode;
use tracing::{debug, info};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return report_parse_error(err),
    };

    let env = RuntimeEnv::from_process();
    let debug = env.debug_enabled(cli.debug);

    let _log_guard = match init_logging(LogConfig {
        app_name: "configbridge",
        debug,
    }) {
        Ok(guard) => {
            if let Some(file) = guard.log_file() {
                debug!("Logging to {}", file.display());
            }
            Some(guard)
        }
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };

    match cli::run(cli, env) {
        Ok(message) => {
            println!("{}", message);
            ExitCode::SUCCESS
        }
        Err(err) => report_error(&err),
    }
}

fn report_error(err: &BridgeError) -> ExitCode {
    info!(exit_code = err.exit_code(), "Run failed: {}", err);
    eprint!("{}", HelpfulError::from_bridge(err));
    if err.is_validation() {
        eprintln!();
        eprintln!("{}", cli::USAGE);
    }
    ExitCode::from(err.exit_code())
}

fn report_parse_error(err: clap::Error) -> ExitCode {
    // Help and version requests are not failures.
    let code = match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::from(EXIT_INVALID_INPUT),
    };
    let _ = err.print();
    code
}
