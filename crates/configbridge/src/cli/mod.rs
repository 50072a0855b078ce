//! CLI module for ConfigBridge
//!
//! Parses arguments, drives the validate / resolve / build / run pipeline and
//! reports the outcome.

pub mod config;
pub mod error;
pub mod format;

use clap::Parser;
use config::StoreSelection;
use configbridge_core::{
    validate, BridgeError, BridgeResult, ConfigRequest, ConfigResolver, ConsoleSink, FileSystem,
    InvocationBuilder, OsFileSystem, ProcessRunner, ResolvedValues, RuntimeEnv, SystemLauncher,
    Transport,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Printed after validation errors and on `--help`.
pub const USAGE: &str = r#"Usage: configbridge <APP_PATH> <REQUEST_JSON> [--debug]
       configbridge <APP_PATH> --request-file <FILE> [--debug]
       configbridge --json <FILE>

Arguments:
  <APP_PATH>      Full path to the executable, or to a .dll run through 'dotnet'
  <REQUEST_JSON>  JSON array of configuration items to resolve and forward

Request items:
  {
    "kind": "Setting" | "ConnectionString",  (aliases: "Sett", "Conn")
    "name": "<key in the configuration store>",
    "outputParameter": "<name passed to the application>"
  }

Examples:
  configbridge /opt/app/server '[{"kind":"Setting","name":"ApiUrl","outputParameter":"apiUrl"}]'
  configbridge /opt/app/Service.dll --request-file request.json --env-vars
  configbridge --json request.json

Note: when running a .dll, 'dotnet' must be in your system PATH."#;

#[derive(Parser, Debug)]
#[command(
    name = "configbridge",
    version,
    about = "Forward machine-wide configuration values to an application",
    after_help = USAGE
)]
pub struct Cli {
    /// Full path to the executable or .dll to run
    pub app_path: Option<String>,

    /// JSON array of configuration items to forward
    pub request_json: Option<String>,

    /// Enable diagnostic output (ignored when APP_ENV=Production)
    #[arg(long)]
    pub debug: bool,

    /// Format a JSON file for command-line use, print it and exit
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Read the request list from a file instead of REQUEST_JSON
    #[arg(long, value_name = "FILE", conflicts_with = "request_json")]
    pub request_file: Option<PathBuf>,

    /// Pass values as environment variables instead of --key "value" flags
    #[arg(long)]
    pub env_vars: bool,

    /// Configuration store file
    #[arg(long, value_name = "PATH", env = "CONFIGBRIDGE_STORE")]
    pub store: Option<PathBuf>,

    /// Read values from CONFIGBRIDGE_SETTING_* / CONFIGBRIDGE_CONNSTR_* variables
    #[arg(long)]
    pub env_store: bool,
}

/// Where the request list came from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RequestSource {
    Argument,
    File(PathBuf),
}

impl Cli {
    fn transport(&self) -> Transport {
        if self.env_vars {
            Transport::EnvironmentVariables
        } else {
            Transport::Arguments
        }
    }

    /// Application path and raw request text for a run.
    fn run_inputs<F: FileSystem>(&self, fs: &F) -> BridgeResult<(PathBuf, String, RequestSource)> {
        let app_path = self
            .app_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(missing_inputs)?;

        let (request, source) = match (&self.request_json, &self.request_file) {
            (Some(json), _) if !json.trim().is_empty() => (json.clone(), RequestSource::Argument),
            (_, Some(path)) => (read_request_file(fs, path)?, RequestSource::File(path.clone())),
            _ => return Err(missing_inputs()),
        };

        Ok((PathBuf::from(app_path), request, source))
    }
}

fn missing_inputs() -> BridgeError {
    BridgeError::validation(
        "Either --json <FILE> or <APP_PATH> and <REQUEST_JSON> (or --request-file) are required.",
    )
}

fn read_request_file<F: FileSystem>(fs: &F, path: &Path) -> BridgeResult<String> {
    if !fs.exists(path) {
        return Err(BridgeError::not_found(
            path,
            format!("The specified request file was not found: {}", path.display()),
        ));
    }
    fs.read_all_text(path).map_err(|e| {
        BridgeError::Unexpected(
            anyhow::Error::new(e).context(format!("Failed to read request file: {}", path.display())),
        )
    })
}

/// Execute the command line. Returns the text to print on success.
pub fn run(cli: Cli, env: RuntimeEnv) -> BridgeResult<String> {
    if let Some(path) = &cli.json {
        let formatted = format::format_json_file(&OsFileSystem, path)?;
        return Ok(format!("Formatted JSON for command-line usage:\n{}", formatted));
    }

    let debug = env.debug_enabled(cli.debug);
    let (app_path, raw_request, source) = cli.run_inputs(&OsFileSystem)?;
    let store = StoreSelection::from_args(cli.store.as_deref(), cli.env_store);
    let transport = cli.transport();

    if debug {
        log_arguments(&app_path, &raw_request, &source, &store, transport);
    }

    let requests = validate(&raw_request)?;
    if debug {
        log_requests(&requests);
    }

    let resolver = ConfigResolver::new(store.open(), env);
    let values = resolver.resolve(&requests, cli.debug);
    if debug {
        log_resolved_values(&values);
    }
    info!(
        requested = requests.len(),
        resolved = values.len(),
        "Resolved configuration values"
    );

    let spec = InvocationBuilder::new(OsFileSystem).build(&app_path, &values, transport)?;
    let mut runner = ProcessRunner::new(SystemLauncher, ConsoleSink, env);
    runner.run(&spec, cli.debug)?;

    Ok("Application execution completed successfully.".to_string())
}

fn log_arguments(
    app_path: &Path,
    raw_request: &str,
    source: &RequestSource,
    store: &StoreSelection,
    transport: Transport,
) {
    debug!("--- Debug Mode Enabled ---");
    debug!("App Path: {}", app_path.display());
    match source {
        RequestSource::Argument => debug!("JSON Config: {}", raw_request),
        RequestSource::File(path) => debug!("JSON Config ({}): {}", path.display(), raw_request),
    }
    debug!("Store: {}", store);
    debug!("Transport: {:?}", transport);
    debug!("--------------------------");
}

fn log_requests(requests: &[ConfigRequest]) {
    debug!("--- Parsed Configuration Items ---");
    for request in requests {
        debug!(
            "Type: {}, Name: \"{}\", Output: \"--{}\"",
            request.kind, request.name, request.output_parameter
        );
    }
    debug!("----------------------------------");
}

fn log_resolved_values(values: &ResolvedValues) {
    debug!("--- Resolved Values to be Forwarded ---");
    for (key, value) in values {
        debug!("--{} \"{}\"", key, value);
    }
    debug!("---------------------------------------");
}
