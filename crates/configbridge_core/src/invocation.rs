//! Invocation building: target path plus resolved values into a launch spec.
//!
//! Library targets (`*.dll`) cannot be started directly; they are run through
//! the intermediary runtime launcher with the target as its first argument.

use crate::error::{BridgeError, BridgeResult};
use crate::fs::FileSystem;
use crate::resolver::ResolvedValues;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of targets that need the runtime launcher.
pub const LIBRARY_EXTENSION: &str = "dll";

/// Intermediary runtime launcher, resolved through PATH at start.
#[cfg(windows)]
pub const RUNTIME_LAUNCHER: &str = "dotnet.exe";
#[cfg(not(windows))]
pub const RUNTIME_LAUNCHER: &str = "dotnet";

/// How resolved values reach the launched process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// `--key "value"` flags on the command line.
    #[default]
    Arguments,
    /// One environment variable per key.
    EnvironmentVariables,
}

/// Fully built launch description. Consumed once by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    /// Program actually started: the target, or the runtime launcher.
    pub executable: PathBuf,
    /// Application the caller asked to run.
    pub target_path: PathBuf,
    /// Complete argument string, quote-escaped.
    pub arguments: String,
    /// The same arguments unescaped, one element per argument.
    pub argv: Vec<String>,
    /// Extra variables for the child; only set in environment transport.
    pub environment: IndexMap<String, String>,
    /// `None` inherits the parent's working directory.
    pub working_dir: Option<PathBuf>,
    /// Child stdout/stderr are piped and relayed by the runner.
    pub redirect_output: bool,
    pub via_launcher: bool,
    pub transport: Transport,
}

impl InvocationSpec {
    /// File name of the target, for diagnostics.
    pub fn target_file_name(&self) -> String {
        self.target_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.target_path.display().to_string())
    }
}

/// Builds [`InvocationSpec`]s, checking targets against a [`FileSystem`].
pub struct InvocationBuilder<F> {
    fs: F,
}

impl<F: FileSystem> InvocationBuilder<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    pub fn build(
        &self,
        target_path: &Path,
        values: &ResolvedValues,
        transport: Transport,
    ) -> BridgeResult<InvocationSpec> {
        let target_display = target_path.to_string_lossy();
        if target_display.trim().is_empty() {
            return Err(BridgeError::validation(
                "Application path cannot be null or empty.",
            ));
        }

        if !self.fs.exists(target_path) {
            return Err(BridgeError::not_found(
                target_path,
                format!("Application not found at path: {}", target_display),
            ));
        }

        let via_launcher = is_library_target(target_path);
        let mut arguments = String::new();
        let mut argv = Vec::with_capacity(values.len() * 2 + 1);
        let executable = if via_launcher {
            push_quoted(&mut arguments, &target_display);
            argv.push(target_display.to_string());
            PathBuf::from(RUNTIME_LAUNCHER)
        } else {
            direct_executable(target_path)
        };

        let mut environment = IndexMap::new();
        match transport {
            Transport::Arguments => {
                for (key, value) in values {
                    if !arguments.is_empty() {
                        arguments.push(' ');
                    }
                    arguments.push_str("--");
                    arguments.push_str(key);
                    arguments.push(' ');
                    push_quoted(&mut arguments, value);
                    argv.push(format!("--{}", key));
                    argv.push(value.clone());
                }
            }
            Transport::EnvironmentVariables => {
                environment.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        arguments.truncate(arguments.trim_end().len());

        debug!(
            executable = %executable.display(),
            via_launcher,
            transport = ?transport,
            "Built invocation for {}",
            target_display
        );

        Ok(InvocationSpec {
            executable,
            target_path: target_path.to_path_buf(),
            arguments,
            argv,
            environment,
            working_dir: None,
            redirect_output: true,
            via_launcher,
            transport,
        })
    }
}

/// True for targets that must run through [`RUNTIME_LAUNCHER`].
pub fn is_library_target(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(LIBRARY_EXTENSION))
        .unwrap_or(false)
}

/// Replace every `"` with `\"`. Nothing else is altered.
pub fn escape_argument(value: &str) -> String {
    value.replace('"', "\\\"")
}

fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    out.push_str(&escape_argument(value));
    out.push('"');
}

/// Program to start for a direct target.
///
/// A bare file name is anchored to the working directory, where the
/// existence check found it, so the launch never falls back to a PATH search.
fn direct_executable(target_path: &Path) -> PathBuf {
    let bare = target_path.is_relative()
        && target_path
            .parent()
            .map_or(true, |parent| parent.as_os_str().is_empty());
    if bare {
        Path::new(".").join(target_path)
    } else {
        target_path.to_path_buf()
    }
}
