//! Process runner: launches one invocation, relays its output and classifies
//! how it ended.
//!
//! ```text
//! NotStarted -> Starting -> Running -> Completed
//!                  |           |
//!                  +-----------+-----> LaunchFailed
//! ```
//!
//! There is no timeout and no retry; a hung child hangs the runner.

use crate::error::{BridgeError, BridgeResult};
use crate::invocation::{InvocationSpec, Transport};
use crate::process::{relay_lines, OutputSink, ProcessLauncher};
use crate::runtime_env::RuntimeEnv;
use std::io;
use std::thread::ScopedJoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle of a runner's single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Starting,
    Running,
    Completed,
    LaunchFailed,
}

/// How a launch attempt ended.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// The child ran and exited. `None` when it was killed by a signal.
    Completed { exit_code: Option<i32> },
    /// The child could not be started, or could not be waited on.
    LaunchFailed { reason: io::Error },
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Completed { exit_code: Some(0) })
    }

    /// Turn anything but a clean exit into an application error.
    pub fn into_result(self, spec: &InvocationSpec) -> BridgeResult<ProcessOutcome> {
        match self {
            ProcessOutcome::Completed { exit_code: Some(0) } => {
                Ok(ProcessOutcome::Completed { exit_code: Some(0) })
            }
            ProcessOutcome::Completed { exit_code } => {
                let status = match exit_code {
                    Some(code) => format!("exited with code {}", code),
                    None => "was terminated by a signal".to_string(),
                };
                Err(BridgeError::application(format!(
                    "Application '{}' (executed via '{}') {}. \
                     Check console output for errors from the application.",
                    spec.target_file_name(),
                    spec.executable.display(),
                    status
                )))
            }
            ProcessOutcome::LaunchFailed { reason } => {
                if spec.via_launcher && reason.kind() == io::ErrorKind::NotFound {
                    let message = format!(
                        "Failed to start application. Ensure '{}' is installed and in your \
                         system PATH. Original error: {}",
                        spec.executable.display(),
                        reason
                    );
                    Err(BridgeError::application_with_source(message, reason))
                } else {
                    let message = format!(
                        "Failed to run application '{}'. Error: {}",
                        spec.target_path.display(),
                        reason
                    );
                    Err(BridgeError::application_with_source(message, reason))
                }
            }
        }
    }
}

/// Runs exactly one [`InvocationSpec`].
pub struct ProcessRunner<L, O> {
    launcher: L,
    sink: O,
    env: RuntimeEnv,
    state: RunState,
}

impl<L: ProcessLauncher, O: OutputSink> ProcessRunner<L, O> {
    pub fn new(launcher: L, sink: O, env: RuntimeEnv) -> Self {
        Self {
            launcher,
            sink,
            env,
            state: RunState::NotStarted,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Launch, relay output until exit, and require a zero exit code.
    pub fn run(&mut self, spec: &InvocationSpec, debug: bool) -> BridgeResult<ProcessOutcome> {
        self.execute(spec, debug)?.into_result(spec)
    }

    /// Launch and wait, reporting the outcome without judging it.
    ///
    /// Fails only when the runner was already used.
    pub fn execute(&mut self, spec: &InvocationSpec, debug: bool) -> BridgeResult<ProcessOutcome> {
        if self.state != RunState::NotStarted {
            return Err(BridgeError::Unexpected(anyhow::anyhow!(
                "process runner already used (state: {:?})",
                self.state
            )));
        }

        if self.env.debug_enabled(debug) {
            log_invocation(spec);
        }

        self.transition(RunState::Starting);
        let mut process = match self.launcher.start(spec) {
            Ok(process) => process,
            Err(reason) => {
                warn!(
                    executable = %spec.executable.display(),
                    "Failed to start process: {}",
                    reason
                );
                self.transition(RunState::LaunchFailed);
                return Ok(ProcessOutcome::LaunchFailed { reason });
            }
        };
        self.transition(RunState::Running);

        info!(
            pid = ?process.id(),
            executable = %spec.executable.display(),
            "Started {}",
            spec.target_file_name()
        );

        let stdout = process.take_stdout();
        let stderr = process.take_stderr();
        let sink = &self.sink;

        let waited = std::thread::scope(|scope| {
            let stdout_relay = stdout.map(|reader| {
                scope.spawn(move || relay_lines(reader, |line| sink.stdout_line(line)))
            });
            let stderr_relay = stderr.map(|reader| {
                scope.spawn(move || relay_lines(reader, |line| sink.stderr_line(line)))
            });

            let status = process.wait();

            finish_relay("stdout", stdout_relay);
            finish_relay("stderr", stderr_relay);
            status
        });

        match waited {
            Ok(exit_code) => {
                info!(exit_code = ?exit_code, "{} exited", spec.target_file_name());
                self.transition(RunState::Completed);
                Ok(ProcessOutcome::Completed { exit_code })
            }
            Err(reason) => {
                warn!("Failed waiting for {}: {}", spec.target_file_name(), reason);
                self.transition(RunState::LaunchFailed);
                Ok(ProcessOutcome::LaunchFailed { reason })
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "Process runner state change");
        self.state = next;
    }
}

fn finish_relay(stream: &str, handle: Option<ScopedJoinHandle<'_, io::Result<u64>>>) {
    let Some(handle) = handle else {
        return;
    };
    match handle.join() {
        Ok(Ok(lines)) => debug!(stream, lines, "Output relay finished"),
        Ok(Err(e)) => warn!(stream, "Output relay stopped early: {}", e),
        Err(_) => warn!(stream, "Output relay thread panicked"),
    }
}

fn log_invocation(spec: &InvocationSpec) {
    debug!("--- Debug Mode: Executing Application ---");
    debug!("Executable/Command: {}", spec.executable.display());
    debug!("Arguments: {}", spec.arguments);
    if spec.transport == Transport::EnvironmentVariables {
        debug!("Environment Variables:");
        for (name, value) in &spec.environment {
            debug!("  {} = {}", name, value);
        }
    }
    debug!("------------------------------------------");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::InvocationBuilder;
    use crate::resolver::ResolvedValues;
    use crate::test_support::{capture_logs, CapturingSink, FakeFileSystem, FakeLauncher, Stream};
    use std::path::Path;

    fn spec_for(target: &str, pairs: &[(&str, &str)], transport: Transport) -> InvocationSpec {
        let values: ResolvedValues = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        InvocationBuilder::new(FakeFileSystem::with_files(&[target]))
            .build(Path::new(target), &values, transport)
            .unwrap()
    }

    #[test]
    fn test_exit_zero_completes() {
        let launcher = FakeLauncher::exiting(Some(0));
        let spec = spec_for("test.exe", &[("key", "value")], Transport::Arguments);
        let mut runner = ProcessRunner::new(&launcher, CapturingSink::default(), RuntimeEnv::development());

        let outcome = runner.run(&spec, false).unwrap();

        assert!(outcome.is_success());
        assert!(matches!(outcome, ProcessOutcome::Completed { exit_code: Some(0) }));
        assert_eq!(runner.state(), RunState::Completed);
        assert_eq!(launcher.started().len(), 1);
        assert_eq!(launcher.wait_calls(), 1);
    }

    #[test]
    fn test_non_zero_exit_is_application_error() {
        let launcher = FakeLauncher::exiting(Some(7));
        let spec = spec_for("/srv/apps/worker.exe", &[], Transport::Arguments);
        let mut runner = ProcessRunner::new(&launcher, CapturingSink::default(), RuntimeEnv::development());

        let err = runner.run(&spec, false).unwrap_err();

        assert_eq!(err.exit_code(), 3);
        let message = err.to_string();
        assert!(message.contains("worker.exe"), "message: {}", message);
        assert!(message.contains("exited with code 7"), "message: {}", message);
        assert!(message.contains("/srv/apps/worker.exe"), "executable named: {}", message);
        assert_eq!(runner.state(), RunState::Completed);
    }

    #[test]
    fn test_signal_termination_is_application_error() {
        let launcher = FakeLauncher::exiting(None);
        let spec = spec_for("app", &[], Transport::Arguments);
        let mut runner = ProcessRunner::new(&launcher, CapturingSink::default(), RuntimeEnv::development());

        let err = runner.run(&spec, false).unwrap_err();
        assert!(err.to_string().contains("terminated by a signal"));
    }

    #[test]
    fn test_missing_launcher_gets_install_hint() {
        let launcher = FakeLauncher::failing_start(io::ErrorKind::NotFound, "No such file or directory");
        let spec = spec_for("service.dll", &[], Transport::Arguments);
        let mut runner = ProcessRunner::new(&launcher, CapturingSink::default(), RuntimeEnv::development());

        let err = runner.run(&spec, false).unwrap_err();

        assert_eq!(err.exit_code(), 3);
        let message = err.to_string();
        assert!(message.contains("Ensure 'dotnet"), "message: {}", message);
        assert!(message.contains("PATH"), "message: {}", message);
        assert_eq!(runner.state(), RunState::LaunchFailed);
        assert_eq!(launcher.wait_calls(), 0);
    }

    #[test]
    fn test_other_start_failures_are_generic() {
        let launcher = FakeLauncher::failing_start(io::ErrorKind::PermissionDenied, "Permission denied");
        let spec = spec_for("test.exe", &[], Transport::Arguments);
        let mut runner = ProcessRunner::new(&launcher, CapturingSink::default(), RuntimeEnv::development());

        let err = runner.run(&spec, false).unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Failed to run application"), "message: {}", message);
        assert!(message.contains("Permission denied"), "message: {}", message);
        assert!(!message.contains("PATH"), "no launcher hint for direct targets: {}", message);
    }

    #[test]
    fn test_missing_direct_executable_is_generic() {
        let launcher = FakeLauncher::failing_start(io::ErrorKind::NotFound, "No such file or directory");
        let spec = spec_for("test.exe", &[], Transport::Arguments);
        let mut runner = ProcessRunner::new(&launcher, CapturingSink::default(), RuntimeEnv::development());

        let err = runner.run(&spec, false).unwrap_err();
        assert!(err.to_string().contains("Failed to run application 'test.exe'"));
    }

    #[test]
    fn test_execute_reports_outcome_without_judging() {
        let launcher = FakeLauncher::exiting(Some(7));
        let spec = spec_for("app", &[], Transport::Arguments);
        let mut runner = ProcessRunner::new(&launcher, CapturingSink::default(), RuntimeEnv::development());

        let outcome = runner.execute(&spec, false).unwrap();
        assert!(matches!(outcome, ProcessOutcome::Completed { exit_code: Some(7) }));
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_relays_both_streams_in_order() {
        let launcher = FakeLauncher::exiting(Some(0))
            .with_stdout("line 1\nline 2\nline 3\n")
            .with_stderr("warn 1\nwarn 2");
        let sink = CapturingSink::default();
        let spec = spec_for("app", &[], Transport::Arguments);
        let mut runner = ProcessRunner::new(&launcher, &sink, RuntimeEnv::development());

        runner.run(&spec, false).unwrap();

        assert_eq!(sink.lines(Stream::Stdout), vec!["line 1", "line 2", "line 3"]);
        assert_eq!(sink.lines(Stream::Stderr), vec!["warn 1", "warn 2"]);
    }

    #[test]
    fn test_output_is_relayed_even_on_failure() {
        let launcher = FakeLauncher::exiting(Some(2)).with_stderr("fatal: bad config\n");
        let sink = CapturingSink::default();
        let spec = spec_for("app", &[], Transport::Arguments);
        let mut runner = ProcessRunner::new(&launcher, &sink, RuntimeEnv::development());

        assert!(runner.run(&spec, false).is_err());
        assert_eq!(sink.lines(Stream::Stderr), vec!["fatal: bad config"]);
    }

    #[test]
    fn test_runner_is_single_use() {
        let launcher = FakeLauncher::exiting(Some(0));
        let spec = spec_for("app", &[], Transport::Arguments);
        let mut runner = ProcessRunner::new(&launcher, CapturingSink::default(), RuntimeEnv::development());

        runner.run(&spec, false).unwrap();
        let err = runner.run(&spec, false).unwrap_err();

        assert_eq!(err.exit_code(), 4);
        assert_eq!(launcher.started().len(), 1);
    }

    #[test]
    fn test_launcher_receives_spec() {
        let launcher = FakeLauncher::exiting(Some(0));
        let spec = spec_for("svc.dll", &[("ApiUrl", "x")], Transport::EnvironmentVariables);
        let mut runner = ProcessRunner::new(&launcher, CapturingSink::default(), RuntimeEnv::development());

        runner.run(&spec, false).unwrap();

        let started = launcher.started();
        assert_eq!(started[0], spec);
        assert_eq!(started[0].environment["ApiUrl"], "x");
    }

    #[test]
    fn test_debug_logs_command_line() {
        let launcher = FakeLauncher::exiting(Some(0));
        let spec = spec_for("test.exe", &[("key", "value")], Transport::Arguments);
        let mut runner = ProcessRunner::new(&launcher, CapturingSink::default(), RuntimeEnv::development());

        let (_, logs) = capture_logs(|| runner.run(&spec, true).unwrap());

        assert!(logs.contains("Debug Mode: Executing Application"), "{}", logs);
        let command_line = format!("Executable/Command: {}", spec.executable.display());
        assert!(logs.contains(&command_line), "{}", logs);
        assert!(command_line.ends_with("test.exe"), "{}", command_line);
        assert!(logs.contains(r#"Arguments: --key "value""#), "{}", logs);
    }

    #[test]
    fn test_debug_logs_unprefixed_environment_names() {
        let launcher = FakeLauncher::exiting(Some(0));
        let spec = spec_for("test.exe", &[("ApiUrl", "https://api")], Transport::EnvironmentVariables);
        let mut runner = ProcessRunner::new(&launcher, CapturingSink::default(), RuntimeEnv::development());

        let (_, logs) = capture_logs(|| runner.run(&spec, true).unwrap());

        assert!(logs.contains("ApiUrl = https://api"), "{}", logs);
        assert!(!logs.contains("CB_ApiUrl"), "{}", logs);
    }

    #[test]
    fn test_production_suppresses_debug_output() {
        let launcher = FakeLauncher::exiting(Some(0));
        let spec = spec_for("test.exe", &[("key", "value")], Transport::Arguments);
        let mut runner = ProcessRunner::new(&launcher, CapturingSink::default(), RuntimeEnv::production());

        let (_, logs) = capture_logs(|| runner.run(&spec, true).unwrap());

        assert!(!logs.contains("Debug Mode: Executing Application"), "{}", logs);
        assert!(!logs.contains("Arguments:"), "{}", logs);
    }
}
