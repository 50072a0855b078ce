//! Process launch seam and output relaying.

use crate::invocation::InvocationSpec;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};

/// Starts processes described by an [`InvocationSpec`].
pub trait ProcessLauncher {
    /// Start the process. Errors of kind [`io::ErrorKind::NotFound`] mean the
    /// executable could not be found.
    fn start(&self, spec: &InvocationSpec) -> io::Result<Box<dyn RunningProcess>>;
}

/// A started child process.
pub trait RunningProcess {
    /// Redirected stdout, if any. Can be taken once.
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>>;
    /// Redirected stderr, if any. Can be taken once.
    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>>;
    /// Block until the process exits. `None` when it was killed by a signal.
    fn wait(&mut self) -> io::Result<Option<i32>>;
    fn id(&self) -> Option<u32> {
        None
    }
}

impl<T: ProcessLauncher + ?Sized> ProcessLauncher for &T {
    fn start(&self, spec: &InvocationSpec) -> io::Result<Box<dyn RunningProcess>> {
        (**self).start(spec)
    }
}

/// Destination for relayed child output. Called from two threads at once.
pub trait OutputSink: Sync {
    fn stdout_line(&self, line: &str);
    fn stderr_line(&self, line: &str);
}

impl<T: OutputSink + ?Sized> OutputSink for &T {
    fn stdout_line(&self, line: &str) {
        (**self).stdout_line(line)
    }

    fn stderr_line(&self, line: &str) {
        (**self).stderr_line(line)
    }
}

/// Relays to the parent's own stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn stdout_line(&self, line: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }

    fn stderr_line(&self, line: &str) {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{}", line);
    }
}

/// Read `reader` to the end, handing each line (without terminator) to
/// `emit`. Invalid UTF-8 is replaced rather than aborting the relay.
pub fn relay_lines<R: Read>(reader: R, mut emit: impl FnMut(&str)) -> io::Result<u64> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);
    let mut lines = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(lines);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        emit(&String::from_utf8_lossy(&buf));
        lines += 1;
    }
}

/// [`ProcessLauncher`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn start(&self, spec: &InvocationSpec) -> io::Result<Box<dyn RunningProcess>> {
        let mut cmd = Command::new(&spec.executable);

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            // Windows programs parse their own command line; pass it verbatim.
            if !spec.arguments.is_empty() {
                cmd.raw_arg(&spec.arguments);
            }
        }
        #[cfg(not(windows))]
        {
            cmd.args(&spec.argv);
        }

        // Inherit the parent environment and add the resolved values on top.
        cmd.envs(&spec.environment);

        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        if spec.redirect_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let child = cmd.spawn()?;
        Ok(Box::new(SystemProcess { child }))
    }
}

struct SystemProcess {
    child: Child,
}

impl RunningProcess for SystemProcess {
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn wait(&mut self) -> io::Result<Option<i32>> {
        Ok(self.child.wait()?.code())
    }

    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }
}
