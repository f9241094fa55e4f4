//! Link operations performed by external `ln`/`rm` processes.
//!
//! Kept for hosts where a privileged helper has to perform the operation.
//! Each child is bounded by a timeout and killed when it expires.

use std::ffi::OsStr;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use localvol_shared::IoFailure;
use tracing::{debug, warn};

use super::{Invoker, LinkCommand};

/// Default bound on a single `ln`/`rm` invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Invoker that shells out to `ln` and `rm`.
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    timeout: Duration,
}

impl CommandInvoker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for CommandInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl Invoker for CommandInvoker {
    fn invoke(&self, command: &LinkCommand<'_>) -> Result<(), IoFailure> {
        debug!(
            command = %command,
            target = %command.target().display(),
            timeout = ?self.timeout,
            "Invoking link command"
        );
        run_command(command.program(), &command.args(), self.timeout)
    }
}

/// Run `program` to completion, failing on non-zero exit or timeout.
///
/// stderr is drained on a separate thread while the child runs, so a
/// chatty child cannot block on a full pipe.
fn run_command(program: &str, args: &[&OsStr], timeout: Duration) -> Result<(), IoFailure> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| IoFailure::Failed(format!("Failed to spawn {}: {}", program, e)))?;

    let stderr_reader = child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });

    let status = wait_with_timeout(&mut child, timeout).inspect_err(|e| {
        warn!(program, timeout = ?timeout, error = %e, "Command failed to complete, killed");
    });
    let stderr = stderr_reader
        .and_then(|reader| reader.join().ok())
        .unwrap_or_default();
    let status = status?;

    if status.success() {
        return Ok(());
    }
    Err(IoFailure::Failed(format!(
        "{} exited with {}: {}",
        program,
        status,
        stderr.trim()
    )))
}

/// Wait for `child`, killing and reaping it on timeout or wait failure.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, IoFailure> {
    let deadline = Instant::now() + timeout;
    let failure = loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => break IoFailure::TimedOut(timeout),
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => break IoFailure::from(e),
        }
    };
    let _ = child.kill();
    let _ = child.wait();
    Err(failure)
}
