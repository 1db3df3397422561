//! Bounded external command execution.
//!
//! Every shell-backed adapter in this layer funnels through [`run_command`],
//! which fences each child process with a hard timeout and kills it on
//! abandonment. A wedged system utility must never wedge the session.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::trace;

/// Upper bound applied to a single command when the caller has no tighter one.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, when the process exited normally.
    pub code: Option<i32>,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Errors from launching or fencing an external command.
///
/// A non-zero exit status is *not* an error at this level: callers decide
/// what a failed exit means for their operation.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process could not be spawned at all.
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The process ran past its timeout and was killed.
    #[error("'{program}' did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

/// Runs `program` with `args`, waits at most `timeout`, and captures output.
///
/// The child is spawned with `kill_on_drop`, so a timeout (or a cancelled
/// caller) reaps it rather than leaking it.
pub async fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, ExecError> {
    trace!(program, ?args, "running command");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExecError::Launch {
            program: program.to_string(),
            source,
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ExecError::Timeout {
            program: program.to_string(),
            timeout,
        })?
        .map_err(|source| ExecError::Launch {
            program: program.to_string(),
            source,
        })?;

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
