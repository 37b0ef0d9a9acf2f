// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Runs external tools (`file`, `scanelf`, `portageq`) with a bounded run time.

use std::ffi::OsStr;
use std::io::Read;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use wait_timeout::ChildExt;

/// Default timeout for a single external tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

pub type CommandResult<T> = std::result::Result<T, CommandError>;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command not found: {command}")]
    NotFound { command: String },
    #[error("Command failed: {command}")]
    Failed {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },
    #[error("Command {command} exited with status {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Captured result of a finished process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Turn a non-zero exit into an error carrying the tool's stderr.
    ///
    /// # Errors
    /// Returns `NonZeroExit` if the process did not exit successfully.
    pub fn success(self, command: &str) -> CommandResult<Self> {
        if self.status.success() {
            Ok(self)
        } else {
            Err(CommandError::NonZeroExit {
                command: command.to_string(),
                code: self.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&self.stderr).trim().to_string(),
            })
        }
    }
}

/// Run `program` with `args`, capturing stdout and stderr.
///
/// Both pipes are drained on reader threads so a chatty tool cannot block on a full pipe
/// while we wait for it. A process still running after `timeout` is killed.
///
/// # Errors
/// Returns an error if the program is missing, cannot be spawned, is killed by a signal,
/// or exceeds the timeout. A non-zero exit status is *not* an error here; see
/// [`CommandOutput::success`].
pub fn run<I, S>(program: &str, args: I, timeout: Duration) -> CommandResult<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CommandError::NotFound {
                command: program.to_string(),
            });
        }
        Err(e) => {
            return Err(CommandError::Failed {
                command: program.to_string(),
                source: e,
            });
        }
    };

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let status = wait_with_timeout(&mut child, timeout, program);
    let stdout = join(stdout);
    let stderr = join(stderr);

    Ok(CommandOutput {
        status: status?,
        stdout,
        stderr,
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            // A read error only truncates the captured output; the exit status still decides.
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Wait for a child process to complete with a timeout.
///
/// If the timeout is reached the process is killed and reaped.
fn wait_with_timeout(child: &mut Child, timeout: Duration, command: &str) -> CommandResult<ExitStatus> {
    let waited = child.wait_timeout(timeout).map_err(|e| CommandError::Failed {
        command: command.to_string(),
        source: e,
    })?;

    if let Some(status) = waited {
        if status.code().is_some() {
            Ok(status)
        } else if let Some(signal) = status.signal() {
            Err(CommandError::Failed {
                command: command.to_string(),
                source: std::io::Error::other(format!("Process terminated by signal: {signal}")),
            })
        } else {
            Err(CommandError::Failed {
                command: command.to_string(),
                source: std::io::Error::other("Unknown process termination"),
            })
        }
    } else {
        let _ = child.kill();
        let _ = child.wait();
        Err(CommandError::Timeout {
            command: command.to_string(),
            timeout,
        })
    }
}
