//! External tool invocation.
//!
//! Every external process the build starts (package downloader, dependency
//! lister, rpath editor, install name tool) goes through [`run_tool`]. Calls
//! are awaited one at a time; nothing in the pipeline runs two tools at once.

use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// The tool could not be run to completion.
///
/// A non-zero exit is not a `ToolError`; it is reported in [`ToolOutput`] and
/// interpreted by the caller.
#[derive(Debug, Error)]
pub enum ToolError {
  #[error("failed to start '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("'{program}' was killed by signal {signal}")]
  Signal { program: String, signal: i32 },

  #[error("'{program}' timed out after {}s and was killed", .timeout.as_secs())]
  Timeout { program: String, timeout: Duration },
}

/// Captured result of a finished tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
  pub stdout: String,
  pub stderr: String,
  pub code: i32,
}

impl ToolOutput {
  pub fn success(&self) -> bool {
    self.code == 0
  }

  /// Last non-empty stderr line, the usual place for the actual error.
  pub fn error_line(&self) -> &str {
    self
      .stderr
      .lines()
      .rev()
      .map(str::trim)
      .find(|line| !line.is_empty())
      .unwrap_or("")
  }
}

/// Run a tool to completion and capture its output.
///
/// # Arguments
///
/// * `program` - Executable name or path
/// * `args` - Arguments, passed without shell interpretation
/// * `timeout` - Kill the process if it runs longer than this
pub async fn run_tool<I, S>(program: &str, args: I, timeout: Option<Duration>) -> Result<ToolOutput, ToolError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<OsStr>,
{
  let args: Vec<S> = args.into_iter().collect();
  debug!(
    program,
    args = %args.iter().map(|a| a.as_ref().to_string_lossy()).collect::<Vec<_>>().join(" "),
    "running tool"
  );

  let mut command = Command::new(program);
  command
    .args(&args)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  let spawn_err = |source| ToolError::Spawn {
    program: program.to_string(),
    source,
  };

  let output = match timeout {
    Some(limit) => match tokio::time::timeout(limit, command.output()).await {
      Ok(result) => result.map_err(spawn_err)?,
      Err(_) => {
        return Err(ToolError::Timeout {
          program: program.to_string(),
          timeout: limit,
        });
      }
    },
    None => command.output().await.map_err(spawn_err)?,
  };

  let code = exit_code(program, output.status)?;
  let result = ToolOutput {
    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    code,
  };

  if !result.success() && !result.stderr.is_empty() {
    debug!(program, code, stderr = %result.stderr.trim(), "tool stderr");
  }

  Ok(result)
}

#[cfg(unix)]
fn exit_code(program: &str, status: ExitStatus) -> Result<i32, ToolError> {
  use std::os::unix::process::ExitStatusExt;

  match (status.code(), status.signal()) {
    (Some(code), _) => Ok(code),
    (None, Some(signal)) => Err(ToolError::Signal {
      program: program.to_string(),
      signal,
    }),
    (None, None) => Ok(-1),
  }
}

#[cfg(not(unix))]
fn exit_code(_program: &str, status: ExitStatus) -> Result<i32, ToolError> {
  Ok(status.code().unwrap_or(-1))
}
