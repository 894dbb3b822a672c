//! Subprocess helper shared by the tools.
//!
//! Commands are spawned from argument vectors, never through a shell, so
//! caller-supplied values cannot be interpreted as shell syntax.

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::process::{Command, ExitStatus, Stdio};

use hostdiag_json_rpc::ToolError;
use tracing::debug;

/// Captured result of a finished command
#[derive(Debug)]
pub struct CommandOutput {
    pub program: String,
    pub status: ExitStatus,
    /// Stdout decoded lossily as UTF-8
    pub stdout: String,
    /// Stdout exactly as the program wrote it
    pub stdout_bytes: Vec<u8>,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Stdout of a successful command, otherwise a `CommandFailed` error
    pub fn into_stdout(self) -> Result<String, ToolError> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(self.into_error())
        }
    }

    pub fn into_error(self) -> ToolError {
        ToolError::CommandFailed {
            program: self.program,
            status: self.status.to_string(),
            stderr: self.stderr.trim().to_string(),
        }
    }
}

/// Run `program` with `args` and wait for it to finish.
///
/// A program that is not installed maps to [`ToolError::MissingUtility`];
/// a non-zero exit is returned as a normal [`CommandOutput`] so each tool can
/// decide whether partial output is acceptable.
pub fn run<I, S>(program: &str, args: I) -> Result<CommandOutput, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|err| match err.kind() {
            ErrorKind::NotFound => ToolError::MissingUtility(program.to_string()),
            _ => ToolError::Io(err),
        })?;

    debug!(
        "{} exited with {} ({} bytes stdout)",
        program,
        output.status,
        output.stdout.len()
    );

    Ok(CommandOutput {
        program: program.to_string(),
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        stdout_bytes: output.stdout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program() {
        let err = run("hostdiag-no-such-program", ["--version"]).unwrap_err();
        assert!(matches!(err, ToolError::MissingUtility(ref p) if p == "hostdiag-no-such-program"));
        assert_eq!(
            err.to_string(),
            "required utility not found: hostdiag-no-such-program"
        );
    }

    #[test]
    fn test_captures_stdout() {
        let output = run("echo", ["hello"]).unwrap();
        assert!(output.success());
        assert_eq!(output.into_stdout().unwrap().trim(), "hello");
    }

    #[test]
    fn test_non_zero_exit_is_reported() {
        let output = run("ls", ["/hostdiag/definitely/missing"]).unwrap();
        assert!(!output.success());
        let err = output.into_stdout().unwrap_err();
        assert!(matches!(err, ToolError::CommandFailed { ref program, .. } if program == "ls"));
    }
}
