use std::borrow::Cow;
use std::ffi::OsStr;
use std::io;
use std::process::{Command, ExitStatus, Output, Stdio};

use log::Level::Debug;
use log::{debug, log_enabled};

pub struct CmdOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CmdOutput {
    /// Converts to a `Result` object that is `Ok` only if the [ExitStatus] is
    /// success.
    pub fn err_on_status(self) -> crate::Result<Self> {
        if self.status.success() {
            return Ok(self);
        }

        // Killed by a signal if there is no code
        let code = self.status.code().unwrap_or(-1);

        Err(crate::Error::CommandError(
            code,
            self.stderr_utf8_lossy().trim().to_string(),
        ))
    }

    #[inline]
    pub fn ok(&self) -> bool {
        self.status.success()
    }

    #[inline]
    pub fn stdout_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    #[inline]
    pub fn stderr_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

impl From<Output> for CmdOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Quotes a string with single quotes
pub fn quote(s: &str) -> String {
    let mut new = String::with_capacity(s.len() + 2);
    new.push('\'');
    for c in s.chars() {
        if c == '\'' {
            new.push_str("'\"'\"'");
        } else {
            new.push(c);
        }
    }
    new.push('\'');
    new
}

pub fn run_cmd<C, S>(cmd: C, args: &[S]) -> io::Result<CmdOutput>
where
    C: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    if log_enabled!(Debug) {
        log_cmd(&cmd, args);
    }
    Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map(|output| output.into())
}

pub fn log_cmd<C, S>(cmd: &C, args: &[S])
where
    C: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    let nargs = args.len();
    if nargs > 0 {
        let mut args_string = String::new();
        for (i, e) in args.iter().enumerate() {
            args_string.push_str(&e.as_ref().to_string_lossy());
            if i < nargs - 1 {
                args_string.push(' ');
            }
        }
        debug!(
            "Running command: `{} {}`",
            cmd.as_ref().to_string_lossy(),
            args_string
        );
    } else {
        debug!("Running command: `{}`", cmd.as_ref().to_string_lossy());
    }
}
