use std::fs;
use std::io;

use log;
use regex::Regex;

use crate::command::{run_cmd, CmdOutput};
use crate::config::AdbConfig;
use crate::Context;

lazy_static::lazy_static! {
    static ref DEVICE_NOT_FOUND: Regex = Regex::new(r"device\s+'([^']+)'\s+not\s+found").unwrap();
}

/// The Adb trait just abstracts some `adb` commands
pub trait Adb: Send + Sync {
    /// Returns the serials of all connected devices
    fn get_connected_devices(&self) -> crate::Result<Vec<String>>;

    /// Essentially the same as running `adb pull $device $local`
    fn pull(&self, device: &str, local: &str) -> io::Result<CmdOutput>;

    /// Essentially the same as running `adb shell '...'`
    fn shell(&self, shell_cmd: &str) -> io::Result<CmdOutput>;

    /// Runs the shell command and returns its stdout, failing if the command
    /// fails or if `adb` itself complains about the device
    fn shell_stdout(&self, shell_cmd: &str) -> crate::Result<String> {
        let output = self.shell(shell_cmd)?;
        if !output.ok() {
            let stderr = output.stderr_utf8_lossy();
            if let Some(err) = device_error(&stderr) {
                return Err(err);
            }
        }
        let output = output.err_on_status()?;
        Ok(output.stdout_utf8_lossy().into_owned())
    }
}

/// Maps `adb`'s own error output to a more specific error if possible
fn device_error(stderr: &str) -> Option<crate::Error> {
    if stderr.contains("no devices/emulators") {
        return Some(crate::Error::NoAdbDevice);
    }
    let caps = DEVICE_NOT_FOUND.captures(stderr)?;
    let serial = caps
        .get(1)
        .map(|m| String::from(m.as_str()))
        .unwrap_or_else(|| "?".into());
    Some(crate::Error::AdbDeviceNotFound(serial))
}

#[derive(Clone)]
/// An `Adb` implementation that just invokes the external `adb` command.
pub struct ExecAdb {
    bin: String,
    serial: Option<String>,
}

impl ExecAdb {
    /// Creates a new `ExecAdb` from the given context.
    ///
    /// The `[adb]` table of the user config is checked first:
    ///
    /// [adb]
    /// executable = "..."
    /// serial = "..."
    ///
    /// and anything it doesn't set is pulled from the environment.
    pub fn new(ctx: &dyn Context) -> crate::Result<Self> {
        let cfg = ctx.get_config()?.adb()?;
        Self::try_from_adb_config(ctx, &cfg)
    }

    pub fn from_env(ctx: &dyn Context) -> crate::Result<Self> {
        let bin = ctx.get_bin("adb")?;
        let serial = ctx.maybe_get_env("ANDROID_SERIAL");

        Ok(Self { bin, serial })
    }

    pub fn try_from_adb_config(ctx: &dyn Context, cfg: &AdbConfig) -> crate::Result<Self> {
        let mut from_env = match &cfg.executable {
            Some(bin) => Self {
                bin: bin.clone(),
                serial: ctx.maybe_get_env("ANDROID_SERIAL"),
            },
            None => Self::from_env(ctx)?,
        };
        if let Some(serial) = &cfg.serial {
            from_env.serial = Some(serial.clone());
        }
        Ok(from_env)
    }

    pub fn has_serial(&self) -> bool {
        self.serial.is_some()
    }

    pub fn with_serial(mut self, serial: String) -> Self {
        self.serial = Some(serial);
        self
    }
}

impl Default for ExecAdb {
    fn default() -> Self {
        Self {
            bin: "adb".into(),
            serial: None,
        }
    }
}

macro_rules! adb_cmd {
    ($adb:ident, $cmd:literal, $($args:expr),*) => {
        if let Some(ref serial) = $adb.serial {
            run_cmd(&$adb.bin, &["-s", serial, $cmd, $($args),*])
        } else {
            run_cmd(&$adb.bin, &[$cmd, $($args),*])
        }
    }
}

impl ExecAdb {
    fn shell_cat_to_file(&self, device: &str, local: &str) -> io::Result<CmdOutput> {
        let cmd_output = adb_cmd!(self, "exec-out", "cat", device)?;
        if cmd_output.ok() {
            fs::write(local, &cmd_output.stdout)?;
        }
        Ok(CmdOutput {
            status: cmd_output.status,
            stdout: Vec::new(),
            stderr: cmd_output.stderr,
        })
    }
}

impl Adb for ExecAdb {
    /// Returns a list of all connected devices (similar to `adb devices -l`)
    fn get_connected_devices(&self) -> crate::Result<Vec<String>> {
        let output = run_cmd(&self.bin, &["devices", "-l"])?;
        let out_str = output.stdout_utf8_lossy();
        let device_list = parse_devices(&out_str);

        if device_list.is_empty() {
            return Err(crate::Error::NoAdbDevice);
        }

        Ok(device_list)
    }

    fn pull(&self, device: &str, local: &str) -> io::Result<CmdOutput> {
        let pull_result = adb_cmd!(self, "pull", device, local);

        match &pull_result {
            Err(_) => self.shell_cat_to_file(device, local),
            Ok(pull_cmd_output) => {
                if pull_cmd_output.status.success() {
                    pull_result
                } else {
                    log::debug!("adb pull {} failed, falling back to cat", device);
                    self.shell_cat_to_file(device, local)
                }
            }
        }
    }

    fn shell(&self, shell_cmd: &str) -> io::Result<CmdOutput> {
        adb_cmd!(self, "shell", shell_cmd)
    }
}

fn parse_devices(out: &str) -> Vec<String> {
    // The first line is just the `List of devices attached` header
    out.lines()
        .skip(1)
        .filter(|l| !l.is_empty())
        .filter_map(|l| {
            let mut parts = l.split_ascii_whitespace();
            let id = parts.next()?;
            match parts.next() {
                Some("device") => Some(String::from(id)),
                _ => None,
            }
        })
        .collect()
}
