use std::io;
use std::process::ExitStatus;

use mockall::mock;
use rstest::fixture;

use crate::command::CmdOutput;

mock! {
    pub Adb {

    }

    impl crate::adb::Adb for Adb {
        fn get_connected_devices(&self) -> crate::Result<Vec<String>>;
        fn pull(&self, device: &str, local: &str) -> io::Result<CmdOutput>;
        fn shell(&self, shell_cmd: &str) -> io::Result<CmdOutput>;
    }
}

#[fixture]
pub fn mock_adb() -> MockAdb {
    MockAdb::new()
}

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

/// Build a [CmdOutput] as if a command printed `stdout` and exited with `code`
pub fn cmd_output(code: i32, stdout: &str) -> CmdOutput {
    CmdOutput {
        status: exit_status(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Same as [cmd_output] but with content on stderr
pub fn cmd_output_stderr(code: i32, stderr: &str) -> CmdOutput {
    CmdOutput {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}
