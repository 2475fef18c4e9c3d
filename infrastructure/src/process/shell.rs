//! Platform shell invocation.

use tokio::process::Command;

/// Build a command that runs `command_line` through the platform shell
/// (`sh -c` on Unix, `cmd /C` on Windows).
pub fn shell_command(command_line: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", command_line]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command_line]);
        c
    }
}
