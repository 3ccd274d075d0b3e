use std::ffi::OsStr;

use tokio::process::Command;

pub fn cmd_program<P: AsRef<OsStr>>(program: P, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(|s| s.as_str()));
    cmd
}

/// Puts the child at the head of a new process group so the whole tree can
/// be signalled through the group id.
#[cfg(unix)]
pub fn own_process_group(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(not(unix))]
pub fn own_process_group(_cmd: &mut Command) {}
