use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use s3update_core::UpdateError;

use crate::report::Reporter;
use crate::target::ExecutableTarget;

/// Builds the command that relaunches `executable` with `args`, where `args`
/// is a full argv including the program name. The environment is inherited
/// unchanged.
pub fn reexec_command<I>(executable: &Path, args: I) -> Command
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut command = Command::new(executable);
    if let Some(arg0) = args.next() {
        set_arg0(&mut command, arg0);
    }
    command.args(args);
    command
}

#[cfg(unix)]
fn set_arg0(command: &mut Command, arg0: OsString) {
    use std::os::unix::process::CommandExt;
    command.arg0(arg0);
}

#[cfg(not(unix))]
fn set_arg0(_command: &mut Command, _arg0: OsString) {}

/// Replaces the current process image with the installed executable.
///
/// Only returns on failure. The PID, arguments and environment carry over.
#[cfg(unix)]
pub fn restart(target: &ExecutableTarget) -> UpdateError {
    use std::os::unix::process::CommandExt;

    let source = reexec_command(target.path(), std::env::args_os()).exec();
    UpdateError::ReexecFailed {
        target: target.path().to_path_buf(),
        source,
    }
}

/// Without `exec`, the new executable is started as a separate process and
/// this one exits, so the PID changes across the update.
#[cfg(not(unix))]
pub fn restart(target: &ExecutableTarget) -> UpdateError {
    match reexec_command(target.path(), std::env::args_os()).spawn() {
        Ok(_) => std::process::exit(0),
        Err(source) => UpdateError::ReexecFailed {
            target: target.path().to_path_buf(),
            source,
        },
    }
}

/// Restarts into the new executable, or exits with status 1. The binary on
/// disk no longer matches the running image, so carrying on is not an option.
pub fn restart_or_exit(target: &ExecutableTarget, reporter: &mut dyn Reporter) -> ! {
    reporter.restarting(target.path());
    let err = restart(target);
    reporter.failed(&err);
    std::process::exit(1)
}
