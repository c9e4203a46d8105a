//! Fork/privilege-drop/exec primitives used by the per-mount daemon launch,
//! its syslog-forwarding grandchild, and the teardown cascade's helper
//! processes.
//!
//! Every function here that runs post-fork, pre-exec is written to touch
//! only async-signal-safe operations (no heap allocation survives past the
//! `fork()` call in the child beyond what was prepared before forking).

use std::ffi::CString;
use std::os::unix::io::{AsRawFd, RawFd};

use anyhow::{Context, Error};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{
    close, dup2, execvp, fork, pipe, setresgid, setresuid, ForkResult, Gid, Pid, Uid, User,
};

/// `setresgid`/`setresuid` to `(uid, gid)`, saved-id included, so the
/// privilege cannot be restored later in this process image. Intended to
/// run in a freshly forked child, before anything else.
pub fn drop_privileges(uid: Uid, gid: Gid) -> Result<(), Error> {
    setresgid(gid, gid, gid).context("setresgid failed while dropping privileges")?;
    setresuid(uid, uid, uid).context("setresuid failed while dropping privileges")?;
    Ok(())
}

/// Looks up the job user's password-database `HOME`, best-effort.
pub fn home_dir_for_uid(uid: Uid) -> Option<std::path::PathBuf> {
    User::from_uid(uid).ok().flatten().map(|u| u.dir)
}

/// Replaces the current process image with `program`, passing `args` as
/// the full argv (including argv[0]). Returns only on failure — callers
/// that rely on `exec` never returning must treat a returned `Error` as
/// fatal and exit non-zero themselves.
pub fn exec_replacing_self(program: &str, args: &[String]) -> Error {
    let cprogram = match CString::new(program) {
        Ok(c) => c,
        Err(e) => return Error::new(e).context("program name contains a NUL byte"),
    };
    let cargs: Result<Vec<CString>, _> = args.iter().map(|a| CString::new(a.as_str())).collect();
    let cargs = match cargs {
        Ok(c) => c,
        Err(e) => return Error::new(e).context("argument contains a NUL byte"),
    };

    match execvp(&cprogram, &cargs) {
        Ok(infallible) => match infallible {},
        Err(errno) => {
            Error::new(errno).context(format!("execvp('{program}') failed"))
        }
    }
}

/// Sets up an observability pipe for the calling process: forks a
/// grandchild that execs a syslog forwarder reading from its stdin, and
/// rewires the caller's own stdout/stderr onto the pipe's write end with
/// stdin redirected to `/dev/null`.
///
/// Must be called in the mount child, after privilege drop and before
/// assembling the daemon command line, so the daemon inherits the rewired
/// descriptors across its own `exec`.
pub fn setup_log_forwarder(logger_tag: &str) -> Result<(), Error> {
    let (read_end, write_end) = pipe().context("Failed to create observability pipe")?;

    match unsafe { fork() }.context("Failed to fork log-forwarder grandchild")? {
        ForkResult::Child => {
            let _ = close(write_end.as_raw_fd());
            let _ = dup2(read_end.as_raw_fd(), 0);
            let _ = close(read_end.as_raw_fd());

            let program = CString::new("logger").unwrap();
            let args = [
                CString::new("logger").unwrap(),
                CString::new("-t").unwrap(),
                CString::new(logger_tag).unwrap(),
                CString::new("-p").unwrap(),
                CString::new("user.info").unwrap(),
            ];
            let _ = execvp(&program, &args);
            std::process::exit(127);
        }
        ForkResult::Parent { .. } => {
            drop(read_end);

            dup2(write_end.as_raw_fd(), 1).context("dup2 onto stdout failed")?;
            dup2(write_end.as_raw_fd(), 2).context("dup2 onto stderr failed")?;
            drop(write_end);

            let devnull = std::fs::File::open("/dev/null")
                .context("Failed to open /dev/null for daemon stdin")?;
            dup2(devnull.as_raw_fd() as RawFd, 0).context("dup2 onto stdin failed")?;

            Ok(())
        }
    }
}

/// Non-blocking poll of a supervised child: reports whether it has exited
/// yet without blocking the caller.
pub fn poll_child_nonblocking(pid: Pid) -> Result<Option<WaitStatus>, Error> {
    match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::StillAlive) => Ok(None),
        Ok(status) => Ok(Some(status)),
        Err(e) => Err(Error::new(e)).context("waitpid failed while polling mount child"),
    }
}

/// `SIGKILL` a supervised child and reap it. Tolerates the child having
/// already exited.
pub fn kill_and_reap(pid: Pid) -> Result<(), Error> {
    match kill(pid, Signal::SIGKILL) {
        Ok(()) | Err(nix::Error::ESRCH) => {}
        Err(e) => return Err(Error::new(e)).context("SIGKILL failed"),
    }
    match waitpid(pid, None) {
        Ok(_) | Err(nix::Error::ECHILD) => Ok(()),
        Err(e) => Err(Error::new(e)).context("waitpid failed after SIGKILL"),
    }
}
