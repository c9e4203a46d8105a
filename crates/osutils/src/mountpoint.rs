//! Mountpoint Prober: decides whether a path is currently a filesystem
//! boundary, tolerant of a FUSE daemon that has died out from under its
//! mount (`ENOTCONN`).

use std::os::unix::fs::MetadataExt;
use std::path::Path;

use anyhow::{Context, Error};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult, Gid, Uid};

/// Tests whether `path` is a mount boundary.
///
/// 1. A hung FUSE endpoint (`stat` fails with `ENOTCONN`) counts as mounted,
///    so teardown still attempts to unmount it.
/// 2. A non-directory is never a mount point.
/// 3. The filesystem root is always a mount point.
/// 4. Otherwise, compare device ids of `path` and `path/..`: they differ
///    exactly when `path` is a mount boundary (or, degenerately, when the
///    inode ids are equal — root-of-filesystem aliasing).
pub fn check_is_mountpoint(path: impl AsRef<Path>) -> Result<bool, Error> {
    let path = path.as_ref();

    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.raw_os_error() == Some(libc::ENOTCONN) => return Ok(true),
        Err(e) => {
            return Err(e).context(format!("Failed to stat '{}'", path.display()));
        }
    };

    if !meta.is_dir() {
        return Ok(false);
    }

    if path == Path::new("/") {
        return Ok(true);
    }

    let parent = path.join("..");
    let parent_meta = std::fs::metadata(&parent)
        .context(format!("Failed to stat '{}'", parent.display()))?;

    Ok(parent_meta.dev() != meta.dev() || parent_meta.ino() == meta.ino())
}

/// Same check, but run as the job user: forks, drops real+effective+saved
/// group then user identity to `(gid, uid)`, and reports the result via
/// exit status (0 = not mounted, 1 = mounted, 2 = probe itself failed).
/// Used whenever the answer must reflect permissions as the job user sees
/// them rather than as the caller (typically root) sees them.
pub fn check_is_mountpoint_as_user(
    path: impl AsRef<Path>,
    uid: Uid,
    gid: Gid,
) -> Result<bool, Error> {
    let path = path.as_ref().to_path_buf();

    // Safety: the child only calls async-signal-safe syscalls (setresgid,
    // setresuid, stat via libc) and exits through `std::process::exit`,
    // never unwinding back through caller frames.
    match unsafe { fork() }.context("Failed to fork mountpoint-probe child")? {
        ForkResult::Parent { child } => match waitpid(child, None)
            .context("Failed to wait for mountpoint-probe child")?
        {
            WaitStatus::Exited(_, 0) => Ok(false),
            WaitStatus::Exited(_, 1) => Ok(true),
            WaitStatus::Exited(_, code) => {
                Err(Error::msg(format!("mountpoint probe exited with status {code}")))
            }
            other => Err(Error::msg(format!(
                "mountpoint probe terminated abnormally: {other:?}"
            ))),
        },
        ForkResult::Child => {
            let status = match crate::process::drop_privileges(uid, gid) {
                Ok(()) => match check_is_mountpoint(&path) {
                    Ok(true) => 1,
                    Ok(false) => 0,
                    Err(_) => 2,
                },
                Err(_) => 2,
            };
            std::process::exit(status);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn root_is_a_mountpoint() {
        assert!(check_is_mountpoint(Path::new("/")).unwrap());
    }

    #[test]
    fn a_plain_subdirectory_is_not_a_mountpoint() {
        let dir = TempDir::new().unwrap();
        assert!(!check_is_mountpoint(dir.path()).unwrap());
    }

    #[test]
    fn a_nonexistent_path_is_an_error() {
        assert!(check_is_mountpoint(Path::new("/does/not/exist/at/all")).is_err());
    }

    #[test]
    fn a_regular_file_is_not_a_mountpoint() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"x").unwrap();
        assert!(!check_is_mountpoint(&file).unwrap());
    }

    // Requires root to exercise the setresgid/setresuid privilege drop
    // against a real unprivileged uid/gid.
    #[test]
    #[ignore]
    fn privileged_probe_matches_unprivileged_probe_for_a_plain_directory() {
        let dir = TempDir::new().unwrap();
        let nobody = Uid::from_raw(65534);
        let nogroup = Gid::from_raw(65534);
        let result = check_is_mountpoint_as_user(dir.path(), nobody, nogroup).unwrap();
        assert!(!result);
    }
}
