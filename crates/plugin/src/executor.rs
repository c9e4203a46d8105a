//! Mount Executor & Lifecycle Manager: establishes one FUSE mount per
//! resolved spec under the job user's identity, polls it to readiness,
//! and tears every established mount down in reverse order at step exit.

use log::{error, info, warn};
use nix::sys::wait::WaitStatus;
use nix::unistd::{fork, ForkResult, Gid, Uid};

use gcsfuse_mount_core::resolver::ResolvedMount;
use osutils::errors::ValidationError;
use osutils::{mount, mountpoint, process};

use crate::constants::{GCSFUSE_BIN, MOUNT_WAIT_RETRIES, MOUNT_WAIT_SLEEP, SYSLOG_TAG};
use crate::error::PluginError;
use crate::session::SessionMountTable;

/// The identity mounts are established and probed as.
#[derive(Debug, Clone, Copy)]
pub struct JobUser {
    pub uid: Uid,
    pub gid: Gid,
}

/// Exit codes the mount child uses to tell the polling parent which stage
/// it failed at, so the parent can raise a distinguishable [`PluginError`]
/// instead of a generic early-exit failure. Any other exit code (or a
/// signal) is treated as a plain exec-stage failure.
const CHILD_EXIT_PRIVILEGE_DROP_FAILED: i32 = 2;
const CHILD_EXIT_VALIDATION_FAILED: i32 = 3;
const CHILD_EXIT_EXEC_FAILED: i32 = 4;

/// Establishes one mount per the per-mount establishment protocol. On
/// success (including the idempotence short-circuit) the Session Mount
/// Table gains an entry for every mount this call actually started.
pub fn establish_mount(
    spec: &ResolvedMount,
    user: JobUser,
    table: &mut SessionMountTable,
) -> Result<(), PluginError> {
    // Already mounted, as the job user would see it: nothing to do.
    let already_mounted =
        mountpoint::check_is_mountpoint_as_user(&spec.mount_point, user.uid, user.gid)
            .map_err(PluginError::Io)?;
    if already_mounted {
        info!(
            "'{}' is already a mount point, skipping",
            spec.mount_point.display()
        );
        return Ok(());
    }

    // Everything past this point runs in the forked child.
    match unsafe { fork() }.map_err(|e| PluginError::Fork {
        mount_point: spec.mount_point.clone(),
        source: anyhow::Error::new(e),
    })? {
        ForkResult::Parent { child } => poll_until_mounted(spec, child, user, table),
        ForkResult::Child => {
            establish_mount_child(spec, user);
        }
    }
}

/// Runs entirely in the forked mount child. Never returns: every path out
/// is `std::process::exit` (with a stage-specific code the polling parent
/// decodes in [`classify_child_exit`]) or a successful `exec` (which
/// replaces the process image and so also never returns to this function).
fn establish_mount_child(spec: &ResolvedMount, user: JobUser) -> ! {
    if let Err(e) = process::drop_privileges(user.uid, user.gid) {
        error!("Failed to drop privileges before mounting: {e:#}");
        std::process::exit(CHILD_EXIT_PRIVILEGE_DROP_FAILED);
    }

    // Best-effort: downstream credential lookups inside the daemon may or
    // may not depend on this, so a failure here is not fatal to the mount.
    if let Some(home) = process::home_dir_for_uid(user.uid) {
        std::env::set_var("HOME", home);
    }

    if let Err(e) = mount::validate_mount_target(&spec.mount_point, user.uid.as_raw()) {
        error!(
            "Mount target '{}' failed validation: {e:#}",
            spec.mount_point.display()
        );
        std::process::exit(CHILD_EXIT_VALIDATION_FAILED);
    }

    if let Err(e) = process::setup_log_forwarder(SYSLOG_TAG) {
        error!("Failed to set up log forwarder: {e:#}");
        std::process::exit(CHILD_EXIT_EXEC_FAILED);
    }

    let mut args = vec![
        GCSFUSE_BIN.to_string(),
        "-foreground".to_string(),
        "-allow-other".to_string(),
        format!("-uid={}", user.uid.as_raw()),
        format!("-gid={}", user.gid.as_raw()),
        "-log-format=json".to_string(),
    ];
    args.extend(spec.flag_args().into_iter().map(str::to_string));
    if let Some(bucket) = spec.bucket.as_deref() {
        if !bucket.is_empty() {
            args.push(bucket.to_string());
        }
    }
    args.push(spec.mount_point.display().to_string());

    // Only returns on failure; a successful call never reaches here.
    let err = process::exec_replacing_self(GCSFUSE_BIN, &args);
    error!("Failed to exec '{GCSFUSE_BIN}': {err:#}");
    std::process::exit(CHILD_EXIT_EXEC_FAILED);
}

/// Parent-side polling loop: waits for the mount to become visible, up to
/// `MOUNT_WAIT_RETRIES` times, `MOUNT_WAIT_SLEEP` apart. Kills and reaps
/// the child on timeout or early exit.
fn poll_until_mounted(
    spec: &ResolvedMount,
    child: nix::unistd::Pid,
    user: JobUser,
    table: &mut SessionMountTable,
) -> Result<(), PluginError> {
    for _ in 0..MOUNT_WAIT_RETRIES {
        let mounted = mountpoint::check_is_mountpoint(&spec.mount_point).map_err(PluginError::Io)?;
        if mounted {
            table.record(spec.mount_point.clone(), child);
            return Ok(());
        }

        match process::poll_child_nonblocking(child).map_err(|e| PluginError::Fork {
            mount_point: spec.mount_point.clone(),
            source: e,
        })? {
            None => std::thread::sleep(MOUNT_WAIT_SLEEP),
            Some(status) => {
                warn!(
                    "Mount daemon for '{}' exited early: {status:?}",
                    spec.mount_point.display()
                );
                return Err(classify_child_exit(spec, user, status));
            }
        }
    }

    warn!(
        "Mount at '{}' did not become ready within {MOUNT_WAIT_RETRIES} retries, killing daemon",
        spec.mount_point.display()
    );
    if let Err(e) = process::kill_and_reap(child) {
        error!("Failed to kill timed-out mount daemon: {e:#}");
    }
    Err(PluginError::MountTimeout {
        mount_point: spec.mount_point.clone(),
        retries: MOUNT_WAIT_RETRIES,
    })
}

/// Turns an early child exit into a [`PluginError`] that distinguishes
/// privilege-drop and validation failures from a plain exec failure, using
/// the stage-specific exit codes `establish_mount_child` reports through.
/// Any other exit code, or termination by signal, is reported as an exec
/// failure — the daemon never got far enough to say more precisely why.
fn classify_child_exit(spec: &ResolvedMount, user: JobUser, status: WaitStatus) -> PluginError {
    match status {
        WaitStatus::Exited(_, CHILD_EXIT_PRIVILEGE_DROP_FAILED) => PluginError::Privilege {
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            source: anyhow::anyhow!("mount child exited while dropping privileges"),
        },
        WaitStatus::Exited(_, CHILD_EXIT_VALIDATION_FAILED) => {
            PluginError::Validation(ValidationError::Stat {
                path: spec.mount_point.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "mount target validation failed in mount child",
                ),
            })
        }
        other => PluginError::Exec {
            mount_point: spec.mount_point.clone(),
            source: anyhow::anyhow!("daemon exited before mount became ready: {other:?}"),
        },
    }
}

/// Tears every entry in `table` down in reverse insertion order.
/// Best-effort throughout — a failure at one stage for one entry does not
/// stop teardown of the remaining entries.
pub fn teardown_all(table: &mut SessionMountTable) {
    for entry in table.drain_reverse() {
        // Graceful unmount first, so a well-behaved daemon gets to exit
        // cleanly before we resort to killing it.
        mount::fusermount_unmount(&entry.mount_point);

        if entry.daemon_pid.as_raw() > 0 {
            if let Err(e) = process::kill_and_reap(entry.daemon_pid) {
                error!(
                    "Failed to kill daemon pid {} for '{}': {e:#}",
                    entry.daemon_pid,
                    entry.mount_point.display()
                );
            }
        }

        // If the graceful unmount didn't take, fall back to a lazy
        // unmount so a hung FUSE endpoint doesn't linger across steps.
        match mountpoint::check_is_mountpoint(&entry.mount_point) {
            Ok(true) => {
                if let Err(e) = mount::lazy_umount(&entry.mount_point) {
                    error!(
                        "Lazy unmount fallback failed for '{}': {e:#}",
                        entry.mount_point.display()
                    );
                }
            }
            Ok(false) => {}
            Err(e) => error!(
                "Failed to probe '{}' before lazy-unmount fallback: {e:#}",
                entry.mount_point.display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_all_empties_a_table_with_no_real_mounts() {
        // No actual daemon_pid > 0 entries, so steps 1-3 are no-ops that
        // fail fast (fusermount/umount on a non-mount is harmless-but-logged).
        let mut table = SessionMountTable::new();
        table.record(
            std::path::PathBuf::from("/does/not/exist"),
            nix::unistd::Pid::from_raw(-1),
        );
        teardown_all(&mut table);
        assert!(table.is_empty());
    }
}
