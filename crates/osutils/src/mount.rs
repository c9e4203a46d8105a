use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Error};
use log::{error, warn};

use crate::errors::ValidationError;
use crate::exe::RunAndCheck;
use crate::files;

const MOUNT_DIR_MODE: u32 = 0o755;

/// Validates (or creates) a mount target directory from the job user's
/// point of view, per the establishment protocol's directory-validation
/// step.
///
/// - Exists: must be a directory, owned by `uid`, empty, and writable.
/// - Absent: created with mode `0755`.
/// - Any other `stat` failure is fatal.
pub fn validate_mount_target(path: &Path, uid: u32) -> Result<(), ValidationError> {
    match fs::metadata(path) {
        Ok(meta) => {
            if !meta.is_dir() {
                return Err(ValidationError::NotADirectory(path.to_path_buf()));
            }
            if meta.uid() != uid {
                return Err(ValidationError::WrongOwner {
                    path: path.to_path_buf(),
                    owner: meta.uid(),
                    expected: uid,
                });
            }
            let mut entries = fs::read_dir(path).map_err(|source| ValidationError::Stat {
                path: path.to_path_buf(),
                source,
            })?;
            if entries.next().is_some() {
                return Err(ValidationError::NotEmpty(path.to_path_buf()));
            }
            if meta.permissions().mode() & 0o200 == 0 {
                return Err(ValidationError::NotWritable(path.to_path_buf()));
            }
            Ok(())
        }
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            files::create_dirs(path).map_err(|e| ValidationError::Stat {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })?;
            fs::set_permissions(path, fs::Permissions::from_mode(MOUNT_DIR_MODE)).map_err(
                |source| ValidationError::Stat {
                    path: path.to_path_buf(),
                    source,
                },
            )?;
            Ok(())
        }
        Err(source) => Err(ValidationError::Stat {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Graceful unmount via the user-space FUSE unmount tool (step 1 of
/// teardown). Logs and returns `Ok` rather than propagating, so teardown
/// proceeds to the SIGKILL and lazy-unmount steps regardless.
pub fn fusermount_unmount(mount_point: &Path) {
    let result = Command::new("fusermount")
        .arg("-u")
        .arg(mount_point)
        .run_and_check();

    if let Err(e) = result {
        warn!(
            "Graceful fusermount unmount of '{}' failed, continuing teardown: {:#}",
            mount_point.display(),
            e
        );
    }
}

/// Lazy unmount fallback (step 3 of teardown), used when the mountpoint is
/// still reported mounted after the daemon has been killed.
pub fn lazy_umount(mount_point: &Path) -> Result<(), Error> {
    Command::new("umount")
        .arg("-l")
        .arg(mount_point)
        .run_and_check()
        .context(format!(
            "Lazy unmount of '{}' failed",
            mount_point.display()
        ))
}

/// Best-effort log of a teardown step that failed but must not abort
/// cleanup of the remaining Session Mount Table entries.
pub fn log_teardown_failure(mount_point: &Path, stage: &str, e: &Error) {
    error!(
        "Teardown stage '{stage}' failed for '{}': {e:#}",
        mount_point.display()
    );
}
