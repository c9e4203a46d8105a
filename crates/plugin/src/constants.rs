//! Fixed knobs for the execution-side components. Mirrors
//! `trident_api::constants` and `gcsfuse_mount_core::constants`.

use std::time::Duration;

/// Retry budget for mount-readiness polling: 60 attempts, 500 ms apart,
/// for a 30 s ceiling on how long a mount is given to come up.
pub const MOUNT_WAIT_RETRIES: u32 = 60;
pub const MOUNT_WAIT_SLEEP: Duration = Duration::from_millis(500);

/// The object-storage FUSE daemon binary, resolved via `PATH`.
pub const GCSFUSE_BIN: &str = "gcsfuse";

/// Tag applied to daemon stdio forwarded through `logger`.
pub const SYSLOG_TAG: &str = "gcsfuse_mount";
