//! Crate-level error aggregate, rolling up the parser, resolver, conflict
//! detector, and mount-target validation errors from the lower crates
//! alongside the fork/exec/timeout/unmount failures that only make sense
//! at the plug-in boundary.

use std::path::PathBuf;

use gcsfuse_mount_core::error::{ConflictError, ParseError, ResolveError};
use osutils::errors::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to drop privileges to uid={uid} gid={gid}")]
    Privilege {
        uid: u32,
        gid: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("fork failed while establishing mount at '{mount_point}'")]
    Fork {
        mount_point: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to exec daemon for mount at '{mount_point}'")]
    Exec {
        mount_point: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "mount at '{mount_point}' did not become ready within {retries} retries"
    )]
    MountTimeout { mount_point: PathBuf, retries: u32 },

    #[error("failed to unmount '{mount_point}'")]
    Unmount {
        mount_point: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O failure: {0}")]
    Io(#[source] anyhow::Error),
}
