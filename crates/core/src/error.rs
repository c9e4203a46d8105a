//! Typed errors for the pure, submission-side components.
//!
//! Mirrors the teacher's split between narrow `thiserror` enums per
//! concern (`trident_api::error`) and a contextual `anyhow::Error` kept one
//! layer up at the OS-facing boundary (`osutils`/`gcsfuse-mount-plugin`).

use std::io;

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
#[error("invalid mount spec token '{token}': {reason}")]
pub struct ParseError {
    pub token: String,
    pub reason: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to determine current working directory")]
    Cwd(#[source] io::Error),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
#[error(
    "mount point '{mount_point}' already claimed by bucket {existing:?}, cannot rebind to {incoming:?}"
)]
pub struct ConflictError {
    pub mount_point: String,
    pub existing: Option<String>,
    pub incoming: Option<String>,
}
