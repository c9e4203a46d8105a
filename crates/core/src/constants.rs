//! Fixed knobs shared by every component. Mirrors `trident_api::constants`.

/// Environment variable carrying the semicolon-delimited mount list between
/// the submission-side option callback and the execution-side `UserInit`.
pub const GCSFUSE_MOUNTS_ENV: &str = "GCSFUSE_MOUNTS";

/// Separator joining serialized Mount Specs inside the accumulator.
pub const MOUNT_LIST_SEPARATOR: char = ';';
