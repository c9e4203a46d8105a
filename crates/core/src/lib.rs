//! Pure, submission-side logic for the GCS FUSE mount plug-in: token
//! parsing, path resolution, and conflict detection. No filesystem or
//! process interaction lives here — see the `osutils` crate for that.

pub mod conflict;
pub mod constants;
pub mod error;
pub mod resolver;
pub mod spec;

pub use conflict::{check_all, check_one};
pub use resolver::ResolvedMount;
pub use spec::MountSpec;
