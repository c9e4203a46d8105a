//! GCS FUSE mount plug-in: the execution-facing half of the system. Wires
//! together the pure logic in `gcsfuse-mount-core` with the OS-facing
//! primitives in `osutils` behind the four-callback surface the host
//! scheduler drives, and exposes that surface both as a plain Rust
//! API (`callbacks::Plugin`) and as a C ABI (`ffi`).

pub mod callbacks;
pub mod constants;
pub mod error;
pub mod executor;
pub mod ffi;
pub mod session;

pub use callbacks::Plugin;
pub use error::PluginError;
