//! Thin `extern "C"` shim over [`crate::callbacks::Plugin`].
//!
//! The host scheduler's plug-in ABI is not specified by this crate's
//! contract, so the shim sticks to primitive C types only (`c_int`,
//! `*const c_char`) and never exposes a Rust type across the boundary.
//! Exactly one process-wide [`Plugin`] lives behind a [`OnceLock`] +
//! [`Mutex`]; this relies on the host's documented invariant that it runs
//! exactly one step per process image, so there is never a second
//! `Init` to race against the first.

use std::ffi::{c_char, c_int, CStr};
use std::sync::{Mutex, OnceLock};

use log::error;
use nix::unistd::{Gid, Uid};

use crate::callbacks::Plugin;

static PLUGIN: OnceLock<Mutex<Plugin>> = OnceLock::new();

/// Return codes handed back across the FFI boundary.
const OK: c_int = 0;
const ERR_NOT_INITIALIZED: c_int = -1;
const ERR_ALREADY_INITIALIZED: c_int = -2;
const ERR_INVALID_ARG: c_int = -3;
const ERR_CALLBACK_FAILED: c_int = -4;

fn with_plugin<R>(f: impl FnOnce(&mut Plugin) -> R) -> Result<R, c_int> {
    let mutex = PLUGIN.get().ok_or(ERR_NOT_INITIALIZED)?;
    let mut guard = mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok(f(&mut guard))
}

/// # Safety
/// Must be called at most once per process image, before any of the other
/// `gcsfuse_mount_plugin_*` functions, per the host's one-step-per-process
/// contract.
#[no_mangle]
pub extern "C" fn gcsfuse_mount_plugin_init_submission() -> c_int {
    if PLUGIN.set(Mutex::new(Plugin::init_submission())).is_err() {
        return ERR_ALREADY_INITIALIZED;
    }
    OK
}

/// # Safety
/// Same one-shot contract as [`gcsfuse_mount_plugin_init_submission`].
#[no_mangle]
pub extern "C" fn gcsfuse_mount_plugin_init_execution(job_uid: u32, job_gid: u32) -> c_int {
    let user = crate::executor::JobUser {
        uid: Uid::from_raw(job_uid),
        gid: Gid::from_raw(job_gid),
    };
    if PLUGIN.set(Mutex::new(Plugin::init_execution(user))).is_err() {
        return ERR_ALREADY_INITIALIZED;
    }
    OK
}

/// # Safety
/// `arg` must be a valid, NUL-terminated C string pointer for the duration
/// of this call, or null.
#[no_mangle]
pub unsafe extern "C" fn gcsfuse_mount_plugin_option_callback(arg: *const c_char) -> c_int {
    if arg.is_null() {
        return ERR_INVALID_ARG;
    }
    let arg = match unsafe { CStr::from_ptr(arg) }.to_str() {
        Ok(s) => s,
        Err(_) => return ERR_INVALID_ARG,
    };

    let result = with_plugin(|plugin| plugin.option_callback(arg));
    match result {
        Ok(Ok(())) => OK,
        Ok(Err(e)) => {
            error!("option callback failed: {e:#}");
            ERR_CALLBACK_FAILED
        }
        Err(code) => code,
    }
}

#[no_mangle]
pub extern "C" fn gcsfuse_mount_plugin_user_init() -> c_int {
    let result = with_plugin(|plugin| plugin.user_init());
    match result {
        Ok(Ok(())) => OK,
        Ok(Err(e)) => {
            error!("user init failed: {e:#}");
            ERR_CALLBACK_FAILED
        }
        Err(code) => code,
    }
}

#[no_mangle]
pub extern "C" fn gcsfuse_mount_plugin_exit() -> c_int {
    match with_plugin(|plugin| plugin.exit()) {
        Ok(()) => OK,
        Err(code) => code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // PLUGIN is a process-wide OnceLock, so these run in a single test to
    // avoid racing other tests over init order.
    #[test]
    fn full_lifecycle_through_the_c_surface() {
        assert_eq!(gcsfuse_mount_plugin_init_execution(0, 0), OK);
        assert_eq!(
            gcsfuse_mount_plugin_init_execution(0, 0),
            ERR_ALREADY_INITIALIZED
        );

        let null_arg_rc = unsafe { gcsfuse_mount_plugin_option_callback(std::ptr::null()) };
        assert_eq!(null_arg_rc, ERR_INVALID_ARG);

        // No GCSFUSE_MOUNTS set in this process, so user_init is a no-op.
        assert_eq!(gcsfuse_mount_plugin_user_init(), OK);
        assert_eq!(gcsfuse_mount_plugin_exit(), OK);
    }
}
