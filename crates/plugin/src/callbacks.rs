//! Host-scheduler callback surface: `Init`, `OptionCallback`,
//! `UserInit`, `Exit`. Exposed here as plain methods on a `Plugin` type so
//! they can be unit tested without an FFI boundary; see `ffi` for the thin
//! `extern "C"` shim the real host calls through.

use std::path::{Path, PathBuf};

use log::error;

use gcsfuse_mount_core::conflict;
use gcsfuse_mount_core::constants::{GCSFUSE_MOUNTS_ENV, MOUNT_LIST_SEPARATOR};
use gcsfuse_mount_core::resolver::ResolvedMount;
use gcsfuse_mount_core::spec::MountSpec;

use crate::error::PluginError;
use crate::executor::{self, JobUser};
use crate::session::SessionMountTable;

/// Submission-side state: the resolved, conflict-checked mount list built
/// up across repeated `OptionCallback` invocations for one step.
#[derive(Debug, Default)]
pub struct SubmissionState {
    accumulator: String,
}

impl SubmissionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds from the current `GCSFUSE_MOUNTS`, e.g. when a submission
    /// context is entered mid-accumulation.
    pub fn from_env() -> Self {
        Self {
            accumulator: std::env::var(GCSFUSE_MOUNTS_ENV).unwrap_or_default(),
        }
    }

    pub fn accumulator(&self) -> &str {
        &self.accumulator
    }

    fn resolved_entries(&self) -> Result<Vec<ResolvedMount>, PluginError> {
        self.accumulator
            .split(MOUNT_LIST_SEPARATOR)
            .filter(|t| !t.is_empty())
            .map(|token| ResolvedMount::resolve_cwd(token).map_err(PluginError::from))
            .collect()
    }

    /// Handles one `--gcsfuse-mount=ARG` occurrence. `arg` may itself carry
    /// several `;`-delimited specs. Every token is resolved against `cwd`
    /// (or the process working directory if `cwd` is `None`), checked for
    /// conflicts against the accumulator plus anything already accepted
    /// from this same `arg`, and appended on success. A conflict anywhere
    /// in `arg` rejects the whole occurrence — nothing is appended.
    pub fn option_callback(
        &mut self,
        arg: &str,
        cwd: Option<&Path>,
    ) -> Result<(), PluginError> {
        let existing = self.resolved_entries()?;
        let mut incoming = Vec::new();

        for token in arg.split(MOUNT_LIST_SEPARATOR) {
            if token.is_empty() {
                continue;
            }
            let resolved = match cwd {
                Some(cwd) => ResolvedMount::resolve(token, cwd)?,
                None => ResolvedMount::resolve_cwd(token)?,
            };
            conflict::check_one(existing.iter().chain(incoming.iter()), &resolved)?;
            incoming.push(resolved);
        }

        for resolved in &incoming {
            if !self.accumulator.is_empty() {
                self.accumulator.push(MOUNT_LIST_SEPARATOR);
            }
            self.accumulator.push_str(&to_token(resolved));
        }
        Ok(())
    }

    /// Publishes the accumulator to the environment, for propagation to
    /// the execution node by the host scheduler.
    pub fn write_env(&self) {
        std::env::set_var(GCSFUSE_MOUNTS_ENV, &self.accumulator);
    }
}

fn to_token(resolved: &ResolvedMount) -> String {
    MountSpec {
        bucket: resolved.bucket.clone(),
        mount_point: resolved.mount_point.display().to_string(),
        flags: resolved.flags.clone(),
    }
    .to_token()
}

/// Execution-side state: the job identity mounts run as, and the Session
/// Mount Table recording what this step's `UserInit` actually established.
#[derive(Debug)]
pub struct ExecutionContext {
    user: JobUser,
    table: SessionMountTable,
}

impl ExecutionContext {
    pub fn new(user: JobUser) -> Self {
        Self {
            user,
            table: SessionMountTable::new(),
        }
    }

    pub fn session_table(&self) -> &SessionMountTable {
        &self.table
    }

    /// Consumes `GCSFUSE_MOUNTS`, establishing one mount per token in
    /// order. A malformed token is logged and skipped; any other
    /// per-mount failure is logged and the remaining tokens are still
    /// attempted, but the callback as a whole returns the first error
    /// encountered.
    pub fn user_init(&mut self) -> Result<(), PluginError> {
        let accumulator = std::env::var(GCSFUSE_MOUNTS_ENV).unwrap_or_default();
        let mut first_error = None;

        for token in accumulator.split(MOUNT_LIST_SEPARATOR) {
            if token.is_empty() {
                continue;
            }
            let spec = match MountSpec::parse(token) {
                Ok(spec) => spec,
                Err(e) => {
                    error!("Skipping malformed mount token '{token}': {e}");
                    continue;
                }
            };
            let resolved = ResolvedMount {
                bucket: spec.bucket,
                mount_point: PathBuf::from(spec.mount_point),
                flags: spec.flags,
            };

            if let Err(e) = executor::establish_mount(&resolved, self.user, &mut self.table) {
                error!(
                    "Failed to establish mount '{}': {e:#}",
                    resolved.mount_point.display()
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Tears down every mount this context established, best-effort.
    pub fn exit(&mut self) {
        executor::teardown_all(&mut self.table);
    }
}

/// Either role the host may put this plug-in instance into for a step.
/// `Init` picks the role; `OptionCallback` only does anything in
/// `Submission`, `UserInit`/`Exit` only in `Execution`.
#[derive(Debug)]
pub enum Plugin {
    Submission(SubmissionState),
    Execution(ExecutionContext),
}

impl Plugin {
    pub fn init_submission() -> Self {
        Plugin::Submission(SubmissionState::from_env())
    }

    pub fn init_execution(user: JobUser) -> Self {
        Plugin::Execution(ExecutionContext::new(user))
    }

    pub fn option_callback(&mut self, arg: &str) -> Result<(), PluginError> {
        match self {
            Plugin::Submission(state) => {
                state.option_callback(arg, None)?;
                state.write_env();
                Ok(())
            }
            Plugin::Execution(_) => Ok(()),
        }
    }

    pub fn user_init(&mut self) -> Result<(), PluginError> {
        match self {
            Plugin::Execution(ctx) => ctx.user_init(),
            Plugin::Submission(_) => Ok(()),
        }
    }

    pub fn exit(&mut self) {
        if let Plugin::Execution(ctx) = self {
            ctx.exit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcsfuse_mount_core::error::ResolveError;

    #[test]
    fn option_callback_resolves_relative_and_writes_accumulator() {
        let mut state = SubmissionState::new();
        state
            .option_callback("data:rel/mp", Some(Path::new("/home/u")))
            .unwrap();
        assert_eq!(state.accumulator(), "data:/home/u/rel/mp");
    }

    #[test]
    fn option_callback_accumulates_across_calls() {
        let mut state = SubmissionState::new();
        state
            .option_callback("a:/mnt/a", Some(Path::new("/home/u")))
            .unwrap();
        state
            .option_callback("b:/mnt/b", Some(Path::new("/home/u")))
            .unwrap();
        assert_eq!(state.accumulator(), "a:/mnt/a;b:/mnt/b");
    }

    #[test]
    fn option_callback_rejects_conflicting_bucket_at_same_mount_point() {
        let mut state = SubmissionState::new();
        state
            .option_callback("b1:/m", Some(Path::new("/home/u")))
            .unwrap();
        let err = state
            .option_callback("b2:/m", Some(Path::new("/home/u")))
            .unwrap_err();
        assert!(matches!(err, PluginError::Conflict(_)));
        // Rejected occurrence must not have been appended.
        assert_eq!(state.accumulator(), "b1:/m");
    }

    #[test]
    fn option_callback_allows_idempotent_re_addition() {
        let mut state = SubmissionState::new();
        state
            .option_callback("a:/mnt/a", Some(Path::new("/home/u")))
            .unwrap();
        state
            .option_callback("a:/mnt/a", Some(Path::new("/home/u")))
            .unwrap();
        assert_eq!(state.accumulator(), "a:/mnt/a;a:/mnt/a");
    }

    #[test]
    fn option_callback_with_empty_arg_is_a_no_op() {
        let mut state = SubmissionState::new();
        let err = state.option_callback("", Some(Path::new("/home/u")));
        // An empty arg splits into one empty token, which is skipped, not
        // parsed — so this succeeds with no change.
        assert!(err.is_ok());
        assert_eq!(state.accumulator(), "");
    }

    #[test]
    fn option_callback_propagates_parse_failure() {
        let mut state = SubmissionState::new();
        let err = state
            .option_callback("bucket:", Some(Path::new("/home/u")))
            .unwrap_err();
        assert!(matches!(
            err,
            PluginError::Resolve(ResolveError::Parse(_))
        ));
        assert_eq!(state.accumulator(), "");
    }

    #[test]
    fn submission_role_ignores_user_init_and_exit() {
        let mut plugin = Plugin::Submission(SubmissionState::new());
        assert!(plugin.user_init().is_ok());
        plugin.exit();
    }
}
