//! Path Resolver: turns a parsed [`MountSpec`] into an absolute mount point,
//! relative to a caller-supplied current directory.

use std::path::{Path, PathBuf};

use crate::error::ResolveError;
use crate::spec::MountSpec;

/// A [`MountSpec`] whose `mount_point` has been made absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMount {
    pub bucket: Option<String>,
    pub mount_point: PathBuf,
    pub flags: Option<String>,
}

impl ResolvedMount {
    /// Resolve `token` against `cwd`. Relative mount points are joined onto
    /// `cwd` and lexically normalized (no symlink resolution — the
    /// mountpoint need not exist yet). Already-absolute mount points pass
    /// through unchanged.
    pub fn resolve(token: &str, cwd: &Path) -> Result<Self, ResolveError> {
        let spec = MountSpec::parse(token)?;
        Ok(Self::from_spec(spec, cwd))
    }

    /// Same as [`Self::resolve`] but against an already-parsed spec, for
    /// callers that parsed once and want to resolve many times (or with a
    /// different `cwd`, e.g. in tests).
    pub fn from_spec(spec: MountSpec, cwd: &Path) -> Self {
        let mount_point = normalize(&if Path::new(&spec.mount_point).is_absolute() {
            PathBuf::from(&spec.mount_point)
        } else {
            cwd.join(&spec.mount_point)
        });

        ResolvedMount {
            bucket: spec.bucket,
            mount_point,
            flags: spec.flags,
        }
    }

    /// Resolve against `std::env::current_dir()`.
    pub fn resolve_cwd(token: &str) -> Result<Self, ResolveError> {
        let cwd = std::env::current_dir().map_err(ResolveError::Cwd)?;
        Self::resolve(token, &cwd)
    }

    /// Whitespace-split view of `flags`, for building a daemon argv.
    pub fn flag_args(&self) -> Vec<&str> {
        self.flags
            .as_deref()
            .map(|f| f.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Collapse `.` and `..` components lexically, without touching the
/// filesystem. A leading `..` past the root is dropped rather than climbing
/// above `/`, matching how most mount-point consumers expect an absolute
/// path to behave.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(out.components().next_back(), Some(Component::RootDir) | None) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
