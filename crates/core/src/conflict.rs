//! Conflict Detector: rejects a batch of resolved mounts that would bind two
//! different buckets onto the same mount point.
//!
//! Two mounts conflict only if they share a `mount_point` AND their
//! `bucket`s differ. Two specs for the same bucket at the same mount point
//! are a harmless duplicate, not a conflict (idempotent resubmission).

use crate::error::ConflictError;
use crate::resolver::ResolvedMount;

/// Check `incoming` against every mount already present in `existing`.
/// Returns the first conflict found, in `existing`'s order.
pub fn check_one<'a>(
    existing: impl IntoIterator<Item = &'a ResolvedMount>,
    incoming: &ResolvedMount,
) -> Result<(), ConflictError> {
    for other in existing {
        if other.mount_point == incoming.mount_point && other.bucket != incoming.bucket {
            return Err(ConflictError {
                mount_point: incoming.mount_point.display().to_string(),
                existing: other.bucket.clone(),
                incoming: incoming.bucket.clone(),
            });
        }
    }
    Ok(())
}

/// Check an entire batch pairwise, returning every conflict found (not just
/// the first), in the order their second member appears in `mounts`.
pub fn check_all(mounts: &[ResolvedMount]) -> Vec<ConflictError> {
    let mut conflicts = Vec::new();
    for (i, incoming) in mounts.iter().enumerate() {
        if let Err(e) = check_one(&mounts[..i], incoming) {
            conflicts.push(e);
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn mount(bucket: Option<&str>, mp: &str) -> ResolvedMount {
        ResolvedMount {
            bucket: bucket.map(str::to_string),
            mount_point: PathBuf::from(mp),
            flags: None,
        }
    }

    #[test]
    fn disjoint_mount_points_never_conflict() {
        let existing = vec![mount(Some("a"), "/mnt/a"), mount(Some("b"), "/mnt/b")];
        let incoming = mount(Some("c"), "/mnt/c");
        assert!(check_one(&existing, &incoming).is_ok());
    }

    #[test]
    fn same_bucket_same_mount_point_is_not_a_conflict() {
        let existing = vec![mount(Some("a"), "/mnt/a")];
        let incoming = mount(Some("a"), "/mnt/a");
        assert!(check_one(&existing, &incoming).is_ok());
    }

    #[test]
    fn different_bucket_same_mount_point_conflicts() {
        let existing = vec![mount(Some("a"), "/mnt/shared")];
        let incoming = mount(Some("b"), "/mnt/shared");
        let err = check_one(&existing, &incoming).unwrap_err();
        assert_eq!(err.mount_point, "/mnt/shared");
        assert_eq!(err.existing.as_deref(), Some("a"));
        assert_eq!(err.incoming.as_deref(), Some("b"));
    }

    #[test]
    fn implicit_all_buckets_conflicts_with_any_explicit_bucket() {
        let existing = vec![mount(None, "/mnt/shared")];
        let incoming = mount(Some("a"), "/mnt/shared");
        assert!(check_one(&existing, &incoming).is_err());
    }

    #[test]
    fn explicit_empty_bucket_is_distinct_from_implicit_none() {
        // Some("") (explicit all-buckets) and None (implicit all-buckets)
        // compare unequal, so this is flagged — a deliberate sharp edge:
        // the two spellings of "all buckets" are not unified by the
        // conflict detector, only by the parser's own canonicalization
        // at submission time.
        let existing = vec![mount(None, "/mnt/shared")];
        let incoming = mount(Some(""), "/mnt/shared");
        assert!(check_one(&existing, &incoming).is_err());
    }

    #[test]
    fn check_all_is_reflexive_and_symmetric_within_a_batch() {
        let mounts = vec![
            mount(Some("a"), "/mnt/shared"),
            mount(Some("b"), "/mnt/shared"),
            mount(Some("c"), "/mnt/other"),
        ];
        let conflicts = check_all(&mounts);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].existing.as_deref(), Some("a"));
        assert_eq!(conflicts[0].incoming.as_deref(), Some("b"));
    }

    #[test]
    fn check_all_on_conflict_free_batch_is_empty() {
        let mounts = vec![
            mount(Some("a"), "/mnt/a"),
            mount(Some("a"), "/mnt/a"),
            mount(Some("b"), "/mnt/b"),
        ];
        assert!(check_all(&mounts).is_empty());
    }
}
