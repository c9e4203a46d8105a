//! Mount-Spec Parser: turns a single `[BUCKET:]PATH[:FLAGS]` token into a
//! structured [`MountSpec`].
//!
//! Disambiguation, in order:
//!   1. No colon at all                     -> Case D
//!   2. First segment (before first colon) is empty -> Case B
//!   3. First segment contains `/`          -> Case A (path wins over bucket)
//!   4. Otherwise                           -> Case C

use crate::error::ParseError;

/// A parsed `(bucket, mount_point, flags)` triple.
///
/// `bucket`:
///   * `None`      — implicit "all buckets" (token had no bucket field).
///   * `Some("")`  — explicit "all buckets" (token had an empty bucket field).
///   * `Some(b)`   — explicit bucket `b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub bucket: Option<String>,
    pub mount_point: String,
    pub flags: Option<String>,
}

impl MountSpec {
    /// Parse a single token per the disambiguation table. Pure: no
    /// allocation survives a failure path (the `Result::Err` carries only
    /// the rejected token, which the caller already owned).
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        let fail = |reason: &'static str| ParseError {
            token: token.to_string(),
            reason,
        };

        let Some(first_colon) = token.find(':') else {
            // Case D: no colon at all.
            if token.is_empty() {
                return Err(fail("empty token"));
            }
            return Ok(MountSpec {
                bucket: None,
                mount_point: token.to_string(),
                flags: None,
            });
        };

        let segment1 = &token[..first_colon];
        let rest1 = &token[first_colon + 1..];

        if segment1.is_empty() {
            // Case B: explicit all-buckets.
            let (mount_point, flags) = split_once_colon(rest1);
            if mount_point.is_empty() {
                return Err(fail("empty mount point"));
            }
            return Ok(MountSpec {
                bucket: Some(String::new()),
                mount_point: mount_point.to_string(),
                flags: flags.map(str::to_string),
            });
        }

        if segment1.contains('/') {
            // Case A: first segment is a path, not a bucket name. The
            // remainder of the token (not split further) is flags.
            if rest1.is_empty() {
                return Ok(MountSpec {
                    bucket: None,
                    mount_point: segment1.to_string(),
                    flags: None,
                });
            }
            return Ok(MountSpec {
                bucket: None,
                mount_point: segment1.to_string(),
                flags: Some(rest1.to_string()),
            });
        }

        // Case C: explicit bucket.
        let (mount_point, flags) = split_once_colon(rest1);
        if mount_point.is_empty() {
            return Err(fail("empty mount point"));
        }
        Ok(MountSpec {
            bucket: Some(segment1.to_string()),
            mount_point: mount_point.to_string(),
            flags: flags.map(str::to_string),
        })
    }

    /// Serialize back to token form. Round-trips for any spec produced by
    /// [`MountSpec::parse`], modulo the `None` vs. `Some("")` bucket
    /// distinction already being canonical at parse time.
    pub fn to_token(&self) -> String {
        match (&self.bucket, &self.flags) {
            (None, None) => self.mount_point.clone(),
            (None, Some(flags)) => format!("{}:{}", self.mount_point, flags),
            (Some(bucket), None) => format!("{}:{}", bucket, self.mount_point),
            (Some(bucket), Some(flags)) => {
                format!("{}:{}:{}", bucket, self.mount_point, flags)
            }
        }
    }

    /// Whitespace-split view of `flags`, for building a daemon argv.
    pub fn flag_args(&self) -> Vec<&str> {
        self.flags
            .as_deref()
            .map(|f| f.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Split `s` on its first colon, if any.
fn split_once_colon(s: &str) -> (&str, Option<&str>) {
    match s.find(':') {
        Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
        None => (s, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_d_no_colon() {
        let spec = MountSpec::parse("mp").unwrap();
        assert_eq!(
            spec,
            MountSpec {
                bucket: None,
                mount_point: "mp".into(),
                flags: None,
            }
        );
    }

    #[test]
    fn case_b_explicit_all_buckets() {
        let spec = MountSpec::parse(":mp").unwrap();
        assert_eq!(spec.bucket, Some(String::new()));
        assert_eq!(spec.mount_point, "mp");
        assert_eq!(spec.flags, None);
    }

    #[test]
    fn case_b_with_flags() {
        let spec = MountSpec::parse(":/mp:-o ro").unwrap();
        assert_eq!(spec.bucket, Some(String::new()));
        assert_eq!(spec.mount_point, "/mp");
        assert_eq!(spec.flags.as_deref(), Some("-o ro"));
    }

    #[test]
    fn case_a_path_wins_over_bucket() {
        // First segment contains '/', so it's a path: mount_point absorbs
        // the whole first segment, and everything past the first colon is
        // flags verbatim (not re-split on ':').
        let spec = MountSpec::parse("a/b:/m").unwrap();
        assert_eq!(spec.bucket, None);
        assert_eq!(spec.mount_point, "a/b");
        assert_eq!(spec.flags.as_deref(), Some("/m"));
    }

    #[test]
    fn case_a_absolute_path_no_flags() {
        let spec = MountSpec::parse("/mnt/data").unwrap();
        assert_eq!(spec.bucket, None);
        assert_eq!(spec.mount_point, "/mnt/data");
        assert_eq!(spec.flags, None);
    }

    #[test]
    fn case_a_absolute_path_with_flags_has_leading_colon() {
        let spec = MountSpec::parse("/mnt/data:-o ro").unwrap();
        assert_eq!(spec.bucket, None);
        assert_eq!(spec.mount_point, "/mnt/data");
        assert_eq!(spec.flags.as_deref(), Some("-o ro"));
    }

    #[test]
    fn case_c_explicit_bucket() {
        let spec = MountSpec::parse("data:/mnt/data").unwrap();
        assert_eq!(spec.bucket.as_deref(), Some("data"));
        assert_eq!(spec.mount_point, "/mnt/data");
        assert_eq!(spec.flags, None);
    }

    #[test]
    fn case_c_explicit_bucket_with_flags() {
        let spec = MountSpec::parse("a:/p:-o ro --implicit-dirs").unwrap();
        assert_eq!(spec.bucket.as_deref(), Some("a"));
        assert_eq!(spec.mount_point, "/p");
        assert_eq!(spec.flags.as_deref(), Some("-o ro --implicit-dirs"));
        assert_eq!(spec.flag_args(), vec!["-o", "ro", "--implicit-dirs"]);
    }

    #[test]
    fn empty_mount_point_is_a_parse_failure() {
        assert!(MountSpec::parse("").is_err());
        assert!(MountSpec::parse(":").is_err());
        assert!(MountSpec::parse("bucket:").is_err());
    }

    #[test]
    fn round_trip_preserves_token_for_parsed_specs() {
        for token in [
            "mp",
            ":mp",
            ":/mp:-o ro",
            "a/b:/m",
            "/mnt/data",
            "/mnt/data:-o ro",
            "data:/mnt/data",
            "a:/p:-o ro --implicit-dirs",
        ] {
            let spec = MountSpec::parse(token).unwrap();
            assert_eq!(spec.to_token(), token, "round trip failed for {token:?}");
        }
    }

    #[test]
    fn flags_whitespace_is_preserved_verbatim() {
        let spec = MountSpec::parse("b:/m:  -o  ro   --foo").unwrap();
        assert_eq!(spec.flags.as_deref(), Some("  -o  ro   --foo"));
    }
}
