// ── Parameter path helpers ──
//
// Paths are dot-separated (`Device.WiFi.Radio.1.Channel`). Collection
// patterns end in `.*` and match direct numeric children only.

use crate::error::Error;

/// Strip the `.*` suffix from an instance pattern.
pub fn pattern_base(pattern: &str) -> Result<&str, Error> {
    match pattern.strip_suffix(".*") {
        Some(base) if !base.is_empty() => Ok(base),
        _ => Err(Error::InvalidPath {
            path: pattern.to_owned(),
            reason: "instance pattern must end in '.*'".into(),
        }),
    }
}

/// Trailing numeric segment of an instance path (`...WLANConfiguration.3` → 3).
pub fn instance_index(path: &str) -> Option<u32> {
    path.rsplit('.').next().and_then(|seg| seg.parse().ok())
}

/// If `path` lives under a direct numeric child of `base`, return that index.
///
/// `child_index("A.B", "A.B.2.X")` is `Some(2)`; `child_index("A.B", "A.BC.2")`
/// is `None`.
pub fn child_index(base: &str, path: &str) -> Option<u32> {
    let rest = path.strip_prefix(base)?.strip_prefix('.')?;
    rest.split('.').next().and_then(|seg| seg.parse().ok())
}

/// Whether `path` is `object` itself or anything beneath it.
pub fn is_within(object: &str, path: &str) -> bool {
    path == object
        || path
            .strip_prefix(object)
            .is_some_and(|rest| rest.starts_with('.'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pattern_base_requires_wildcard() {
        assert_eq!(
            pattern_base("Device.WiFi.Radio.*").unwrap(),
            "Device.WiFi.Radio"
        );
        assert!(pattern_base("Device.WiFi.Radio").is_err());
        assert!(pattern_base(".*").is_err());
    }

    #[test]
    fn instance_index_reads_last_segment() {
        assert_eq!(
            instance_index("InternetGatewayDevice.LANDevice.1.WLANConfiguration.5"),
            Some(5)
        );
        assert_eq!(instance_index("Device.WiFi.Radio"), None);
    }

    #[test]
    fn child_index_respects_segment_boundaries() {
        assert_eq!(child_index("A.B", "A.B.2.X"), Some(2));
        assert_eq!(child_index("A.B", "A.B.10"), Some(10));
        assert_eq!(child_index("A.B", "A.BC.2"), None);
        assert_eq!(child_index("A.B", "A.B.X.2"), None);
    }

    #[test]
    fn is_within_matches_prefix_objects() {
        assert!(is_within("A.B", "A.B"));
        assert!(is_within("A.B", "A.B.C"));
        assert!(!is_within("A.B", "A.BC"));
    }
}
