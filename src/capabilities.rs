//! Host capability flags, computed once when the host announces itself.
//!
//! Version-conditional behavior lives here instead of being probed at each
//! call site: `Addon::included` resolves the host's reported framework
//! version into a flat set of flags that the rest of the build consults.

/// Hosts older than this need the legacy application shim tree merged into
/// their app tree.
const LEGACY_SHIM_CUTOFF: (u64, u64) = (2, 10);

/// Capability flags derived from the host framework version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Host predates the built-in manual-boot support and needs the
    /// compatibility app tree.
    pub needs_legacy_app_shim: bool,
}

impl HostCapabilities {
    /// Resolve capabilities from a version string such as `"2.11.3"` or
    /// `"2.10.0-alpha.1"`. Unparseable versions are treated as current
    /// (no shims): an unknown host is assumed to be newer than the cutoffs.
    pub fn from_host_version(version: &str) -> Self {
        let needs_legacy_app_shim = match parse_major_minor(version) {
            Some((major, minor)) => (major, minor) < LEGACY_SHIM_CUTOFF,
            None => false,
        };
        Self {
            needs_legacy_app_shim,
        }
    }
}

fn parse_major_minor(version: &str) -> Option<(u64, u64)> {
    // Prerelease/build suffixes don't affect the major.minor comparison.
    let core = version
        .split(|c| c == '-' || c == '+')
        .next()
        .unwrap_or(version);
    let mut parts = core.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_old_host_needs_shim() {
        let caps = HostCapabilities::from_host_version("2.9.1");
        assert!(caps.needs_legacy_app_shim);
    }

    #[test]
    fn test_cutoff_host_does_not_need_shim() {
        let caps = HostCapabilities::from_host_version("2.10.0");
        assert!(!caps.needs_legacy_app_shim);
    }

    #[test]
    fn test_prerelease_suffix_ignored_for_comparison() {
        let caps = HostCapabilities::from_host_version("2.10.0-alpha.1");
        assert!(!caps.needs_legacy_app_shim);
        let caps = HostCapabilities::from_host_version("2.9.0-beta.2");
        assert!(caps.needs_legacy_app_shim);
    }

    #[test]
    fn test_newer_major_does_not_need_shim() {
        let caps = HostCapabilities::from_host_version("3.0.0");
        assert!(!caps.needs_legacy_app_shim);
    }

    #[test]
    fn test_unparseable_version_assumed_current() {
        let caps = HostCapabilities::from_host_version("canary");
        assert!(!caps.needs_legacy_app_shim);
    }
}
