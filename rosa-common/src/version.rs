//! OpenShift version helpers
//!
//! Versions coming from the service are either full (`4.12.3`) or
//! minor-only (`4.12`, used for policy versions). Both are normalized to
//! semver before comparison.

use crate::{Error, Result};
use semver::Version;

/// Parse a raw OpenShift version, padding missing minor/patch components
pub fn parse(raw: &str) -> Result<Version> {
    let trimmed = raw.trim().trim_start_matches("openshift-v");
    let core = trimmed.split(['-', '+']).next().unwrap_or_default();
    let padded = match core.split('.').count() {
        1 => format!("{}.0.0", core),
        2 => format!("{}.0", core),
        _ => core.to_string(),
    };

    Version::parse(&padded).map_err(|e| Error::InvalidVersion {
        version: raw.to_string(),
        reason: e.to_string(),
    })
}

/// `4.12.3` -> `4.12`
pub fn major_minor(raw: &str) -> Result<String> {
    let v = parse(raw)?;
    Ok(format!("{}.{}", v.major, v.minor))
}

/// True when `version` is the same or newer than `minimum` (major.minor.patch)
pub fn is_at_least(version: &str, minimum: &str) -> Result<bool> {
    Ok(parse(version)? >= parse(minimum)?)
}

/// True when a policy tagged with `current` must be upgraded to `target`.
///
/// Only major.minor is compared: policies are versioned per minor release.
pub fn is_policy_outdated(current: &str, target: &str) -> Result<bool> {
    let current = parse(current)?;
    let target = parse(target)?;
    Ok((current.major, current.minor) < (target.major, target.minor))
}
