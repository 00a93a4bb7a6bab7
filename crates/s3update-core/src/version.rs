use std::fmt;
use std::num::NonZeroU64;

use crate::error::UpdateError;

/// Monotonically increasing build number. Zero is never a valid version.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionIdentifier(NonZeroU64);

impl VersionIdentifier {
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<u64>().ok().and_then(Self::new)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VersionComparison {
    UpToDate,
    Outdated,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VersionCheck {
    pub local: VersionIdentifier,
    pub remote: VersionIdentifier,
    pub comparison: VersionComparison,
}

impl VersionCheck {
    pub fn new(local: VersionIdentifier, remote: VersionIdentifier) -> Self {
        Self {
            local,
            remote,
            comparison: compare_versions(local, remote),
        }
    }

    pub fn is_outdated(&self) -> bool {
        self.comparison == VersionComparison::Outdated
    }
}

pub fn parse_local_version(raw: &str) -> Result<VersionIdentifier, UpdateError> {
    VersionIdentifier::parse(raw).ok_or_else(|| UpdateError::InvalidLocalVersion {
        value: raw.to_string(),
    })
}

pub fn parse_remote_version(raw: &str) -> Result<VersionIdentifier, UpdateError> {
    VersionIdentifier::parse(raw).ok_or_else(|| UpdateError::InvalidRemoteVersion {
        value: raw.trim().to_string(),
    })
}

/// Strictly newer remote builds are the only ones installed; an older remote
/// is treated the same as an equal one.
pub fn compare_versions(local: VersionIdentifier, remote: VersionIdentifier) -> VersionComparison {
    if remote > local {
        VersionComparison::Outdated
    } else {
        VersionComparison::UpToDate
    }
}
