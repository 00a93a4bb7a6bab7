use std::path::PathBuf;

use crate::version::VersionIdentifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The disable switch was set; nothing was read or written.
    Disabled,
    UpToDate {
        local: VersionIdentifier,
        remote: VersionIdentifier,
    },
    /// The new binary is installed on disk. The running image is still the old
    /// one until the process is restarted.
    Updated {
        previous: VersionIdentifier,
        installed: VersionIdentifier,
        executable: PathBuf,
        backup: Option<PathBuf>,
    },
}

impl UpdateOutcome {
    pub fn needs_restart(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}
