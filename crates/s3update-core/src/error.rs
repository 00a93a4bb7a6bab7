use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage an [`UpdateError`] surfaced from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UpdateStage {
    Config,
    Comparing,
    Fetching,
    Downloading,
    Verifying,
    Swapping,
    Reexecuting,
}

impl UpdateStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Comparing => "comparing",
            Self::Fetching => "fetching",
            Self::Downloading => "downloading",
            Self::Verifying => "verifying",
            Self::Swapping => "swapping",
            Self::Reexecuting => "reexecuting",
        }
    }
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the backup after the staged binary failed to install.
#[derive(Debug)]
pub enum RollbackOutcome {
    /// There was no previous executable, so nothing was moved aside.
    NotNeeded,
    Restored,
    /// The previous executable is stranded at `backup`; the target path is empty.
    Failed { backup: PathBuf, error: io::Error },
}

impl RollbackOutcome {
    pub fn requires_manual_intervention(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotNeeded => f.write_str("no previous executable to restore"),
            Self::Restored => f.write_str("previous executable restored"),
            Self::Failed { backup, error } => write!(
                f,
                "rollback failed ({error}); previous executable left at {}, manual intervention required",
                backup.display()
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("config-invalid: no {field} set")]
    ConfigInvalid { field: &'static str },

    #[error("invalid local version '{value}'")]
    InvalidLocalVersion { value: String },

    #[error("invalid remote version '{value}'")]
    InvalidRemoteVersion { value: String },

    #[error("object-fetch-failed: bucket '{bucket}' key '{key}'")]
    Fetch {
        bucket: String,
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("executable-unresolved: failed resolving the running executable")]
    TargetUnresolved {
        #[source]
        source: io::Error,
    },

    #[error("staging-failed: {}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "incomplete-download: staged {actual} bytes at {}, remote declared {expected}",
        path.display()
    )]
    IncompleteDownload {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("backup-failed: could not move {} to {}", target.display(), backup.display())]
    BackupFailed {
        target: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "swap-failed: could not install {} at {}; {rollback}",
        staged.display(),
        target.display()
    )]
    SwapFailed {
        target: PathBuf,
        staged: PathBuf,
        rollback: RollbackOutcome,
        #[source]
        source: io::Error,
    },

    #[error("reexec-failed: could not restart {}", target.display())]
    ReexecFailed {
        target: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl UpdateError {
    pub fn stage(&self) -> UpdateStage {
        match self {
            Self::ConfigInvalid { .. } => UpdateStage::Config,
            Self::InvalidLocalVersion { .. } | Self::InvalidRemoteVersion { .. } => {
                UpdateStage::Comparing
            }
            Self::Fetch { .. } => UpdateStage::Fetching,
            Self::TargetUnresolved { .. } | Self::Staging { .. } => UpdateStage::Downloading,
            Self::IncompleteDownload { .. } => UpdateStage::Verifying,
            Self::BackupFailed { .. } | Self::SwapFailed { .. } => UpdateStage::Swapping,
            Self::ReexecFailed { .. } => UpdateStage::Reexecuting,
        }
    }

    /// A bad local version means the build itself is misconfigured, so no
    /// later check can succeed either.
    pub fn aborts_all_checks(&self) -> bool {
        matches!(
            self,
            Self::ConfigInvalid { .. } | Self::InvalidLocalVersion { .. }
        )
    }

    /// True once the live executable may no longer match the running image.
    pub fn live_binary_touched(&self) -> bool {
        match self {
            Self::SwapFailed { rollback, .. } => rollback.requires_manual_intervention(),
            Self::ReexecFailed { .. } => true,
            _ => false,
        }
    }
}
