//! Self-update for standalone executables published to an S3 bucket.
//!
//! The pipeline compares the embedded build number against a version object,
//! stages the platform artifact next to the running binary, checks its size,
//! swaps it in with a single backup generation and re-executes in place.

mod gate;
mod pipeline;
mod reexec;
mod report;
mod staging;
mod swap;
mod target;

pub use gate::{verify_download, VerifiedDownload};
pub use pipeline::{auto_update, disabled_by_env, Updater, DISABLE_ENV_VAR};
pub use reexec::{reexec_command, restart, restart_or_exit};
pub use report::{Reporter, SilentReporter, StdoutReporter};
pub use staging::{stage_download, DownloadSession};
pub use swap::{swap_executable, SwapReceipt};
pub use target::{ExecutableTarget, BACKUP_SUFFIX};

pub use s3update_core::{
    Platform, ReleaseKey, RollbackOutcome, UpdateError, UpdateOutcome, UpdateStage,
    UpdaterConfig, VersionCheck, VersionIdentifier,
};
pub use s3update_store::{
    store_from_config, FilesystemObjectStore, HttpObjectStore, ObjectStore, RemoteObject,
    S3ObjectStore,
};

#[cfg(test)]
mod tests;
