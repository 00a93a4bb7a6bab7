mod config;
mod error;
mod outcome;
mod release_key;
mod version;

pub use config::UpdaterConfig;
pub use error::{RollbackOutcome, UpdateError, UpdateStage};
pub use outcome::UpdateOutcome;
pub use release_key::{Platform, ReleaseKey, ARCH_TOKEN, OS_TOKEN};
pub use version::{
    compare_versions, parse_local_version, parse_remote_version, VersionCheck, VersionComparison,
    VersionIdentifier,
};
