use std::fs;
use std::path::PathBuf;

use s3update_core::{RollbackOutcome, UpdateError};

use crate::gate::VerifiedDownload;
use crate::target::ExecutableTarget;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub executable: PathBuf,
    /// Previous executable, if there was one to move aside.
    pub backup: Option<PathBuf>,
}

/// Installs a verified download at the target path.
///
/// The current executable is renamed to the backup path (replacing any older
/// backup), then the staged file is renamed over the target. If the second
/// rename fails the backup is moved back. The two renames are not atomic as a
/// pair: a crash between them leaves the target missing and the previous
/// build at the backup path. Concurrent swaps of one target are not guarded.
pub fn swap_executable(
    target: &ExecutableTarget,
    staged: VerifiedDownload,
) -> Result<SwapReceipt, UpdateError> {
    let had_existing = target.path().exists();

    if had_existing {
        if let Err(source) = fs::rename(target.path(), target.backup_path()) {
            let _ = fs::remove_file(staged.path());
            return Err(UpdateError::BackupFailed {
                target: target.path().to_path_buf(),
                backup: target.backup_path().to_path_buf(),
                source,
            });
        }
        log::debug!(
            "moved {} to {}",
            target.path().display(),
            target.backup_path().display()
        );
    }

    if let Err(source) = fs::rename(staged.path(), target.path()) {
        let rollback = if had_existing {
            match fs::rename(target.backup_path(), target.path()) {
                Ok(()) => RollbackOutcome::Restored,
                Err(error) => RollbackOutcome::Failed {
                    backup: target.backup_path().to_path_buf(),
                    error,
                },
            }
        } else {
            RollbackOutcome::NotNeeded
        };
        log::warn!(
            "failed installing {} at {}: {source}; {rollback}",
            staged.path().display(),
            target.path().display()
        );
        let _ = fs::remove_file(staged.path());

        return Err(UpdateError::SwapFailed {
            target: target.path().to_path_buf(),
            staged: staged.path,
            rollback,
            source,
        });
    }

    log::info!(
        "installed {} bytes at {}",
        staged.size(),
        target.path().display()
    );
    Ok(SwapReceipt {
        executable: target.path().to_path_buf(),
        backup: had_existing.then(|| target.backup_path().to_path_buf()),
    })
}
