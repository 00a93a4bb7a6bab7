use std::fs;
use std::path::{Path, PathBuf};

use s3update_core::UpdateError;

use crate::staging::DownloadSession;

/// A staged file whose size matched the length the store declared.
///
/// Only [`verify_download`] hands these out, so the swap cannot be reached
/// with an unchecked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedDownload {
    pub(crate) path: PathBuf,
    pub(crate) size: u64,
}

impl VerifiedDownload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Size check only. A same-length corrupt artifact passes.
pub fn verify_download(session: DownloadSession) -> Result<VerifiedDownload, UpdateError> {
    let actual = match fs::metadata(session.path()) {
        Ok(metadata) => metadata.len(),
        Err(source) => {
            let path = session.path().to_path_buf();
            session.discard();
            return Err(UpdateError::Staging { path, source });
        }
    };

    if actual != session.expected_size() {
        let err = UpdateError::IncompleteDownload {
            path: session.path().to_path_buf(),
            expected: session.expected_size(),
            actual,
        };
        session.discard();
        return Err(err);
    }

    log::debug!(
        "staged download {} verified: {actual} bytes sha256={}",
        session.path().display(),
        session.sha256()
    );
    Ok(VerifiedDownload {
        path: session.path,
        size: actual,
    })
}
