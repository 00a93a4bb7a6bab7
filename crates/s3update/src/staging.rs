use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use s3update_core::UpdateError;
use sha2::{Digest, Sha256};

use crate::target::ExecutableTarget;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// One staged download: where it landed, what the store promised and what
/// was actually written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSession {
    pub(crate) path: PathBuf,
    pub(crate) expected_size: u64,
    pub(crate) bytes_written: u64,
    pub(crate) sha256: String,
}

impl DownloadSession {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn expected_size(&self) -> u64 {
        self.expected_size
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Digest of the bytes written, for diagnostics only; nothing checks it.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Removes the staged file. Used when the session is abandoned before
    /// the swap.
    pub fn discard(self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                log::warn!(
                    "failed removing staged download {}: {err}",
                    self.path.display()
                );
            }
        }
    }
}

/// Copies `source` into a fresh executable file in `staging_dir`.
///
/// Both the source and the file handle are closed before this returns. On
/// any failure the partial file is removed.
pub fn stage_download<R, P>(
    source: R,
    expected_size: u64,
    staging_dir: &Path,
    target: &ExecutableTarget,
    mut progress: P,
) -> Result<DownloadSession, UpdateError>
where
    R: Read,
    P: FnMut(u64, u64),
{
    fs::create_dir_all(staging_dir).map_err(|source| UpdateError::Staging {
        path: staging_dir.to_path_buf(),
        source,
    })?;

    let path = staging_dir.join(staging_file_name(target));
    let file = create_staging_file(&path).map_err(|source| UpdateError::Staging {
        path: path.clone(),
        source,
    })?;
    log::debug!("staging download at {}", path.display());

    let mut source = source;
    let copied = copy_into(file, &mut source, expected_size, &mut progress);
    drop(source);

    match copied {
        Ok((bytes_written, sha256)) => Ok(DownloadSession {
            path,
            expected_size,
            bytes_written,
            sha256,
        }),
        Err(source) => {
            let _ = fs::remove_file(&path);
            Err(UpdateError::Staging { path, source })
        }
    }
}

fn staging_file_name(target: &ExecutableTarget) -> String {
    format!(
        ".{}.s3update-{}-{}.part",
        target.file_name(),
        std::process::id(),
        unique_suffix()
    )
}

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

fn create_staging_file(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o755);
    }
    options.open(path)
}

// Takes the file by value so the handle is released on every return path.
fn copy_into<R, P>(
    mut file: File,
    source: &mut R,
    expected_size: u64,
    progress: &mut P,
) -> io::Result<(u64, String)>
where
    R: Read,
    P: FnMut(u64, u64),
{
    let mut hasher = Sha256::new();
    let mut buffer = vec![0_u8; COPY_BUFFER_SIZE];
    let mut written = 0_u64;

    loop {
        let read = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        file.write_all(&buffer[..read])?;
        hasher.update(&buffer[..read]);
        written += read as u64;
        progress(written, expected_size);
    }

    file.sync_all()?;
    Ok((written, hex::encode(hasher.finalize())))
}
