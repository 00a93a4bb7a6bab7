use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const BACKUP_SUFFIX: &str = ".bak";

/// The executable being replaced and where its previous build is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableTarget {
    path: PathBuf,
    backup: PathBuf,
}

impl ExecutableTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut backup = OsString::from(path.as_os_str());
        backup.push(BACKUP_SUFFIX);
        Self {
            path,
            backup: PathBuf::from(backup),
        }
    }

    /// Resolves the running binary, following symlinks so the real file is
    /// replaced rather than the link pointing at it.
    pub fn current() -> io::Result<Self> {
        let exe = env::current_exe()?;
        let resolved = fs::canonicalize(&exe).unwrap_or(exe);
        Ok(Self::new(resolved))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    pub fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "executable".to_string())
    }
}
