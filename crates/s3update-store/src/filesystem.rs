use std::fs::File;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::object::{ObjectStore, RemoteObject};

/// Serves objects from `{root}/{bucket}/{key}`, e.g. a synced mirror of the
/// release bucket.
#[derive(Debug, Clone)]
pub struct FilesystemObjectStore {
    root: PathBuf,
}

impl FilesystemObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for (label, value) in [("bucket", bucket), ("key", key)] {
            let relative = Path::new(value);
            if value.is_empty()
                || !relative
                    .components()
                    .all(|component| matches!(component, Component::Normal(_)))
            {
                return Err(anyhow!(
                    "object-key-invalid: {label} '{value}' must be a relative path without '..'"
                ));
            }
            path.push(relative);
        }
        Ok(path)
    }
}

impl ObjectStore for FilesystemObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<RemoteObject> {
        let path = self.object_path(bucket, key)?;
        let file = File::open(&path)
            .with_context(|| format!("object-fetch-failed: failed opening {}", path.display()))?;
        let content_length = file
            .metadata()
            .with_context(|| format!("object-fetch-failed: failed reading {}", path.display()))?
            .len();
        log::debug!("serving {} ({content_length} bytes)", path.display());
        Ok(RemoteObject::new(Box::new(file), content_length))
    }
}
