mod filesystem;
mod http;
mod object;
mod s3;

use anyhow::Result;
use s3update_core::UpdaterConfig;

pub use filesystem::FilesystemObjectStore;
pub use http::HttpObjectStore;
pub use object::{read_version_text, ObjectStore, RemoteObject};
pub use s3::S3ObjectStore;

/// Picks the store a config asks for: signed S3 requests by default, plain
/// unsigned `GET`s when `anonymous` is set.
pub fn store_from_config(config: &UpdaterConfig) -> Result<Box<dyn ObjectStore>> {
    if config.anonymous {
        Ok(Box::new(HttpObjectStore::from_config(config)?))
    } else {
        Ok(Box::new(S3ObjectStore::from_config(config)?))
    }
}
