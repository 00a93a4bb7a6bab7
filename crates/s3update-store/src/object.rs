use std::fmt;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};

/// Maximum size accepted for a version object; it only ever holds a number.
const VERSION_OBJECT_LIMIT: u64 = 4096;

/// A remote object opened for reading, with the length the store declared.
pub struct RemoteObject {
    body: Box<dyn Read + Send>,
    content_length: u64,
}

impl RemoteObject {
    pub fn new(body: Box<dyn Read + Send>, content_length: u64) -> Self {
        Self {
            body,
            content_length,
        }
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }
}

impl Read for RemoteObject {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.body.read(buf)
    }
}

impl fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteObject")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// `GetObject(bucket, key)` over whatever backs the release bucket.
pub trait ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<RemoteObject>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn get_object(&self, bucket: &str, key: &str) -> Result<RemoteObject> {
        (**self).get_object(bucket, key)
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for Box<T> {
    fn get_object(&self, bucket: &str, key: &str) -> Result<RemoteObject> {
        (**self).get_object(bucket, key)
    }
}

/// Reads a version object as text. Bytes that are not UTF-8 are replaced
/// rather than rejected, so a garbled object fails to parse as a version
/// instead of failing the fetch.
pub fn read_version_text<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    key: &str,
) -> Result<String> {
    let object = store.get_object(bucket, key)?;
    let mut raw = Vec::new();
    object
        .take(VERSION_OBJECT_LIMIT + 1)
        .read_to_end(&mut raw)
        .with_context(|| format!("object-read-failed: bucket '{bucket}' key '{key}'"))?;
    if raw.len() as u64 > VERSION_OBJECT_LIMIT {
        bail!(
            "object-too-large: bucket '{bucket}' key '{key}' exceeds {VERSION_OBJECT_LIMIT} bytes"
        );
    }
    Ok(String::from_utf8_lossy(&raw).into_owned())
}
