use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use s3update_core::UpdaterConfig;
use tokio::runtime::Runtime;

use crate::http::normalize_endpoint;
use crate::object::{ObjectStore, RemoteObject};

/// Signed `GetObject` calls against S3, or an S3-compatible server when an
/// endpoint is given.
///
/// Credentials come from the standard AWS provider chain: `AWS_*` environment
/// variables, the shared config and credentials files, SSO, and container or
/// instance roles. Requests run on a private current-thread runtime, so the
/// store must not be called from inside another async runtime.
pub struct S3ObjectStore {
    runtime: Arc<Runtime>,
    client: Client,
}

impl S3ObjectStore {
    pub fn new(region: impl Into<String>, endpoint: Option<String>) -> Result<Self> {
        let runtime = build_runtime()?;
        let sdk_config = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.into()))
                .load(),
        );

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = normalize_endpoint(endpoint) {
            log::debug!("using S3 endpoint {endpoint}");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Ok(Self::with_runtime(runtime, builder.build()))
    }

    pub fn from_config(config: &UpdaterConfig) -> Result<Self> {
        Self::new(config.region.clone(), config.endpoint.clone())
    }

    /// Uses a fully built client config, e.g. with explicit credentials.
    pub fn from_sdk_config(config: aws_sdk_s3::Config) -> Result<Self> {
        Ok(Self::with_runtime(build_runtime()?, config))
    }

    fn with_runtime(runtime: Runtime, config: aws_sdk_s3::Config) -> Self {
        let client = {
            let _guard = runtime.enter();
            Client::from_conf(config)
        };
        Self {
            runtime: Arc::new(runtime),
            client,
        }
    }
}

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("object-store-init-failed: failed starting s3 runtime")
}

impl ObjectStore for S3ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<RemoteObject> {
        log::debug!("GetObject s3://{bucket}/{key}");

        let output = self
            .runtime
            .block_on(self.client.get_object().bucket(bucket).key(key).send())
            .map_err(|err| anyhow!("{}", DisplayErrorContext(&err)))
            .with_context(|| format!("object-fetch-failed: GetObject s3://{bucket}/{key}"))?;

        let content_length = output
            .content_length()
            .and_then(|length| u64::try_from(length).ok())
            .ok_or_else(|| {
                anyhow!("object-fetch-failed: s3://{bucket}/{key} did not declare a content length")
            })?;

        let body = ByteStreamReader {
            runtime: Arc::clone(&self.runtime),
            stream: output.body,
            chunk: Vec::new(),
            offset: 0,
        };
        Ok(RemoteObject::new(Box::new(body), content_length))
    }
}

/// Blocking `Read` over an SDK byte stream, one chunk at a time.
struct ByteStreamReader {
    runtime: Arc<Runtime>,
    stream: ByteStream,
    chunk: Vec<u8>,
    offset: usize,
}

impl Read for ByteStreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.offset == self.chunk.len() {
            match self.runtime.block_on(self.stream.next()) {
                Some(Ok(bytes)) => {
                    self.chunk = bytes.to_vec();
                    self.offset = 0;
                }
                Some(Err(err)) => return Err(io::Error::other(err)),
                None => return Ok(0),
            }
        }

        let count = buf.len().min(self.chunk.len() - self.offset);
        buf[..count].copy_from_slice(&self.chunk[self.offset..self.offset + count]);
        self.offset += count;
        Ok(count)
    }
}
