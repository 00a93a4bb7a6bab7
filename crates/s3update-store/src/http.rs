use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use s3update_core::UpdaterConfig;

use crate::object::{ObjectStore, RemoteObject};

/// Anonymous `GET` access to an S3 bucket, or to any S3-compatible server
/// when an endpoint is given.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    region: String,
    endpoint: Option<String>,
}

impl HttpObjectStore {
    pub fn new(region: impl Into<String>, endpoint: Option<String>) -> Result<Self> {
        // Artifact downloads run for as long as they need to; callers that
        // want a bound wrap the whole update.
        let client = Client::builder()
            .user_agent(concat!("s3update/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<Duration>)
            .build()
            .context("object-store-init-failed: failed building http client")?;

        Ok(Self {
            client,
            region: region.into(),
            endpoint: normalize_endpoint(endpoint),
        })
    }

    pub fn from_config(config: &UpdaterConfig) -> Result<Self> {
        Self::new(config.region.clone(), config.endpoint.clone())
    }

    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match &self.endpoint {
            Some(endpoint) => format!("{endpoint}/{bucket}/{key}"),
            None => format!("https://{bucket}.s3.{}.amazonaws.com/{key}", self.region),
        }
    }
}

impl ObjectStore for HttpObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<RemoteObject> {
        let url = self.object_url(bucket, key);
        log::debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("object-fetch-failed: GET {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("object-fetch-failed: GET {url} returned {status}"));
        }

        let content_length = response.content_length().ok_or_else(|| {
            anyhow!("object-fetch-failed: GET {url} did not declare a content length")
        })?;

        Ok(RemoteObject::new(Box::new(response), content_length))
    }
}

pub(crate) fn normalize_endpoint(endpoint: Option<String>) -> Option<String> {
    endpoint
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
}
