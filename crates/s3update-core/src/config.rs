use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::UpdateError;
use crate::release_key::ReleaseKey;
use crate::version::parse_local_version;

/// Settings supplied by the embedding application.
///
/// Fields default to empty so that a partially written file still parses;
/// [`UpdaterConfig::validate`] is what rejects missing values.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UpdaterConfig {
    #[serde(default)]
    pub current_version: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub region: String,
    /// S3-compatible base URL used instead of the regional AWS endpoint.
    pub endpoint: Option<String>,
    /// Key template, e.g. `cli/releases/cli-{{OS}}-{{ARCH}}`.
    #[serde(default)]
    pub release_key: String,
    #[serde(default)]
    pub version_key: String,
    /// Where downloads are staged. Defaults to the executable's own directory.
    pub staging_dir: Option<PathBuf>,
    /// Fetch with unsigned requests instead of AWS credentials, for public
    /// buckets and mirrors.
    #[serde(default)]
    pub anonymous: bool,
}

impl UpdaterConfig {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        toml::from_str(input).context("config-invalid: failed to parse updater config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("config-invalid: failed reading {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("config-invalid: failed loading {}", path.display()))
    }

    /// Rejects the first unusable field. The version is checked first so a
    /// misbuilt binary never reaches the network.
    pub fn validate(&self) -> Result<(), UpdateError> {
        parse_local_version(&self.current_version)?;

        let required = [
            ("bucket", &self.bucket),
            ("region", &self.region),
            ("release key", &self.release_key),
            ("version key", &self.version_key),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(UpdateError::ConfigInvalid { field });
            }
        }
        Ok(())
    }

    pub fn release_key(&self) -> ReleaseKey {
        ReleaseKey::new(self.release_key.clone())
    }
}
