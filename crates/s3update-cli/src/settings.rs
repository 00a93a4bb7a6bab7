use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use s3update_core::UpdaterConfig;
use s3update_store::{store_from_config, FilesystemObjectStore, ObjectStore};

/// Build number baked in by the release pipeline, e.g.
/// `S3UPDATE_BUILD_VERSION=42 cargo build --release`.
pub(crate) const BUILD_VERSION: Option<&str> = option_env!("S3UPDATE_BUILD_VERSION");

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct ConfigArgs {
    /// TOML file with updater settings; flags override its values.
    #[arg(long, env = "S3UPDATE_CONFIG", global = true)]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, global = true)]
    pub(crate) current_version: Option<String>,
    #[arg(long, global = true)]
    pub(crate) bucket: Option<String>,
    #[arg(long, global = true)]
    pub(crate) region: Option<String>,
    #[arg(long, global = true)]
    pub(crate) endpoint: Option<String>,
    #[arg(long, global = true)]
    pub(crate) release_key: Option<String>,
    #[arg(long, global = true)]
    pub(crate) version_key: Option<String>,
    #[arg(long, global = true)]
    pub(crate) staging_dir: Option<PathBuf>,
    /// Serve objects from `<dir>/<bucket>/<key>` instead of S3.
    #[arg(long, global = true)]
    pub(crate) mirror: Option<PathBuf>,
    /// Send unsigned requests instead of using AWS credentials.
    #[arg(long, global = true)]
    pub(crate) anonymous: bool,
}

/// Where the local version of a resolved config came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum VersionSource {
    Flag,
    ConfigFile,
    BuildTime,
    Unset,
}

impl VersionSource {
    /// Only a version compiled into the binary changes when the binary is
    /// replaced; flags and config files hand the restarted process the same
    /// stale number.
    pub(crate) fn follows_installed_binary(self) -> bool {
        matches!(self, Self::BuildTime)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ResolvedConfig {
    pub(crate) config: UpdaterConfig,
    pub(crate) version_source: VersionSource,
}

pub(crate) fn resolve_config(args: &ConfigArgs) -> Result<ResolvedConfig> {
    resolve_config_with_build_version(args, BUILD_VERSION)
}

pub(crate) fn resolve_config_with_build_version(
    args: &ConfigArgs,
    build_version: Option<&str>,
) -> Result<ResolvedConfig> {
    let mut config = match &args.config {
        Some(path) => UpdaterConfig::load(path)?,
        None => UpdaterConfig::default(),
    };

    let mut version_source = if config.current_version.trim().is_empty() {
        VersionSource::Unset
    } else {
        VersionSource::ConfigFile
    };
    if version_source == VersionSource::Unset {
        if let Some(version) = build_version.filter(|version| !version.trim().is_empty()) {
            config.current_version = version.to_string();
            version_source = VersionSource::BuildTime;
        }
    }
    if let Some(version) = &args.current_version {
        config.current_version.clone_from(version);
        version_source = VersionSource::Flag;
    }

    override_string(&mut config.bucket, &args.bucket);
    override_string(&mut config.region, &args.region);
    override_string(&mut config.release_key, &args.release_key);
    override_string(&mut config.version_key, &args.version_key);
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = Some(endpoint.clone());
    }
    if let Some(staging_dir) = &args.staging_dir {
        config.staging_dir = Some(staging_dir.clone());
    }
    if args.anonymous {
        config.anonymous = true;
    }

    Ok(ResolvedConfig {
        config,
        version_source,
    })
}

fn override_string(slot: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        slot.clone_from(value);
    }
}

pub(crate) fn build_store(
    args: &ConfigArgs,
    config: &UpdaterConfig,
) -> Result<Box<dyn ObjectStore>> {
    match &args.mirror {
        Some(root) => {
            log::debug!("serving objects from mirror {}", root.display());
            Ok(Box::new(FilesystemObjectStore::new(root.clone())))
        }
        None => {
            log::debug!(
                "fetching from bucket '{}' in region '{}'{}",
                config.bucket,
                config.region,
                if config.anonymous { " without credentials" } else { "" }
            );
            store_from_config(config)
                .with_context(|| format!("failed preparing store for bucket '{}'", config.bucket))
        }
    }
}
