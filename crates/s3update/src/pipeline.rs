use std::env;

use s3update_core::{
    parse_local_version, parse_remote_version, Platform, UpdateError, UpdateOutcome,
    UpdaterConfig, VersionCheck,
};
use s3update_store::{read_version_text, store_from_config, ObjectStore};

use crate::gate::verify_download;
use crate::reexec::restart_or_exit;
use crate::report::{Reporter, StdoutReporter};
use crate::staging::stage_download;
use crate::swap::swap_executable;
use crate::target::ExecutableTarget;

pub const DISABLE_ENV_VAR: &str = "S3UPDATE_DISABLED";

pub fn disabled_by_env() -> bool {
    env::var_os(DISABLE_ENV_VAR).is_some_and(|value| !value.is_empty())
}

/// One configured update check against one store.
///
/// Runs entirely on the calling thread and blocks for every fetch and
/// filesystem operation. There is no timeout; wrap the call if one is needed.
pub struct Updater<S> {
    config: UpdaterConfig,
    store: S,
    platform: Platform,
    target: Option<ExecutableTarget>,
    disabled: bool,
}

impl<S: ObjectStore> Updater<S> {
    pub fn new(config: UpdaterConfig, store: S) -> Self {
        Self {
            config,
            store,
            platform: Platform::current(),
            target: None,
            disabled: disabled_by_env(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Replaces a different file than the running executable.
    pub fn with_target(mut self, target: ExecutableTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn resolved_release_key(&self) -> String {
        self.config.release_key().resolve(&self.platform)
    }

    /// Compares versions without downloading anything. `None` when disabled.
    pub fn check(&self) -> Result<Option<VersionCheck>, UpdateError> {
        if self.disabled {
            return Ok(None);
        }
        self.compare().map(Some)
    }

    /// Runs the pipeline up to and including the swap. The process keeps
    /// running the old image; see [`Updater::run_and_restart`].
    pub fn run(&self, reporter: &mut dyn Reporter) -> Result<UpdateOutcome, UpdateError> {
        if self.disabled {
            reporter.disabled();
            return Ok(UpdateOutcome::Disabled);
        }

        let check = self.compare()?;
        reporter.versions(&check);
        if !check.is_outdated() {
            log::debug!("local version {} is current", check.local);
            return Ok(UpdateOutcome::UpToDate {
                local: check.local,
                remote: check.remote,
            });
        }

        let target = self.resolve_target()?;
        let key = self.resolved_release_key();
        log::debug!("fetching artifact '{key}' from bucket '{}'", self.config.bucket);
        let object = self
            .store
            .get_object(&self.config.bucket, &key)
            .map_err(|source| UpdateError::Fetch {
                bucket: self.config.bucket.clone(),
                key: key.clone(),
                source,
            })?;

        let total = object.content_length();
        reporter.download_started(&key, total);
        let staging_dir = self
            .config
            .staging_dir
            .clone()
            .unwrap_or_else(|| target.directory());
        let session = stage_download(object, total, &staging_dir, &target, |written, total| {
            reporter.download_progress(written, total)
        })?;
        reporter.download_finished(&session);

        let verified = verify_download(session)?;
        let receipt = swap_executable(&target, verified)?;
        reporter.updated(check.remote);

        Ok(UpdateOutcome::Updated {
            previous: check.local,
            installed: check.remote,
            executable: receipt.executable,
            backup: receipt.backup,
        })
    }

    /// Runs the pipeline and, after a successful swap, re-executes the new
    /// binary. Returns only when no update was installed or the run failed
    /// before touching the executable.
    pub fn run_and_restart(
        &self,
        reporter: &mut dyn Reporter,
    ) -> Result<UpdateOutcome, UpdateError> {
        let outcome = self.run(reporter)?;
        if let UpdateOutcome::Updated { executable, .. } = &outcome {
            restart_or_exit(&ExecutableTarget::new(executable.clone()), reporter);
        }
        Ok(outcome)
    }

    fn compare(&self) -> Result<VersionCheck, UpdateError> {
        self.config.validate()?;
        let local = parse_local_version(&self.config.current_version)?;

        let raw = read_version_text(&self.store, &self.config.bucket, &self.config.version_key)
            .map_err(|source| UpdateError::Fetch {
                bucket: self.config.bucket.clone(),
                key: self.config.version_key.clone(),
                source,
            })?;
        let remote = parse_remote_version(&raw)?;

        Ok(VersionCheck::new(local, remote))
    }

    fn resolve_target(&self) -> Result<ExecutableTarget, UpdateError> {
        match &self.target {
            Some(target) => Ok(target.clone()),
            None => ExecutableTarget::current()
                .map_err(|source| UpdateError::TargetUnresolved { source }),
        }
    }
}

/// Checks the configured S3 bucket and, when a newer build is published,
/// installs it and restarts into it. Status goes to stdout.
///
/// Errors are printed and returned; deciding whether they are fatal is left
/// to the caller. The process only exits here when the new binary is in place
/// but could not be executed.
pub fn auto_update(config: UpdaterConfig) -> Result<UpdateOutcome, UpdateError> {
    let mut reporter = StdoutReporter;
    if disabled_by_env() {
        reporter.disabled();
        return Ok(UpdateOutcome::Disabled);
    }
    if let Err(err) = config.validate() {
        reporter.failed(&err);
        return Err(err);
    }

    let store = match store_from_config(&config) {
        Ok(store) => store,
        Err(source) => {
            let err = UpdateError::Fetch {
                bucket: config.bucket.clone(),
                key: config.version_key.clone(),
                source,
            };
            reporter.failed(&err);
            return Err(err);
        }
    };

    let updater = Updater::new(config, store).with_disabled(false);
    updater.run_and_restart(&mut reporter).inspect_err(|err| {
        reporter.failed(err);
    })
}
