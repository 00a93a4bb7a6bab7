use std::path::Path;

use s3update_core::{UpdateError, VersionCheck, VersionIdentifier};

use crate::staging::DownloadSession;

/// Receives the human-facing status of an update run.
///
/// Every hook defaults to doing nothing so embedders only override what
/// they display.
pub trait Reporter {
    fn disabled(&mut self) {}

    fn versions(&mut self, _check: &VersionCheck) {}

    fn download_started(&mut self, _key: &str, _total: u64) {}

    fn download_progress(&mut self, _written: u64, _total: u64) {}

    fn download_finished(&mut self, _session: &DownloadSession) {}

    fn updated(&mut self, _version: VersionIdentifier) {}

    fn restarting(&mut self, _executable: &Path) {}

    fn failed(&mut self, _error: &UpdateError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {}

/// Plain `s3update: ...` status lines on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn disabled(&mut self) {
        println!("s3update: autoupdate disabled");
    }

    fn versions(&mut self, check: &VersionCheck) {
        println!(
            "s3update: Local Version {} - Remote Version: {}",
            check.local, check.remote
        );
        if check.is_outdated() {
            println!("s3update: version outdated ... ");
        }
    }

    fn updated(&mut self, version: VersionIdentifier) {
        println!("s3update: updated with success to version {version}");
    }

    fn restarting(&mut self, _executable: &Path) {
        println!("Restarting application");
    }

    fn failed(&mut self, error: &UpdateError) {
        if error.aborts_all_checks() {
            println!("s3update: {error} - skipping auto update");
        } else {
            println!("s3update: {error}");
        }
    }
}
