use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::anyhow;

use super::*;

const VERSION_KEY: &str = "cli/VERSION";
const ARTIFACT_KEY: &str = "cli/releases/cli-linux-amd64";
const OLD_BINARY: &[u8] = b"#!/bin/sh\necho old build\n";
const NEW_BINARY: &[u8] = b"#!/bin/sh\necho new build, a little longer\n";

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Default)]
struct FakeStore {
    objects: HashMap<String, Vec<u8>>,
    declared_lengths: HashMap<String, u64>,
    broken_after: HashMap<String, usize>,
    calls: RefCell<Vec<String>>,
}

impl FakeStore {
    fn with_version(version: &str) -> Self {
        let mut store = Self::default();
        store.put(VERSION_KEY, version.as_bytes());
        store
    }

    fn put(&mut self, key: &str, content: &[u8]) {
        self.objects.insert(key.to_string(), content.to_vec());
    }

    fn declare_length(&mut self, key: &str, length: u64) {
        self.declared_lengths.insert(key.to_string(), length);
    }

    fn break_after(&mut self, key: &str, bytes: usize) {
        self.broken_after.insert(key.to_string(), bytes);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ObjectStore for FakeStore {
    fn get_object(&self, bucket: &str, key: &str) -> anyhow::Result<RemoteObject> {
        assert_eq!(bucket, "releases-bucket");
        self.calls.borrow_mut().push(key.to_string());
        let content = self
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("NoSuchKey: {key}"))?;
        let declared = self
            .declared_lengths
            .get(key)
            .copied()
            .unwrap_or(content.len() as u64);
        let body: Box<dyn Read + Send> = match self.broken_after.get(key) {
            Some(limit) => Box::new(BrokenReader {
                inner: Cursor::new(content),
                remaining: *limit,
            }),
            None => Box::new(Cursor::new(content)),
        };
        Ok(RemoteObject::new(body, declared))
    }
}

/// Yields `remaining` bytes and then fails, like a dropped connection.
struct BrokenReader {
    inner: Cursor<Vec<u8>>,
    remaining: usize,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ));
        }
        let limit = buf.len().min(self.remaining);
        let read = self.inner.read(&mut buf[..limit])?;
        self.remaining -= read;
        Ok(read)
    }
}

#[derive(Default)]
struct RecordingReporter {
    events: Vec<String>,
    last_progress: Option<(u64, u64)>,
}

impl Reporter for RecordingReporter {
    fn disabled(&mut self) {
        self.events.push("disabled".to_string());
    }

    fn versions(&mut self, check: &VersionCheck) {
        self.events
            .push(format!("versions {} {}", check.local, check.remote));
    }

    fn download_started(&mut self, key: &str, total: u64) {
        self.events.push(format!("download {key} {total}"));
    }

    fn download_progress(&mut self, written: u64, total: u64) {
        self.last_progress = Some((written, total));
    }

    fn download_finished(&mut self, session: &DownloadSession) {
        self.events
            .push(format!("downloaded {}", session.bytes_written()));
    }

    fn updated(&mut self, version: VersionIdentifier) {
        self.events.push(format!("updated {version}"));
    }
}

struct Scratch {
    root: PathBuf,
}

impl Scratch {
    fn new() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        let seq = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "s3update-test-{}-{nanos}-{seq}",
            std::process::id()
        ));
        fs::create_dir_all(root.join("bin")).expect("must create scratch dir");
        Self { root }
    }

    fn target(&self) -> ExecutableTarget {
        ExecutableTarget::new(self.root.join("bin").join("tool"))
    }

    fn install_old_binary(&self) -> ExecutableTarget {
        let target = self.target();
        fs::write(target.path(), OLD_BINARY).expect("must write old binary");
        target
    }

    fn bin_entries(&self) -> Vec<String> {
        let mut names = fs::read_dir(self.root.join("bin"))
            .expect("must read bin dir")
            .map(|entry| {
                entry
                    .expect("must read entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect::<Vec<_>>();
        names.sort();
        names
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn config(current_version: &str) -> UpdaterConfig {
    UpdaterConfig {
        current_version: current_version.to_string(),
        bucket: "releases-bucket".to_string(),
        region: "eu-west-1".to_string(),
        endpoint: None,
        release_key: "cli/releases/cli-{{OS}}-{{ARCH}}".to_string(),
        version_key: VERSION_KEY.to_string(),
        staging_dir: None,
        anonymous: false,
    }
}

fn updater<'a>(
    current_version: &str,
    store: &'a FakeStore,
    target: &ExecutableTarget,
) -> Updater<&'a FakeStore> {
    Updater::new(config(current_version), store)
        .with_platform(Platform::new("linux", "amd64"))
        .with_target(target.clone())
        .with_disabled(false)
}

fn publish_release(version: &str) -> FakeStore {
    let mut store = FakeStore::with_version(version);
    store.put(ARTIFACT_KEY, NEW_BINARY);
    store
}

fn read(path: &Path) -> Vec<u8> {
    fs::read(path).expect("must read file")
}

#[test]
fn equal_or_older_remote_is_up_to_date_without_artifact_fetch() {
    for remote in ["42", "41"] {
        let scratch = Scratch::new();
        let target = scratch.install_old_binary();
        let store = publish_release(remote);

        let outcome = updater("42", &store, &target)
            .run(&mut SilentReporter)
            .expect("must check");

        assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }));
        assert_eq!(store.calls(), vec![VERSION_KEY.to_string()]);
        assert_eq!(read(target.path()), OLD_BINARY);
        assert_eq!(scratch.bin_entries(), vec!["tool".to_string()]);
    }
}

#[test]
fn newer_remote_installs_artifact_and_keeps_backup() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let store = publish_release("42");
    let mut reporter = RecordingReporter::default();

    let outcome = updater("41", &store, &target)
        .run(&mut reporter)
        .expect("must update");

    match outcome {
        UpdateOutcome::Updated {
            previous,
            installed,
            executable,
            backup,
        } => {
            assert_eq!(previous.get(), 41);
            assert_eq!(installed.get(), 42);
            assert_eq!(executable, target.path());
            assert_eq!(backup.as_deref(), Some(target.backup_path()));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert_eq!(
        store.calls(),
        vec![VERSION_KEY.to_string(), ARTIFACT_KEY.to_string()]
    );
    assert_eq!(read(target.path()), NEW_BINARY);
    assert_eq!(read(target.backup_path()), OLD_BINARY);
    assert_eq!(
        scratch.bin_entries(),
        vec!["tool".to_string(), "tool.bak".to_string()]
    );

    let total = NEW_BINARY.len() as u64;
    assert_eq!(reporter.last_progress, Some((total, total)));
    assert_eq!(
        reporter.events,
        vec![
            "versions 41 42".to_string(),
            format!("download {ARTIFACT_KEY} {total}"),
            format!("downloaded {total}"),
            "updated 42".to_string(),
        ]
    );
}

#[cfg(unix)]
#[test]
fn installed_binary_is_executable() {
    use std::os::unix::fs::PermissionsExt;

    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let store = publish_release("42");

    updater("41", &store, &target)
        .run(&mut SilentReporter)
        .expect("must update");

    let mode = fs::metadata(target.path())
        .expect("must stat target")
        .permissions()
        .mode();
    assert_ne!(mode & 0o100, 0, "owner execute bit must be set: {mode:o}");
}

#[test]
fn invalid_local_version_makes_no_network_call() {
    for local in ["0", "", "abc"] {
        let scratch = Scratch::new();
        let target = scratch.install_old_binary();
        let store = publish_release("42");

        let err = updater(local, &store, &target)
            .run(&mut SilentReporter)
            .expect_err("must reject local version");

        assert!(
            matches!(err, UpdateError::InvalidLocalVersion { .. }),
            "unexpected error for '{local}': {err}"
        );
        assert!(store.calls().is_empty());
        assert_eq!(read(target.path()), OLD_BINARY);
    }
}

#[test]
fn invalid_remote_version_skips_artifact_fetch() {
    for remote in ["0", "latest"] {
        let scratch = Scratch::new();
        let target = scratch.install_old_binary();
        let store = publish_release(remote);

        let err = updater("41", &store, &target)
            .run(&mut SilentReporter)
            .expect_err("must reject remote version");

        assert!(matches!(err, UpdateError::InvalidRemoteVersion { .. }));
        assert_eq!(err.stage(), UpdateStage::Comparing);
        assert_eq!(store.calls(), vec![VERSION_KEY.to_string()]);
        assert_eq!(read(target.path()), OLD_BINARY);
    }
}

#[test]
fn non_utf8_remote_version_is_invalid_not_a_fetch_error() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let mut store = FakeStore::default();
    store.put(VERSION_KEY, &[0xff, 0xfe, b'4', b'2']);
    store.put(ARTIFACT_KEY, NEW_BINARY);

    let err = updater("41", &store, &target)
        .run(&mut SilentReporter)
        .expect_err("must reject remote version");

    assert!(
        matches!(err, UpdateError::InvalidRemoteVersion { .. }),
        "unexpected error: {err}"
    );
    assert_eq!(err.stage(), UpdateStage::Comparing);
    assert_eq!(store.calls(), vec![VERSION_KEY.to_string()]);
    assert_eq!(read(target.path()), OLD_BINARY);
}

#[test]
fn missing_config_field_aborts_before_any_fetch() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let store = publish_release("42");
    let mut incomplete = config("41");
    incomplete.bucket.clear();

    let err = Updater::new(incomplete, &store)
        .with_target(target.clone())
        .with_disabled(false)
        .run(&mut SilentReporter)
        .expect_err("must reject config");

    assert!(matches!(err, UpdateError::ConfigInvalid { field: "bucket" }));
    assert!(store.calls().is_empty());
}

#[test]
fn missing_version_object_is_a_fetch_error() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let store = FakeStore::default();

    let err = updater("41", &store, &target)
        .run(&mut SilentReporter)
        .expect_err("must fail");

    assert_eq!(err.stage(), UpdateStage::Fetching);
    assert!(format!("{err:#}").contains(VERSION_KEY));
    assert_eq!(store.calls(), vec![VERSION_KEY.to_string()]);
}

#[test]
fn missing_artifact_leaves_executable_untouched() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let store = FakeStore::with_version("42");

    let err = updater("41", &store, &target)
        .run(&mut SilentReporter)
        .expect_err("must fail");

    match &err {
        UpdateError::Fetch { key, .. } => assert_eq!(key, ARTIFACT_KEY),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(read(target.path()), OLD_BINARY);
    assert_eq!(scratch.bin_entries(), vec!["tool".to_string()]);
}

#[test]
fn size_mismatch_is_incomplete_download_and_target_is_untouched() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let mut store = publish_release("42");
    store.declare_length(ARTIFACT_KEY, NEW_BINARY.len() as u64 + 100);

    let err = updater("41", &store, &target)
        .run(&mut SilentReporter)
        .expect_err("must reject truncated download");

    match err {
        UpdateError::IncompleteDownload {
            expected, actual, ..
        } => {
            assert_eq!(expected, NEW_BINARY.len() as u64 + 100);
            assert_eq!(actual, NEW_BINARY.len() as u64);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(read(target.path()), OLD_BINARY);
    assert!(!target.backup_path().exists());
    assert_eq!(scratch.bin_entries(), vec!["tool".to_string()]);
}

#[test]
fn interrupted_stream_removes_partial_staging_file() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let mut store = publish_release("42");
    store.break_after(ARTIFACT_KEY, 5);

    let err = updater("41", &store, &target)
        .run(&mut SilentReporter)
        .expect_err("must fail on broken stream");

    assert!(matches!(err, UpdateError::Staging { .. }));
    assert_eq!(err.stage(), UpdateStage::Downloading);
    assert_eq!(read(target.path()), OLD_BINARY);
    assert_eq!(scratch.bin_entries(), vec!["tool".to_string()]);
}

#[test]
fn disabled_updater_touches_nothing() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let store = publish_release("42");
    let mut reporter = RecordingReporter::default();

    let updater = updater("41", &store, &target).with_disabled(true);
    let outcome = updater.run(&mut reporter).expect("must no-op");

    assert_eq!(outcome, UpdateOutcome::Disabled);
    assert!(updater.check().expect("must no-op").is_none());
    assert!(store.calls().is_empty());
    assert_eq!(reporter.events, vec!["disabled".to_string()]);
    assert_eq!(read(target.path()), OLD_BINARY);
    assert_eq!(scratch.bin_entries(), vec!["tool".to_string()]);
}

#[test]
fn disabled_switch_skips_invalid_config() {
    let store = FakeStore::default();
    let outcome = Updater::new(UpdaterConfig::default(), &store)
        .with_disabled(true)
        .run(&mut SilentReporter)
        .expect("must no-op");
    assert_eq!(outcome, UpdateOutcome::Disabled);
}

#[test]
fn second_run_after_update_is_a_no_op() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let store = publish_release("42");

    updater("41", &store, &target)
        .run(&mut SilentReporter)
        .expect("must update");
    let backup_after_update = read(target.backup_path());

    let outcome = updater("42", &store, &target)
        .run(&mut SilentReporter)
        .expect("must check");

    assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }));
    assert_eq!(
        store.calls(),
        vec![
            VERSION_KEY.to_string(),
            ARTIFACT_KEY.to_string(),
            VERSION_KEY.to_string(),
        ]
    );
    assert_eq!(read(target.path()), NEW_BINARY);
    assert_eq!(read(target.backup_path()), backup_after_update);
}

#[test]
fn check_compares_without_downloading() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let store = publish_release("42");

    let check = updater("41", &store, &target)
        .check()
        .expect("must check")
        .expect("must not be disabled");

    assert!(check.is_outdated());
    assert_eq!(store.calls(), vec![VERSION_KEY.to_string()]);
    assert_eq!(read(target.path()), OLD_BINARY);
}

#[test]
fn staging_dir_override_is_created_and_left_empty() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let store = publish_release("42");
    let staging_dir = scratch.root.join("staging");
    let mut with_staging = config("41");
    with_staging.staging_dir = Some(staging_dir.clone());

    Updater::new(with_staging, &store)
        .with_platform(Platform::new("linux", "amd64"))
        .with_target(target.clone())
        .with_disabled(false)
        .run(&mut SilentReporter)
        .expect("must update");

    assert_eq!(read(target.path()), NEW_BINARY);
    assert_eq!(
        fs::read_dir(&staging_dir)
            .expect("must read staging dir")
            .count(),
        0
    );
}

#[test]
fn first_install_without_previous_executable_has_no_backup() {
    let scratch = Scratch::new();
    let target = scratch.target();
    let store = publish_release("42");

    let outcome = updater("41", &store, &target)
        .run(&mut SilentReporter)
        .expect("must install");

    match outcome {
        UpdateOutcome::Updated { backup, .. } => assert!(backup.is_none()),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(read(target.path()), NEW_BINARY);
    assert!(!target.backup_path().exists());
}

#[test]
fn existing_backup_is_replaced_by_newer_generation() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    fs::write(target.backup_path(), b"ancient build").expect("must write stale backup");
    let store = publish_release("42");

    updater("41", &store, &target)
        .run(&mut SilentReporter)
        .expect("must update");

    assert_eq!(read(target.backup_path()), OLD_BINARY);
    assert_eq!(
        scratch.bin_entries(),
        vec!["tool".to_string(), "tool.bak".to_string()]
    );
}

#[test]
fn failed_install_rename_restores_previous_executable() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    let staged = VerifiedDownload {
        path: scratch.root.join("bin").join(".tool.vanished.part"),
        size: 10,
    };

    let err = swap_executable(&target, staged).expect_err("must fail to install");

    match &err {
        UpdateError::SwapFailed { rollback, .. } => {
            assert!(matches!(rollback, RollbackOutcome::Restored));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.live_binary_touched());
    assert_eq!(read(target.path()), OLD_BINARY);
    assert!(!target.backup_path().exists());
}

#[test]
fn failed_install_without_previous_executable_needs_no_rollback() {
    let scratch = Scratch::new();
    let target = scratch.target();
    let staged = VerifiedDownload {
        path: scratch.root.join("bin").join(".tool.vanished.part"),
        size: 10,
    };

    let err = swap_executable(&target, staged).expect_err("must fail to install");

    assert!(matches!(
        err,
        UpdateError::SwapFailed {
            rollback: RollbackOutcome::NotNeeded,
            ..
        }
    ));
    assert!(!target.path().exists());
}

#[test]
fn backup_failure_leaves_executable_and_discards_staged_file() {
    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    // A non-empty directory at the backup path makes the rename fail.
    fs::create_dir_all(target.backup_path().join("occupied")).expect("must create blocker");
    let staged_path = scratch.root.join("bin").join(".tool.staged.part");
    fs::write(&staged_path, NEW_BINARY).expect("must write staged file");
    let staged = VerifiedDownload {
        path: staged_path.clone(),
        size: NEW_BINARY.len() as u64,
    };

    let err = swap_executable(&target, staged).expect_err("must fail to back up");

    assert!(matches!(err, UpdateError::BackupFailed { .. }));
    assert_eq!(read(target.path()), OLD_BINARY);
    assert!(!staged_path.exists());
}

#[test]
fn stage_download_tracks_bytes_and_digest() {
    let scratch = Scratch::new();
    let target = scratch.target();
    let mut reports = Vec::new();

    let session = stage_download(
        Cursor::new(b"hello".to_vec()),
        5,
        &scratch.root.join("bin"),
        &target,
        |written, total| reports.push((written, total)),
    )
    .expect("must stage");

    assert_eq!(session.bytes_written(), 5);
    assert_eq!(session.expected_size(), 5);
    assert_eq!(
        session.sha256(),
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(reports.last(), Some(&(5, 5)));
    assert_eq!(read(session.path()), b"hello");
    let name = session
        .path()
        .file_name()
        .expect("must have name")
        .to_string_lossy()
        .into_owned();
    assert!(name.starts_with(".tool.s3update-"), "unexpected name {name}");
    assert!(name.ends_with(".part"));

    let verified = verify_download(session).expect("must verify");
    assert_eq!(verified.size(), 5);
}

#[test]
fn verify_rejects_short_file_and_removes_it() {
    let scratch = Scratch::new();
    let target = scratch.target();

    let session = stage_download(
        Cursor::new(b"hel".to_vec()),
        5,
        &scratch.root.join("bin"),
        &target,
        |_, _| {},
    )
    .expect("must stage");
    let staged_path = session.path().to_path_buf();

    let err = verify_download(session).expect_err("must reject");
    assert!(matches!(
        err,
        UpdateError::IncompleteDownload {
            expected: 5,
            actual: 3,
            ..
        }
    ));
    assert!(!staged_path.exists());
}

#[test]
fn backup_path_appends_suffix() {
    let target = ExecutableTarget::new("/opt/tools/cli");
    assert_eq!(target.backup_path(), Path::new("/opt/tools/cli.bak"));
    assert_eq!(target.directory(), PathBuf::from("/opt/tools"));
    assert_eq!(target.file_name(), "cli");

    let bare = ExecutableTarget::new("cli");
    assert_eq!(bare.directory(), PathBuf::from("."));
}

#[test]
fn current_target_is_absolute() {
    let target = ExecutableTarget::current().expect("must resolve test binary");
    assert!(target.path().is_absolute());
    assert!(target
        .backup_path()
        .to_string_lossy()
        .ends_with(BACKUP_SUFFIX));
}

#[test]
fn reexec_command_passes_arguments_through() {
    let args = vec![
        OsString::from("tool"),
        OsString::from("serve"),
        OsString::from("--port=8080"),
    ];
    let command = reexec_command(Path::new("/opt/tools/tool"), args);

    assert_eq!(command.get_program(), "/opt/tools/tool");
    assert_eq!(
        command.get_args().collect::<Vec<_>>(),
        vec!["serve", "--port=8080"]
    );
    assert_eq!(command.get_envs().count(), 0);
}

#[test]
fn resolved_release_key_uses_configured_platform() {
    let store = FakeStore::default();
    let updater = Updater::new(config("1"), &store).with_platform(Platform::new("darwin", "arm64"));
    assert_eq!(
        updater.resolved_release_key(),
        "cli/releases/cli-darwin-arm64"
    );
}

const CHILD_TEST_ENV: &str = "S3UPDATE_TEST_CHILD";
const CHILD_TARGET_ENV: &str = "S3UPDATE_TEST_TARGET";
const CHILD_EXPECT_ENV: &str = "S3UPDATE_TEST_EXPECT";
const RESTART_CHILD: &str = "tests::restart_child_process";
const DISABLE_SWITCH_CHILD: &str = "tests::disable_switch_child_process";

/// Runs a single test of this binary in a fresh process. The named test only
/// does its work when it sees its own name in `CHILD_TEST_ENV`.
fn run_child_test(test_name: &str, envs: &[(&str, &str)]) -> Output {
    let mut command = Command::new(std::env::current_exe().expect("must find test binary"));
    command
        .args([test_name, "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_TEST_ENV, test_name)
        .env_remove(DISABLE_ENV_VAR);
    for (key, value) in envs {
        command.env(key, value);
    }
    command.output().expect("must run child test")
}

fn running_as_child(test_name: &str) -> bool {
    std::env::var(CHILD_TEST_ENV).is_ok_and(|value| value == test_name)
}

#[test]
fn restart_child_process() {
    if !running_as_child(RESTART_CHILD) {
        return;
    }
    let target = std::env::var_os(CHILD_TARGET_ENV).expect("target path is set");
    restart_or_exit(&ExecutableTarget::new(PathBuf::from(target)), &mut StdoutReporter);
}

#[cfg(unix)]
#[test]
fn failed_restart_reports_and_exits_with_status_one() {
    use std::os::unix::fs::PermissionsExt;

    let scratch = Scratch::new();
    let target = scratch.install_old_binary();
    fs::set_permissions(target.path(), fs::Permissions::from_mode(0o644))
        .expect("must clear exec bits");

    let target_env = target.path().to_string_lossy().into_owned();
    let output = run_child_test(RESTART_CHILD, &[(CHILD_TARGET_ENV, &target_env)]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1), "stdout: {stdout}");
    assert!(stdout.contains("Restarting application"), "stdout: {stdout}");
    assert!(
        stdout.contains(&format!(
            "s3update: reexec-failed: could not restart {}",
            target.path().display()
        )),
        "stdout: {stdout}"
    );
}

#[cfg(unix)]
#[test]
fn restart_replaces_process_with_same_arguments_and_environment() {
    use std::os::unix::fs::PermissionsExt;

    let scratch = Scratch::new();
    let target = scratch.target();
    fs::write(
        target.path(),
        "#!/bin/sh\nprintf 'args:%s\\n' \"$*\"\nprintf 'child:%s\\n' \"$S3UPDATE_TEST_CHILD\"\n",
    )
    .expect("must write restart script");
    fs::set_permissions(target.path(), fs::Permissions::from_mode(0o755))
        .expect("must set exec bits");

    let target_env = target.path().to_string_lossy().into_owned();
    let output = run_child_test(RESTART_CHILD, &[(CHILD_TARGET_ENV, &target_env)]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("Restarting application"), "stdout: {stdout}");
    assert!(
        stdout.contains(&format!(
            "args:{RESTART_CHILD} --exact --nocapture --test-threads=1"
        )),
        "stdout: {stdout}"
    );
    assert!(
        stdout.contains(&format!("child:{RESTART_CHILD}")),
        "stdout: {stdout}"
    );
    assert!(!stdout.contains("reexec-failed"), "stdout: {stdout}");
}

#[test]
fn disable_switch_child_process() {
    if !running_as_child(DISABLE_SWITCH_CHILD) {
        return;
    }
    let store = FakeStore::default();
    match std::env::var(CHILD_EXPECT_ENV).as_deref() {
        Ok("disabled") => {
            assert!(disabled_by_env());
            assert!(Updater::new(config("1"), &store).is_disabled());
            let outcome = auto_update(config("1")).expect("disabled update is a no-op");
            assert_eq!(outcome, UpdateOutcome::Disabled);
        }
        _ => {
            assert!(!disabled_by_env());
            assert!(!Updater::new(config("1"), &store).is_disabled());
        }
    }
    assert!(store.calls().is_empty());
}

#[test]
fn disable_env_var_turns_auto_update_into_a_no_op() {
    let output = run_child_test(
        DISABLE_SWITCH_CHILD,
        &[(DISABLE_ENV_VAR, "1"), (CHILD_EXPECT_ENV, "disabled")],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout: {stdout}");
    assert!(
        stdout.contains("s3update: autoupdate disabled"),
        "stdout: {stdout}"
    );
}

#[test]
fn empty_disable_env_var_leaves_updates_enabled() {
    let output = run_child_test(
        DISABLE_SWITCH_CHILD,
        &[(DISABLE_ENV_VAR, ""), (CHILD_EXPECT_ENV, "enabled")],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout: {stdout}");
    assert!(!stdout.contains("autoupdate disabled"), "stdout: {stdout}");
}
