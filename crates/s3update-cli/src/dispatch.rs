use std::io;

use anyhow::{anyhow, Result};
use s3update::{ExecutableTarget, Reporter, Updater};
use s3update_core::{Platform, ReleaseKey, UpdateError, UpdateOutcome, UpdaterConfig};
use s3update_store::ObjectStore;

use crate::completion::write_completions_script;
use crate::render::TerminalReporter;
use crate::settings::{build_store, resolve_config, VersionSource};
use crate::{Cli, Commands, UpdateArgs};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check => {
            let resolved = resolve_config(&cli.config)?;
            let store = build_store(&cli.config, &resolved.config)?;
            let reporter = TerminalReporter::current();
            for line in run_check_command(resolved.config, store)? {
                reporter.print_status("check", &line);
            }
        }
        Commands::Update(args) => {
            let resolved = resolve_config(&cli.config)?;
            let store = build_store(&cli.config, &resolved.config)?;
            let restart_blocker = restart_blocker(&args, resolved.version_source);
            let mut reporter = TerminalReporter::current();
            let outcome = run_update_command(
                resolved.config,
                store,
                &args,
                resolved.version_source,
                &mut reporter,
            )?;
            if let Some(line) = format_outcome_line(&outcome) {
                reporter.print_status(outcome_status(&outcome), &line);
            }
            if let (UpdateOutcome::Updated { .. }, Some(reason)) = (&outcome, restart_blocker) {
                reporter.print_status("skipped", &format!("not restarting: {reason}"));
            }
        }
        Commands::ReleaseKey { os, arch } => {
            let resolved = resolve_config(&cli.config)?;
            println!(
                "{}",
                resolve_release_key_command(&resolved.config, os, arch)?
            );
        }
        Commands::Completions { shell } => {
            let mut stdout = io::stdout();
            write_completions_script(shell, &mut stdout)?;
        }
    }

    Ok(())
}

pub(crate) fn run_check_command<S: ObjectStore>(
    config: UpdaterConfig,
    store: S,
) -> Result<Vec<String>> {
    let updater = Updater::new(config, store);
    let Some(check) = updater.check().map_err(into_cli_error)? else {
        return Ok(vec!["autoupdate disabled".to_string()]);
    };

    let mut lines = vec![format!(
        "Local Version {} - Remote Version: {}",
        check.local, check.remote
    )];
    if check.is_outdated() {
        lines.push(format!(
            "update available: {} -> {} ({})",
            check.local,
            check.remote,
            updater.resolved_release_key()
        ));
    } else {
        lines.push("up to date".to_string());
    }
    Ok(lines)
}

/// Reason the freshly installed binary must not be re-executed, if any.
///
/// A restart re-runs this command with the same arguments. That only
/// terminates when the new binary reports the new version by itself, and
/// only makes sense when the replaced file is the running executable.
pub(crate) fn restart_blocker(
    args: &UpdateArgs,
    version_source: VersionSource,
) -> Option<&'static str> {
    if args.no_restart {
        Some("--no-restart given")
    } else if args.target.is_some() {
        Some("--target replaced a different executable")
    } else if !version_source.follows_installed_binary() {
        Some("the current version is set at runtime and would not change after a restart")
    } else {
        None
    }
}

pub(crate) fn run_update_command<S: ObjectStore>(
    config: UpdaterConfig,
    store: S,
    args: &UpdateArgs,
    version_source: VersionSource,
    reporter: &mut dyn Reporter,
) -> Result<UpdateOutcome> {
    let mut updater = Updater::new(config, store);
    if let Some(target) = &args.target {
        updater = updater.with_target(ExecutableTarget::new(target.clone()));
    }

    let result = match restart_blocker(args, version_source) {
        Some(reason) => {
            log::debug!("restart disabled: {reason}");
            updater.run(reporter)
        }
        None => updater.run_and_restart(reporter),
    };
    result.map_err(into_cli_error)
}

pub(crate) fn resolve_release_key_command(
    config: &UpdaterConfig,
    os: Option<String>,
    arch: Option<String>,
) -> Result<String> {
    if config.release_key.trim().is_empty() {
        return Err(anyhow!("config-invalid: no release key set"));
    }
    let current = Platform::current();
    let platform = Platform::new(
        os.unwrap_or_else(|| current.os().to_string()),
        arch.unwrap_or_else(|| current.arch().to_string()),
    );
    Ok(ReleaseKey::new(config.release_key.clone()).resolve(&platform))
}

pub(crate) fn format_outcome_line(outcome: &UpdateOutcome) -> Option<String> {
    match outcome {
        UpdateOutcome::Disabled => None,
        UpdateOutcome::UpToDate { local, .. } => {
            Some(format!("already up to date at version {local}"))
        }
        UpdateOutcome::Updated {
            installed,
            executable,
            backup,
            ..
        } => {
            let backup = backup
                .as_ref()
                .map(|path| format!(", previous build kept at {}", path.display()))
                .unwrap_or_default();
            Some(format!(
                "version {installed} installed at {}{backup}; restart to use it",
                executable.display()
            ))
        }
    }
}

fn outcome_status(outcome: &UpdateOutcome) -> &'static str {
    match outcome {
        UpdateOutcome::Disabled => "skipped",
        UpdateOutcome::UpToDate { .. } => "up-to-date",
        UpdateOutcome::Updated { .. } => "updated",
    }
}

fn into_cli_error(err: UpdateError) -> anyhow::Error {
    let stage = err.stage();
    anyhow::Error::new(err).context(format!("self-update-failed: {stage} stage"))
}
