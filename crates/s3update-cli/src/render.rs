use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use s3update::{DownloadSession, Reporter};
use s3update_core::{UpdateError, VersionCheck, VersionIdentifier};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    resolve_output_style(
        std::io::stdout().is_terminal(),
        std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty()),
    )
}

pub(crate) fn resolve_output_style(is_terminal: bool, no_color: bool) -> OutputStyle {
    if is_terminal && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => format!("s3update: {message}"),
        OutputStyle::Rich => format!(
            "{} {message}",
            colorize(status_style(status), &format!("{status:>10}"))
        ),
    }
}

/// Status lines and a byte progress bar for one update run.
pub(crate) struct TerminalReporter {
    style: OutputStyle,
    progress_bar: Option<ProgressBar>,
    started_at: Option<Instant>,
}

impl TerminalReporter {
    pub(crate) fn new(style: OutputStyle) -> Self {
        Self {
            style,
            progress_bar: None,
            started_at: None,
        }
    }

    pub(crate) fn current() -> Self {
        Self::new(current_output_style())
    }

    pub(crate) fn print_status(&self, status: &str, message: &str) {
        println!("{}", render_status_line(self.style, status, message));
    }

    fn abandon_progress(&mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.abandon();
        }
    }
}

impl Reporter for TerminalReporter {
    fn disabled(&mut self) {
        self.print_status("skipped", "autoupdate disabled");
    }

    fn versions(&mut self, check: &VersionCheck) {
        self.print_status(
            "checked",
            &format!(
                "Local Version {} - Remote Version: {}",
                check.local, check.remote
            ),
        );
        if check.is_outdated() {
            self.print_status("outdated", "version outdated ...");
        }
    }

    fn download_started(&mut self, key: &str, total: u64) {
        self.started_at = Some(Instant::now());
        if self.style == OutputStyle::Plain {
            self.print_status(
                "download",
                &format!("downloading {key} ({})", HumanBytes(total)),
            );
            return;
        }

        let progress_bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template(
            "{msg:>10} [{bar:40.cyan/blue}] {bytes:>10}/{total_bytes:10} {bytes_per_sec}",
        ) {
            progress_bar.set_style(style.progress_chars("=>-"));
        }
        progress_bar.set_message("download");
        progress_bar.enable_steady_tick(Duration::from_millis(500));
        self.progress_bar = Some(progress_bar);
    }

    fn download_progress(&mut self, written: u64, _total: u64) {
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_position(written);
        }
    }

    fn download_finished(&mut self, session: &DownloadSession) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        let elapsed = self
            .started_at
            .take()
            .map(|started| format!(" in {}", format_elapsed(started.elapsed())))
            .unwrap_or_default();
        self.print_status(
            "downloaded",
            &format!("{}{elapsed}", HumanBytes(session.bytes_written())),
        );
    }

    fn updated(&mut self, version: VersionIdentifier) {
        self.print_status(
            "updated",
            &format!("updated with success to version {version}"),
        );
    }

    fn restarting(&mut self, executable: &Path) {
        self.print_status(
            "restarting",
            &format!("Restarting application ({})", executable.display()),
        );
    }

    // Only reached from the restart path; every other failure is returned to
    // main and printed there.
    fn failed(&mut self, error: &UpdateError) {
        self.abandon_progress();
        eprintln!(
            "{}",
            render_status_line(self.style, "error", &error.to_string())
        );
    }
}

impl Drop for TerminalReporter {
    fn drop(&mut self) {
        self.abandon_progress();
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn status_style(status: &str) -> Style {
    let color = match status {
        "error" => AnsiColor::BrightRed,
        "outdated" | "restarting" => AnsiColor::BrightYellow,
        "updated" | "up-to-date" => AnsiColor::BrightGreen,
        _ => AnsiColor::BrightCyan,
    };
    Style::new().fg_color(Some(color.into())).effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
