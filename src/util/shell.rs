//! User-facing output and progress.
//!
//! Status lines go to stderr as `{status:>12} {message}` so that stdout stays
//! free for command results (`list`, `avail`, job output). Logging through
//! `tracing` is separate and controlled by `--verbose`/`--debug`.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only, no progress
    Quiet,
    /// Status messages + progress bars
    #[default]
    Normal,
    /// Status messages, no progress bars
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    Always,
    Never,
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Loaded,
    Unloaded,
    Installed,
    Removed,
    Finished,

    // In-progress statuses (cyan)
    Installing,
    Downloading,
    Resolving,
    Running,

    // Info statuses (blue)
    Info,

    // Warning statuses (yellow)
    Skipped,
    Warning,

    // Error status (red)
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Loaded => "Loaded",
            Status::Unloaded => "Unloaded",
            Status::Installed => "Installed",
            Status::Removed => "Removed",
            Status::Finished => "Finished",
            Status::Installing => "Installing",
            Status::Downloading => "Downloading",
            Status::Resolving => "Resolving",
            Status::Running => "Running",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Loaded
            | Status::Unloaded
            | Status::Installed
            | Status::Removed
            | Status::Finished => "\x1b[1;32m",
            Status::Installing | Status::Downloading | Status::Resolving | Status::Running => {
                "\x1b[1;36m"
            }
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }
}

const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
}

impl Shell {
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };

        Shell {
            verbosity,
            use_color,
        }
    }

    /// Create a shell from CLI flags.
    pub fn from_flags(quiet: bool, verbose: bool, no_color: bool) -> Self {
        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        let color = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Shell::new(verbosity, color)
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print a status message.
    ///
    /// In quiet mode, only Error status is printed.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && status != Status::Error {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Create a byte-based progress bar for downloads.
    ///
    /// `total_bytes` of 0 means the size is unknown; a spinner is shown.
    pub fn bytes_progress(self: &Arc<Self>, msg: impl Display, total_bytes: u64) -> Progress {
        Progress::new(self, msg.to_string(), total_bytes)
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(Verbosity::Normal, ColorChoice::Auto)
    }
}

/// Progress bar wrapper that respects shell verbosity.
pub struct Progress {
    pb: Option<ProgressBar>,
    current: u64,
}

impl Progress {
    fn new(shell: &Shell, message: String, total: u64) -> Self {
        let pb = if shell.is_quiet() || shell.is_verbose() || !io::stderr().is_terminal() {
            None
        } else if total > 0 {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb.set_message(message);
            Some(pb)
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_message(message);
            Some(pb)
        };

        Progress { pb, current: 0 }
    }

    pub fn inc(&mut self, delta: u64) {
        self.current += delta;
        if let Some(pb) = &self.pb {
            pb.inc(delta);
        }
    }

    pub fn position(&self) -> u64 {
        self.current
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }
}
