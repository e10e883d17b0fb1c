//! Centralized shell output and progress management.
//!
//! All CLI output goes through [`Shell`]:
//! - Status messages right-aligned to a 12-column verb
//! - A spinner (via indicatif) while a long toolchain step runs
//! - JSON mode for machine-readable output, exclusive with human output

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// Human-readable output with optional colors and a spinner.
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    /// Machine-readable JSON output only.
    Json,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
        }
    }
}

/// Output verbosity level (Human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no spinner
    Quiet,
    /// Default: status messages + spinner
    #[default]
    Normal,
    /// --verbose: status lines only, no spinner
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Finished,
    Installed,
    Verified,

    // In-progress statuses (cyan)
    Resolving,
    Planning,
    Building,
    Copying,
    Verifying,

    // Info statuses (blue)
    Caveat,
    Info,

    // Warning statuses (yellow)
    Deprecated,
    Warning,

    // Error status (red)
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Finished => "Finished",
            Status::Installed => "Installed",
            Status::Verified => "Verified",
            Status::Resolving => "Resolving",
            Status::Planning => "Planning",
            Status::Building => "Building",
            Status::Copying => "Copying",
            Status::Verifying => "Verifying",
            Status::Caveat => "Caveat",
            Status::Info => "Info",
            Status::Deprecated => "Deprecated",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Finished | Status::Installed | Status::Verified => "\x1b[1;32m",
            Status::Resolving
            | Status::Planning
            | Status::Building
            | Status::Copying
            | Status::Verifying => "\x1b[1;36m",
            Status::Caveat | Status::Info => "\x1b[1;34m",
            Status::Deprecated | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }
}

const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
}

impl Shell {
    /// Create a new shell with the given mode.
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell { mode, use_color }
    }

    /// Create a shell from CLI flags. JSON mode takes precedence over
    /// quiet/verbose.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice, json: bool) -> Self {
        let mode = if json {
            ShellMode::Json
        } else {
            let verbosity = if quiet {
                Verbosity::Quiet
            } else if verbose {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            };
            ShellMode::Human { verbosity, color }
        };

        Shell::new(mode)
    }

    pub fn is_quiet(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Quiet,
                ..
            }
        )
    }

    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message to stderr.
    ///
    /// Format: `{status:>12} {message}`. Quiet mode keeps errors only;
    /// JSON mode drops everything (use [`Shell::json_event`]).
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() {
            return;
        }
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

    /// Print a multi-line caveat, indenting continuation lines.
    pub fn caveat(&self, msg: &str) {
        let indent = " ".repeat(STATUS_WIDTH + 1);
        let body = msg.trim().lines().collect::<Vec<_>>().join(&format!("\n{}", indent));
        self.status(Status::Caveat, body);
    }

    /// Print a JSON value to stdout. Ignored in human mode.
    pub fn json_event(&self, event: &serde_json::Value) {
        if !self.is_json() {
            return;
        }
        println!("{}", event);
        let _ = io::stdout().flush();
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!("{}{:>width$}\x1b[0m", status.color_code(), text, width = STATUS_WIDTH)
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Start a spinner for a long blocking step.
    ///
    /// Quiet, verbose and JSON modes get a no-op spinner; the finish line
    /// with elapsed time is printed unless quiet.
    pub fn spinner(&self, status: Status, msg: impl Display) -> Spinner<'_> {
        let message = msg.to_string();
        let bar = if self.is_quiet() || self.is_verbose() || self.is_json() || !io::stderr().is_terminal() {
            self.status(status, &message);
            None
        } else {
            let pb = ProgressBar::new_spinner();
            let template = format!("{{spinner:.cyan}} {} {{msg}} [{{elapsed}}]", status.as_str());
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template(&template)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message(message.clone());
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        };

        Spinner {
            shell: self,
            bar,
            message,
            start: Instant::now(),
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(ShellMode::default())
    }
}

/// Spinner over a blocking step. Cleared on drop.
pub struct Spinner<'a> {
    shell: &'a Shell,
    bar: Option<ProgressBar>,
    message: String,
    start: Instant,
}

impl Spinner<'_> {
    /// Clear the spinner and print a timed `Finished` line.
    pub fn finish(mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
        self.shell.status(
            Status::Finished,
            format!("{} in {}", self.message, format_duration(self.start.elapsed())),
        );
    }
}

impl Drop for Spinner<'_> {
    fn drop(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

/// Format a duration in a human-readable way.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_modes() {
        let shell = Shell::new(ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Never,
        });
        assert!(!shell.is_quiet());
        assert!(!shell.is_verbose());
        assert!(!shell.is_json());

        let json_shell = Shell::new(ShellMode::Json);
        assert!(json_shell.is_json());
        assert!(!json_shell.use_color());
    }

    #[test]
    fn test_color_choice_parse() {
        assert_eq!("auto".parse::<ColorChoice>().unwrap(), ColorChoice::Auto);
        assert_eq!("NEVER".parse::<ColorChoice>().unwrap(), ColorChoice::Never);
        assert!("sometimes".parse::<ColorChoice>().is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "0.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_status_formatting() {
        let shell = Shell::new(ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Never,
        });

        let formatted = shell.format_status(Status::Deprecated);
        assert_eq!(formatted.trim(), "Deprecated");
        assert_eq!(formatted.len(), 12);
    }

    #[test]
    fn test_from_flags() {
        let shell = Shell::from_flags(true, false, ColorChoice::Never, false);
        assert!(shell.is_quiet());

        // JSON takes precedence
        let shell = Shell::from_flags(true, true, ColorChoice::Never, true);
        assert!(shell.is_json());
        assert!(!shell.is_quiet());
    }
}
