//! User-friendly diagnostic messages.
//!
//! Every error names its root cause first, then the identifiers involved,
//! then numbered suggestions.

use std::fmt;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a requested option is not registered.
    pub const LIST_OPTIONS: &str = "Run `rigging options` to list the recipe's options";

    /// Suggestion when a required dependency is absent.
    pub const INSTALL_DEPENDENCY: &str =
        "Install the dependency or mark it present under [dependencies.<name>] in .rigging/config.toml";

    /// Suggestion when environment discovery found nothing.
    pub const MISSING_ARTIFACT: &str =
        "Install the interpreter's development files or disable the option that needs it";

    /// Suggestion when the toolchain fails.
    pub const BUILD_FAILED: &str = "Run `rigging install --verbose` for more details";
}

/// An error message with optional context and suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let label = if color { "\x1b[1;31merror\x1b[0m" } else { "error" };
        output.push_str(&format!("{}: {}\n", label, self.message));

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("mutually exclusive options: python and python3")
            .with_context("options involved: python, python3")
            .with_suggestion("Disable one of them, e.g. `--without python3`");

        let output = diag.format(false);
        assert!(output.starts_with("error: mutually exclusive"));
        assert!(output.contains("  = options involved: python, python3"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Disable one of them"));
    }

    #[test]
    fn test_first_line_is_single_error_line() {
        let diag = Diagnostic::error("unknown option `qt6`").with_context("did you mean: qt5?");
        let first = diag.format(false).lines().next().unwrap().to_string();
        assert_eq!(first, "error: unknown option `qt6`");
    }
}
