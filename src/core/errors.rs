//! Error taxonomy for the resolution pipeline.
//!
//! Every stage fails fast with one of these. The only non-fatal diagnostic
//! in the system is the alias deprecation notice, which is not an error.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// What kind of contradiction a [`ValidationError`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationKind {
    /// Two or more options of a conflict group are active together.
    MutuallyExclusive,
    /// An active dependency's constraint list does not hold.
    Unsatisfiable,
    /// A required dependency was reported absent by the availability probe.
    Unavailable,
    /// The request assigned different values to the same canonical option.
    ConflictingRequest,
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationKind::MutuallyExclusive => "mutually exclusive options",
            ValidationKind::Unsatisfiable => "unsatisfiable requirement",
            ValidationKind::Unavailable => "unavailable dependency",
            ValidationKind::ConflictingRequest => "conflicting request",
        };
        f.write_str(s)
    }
}

/// A contradiction in the requested configuration.
///
/// Always names the option identifiers involved so the caller can point at
/// exactly what to change.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct ValidationError {
    pub kind: ValidationKind,
    pub message: String,
    pub options: Vec<String>,
    pub dependency: Option<String>,
}

impl ValidationError {
    pub fn new(kind: ValidationKind, message: impl Into<String>, options: Vec<String>) -> Self {
        ValidationError {
            kind,
            message: message.into(),
            options,
            dependency: None,
        }
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependency = Some(dependency.into());
        self
    }

    /// Whether this error names the given option identifier.
    pub fn names(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// Which post-install check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyCheck {
    /// Built but not linkable: the version harness failed to compile or run.
    Link,
    /// Built but not runnable: the installed entry point failed.
    Runtime,
}

impl fmt::Display for VerifyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyCheck::Link => f.write_str("link"),
            VerifyCheck::Runtime => f.write_str("runtime"),
        }
    }
}

/// A single failed post-install check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    pub check: VerifyCheck,
    pub message: String,
}

/// Post-install verification failed: the artifact exists but is broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("installed artifact failed the {}", summarize(.failures))]
pub struct VerificationError {
    pub failures: Vec<CheckFailure>,
}

fn summarize(failures: &[CheckFailure]) -> String {
    let checks: Vec<String> = failures.iter().map(|f| format!("{} check", f.check)).collect();
    checks.join(" and ")
}

impl VerificationError {
    pub fn failed(&self, check: VerifyCheck) -> bool {
        self.failures.iter().any(|f| f.check == check)
    }
}

/// Errors produced anywhere in the option → plan → install pipeline.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum RiggingError {
    #[error("unknown option `{option}`")]
    #[diagnostic(code(rigging::options::unknown))]
    UnknownOption {
        option: String,
        suggestions: Vec<String>,
    },

    #[error("option `{option}` is registered more than once")]
    #[diagnostic(code(rigging::options::duplicate))]
    DuplicateOption { option: String },

    #[error("invalid value `{value}` for option `{option}` (expected {expected})")]
    #[diagnostic(code(rigging::options::invalid_value))]
    InvalidOptionValue {
        option: String,
        value: String,
        expected: String,
    },

    #[error("invalid recipe: {message}")]
    #[diagnostic(code(rigging::recipe::invalid))]
    InvalidRecipe { message: String },

    #[error("{0}")]
    #[diagnostic(code(rigging::validate))]
    Validation(#[from] ValidationError),

    #[error("no {artifact} found for `{dependency}`")]
    #[diagnostic(code(rigging::plan::missing_artifact))]
    MissingArtifact {
        dependency: String,
        artifact: String,
        candidates: Vec<String>,
    },

    #[error("unresolved placeholder `{placeholder}` in `{template}`")]
    #[diagnostic(code(rigging::plan::unresolved))]
    UnresolvedPlaceholder { placeholder: String, template: String },

    #[error("build plan invariant violated: {message}")]
    #[diagnostic(code(rigging::plan::invariant))]
    PlanInvariant { message: String },

    #[error("toolchain `{step}` step failed ({})", describe_status(.status))]
    #[diagnostic(code(rigging::toolchain::failed))]
    ToolchainFailure {
        step: String,
        status: Option<i32>,
        output: String,
    },

    #[error("toolchain `{step}` step timed out after {}s", .after.as_secs())]
    #[diagnostic(code(rigging::toolchain::timeout))]
    ToolchainTimedOut {
        step: String,
        after: Duration,
        output: String,
    },

    #[error("toolchain `{step}` step was cancelled")]
    #[diagnostic(code(rigging::toolchain::cancelled))]
    ToolchainCancelled { step: String, output: String },

    #[error("{0}")]
    #[diagnostic(code(rigging::verify))]
    Verification(#[from] VerificationError),

    #[error("{context}: {source}")]
    #[diagnostic(code(rigging::io))]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(rigging::other))]
    Other(#[from] anyhow::Error),
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl RiggingError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RiggingError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_recipe(message: impl Into<String>) -> Self {
        RiggingError::InvalidRecipe {
            message: message.into(),
        }
    }

    /// Process exit code for this error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            RiggingError::UnknownOption { .. }
            | RiggingError::InvalidOptionValue { .. }
            | RiggingError::Validation(_)
            | RiggingError::MissingArtifact { .. } => 2,
            RiggingError::ToolchainFailure { .. }
            | RiggingError::ToolchainTimedOut { .. }
            | RiggingError::ToolchainCancelled { .. } => 3,
            RiggingError::Verification(_) => 4,
            _ => 1,
        }
    }

    /// Captured toolchain output, if this error carries any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            RiggingError::ToolchainFailure { output, .. }
            | RiggingError::ToolchainTimedOut { output, .. }
            | RiggingError::ToolchainCancelled { output, .. } => Some(output.as_str()),
            _ => None,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            RiggingError::UnknownOption { suggestions, .. } => {
                let diag = if suggestions.is_empty() {
                    diag
                } else {
                    diag.with_context(format!("did you mean: {}?", suggestions.join(", ")))
                };
                diag.with_suggestion(suggestions::LIST_OPTIONS)
            }
            RiggingError::Validation(err) => {
                let mut diag = diag;
                if !err.options.is_empty() {
                    diag = diag.with_context(format!("options involved: {}", err.options.join(", ")));
                }
                if let Some(ref dep) = err.dependency {
                    diag = diag.with_context(format!("dependency: {}", dep));
                }
                match err.kind {
                    ValidationKind::MutuallyExclusive => {
                        for option in err.options.iter().skip(1) {
                            diag = diag.with_suggestion(format!("Disable one of them, e.g. `--without {}`", option));
                        }
                        diag
                    }
                    ValidationKind::Unavailable => diag.with_suggestion(suggestions::INSTALL_DEPENDENCY),
                    _ => diag,
                }
            }
            RiggingError::MissingArtifact { candidates, .. } => {
                let mut diag = diag;
                for candidate in candidates {
                    diag = diag.with_context(format!("probed: {}", candidate));
                }
                diag.with_suggestion(suggestions::MISSING_ARTIFACT)
            }
            RiggingError::ToolchainFailure { .. } | RiggingError::ToolchainTimedOut { .. } => {
                diag.with_suggestion(suggestions::BUILD_FAILED)
            }
            RiggingError::Verification(err) => {
                let mut diag = diag;
                for failure in &err.failures {
                    diag = diag.with_context(format!("{} check: {}", failure.check, failure.message));
                }
                diag
            }
            _ => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_diagnostic_names_options() {
        let err = RiggingError::from(ValidationError::new(
            ValidationKind::MutuallyExclusive,
            "cannot build both python and python3 wrappers",
            vec!["python".to_string(), "python3".to_string()],
        ));

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("mutually exclusive"));
        assert!(output.contains("python, python3"));
        assert!(output.contains("--without python3"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_artifact_lists_candidates() {
        let err = RiggingError::MissingArtifact {
            dependency: "python".to_string(),
            artifact: "library".to_string(),
            candidates: vec!["/usr/Python".to_string(), "/usr/lib/libpython2.7.a".to_string()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("no library found for `python`"));
        assert!(output.contains("probed: /usr/Python"));
        assert!(output.contains("probed: /usr/lib/libpython2.7.a"));
    }

    #[test]
    fn test_toolchain_failure_keeps_output() {
        let err = RiggingError::ToolchainFailure {
            step: "configure".to_string(),
            status: Some(2),
            output: "CMake Error at CMakeLists.txt:1".to_string(),
        };

        assert_eq!(err.to_string(), "toolchain `configure` step failed (exit code 2)");
        assert_eq!(err.captured_output(), Some("CMake Error at CMakeLists.txt:1"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_verification_distinguishes_checks() {
        let err = VerificationError {
            failures: vec![CheckFailure {
                check: VerifyCheck::Runtime,
                message: "exit code 1".to_string(),
            }],
        };

        assert!(err.failed(VerifyCheck::Runtime));
        assert!(!err.failed(VerifyCheck::Link));
        assert_eq!(err.to_string(), "installed artifact failed the runtime check");
    }
}
