//! Post-install verification.
//!
//! Two independent checks run against an installed prefix:
//!
//! 1. **link**: compile the version harness against the installed headers
//!    and run it, so a mismatched or missing version constant fails.
//! 2. **runtime**: invoke the installed entry point with a no-op command.
//!
//! Both always run. Failures are collected and reported together so the
//! caller can tell "built but not linkable" from "built but not runnable".

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::builder::plan::VerifyPlan;
use crate::core::errors::{CheckFailure, RiggingError, VerificationError, VerifyCheck};
use crate::util::fs::write_string;
use crate::util::process::{find_cxx_compiler, find_executable, CancelToken, ProcessBuilder, StepOutcome};

/// Per-command limit for the harness compile and the entry point.
const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(300);

/// Result of one check.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyStep {
    pub check: VerifyCheck,
    pub passed: bool,
    /// Nothing to check (no harness, or the entry point is inactive).
    pub skipped: bool,
    pub message: String,
    #[serde(serialize_with = "serialize_duration_ms")]
    pub duration: Duration,
}

fn serialize_duration_ms<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl VerifyStep {
    fn pass(check: VerifyCheck, message: impl Into<String>, duration: Duration) -> Self {
        VerifyStep {
            check,
            passed: true,
            skipped: false,
            message: message.into(),
            duration,
        }
    }

    fn fail(check: VerifyCheck, message: impl Into<String>, duration: Duration) -> Self {
        VerifyStep {
            check,
            passed: false,
            skipped: false,
            message: message.into(),
            duration,
        }
    }

    fn skip(check: VerifyCheck, message: impl Into<String>) -> Self {
        VerifyStep {
            check,
            passed: true,
            skipped: true,
            message: message.into(),
            duration: Duration::ZERO,
        }
    }
}

/// A fully passing verification run.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub prefix: PathBuf,
    pub version: String,
    pub steps: Vec<VerifyStep>,
}

pub trait InstallVerifier {
    fn verify(&self, plan: &VerifyPlan) -> Result<VerifyReport, RiggingError>;
}

/// Verifier that compiles and runs real programs.
#[derive(Debug, Clone)]
pub struct PostInstallVerifier {
    /// Overrides the recipe's compiler and `$CXX`.
    compiler: Option<PathBuf>,
    timeout: Duration,
    cancel: CancelToken,
}

impl Default for PostInstallVerifier {
    fn default() -> Self {
        PostInstallVerifier {
            compiler: None,
            timeout: DEFAULT_CHECK_TIMEOUT,
            cancel: CancelToken::new(),
        }
    }
}

impl PostInstallVerifier {
    pub fn new() -> Self {
        PostInstallVerifier::default()
    }

    pub fn with_compiler(mut self, compiler: Option<PathBuf>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stop the running check when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn compiler(&self, plan: &VerifyPlan) -> Option<PathBuf> {
        self.compiler
            .clone()
            .or_else(|| plan.compiler.as_deref().and_then(find_executable))
            .or_else(find_cxx_compiler)
    }

    fn run(&self, cmd: ProcessBuilder) -> Result<(), String> {
        let shown = cmd.display_command();
        tracing::debug!("verify: {}", shown);
        match cmd.exec_with_deadline(Some(self.timeout), &self.cancel) {
            Ok(StepOutcome::Exited { success: true, .. }) => Ok(()),
            Ok(StepOutcome::Exited { code, output, .. }) => Err(format!(
                "`{}` exited with {}\n{}",
                shown,
                code.map_or_else(|| "a signal".to_string(), |c| format!("code {}", c)),
                output.trim_end()
            )),
            Ok(StepOutcome::TimedOut { .. }) => Err(format!(
                "`{}` timed out after {}s",
                shown,
                self.timeout.as_secs()
            )),
            Ok(StepOutcome::Cancelled { .. }) => Err(format!("`{}` was cancelled", shown)),
            Err(e) => Err(format!("{:#}", e)),
        }
    }

    fn link_check(&self, plan: &VerifyPlan) -> VerifyStep {
        let Some(ref source) = plan.harness else {
            return VerifyStep::skip(VerifyCheck::Link, "no version harness declared");
        };
        let started = Instant::now();
        let fail = |message: String| VerifyStep::fail(VerifyCheck::Link, message, started.elapsed());

        let Some(compiler) = self.compiler(plan) else {
            return fail("no C++ compiler found (set CXX or [verify] compiler)".to_string());
        };
        let scratch = match tempfile::Builder::new().prefix("rigging-verify-").tempdir() {
            Ok(dir) => dir,
            Err(e) => return fail(format!("failed to create scratch directory: {}", e)),
        };

        let source_path = scratch.path().join(&plan.harness_name);
        if let Err(e) = write_string(&source_path, source) {
            return fail(format!("{:#}", e));
        }
        let binary = scratch.path().join("harness");
        let include = plan
            .include_dir
            .clone()
            .unwrap_or_else(|| plan.prefix.join("include"));

        let compile = ProcessBuilder::new(&compiler)
            .arg(format!("-I{}", include.display()))
            .arg(&source_path)
            .arg(format!("-L{}", plan.prefix.join("lib").display()))
            .arg("-o")
            .arg(&binary)
            .cwd(scratch.path());
        if let Err(message) = self.run(compile) {
            return fail(message);
        }
        if let Err(message) = self.run(ProcessBuilder::new(&binary).cwd(scratch.path())) {
            return fail(message);
        }

        VerifyStep::pass(
            VerifyCheck::Link,
            format!("version harness reports {}", plan.expected_version),
            started.elapsed(),
        )
    }

    fn runtime_check(&self, plan: &VerifyPlan) -> VerifyStep {
        let Some(ref entry) = plan.entry_point else {
            return VerifyStep::skip(VerifyCheck::Runtime, "no entry point for this configuration");
        };
        let started = Instant::now();

        if !entry.program.exists() {
            return VerifyStep::fail(
                VerifyCheck::Runtime,
                format!("{} is not installed", entry.program.display()),
                started.elapsed(),
            );
        }
        match self.run(ProcessBuilder::new(&entry.program).args(&entry.args)) {
            Ok(()) => VerifyStep::pass(
                VerifyCheck::Runtime,
                format!("{} runs", entry.program.display()),
                started.elapsed(),
            ),
            Err(message) => VerifyStep::fail(VerifyCheck::Runtime, message, started.elapsed()),
        }
    }
}

impl InstallVerifier for PostInstallVerifier {
    fn verify(&self, plan: &VerifyPlan) -> Result<VerifyReport, RiggingError> {
        check_prefix(&plan.prefix)?;

        let steps = vec![self.link_check(plan), self.runtime_check(plan)];
        for step in &steps {
            tracing::info!(
                "{} check: {} ({})",
                step.check,
                if step.skipped { "skipped" } else if step.passed { "ok" } else { "FAILED" },
                step.message.lines().next().unwrap_or_default()
            );
        }
        collect(plan, steps)
    }
}

fn check_prefix(prefix: &Path) -> Result<(), RiggingError> {
    if prefix.is_dir() {
        return Ok(());
    }
    Err(VerificationError {
        failures: vec![CheckFailure {
            check: VerifyCheck::Link,
            message: format!("install prefix {} does not exist", prefix.display()),
        }],
    }
    .into())
}

/// Turn check results into a report, or an error naming every failed check.
pub fn collect(plan: &VerifyPlan, steps: Vec<VerifyStep>) -> Result<VerifyReport, RiggingError> {
    let failures: Vec<CheckFailure> = steps
        .iter()
        .filter(|s| !s.passed)
        .map(|s| CheckFailure {
            check: s.check,
            message: s.message.clone(),
        })
        .collect();
    if !failures.is_empty() {
        return Err(VerificationError { failures }.into());
    }
    Ok(VerifyReport {
        prefix: plan.prefix.clone(),
        version: plan.expected_version.clone(),
        steps,
    })
}
