//! The toolchain boundary.
//!
//! A driver takes a compiled [`BuildPlan`] and runs the external configure,
//! compile and install sequence. It never retries and never downgrades a
//! failure: a non-zero exit comes back as
//! [`RiggingError::ToolchainFailure`] with the captured output attached.

use std::path::PathBuf;
use std::time::Duration;

use crate::builder::plan::BuildPlan;
use crate::core::errors::RiggingError;
use crate::util::process::{CancelToken, StepOutcome};

/// Caller-supplied execution settings.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Unpacked package sources.
    pub source_dir: PathBuf,
    /// Parent for the scratch build directory; the system temp dir if unset.
    pub work_dir: Option<PathBuf>,
    pub jobs: Option<usize>,
    /// Applies to each step separately.
    pub timeout: Option<Duration>,
    pub cancel: CancelToken,
    /// CMake generator, e.g. `Ninja`.
    pub generator: Option<String>,
    /// Explicit cmake binary; looked up on PATH otherwise.
    pub cmake: Option<PathBuf>,
}

impl DriverOptions {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        DriverOptions {
            source_dir: source_dir.into(),
            work_dir: None,
            jobs: None,
            timeout: None,
            cancel: CancelToken::new(),
            generator: None,
            cmake: None,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverOutput {
    /// Captured output of every step, in order.
    pub steps: Vec<(String, String)>,
}

impl DriverOutput {
    pub fn output_of(&self, step: &str) -> Option<&str> {
        self.steps
            .iter()
            .find(|(name, _)| name == step)
            .map(|(_, output)| output.as_str())
    }
}

pub trait ToolchainDriver {
    /// Run configure, compile and install for `plan`. Blocks until done.
    fn execute(&self, plan: &BuildPlan, options: &DriverOptions) -> Result<DriverOutput, RiggingError>;
}

/// Map one step's outcome to the driver contract.
pub fn check_step(step: &str, outcome: StepOutcome, timeout: Option<Duration>) -> Result<String, RiggingError> {
    match outcome {
        StepOutcome::Exited {
            success: true,
            output,
            ..
        } => Ok(output),
        StepOutcome::Exited { code, output, .. } => Err(RiggingError::ToolchainFailure {
            step: step.to_string(),
            status: code,
            output,
        }),
        StepOutcome::TimedOut { output } => Err(RiggingError::ToolchainTimedOut {
            step: step.to_string(),
            after: timeout.unwrap_or_default(),
            output,
        }),
        StepOutcome::Cancelled { output } => Err(RiggingError::ToolchainCancelled {
            step: step.to_string(),
            output,
        }),
    }
}
