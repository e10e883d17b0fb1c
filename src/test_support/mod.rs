//! Test doubles for the probe, driver and verifier seams.
//!
//! Every external collaborator of the pipeline sits behind a trait, so unit
//! tests run without a real interpreter, compiler or CMake:
//!
//! ```rust,ignore
//! let probe = FakeProbe::new()
//!     .with_python("python3", "/usr", "3.11")
//!     .with_file("/usr/lib/libpython3.11.so");
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::builder::driver::{DriverOptions, DriverOutput, ToolchainDriver};
use crate::builder::plan::{BuildPlan, VerifyPlan};
use crate::core::dependency::DependencyRequirement;
use crate::core::errors::RiggingError;
use crate::ops::verify::{InstallVerifier, VerifyReport};
use crate::probe::{Availability, DependencyProbe};

/// In-memory host: every dependency is present unless marked absent,
/// and only registered programs and files exist.
#[derive(Debug, Default)]
pub struct FakeProbe {
    absent: BTreeSet<String>,
    prefixes: BTreeMap<String, PathBuf>,
    programs: BTreeMap<String, PathBuf>,
    /// (program file name, snippet substring, answer)
    answers: Vec<(String, String, String)>,
    files: BTreeSet<PathBuf>,
    probed: Mutex<Vec<PathBuf>>,
}

impl FakeProbe {
    pub fn new() -> Self {
        FakeProbe::default()
    }

    pub fn absent(mut self, dependency: &str) -> Self {
        self.absent.insert(dependency.to_string());
        self
    }

    pub fn with_prefix(mut self, dependency: &str, prefix: impl Into<PathBuf>) -> Self {
        self.prefixes.insert(dependency.to_string(), prefix.into());
        self
    }

    pub fn with_program(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.programs.insert(name.to_string(), path.into());
        self
    }

    /// Answer queries to `program` whose arguments contain `needle`.
    pub fn answer(mut self, program: &str, needle: &str, answer: &str) -> Self {
        self.answers
            .push((program.to_string(), needle.to_string(), answer.to_string()));
        self
    }

    /// An interpreter at `<prefix>/bin/<program>` answering the usual
    /// prefix, include and version queries.
    pub fn with_python(self, program: &str, prefix: &str, version: &str) -> Self {
        self.with_program(program, format!("{}/bin/{}", prefix, program))
            .answer(program, "sys.prefix", prefix)
            .answer(program, "get_python_inc", &format!("{}/include/python{}", prefix, version))
            .answer(program, "version_info", version)
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.insert(path.into());
        self
    }

    /// Every path passed to [`DependencyProbe::exists`], in order.
    pub fn probed(&self) -> Vec<PathBuf> {
        self.probed.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl DependencyProbe for FakeProbe {
    fn availability(&self, dep: &DependencyRequirement) -> Availability {
        if self.absent.contains(&dep.name) {
            return Availability::Absent;
        }
        match self.prefixes.get(&dep.name) {
            Some(prefix) => Availability::at(prefix.clone()),
            None => Availability::present(),
        }
    }

    fn locate_program(&self, program: &str) -> Option<PathBuf> {
        self.programs.get(program).cloned()
    }

    fn query(&self, program: &Path, args: &[String]) -> Result<String, String> {
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let joined = args.join(" ");
        self.answers
            .iter()
            .find(|(p, needle, _)| *p == name && joined.contains(needle.as_str()))
            .map(|(_, _, answer)| answer.clone())
            .ok_or_else(|| format!("{}: no answer for `{}`", name, joined))
    }

    fn exists(&self, path: &Path) -> bool {
        if let Ok(mut probed) = self.probed.lock() {
            probed.push(path.to_path_buf());
        }
        self.files.contains(path)
    }
}

/// Shared log of pipeline calls, in order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Driver that records its calls and returns a canned result.
pub struct RecordingDriver {
    log: CallLog,
    fail_with: Option<(String, i32, String)>,
}

impl RecordingDriver {
    pub fn succeeding(log: CallLog) -> Self {
        RecordingDriver {
            log,
            fail_with: None,
        }
    }

    pub fn failing(log: CallLog, step: &str, status: i32, output: &str) -> Self {
        RecordingDriver {
            log,
            fail_with: Some((step.to_string(), status, output.to_string())),
        }
    }
}

impl ToolchainDriver for RecordingDriver {
    fn execute(&self, plan: &BuildPlan, _options: &DriverOptions) -> Result<DriverOutput, RiggingError> {
        if let Ok(mut log) = self.log.lock() {
            log.push(format!("driver:{}", plan.package));
        }
        match self.fail_with {
            Some((ref step, status, ref output)) => Err(RiggingError::ToolchainFailure {
                step: step.clone(),
                status: Some(status),
                output: output.clone(),
            }),
            None => Ok(DriverOutput {
                steps: vec![("install".to_string(), "-- Installing: done".to_string())],
            }),
        }
    }
}

/// Verifier that records its calls and always passes.
pub struct RecordingVerifier {
    log: CallLog,
}

impl RecordingVerifier {
    pub fn new(log: CallLog) -> Self {
        RecordingVerifier { log }
    }
}

impl InstallVerifier for RecordingVerifier {
    fn verify(&self, plan: &VerifyPlan) -> Result<VerifyReport, RiggingError> {
        if let Ok(mut log) = self.log.lock() {
            log.push(format!("verify:{}", plan.prefix.display()));
        }
        Ok(VerifyReport {
            prefix: plan.prefix.clone(),
            version: plan.expected_version.clone(),
            steps: Vec::new(),
        })
    }
}

/// Small recipe without discovery, for pipeline tests.
pub const DEMO_RECIPE: &str = r#"
[package]
name = "demo"
version = "2.3.0"

[[options]]
id = "docs"
description = "Build documentation"

[[options]]
id = "gui"

[[options]]
id = "tui"

[aliases]
with-docs = "docs"

[[conflicts]]
options = ["gui", "tui"]

[[dependencies]]
name = "doxygen"
stage = "build"
when = { enabled = "docs" }

[cmake]
args = ["CMAKE_INSTALL_PREFIX={prefix}"]

[[flags]]
when = { enabled = "docs" }
args = ["BUILD_DOCS=ON"]
otherwise = ["BUILD_DOCS=OFF"]

[[install-extra]]
when = { enabled = "docs" }
from = "docs"
to = "{share}/demo/docs"

[[caveats]]
when = { enabled = "docs" }
message = "Documentation is in {share}/demo/docs"
"#;
