//! Implementation of `rigging install`.
//!
//! Plan, run the toolchain, copy extras, then verify. Each stage only
//! starts once the previous one succeeded; a toolchain failure ends the
//! run before the verifier is ever called.

use std::path::PathBuf;

use crate::builder::driver::{DriverOptions, DriverOutput, ToolchainDriver};
use crate::builder::plan::BuildPlan;
use crate::core::errors::RiggingError;
use crate::core::recipe::Recipe;
use crate::core::registry::OptionRequest;
use crate::ops::resolve::{plan_build, PlanSettings, PlannedBuild};
use crate::ops::verify::{InstallVerifier, VerifyReport};
use crate::probe::DependencyProbe;
use crate::util::fs::copy_dir_all;

/// Options for the install command.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub settings: PlanSettings,
    pub driver: DriverOptions,
    /// Skip the post-install checks
    pub skip_verify: bool,
}

/// Progress reported to the caller between stages.
#[derive(Debug, Clone, Copy)]
pub enum InstallStage<'a> {
    Planned(&'a PlannedBuild),
    Building(&'a BuildPlan),
    CopyingExtra { from: &'a PathBuf, to: &'a PathBuf },
    Verifying(&'a BuildPlan),
}

/// Everything a successful install produced.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub planned: PlannedBuild,
    pub toolchain: DriverOutput,
    pub report: Option<VerifyReport>,
}

impl InstallOutcome {
    /// Advisory messages for the selected options.
    pub fn caveats(&self) -> &[String] {
        &self.planned.plan.caveats
    }
}

pub fn install(
    recipe: &Recipe,
    request: &OptionRequest,
    probe: &dyn DependencyProbe,
    driver: &dyn ToolchainDriver,
    verifier: &dyn InstallVerifier,
    options: &InstallOptions,
    on_stage: &mut dyn FnMut(InstallStage<'_>),
) -> Result<InstallOutcome, RiggingError> {
    let planned = plan_build(recipe, request, probe, &options.settings)?;
    on_stage(InstallStage::Planned(&planned));
    let plan = &planned.plan;

    on_stage(InstallStage::Building(plan));
    let toolchain = driver.execute(plan, &options.driver)?;

    for extra in &plan.extras {
        let from = options.driver.source_dir.join(&extra.from);
        on_stage(InstallStage::CopyingExtra {
            from: &extra.from,
            to: &extra.to,
        });
        if !from.exists() {
            return Err(RiggingError::io(
                format!("extra files {} were not produced", from.display()),
                std::io::ErrorKind::NotFound.into(),
            ));
        }
        copy_dir_all(&from, &extra.to)?;
    }

    let report = if options.skip_verify {
        tracing::info!("skipping post-install verification");
        None
    } else {
        on_stage(InstallStage::Verifying(plan));
        Some(verifier.verify(&plan.verify)?)
    };

    Ok(InstallOutcome {
        planned,
        toolchain,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolved::Platform;
    use crate::test_support::{CallLog, FakeProbe, RecordingDriver, RecordingVerifier, DEMO_RECIPE};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn options(source: &TempDir, prefix: &TempDir) -> InstallOptions {
        InstallOptions {
            settings: PlanSettings::new(prefix.path()).with_platform(Platform::new("linux", "x86_64")),
            driver: DriverOptions::new(source.path()),
            skip_verify: false,
        }
    }

    fn calls(log: &CallLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_stages_run_in_order() {
        let recipe = Recipe::parse(DEMO_RECIPE, "demo").unwrap();
        let source = TempDir::new().unwrap();
        let prefix = TempDir::new().unwrap();
        std::fs::create_dir_all(source.path().join("docs")).unwrap();
        std::fs::write(source.path().join("docs/index.html"), "<html/>").unwrap();

        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut stages = Vec::new();
        let outcome = install(
            &recipe,
            &OptionRequest::new().enable("docs"),
            &FakeProbe::new(),
            &RecordingDriver::succeeding(log.clone()),
            &RecordingVerifier::new(log.clone()),
            &options(&source, &prefix),
            &mut |stage| {
                stages.push(match stage {
                    InstallStage::Planned(_) => "planned",
                    InstallStage::Building(_) => "building",
                    InstallStage::CopyingExtra { .. } => "copying",
                    InstallStage::Verifying(_) => "verifying",
                })
            },
        )
        .unwrap();

        assert_eq!(stages, vec!["planned", "building", "copying", "verifying"]);
        assert_eq!(
            calls(&log),
            vec![
                "driver:demo".to_string(),
                format!("verify:{}", prefix.path().display())
            ]
        );
        assert!(prefix.path().join("share/demo/docs/index.html").exists());
        assert_eq!(outcome.caveats().len(), 1);
        assert!(outcome.report.is_some());
    }

    #[test]
    fn test_toolchain_failure_skips_verifier() {
        let recipe = Recipe::parse(DEMO_RECIPE, "demo").unwrap();
        let source = TempDir::new().unwrap();
        let prefix = TempDir::new().unwrap();

        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let err = install(
            &recipe,
            &OptionRequest::new(),
            &FakeProbe::new(),
            &RecordingDriver::failing(log.clone(), "build", 2, "make: *** [all] Error 2"),
            &RecordingVerifier::new(log.clone()),
            &options(&source, &prefix),
            &mut |_| {},
        )
        .unwrap_err();

        assert_eq!(err.captured_output(), Some("make: *** [all] Error 2"));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(calls(&log), vec!["driver:demo".to_string()]);
    }

    #[test]
    fn test_validation_error_never_reaches_driver() {
        let recipe = Recipe::parse(DEMO_RECIPE, "demo").unwrap();
        let source = TempDir::new().unwrap();
        let prefix = TempDir::new().unwrap();

        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let err = install(
            &recipe,
            &OptionRequest::new().enable("gui").enable("tui"),
            &FakeProbe::new(),
            &RecordingDriver::succeeding(log.clone()),
            &RecordingVerifier::new(log.clone()),
            &options(&source, &prefix),
            &mut |_| {},
        )
        .unwrap_err();

        assert!(matches!(err, RiggingError::Validation(ref e) if e.names("gui") && e.names("tui")));
        assert!(calls(&log).is_empty());
    }

    #[test]
    fn test_unavailable_dependency_never_reaches_driver() {
        let recipe = Recipe::parse(DEMO_RECIPE, "demo").unwrap();
        let source = TempDir::new().unwrap();
        let prefix = TempDir::new().unwrap();

        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let err = install(
            &recipe,
            &OptionRequest::new().enable("with-docs"),
            &FakeProbe::new().absent("doxygen"),
            &RecordingDriver::succeeding(log.clone()),
            &RecordingVerifier::new(log.clone()),
            &options(&source, &prefix),
            &mut |_| {},
        )
        .unwrap_err();

        assert!(matches!(err, RiggingError::Validation(ref e) if e.dependency.as_deref() == Some("doxygen")));
        assert!(calls(&log).is_empty());
    }

    #[test]
    fn test_missing_extra_source_fails_before_verify() {
        let recipe = Recipe::parse(DEMO_RECIPE, "demo").unwrap();
        let source = TempDir::new().unwrap();
        let prefix = TempDir::new().unwrap();

        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let err = install(
            &recipe,
            &OptionRequest::new().enable("docs"),
            &FakeProbe::new(),
            &RecordingDriver::succeeding(log.clone()),
            &RecordingVerifier::new(log.clone()),
            &options(&source, &prefix),
            &mut |_| {},
        )
        .unwrap_err();

        assert!(err.to_string().contains("docs"));
        assert_eq!(calls(&log), vec!["driver:demo".to_string()]);
    }

    #[test]
    fn test_skip_verify() {
        let recipe = Recipe::parse(DEMO_RECIPE, "demo").unwrap();
        let source = TempDir::new().unwrap();
        let prefix = TempDir::new().unwrap();
        let mut opts = options(&source, &prefix);
        opts.skip_verify = true;

        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let outcome = install(
            &recipe,
            &OptionRequest::new(),
            &FakeProbe::new(),
            &RecordingDriver::succeeding(log.clone()),
            &RecordingVerifier::new(log.clone()),
            &opts,
            &mut |_| {},
        )
        .unwrap();

        assert!(outcome.report.is_none());
        assert_eq!(calls(&log), vec!["driver:demo".to_string()]);
    }
}
