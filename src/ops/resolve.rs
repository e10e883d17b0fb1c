//! Request → validated configuration → build plan.

use std::path::PathBuf;

use crate::builder::plan::{BuildPlan, PlanCompiler};
use crate::core::errors::RiggingError;
use crate::core::recipe::Recipe;
use crate::core::registry::{DeprecationNotice, OptionRequest};
use crate::core::resolved::{Platform, ResolvedConfiguration};
use crate::probe::DependencyProbe;
use crate::resolver::{validate_rules, ConflictValidator, DependencyGraphBuilder};

/// Where and for which host a plan is compiled.
#[derive(Debug, Clone)]
pub struct PlanSettings {
    pub prefix: PathBuf,
    pub platform: Platform,
}

impl PlanSettings {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        PlanSettings {
            prefix: prefix.into(),
            platform: Platform::host(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }
}

/// A validated configuration and the notices produced while resolving it.
#[derive(Debug, Clone)]
pub struct Configured {
    pub config: ResolvedConfiguration,
    pub notices: Vec<DeprecationNotice>,
}

/// Resolve options, build the dependency graph and validate the result.
///
/// Fails before anything is compiled or executed.
pub fn resolve_configuration(
    recipe: &Recipe,
    request: &OptionRequest,
    probe: &dyn DependencyProbe,
    platform: Platform,
) -> Result<Configured, RiggingError> {
    let resolution = recipe.registry.resolve_on(request, platform)?;
    let requirements = DependencyGraphBuilder::new(&recipe.dependencies).build(&resolution.options);
    ConflictValidator::new(&recipe.conflicts, probe).validate(&resolution.options, &requirements)?;

    Ok(Configured {
        config: ResolvedConfiguration::new(resolution.options, requirements),
        notices: resolution.notices,
    })
}

/// Resolve options and the requirements they activate, checking conflicts
/// and constraints but not whether any dependency is installed.
pub fn resolve_requirements(
    recipe: &Recipe,
    request: &OptionRequest,
    platform: Platform,
) -> Result<Configured, RiggingError> {
    let resolution = recipe.registry.resolve_on(request, platform)?;
    let requirements = DependencyGraphBuilder::new(&recipe.dependencies).build(&resolution.options);
    validate_rules(&recipe.conflicts, &resolution.options, &requirements)?;

    Ok(Configured {
        config: ResolvedConfiguration::new(resolution.options, requirements),
        notices: resolution.notices,
    })
}

/// A compiled plan together with the configuration it came from.
#[derive(Debug, Clone)]
pub struct PlannedBuild {
    pub config: ResolvedConfiguration,
    pub plan: BuildPlan,
    pub notices: Vec<DeprecationNotice>,
}

pub fn plan_build(
    recipe: &Recipe,
    request: &OptionRequest,
    probe: &dyn DependencyProbe,
    settings: &PlanSettings,
) -> Result<PlannedBuild, RiggingError> {
    let Configured { config, notices } =
        resolve_configuration(recipe, request, probe, settings.platform.clone())?;
    let plan = PlanCompiler::new(recipe, probe).compile(&config, &settings.prefix)?;
    Ok(PlannedBuild {
        config,
        plan,
        notices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ValidationKind;
    use crate::test_support::FakeProbe;

    fn settings() -> PlanSettings {
        PlanSettings::new("/opt/vtk").with_platform(Platform::new("linux", "x86_64"))
    }

    #[test]
    fn test_alias_and_canonical_plan_identically() {
        let recipe = Recipe::bundled().unwrap();
        let probe = FakeProbe::new()
            .with_python("python", "/usr", "2.7")
            .with_file("/usr/lib/libpython2.7.so")
            .with_prefix("pyqt5", "/opt/pyqt5");

        let canonical = plan_build(
            &recipe,
            &OptionRequest::new().enable("qt5").enable("examples"),
            &probe,
            &settings(),
        )
        .unwrap();
        let aliased = plan_build(
            &recipe,
            &OptionRequest::new().enable("with-qt@5.7").enable("with-examples"),
            &probe,
            &settings(),
        )
        .unwrap();

        assert_eq!(canonical.config, aliased.config);
        assert_eq!(canonical.plan, aliased.plan);
        assert!(canonical.notices.is_empty());
        assert_eq!(aliased.notices.len(), 2);
    }

    #[test]
    fn test_qt5_python2_requirements() {
        let recipe = Recipe::bundled().unwrap();
        let probe = FakeProbe::new()
            .with_python("python", "/usr", "2.7")
            .with_file("/usr/lib/libpython2.7.so")
            .with_prefix("pyqt5", "/opt/pyqt5");

        let planned = plan_build(
            &recipe,
            &OptionRequest::new().enable("qt5").enable("python"),
            &probe,
            &settings(),
        )
        .unwrap();

        let sip = planned.config.requirement("sip").unwrap();
        assert!(sip.options.is_empty());
        let pyqt5 = planned.config.requirement("pyqt5").unwrap();
        assert_eq!(pyqt5.options, vec!["with-python", "without-python3"]);
        assert_eq!(planned.plan.arg("VTK_WRAP_PYTHON_SIP"), Some("ON"));
    }

    #[test]
    fn test_qt5_python3_requirements() {
        let recipe = Recipe::bundled().unwrap();
        let probe = FakeProbe::new()
            .with_python("python3", "/usr", "3.6")
            .with_file("/usr/lib/libpython3.6.so")
            .with_prefix("pyqt5", "/opt/pyqt5");

        let planned = plan_build(
            &recipe,
            &OptionRequest::new().enable("qt5").enable("python3").disable("python"),
            &probe,
            &settings(),
        )
        .unwrap();

        let sip = planned.config.requirement("sip").unwrap();
        assert_eq!(sip.options, vec!["with-python3", "without-python"]);
        let pyqt5 = planned.config.requirement("pyqt5").unwrap();
        assert!(pyqt5.options.is_empty());
        assert_eq!(planned.plan.arg("PYTHON_LIBRARY"), Some("/usr/lib/libpython3.6.so"));
    }

    #[test]
    fn test_both_pythons_fail_before_compilation() {
        let recipe = Recipe::bundled().unwrap();
        // nothing discoverable: reaching the compiler would raise MissingArtifact
        let probe = FakeProbe::new();

        let err = plan_build(
            &recipe,
            &OptionRequest::new().enable("qt5").enable("python").enable("python3"),
            &probe,
            &settings(),
        )
        .unwrap_err();

        match err {
            RiggingError::Validation(err) => {
                assert_eq!(err.kind, ValidationKind::MutuallyExclusive);
                assert_eq!(err.options, vec!["python", "python3"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(probe.probed().is_empty());
    }

    #[test]
    fn test_requirements_without_availability() {
        let recipe = Recipe::bundled().unwrap();
        let request = OptionRequest::new().enable("qt5");

        let configured = resolve_requirements(&recipe, &request, Platform::new("linux", "x86_64")).unwrap();
        assert!(configured.config.requirement("qt5").is_some());

        let err = resolve_configuration(
            &recipe,
            &request,
            &FakeProbe::new().absent("qt5"),
            Platform::new("linux", "x86_64"),
        )
        .unwrap_err();
        assert!(matches!(err, RiggingError::Validation(ref e) if e.kind == ValidationKind::Unavailable));

        let err = resolve_requirements(
            &recipe,
            &OptionRequest::new().enable("python").enable("python3"),
            Platform::new("linux", "x86_64"),
        )
        .unwrap_err();
        assert!(matches!(err, RiggingError::Validation(ref e) if e.kind == ValidationKind::MutuallyExclusive));
    }

    #[test]
    fn test_unknown_option_suggests() {
        let recipe = Recipe::bundled().unwrap();
        let err = plan_build(
            &recipe,
            &OptionRequest::new().enable("qt6"),
            &FakeProbe::new(),
            &settings(),
        )
        .unwrap_err();
        match err {
            RiggingError::UnknownOption { option, suggestions } => {
                assert_eq!(option, "qt6");
                assert!(suggestions.contains(&"qt5".to_string()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
