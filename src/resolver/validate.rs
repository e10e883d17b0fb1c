//! Conflict validation.
//!
//! Runs after the dependency graph is built and before anything touches the
//! toolchain. Checks run in a fixed order so the same bad request always
//! reports the same error: conflict groups first, then dependency
//! constraints, then availability of required dependencies.

use crate::core::dependency::DependencyRequirement;
use crate::core::errors::{RiggingError, ValidationError, ValidationKind};
use crate::core::recipe::{ConflictRule, Recipe};
use crate::core::resolved::ResolvedOptions;
use crate::probe::{Availability, DependencyProbe};

pub struct ConflictValidator<'a> {
    conflicts: &'a [ConflictRule],
    probe: &'a dyn DependencyProbe,
}

impl<'a> ConflictValidator<'a> {
    pub fn new(conflicts: &'a [ConflictRule], probe: &'a dyn DependencyProbe) -> Self {
        ConflictValidator { conflicts, probe }
    }

    /// Accept the configuration or report the first contradiction found.
    pub fn validate(
        &self,
        opts: &ResolvedOptions,
        requirements: &[DependencyRequirement],
    ) -> Result<(), ValidationError> {
        validate_rules(self.conflicts, opts, requirements)?;
        self.check_availability(requirements)?;
        tracing::debug!("configuration accepted ({} dependencies)", requirements.len());
        Ok(())
    }

    fn check_availability(&self, requirements: &[DependencyRequirement]) -> Result<(), ValidationError> {
        for dep in requirements {
            if self.probe.availability(dep) != Availability::Absent {
                continue;
            }
            if !dep.required {
                tracing::warn!("optional dependency `{}` not found; continuing without it", dep.name);
                continue;
            }

            let message = if dep.activated_by.is_empty() {
                format!("`{}` is required but was not found", dep.name)
            } else {
                format!(
                    "`{}` is required by {} but was not found",
                    dep.name,
                    dep.activated_by
                        .iter()
                        .map(|id| format!("`{}`", id))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            };
            return Err(ValidationError::new(
                ValidationKind::Unavailable,
                message,
                dep.activated_by.clone(),
            )
            .with_dependency(&dep.name));
        }
        Ok(())
    }
}

/// Conflict groups then dependency constraints, without consulting a probe.
pub fn validate_rules(
    conflicts: &[ConflictRule],
    opts: &ResolvedOptions,
    requirements: &[DependencyRequirement],
) -> Result<(), ValidationError> {
    check_conflicts(conflicts, opts)?;
    check_constraints(opts, requirements)
}

fn check_conflicts(conflicts: &[ConflictRule], opts: &ResolvedOptions) -> Result<(), ValidationError> {
    for group in conflicts {
        let active: Vec<String> = group
            .options
            .iter()
            .filter(|id| opts.is_enabled(id))
            .cloned()
            .collect();
        if active.len() < 2 {
            continue;
        }

        let listed = active
            .iter()
            .map(|id| format!("`{}`", id))
            .collect::<Vec<_>>()
            .join(", ");
        let message = match group.message {
            Some(ref reason) => format!("{} are all enabled; {}", listed, reason),
            None => format!("{} cannot be enabled together", listed),
        };
        return Err(ValidationError::new(
            ValidationKind::MutuallyExclusive,
            message,
            active,
        ));
    }
    Ok(())
}

fn check_constraints(
    opts: &ResolvedOptions,
    requirements: &[DependencyRequirement],
) -> Result<(), ValidationError> {
    for dep in requirements {
        for constraint in &dep.constraints {
            if constraint.evaluate(opts) {
                continue;
            }
            let options = constraint.options().into_iter().map(str::to_string).collect();
            return Err(ValidationError::new(
                ValidationKind::Unsatisfiable,
                format!("`{}` requires {}", dep.name, constraint),
                options,
            )
            .with_dependency(&dep.name));
        }
    }
    Ok(())
}

/// Static consistency checks run once when a recipe is loaded.
///
/// Every predicate must reference declared options only, conflict groups
/// must name at least two switches, and discovery selectors must be
/// switches so "exactly one active" is meaningful.
pub fn check_recipe(recipe: &Recipe) -> Result<(), RiggingError> {
    let registry = &recipe.registry;
    let fail = |section: String, reason: String| {
        RiggingError::invalid_recipe(format!("{}: {}", section, reason))
    };

    for (i, group) in recipe.conflicts.iter().enumerate() {
        let section = format!("conflict group #{}", i + 1);
        if group.options.len() < 2 {
            return Err(fail(section, "needs at least two options".to_string()));
        }
        for id in &group.options {
            match registry.get(id) {
                Some(decl) if decl.is_switch() => {}
                Some(_) => return Err(fail(section, format!("`{}` is not a switch", id))),
                None => return Err(fail(section, format!("unknown option `{}`", id))),
            }
        }
    }

    for rule in &recipe.dependencies {
        let section = format!("dependency `{}`", rule.name);
        if rule.name.trim().is_empty() {
            return Err(RiggingError::invalid_recipe("dependency with an empty name"));
        }
        rule.when.check(registry).map_err(|e| fail(section.clone(), e))?;
        for constraint in &rule.constraints {
            constraint.check(registry).map_err(|e| fail(section.clone(), e))?;
        }
    }

    for (i, flag) in recipe.flags.iter().enumerate() {
        flag.when
            .check(registry)
            .map_err(|e| fail(format!("flag rule #{}", i + 1), e))?;
    }

    for rule in &recipe.discovery {
        let section = format!("discovery `{}`", rule.name);
        rule.when.check(registry).map_err(|e| fail(section.clone(), e))?;
        if rule.select.is_empty() {
            return Err(fail(section, "`select` names no options".to_string()));
        }
        for id in rule.select.keys() {
            match registry.get(id) {
                Some(decl) if decl.is_switch() => {}
                Some(_) => return Err(fail(section, format!("selector `{}` is not a switch", id))),
                None => return Err(fail(section, format!("unknown option `{}`", id))),
            }
        }
        if let Some(ref artifact) = rule.artifact {
            if artifact.candidates.is_empty() {
                return Err(fail(section, format!("no candidates for `{}`", artifact.name)));
            }
        }
    }

    for (i, caveat) in recipe.caveats.iter().enumerate() {
        caveat
            .when
            .check(registry)
            .map_err(|e| fail(format!("caveat #{}", i + 1), e))?;
    }

    for extra in &recipe.install_extra {
        extra
            .when
            .check(registry)
            .map_err(|e| fail(format!("install-extra `{}`", extra.from), e))?;
    }

    if let Some(entry) = recipe.test.as_ref().and_then(|t| t.entry_point.as_ref()) {
        entry
            .when
            .check(registry)
            .map_err(|e| fail(format!("test entry point `{}`", entry.path), e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::OptionRequest;
    use crate::core::resolved::Platform;
    use crate::resolver::graph::DependencyGraphBuilder;
    use crate::test_support::FakeProbe;

    fn validate(recipe: &Recipe, probe: &FakeProbe, request: OptionRequest) -> Result<(), ValidationError> {
        let opts = recipe
            .registry
            .resolve_on(&request, Platform::new("linux", "x86_64"))
            .unwrap()
            .options;
        let reqs = DependencyGraphBuilder::new(&recipe.dependencies).build(&opts);
        ConflictValidator::new(&recipe.conflicts, probe).validate(&opts, &reqs)
    }

    #[test]
    fn test_bundled_recipe_defaults_accepted() {
        let recipe = Recipe::bundled().unwrap();
        assert!(validate(&recipe, &FakeProbe::new(), OptionRequest::new()).is_ok());
    }

    #[test]
    fn test_python_and_python3_exclusive() {
        let recipe = Recipe::bundled().unwrap();
        let err = validate(
            &recipe,
            &FakeProbe::new(),
            OptionRequest::new().enable("python").enable("python3"),
        )
        .unwrap_err();

        assert_eq!(err.kind, ValidationKind::MutuallyExclusive);
        assert!(err.names("python"));
        assert!(err.names("python3"));
        assert!(err.message.contains("both python 2 and 3"));
    }

    #[test]
    fn test_python3_alone_hits_default_python() {
        // python defaults on, so asking for python3 without disabling it conflicts
        let recipe = Recipe::bundled().unwrap();
        let err = validate(&recipe, &FakeProbe::new(), OptionRequest::new().enable("python3")).unwrap_err();
        assert_eq!(err.kind, ValidationKind::MutuallyExclusive);

        let ok = validate(
            &recipe,
            &FakeProbe::new(),
            OptionRequest::new().enable("python3").disable("python"),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_conflict_checked_before_availability() {
        let recipe = Recipe::bundled().unwrap();
        let probe = FakeProbe::new().absent("pyqt5");
        let err = validate(
            &recipe,
            &probe,
            OptionRequest::new().enable("qt5").enable("python3"),
        )
        .unwrap_err();
        assert_eq!(err.kind, ValidationKind::MutuallyExclusive);
    }

    #[test]
    fn test_unavailable_names_dependency_and_options() {
        let recipe = Recipe::bundled().unwrap();
        let probe = FakeProbe::new().absent("pyqt5");
        let err = validate(&recipe, &probe, OptionRequest::new().enable("qt5")).unwrap_err();

        assert_eq!(err.kind, ValidationKind::Unavailable);
        assert_eq!(err.dependency.as_deref(), Some("pyqt5"));
        assert!(err.names("qt5"));
    }

    #[test]
    fn test_optional_absent_dependency_is_tolerated() {
        let recipe = Recipe::parse(
            r#"
            [package]
            name = "demo"
            version = "1.0.0"

            [[dependencies]]
            name = "doxygen"
            required = false
            "#,
            "test",
        )
        .unwrap();
        let probe = FakeProbe::new().absent("doxygen");
        assert!(validate(&recipe, &probe, OptionRequest::new()).is_ok());
    }

    #[test]
    fn test_unsatisfiable_constraint() {
        let recipe = Recipe::parse(
            r#"
            [package]
            name = "demo"
            version = "1.0.0"

            [[options]]
            id = "qt5"

            [[options]]
            id = "python"

            [[options]]
            id = "python3"

            [[dependencies]]
            name = "sip"
            when = { enabled = "qt5" }
            constraints = [{ exactly-one = ["python", "python3"] }]
            "#,
            "test",
        )
        .unwrap();

        let err = validate(&recipe, &FakeProbe::new(), OptionRequest::new().enable("qt5")).unwrap_err();
        assert_eq!(err.kind, ValidationKind::Unsatisfiable);
        assert_eq!(err.dependency.as_deref(), Some("sip"));
        assert_eq!(err.options, vec!["python", "python3"]);
    }

    #[test]
    fn test_recipe_with_unknown_option_rejected() {
        let err = Recipe::parse(
            r#"
            [package]
            name = "demo"
            version = "1.0.0"

            [[dependencies]]
            name = "qt5"
            when = { enabled = "qt" }
            "#,
            "test",
        )
        .unwrap_err();
        assert!(err.to_string().contains("dependency `qt5`: unknown option `qt`"));
    }

    #[test]
    fn test_conflict_group_needs_two_switches() {
        let err = Recipe::parse(
            r#"
            [package]
            name = "demo"
            version = "1.0.0"

            [[options]]
            id = "python"

            [[conflicts]]
            options = ["python"]
            "#,
            "test",
        )
        .unwrap_err();
        assert!(err.to_string().contains("at least two options"));
    }

    #[test]
    fn test_discovery_selector_must_be_switch() {
        let err = Recipe::parse(
            r#"
            [package]
            name = "demo"
            version = "1.0.0"

            [[options]]
            id = "window-system"
            choices = ["native", "x11"]

            [[discovery]]
            name = "python"
            select = { window-system = "python" }
            "#,
            "test",
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a switch"));
    }
}
