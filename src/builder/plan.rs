//! Build plan compilation.
//!
//! A [`BuildPlan`] is the fully resolved, deterministic input to the
//! toolchain: every argument value is concrete, every environment lookup has
//! already happened, and the order of arguments is fixed by the recipe.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::builder::template::TemplateContext;
use crate::core::dependency::Arg;
use crate::core::errors::RiggingError;
use crate::core::recipe::{DiscoveryRule, Recipe};
use crate::core::resolved::{ResolvedConfiguration, ResolvedOptions};
use crate::probe::DependencyProbe;

/// A shell-outable discovery step run while compiling the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreStep {
    /// Name the result is bound to, e.g. `python.include`.
    pub binding: String,
    pub command: Vec<String>,
    pub result: String,
}

/// A directory from the source tree copied into the prefix after install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallCopy {
    /// Relative to the source tree.
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Installed executable invoked with a no-op command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// The post-install checks this build should pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyPlan {
    pub prefix: PathBuf,
    pub expected_version: String,
    pub include_dir: Option<PathBuf>,
    pub compiler: Option<String>,
    pub harness_name: String,
    pub harness: Option<String>,
    pub entry_point: Option<EntryCommand>,
}

impl VerifyPlan {
    /// Derive the checks from the recipe's `[test]` section.
    pub fn from_recipe(recipe: &Recipe, opts: &ResolvedOptions, prefix: &Path) -> Result<Self, RiggingError> {
        let version = recipe.package.version()?;
        let substitute = |s: &str| {
            s.replace("{major}", &version.major.to_string())
                .replace("{minor}", &version.minor.to_string())
                .replace("{patch}", &version.patch.to_string())
        };

        let mut plan = VerifyPlan {
            prefix: prefix.to_path_buf(),
            expected_version: recipe.package.version.clone(),
            include_dir: None,
            compiler: None,
            harness_name: "harness.cpp".to_string(),
            harness: None,
            entry_point: None,
        };

        let Some(ref test) = recipe.test else {
            return Ok(plan);
        };

        plan.include_dir = test.include_dir.as_deref().map(|dir| prefix.join(substitute(dir)));
        plan.compiler = test.compiler.clone();
        plan.harness_name = test.source_name.clone();
        plan.harness = test.program.as_deref().map(substitute);
        plan.entry_point = test
            .entry_point
            .as_ref()
            .filter(|entry| entry.when.evaluate(opts))
            .map(|entry| EntryCommand {
                program: prefix.join(&entry.path),
                args: entry.args.clone(),
            });

        Ok(plan)
    }
}

/// Everything the toolchain driver and verifier need for one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    pub package: String,
    pub version: String,
    pub prefix: PathBuf,
    /// Configure arguments, in emission order.
    pub args: Vec<Arg>,
    /// Environment applied to every toolchain step.
    pub env: Vec<Arg>,
    pub pre_steps: Vec<PreStep>,
    pub caveats: Vec<String>,
    pub extras: Vec<InstallCopy>,
    pub verify: VerifyPlan,
}

impl BuildPlan {
    /// Arguments as passed to `cmake`, e.g. `-DBUILD_SHARED_LIBS=ON`.
    pub fn configure_args(&self) -> Vec<String> {
        self.args.iter().map(|arg| format!("-D{}", arg)).collect()
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// Compiles a validated configuration into a [`BuildPlan`].
pub struct PlanCompiler<'a> {
    recipe: &'a Recipe,
    probe: &'a dyn DependencyProbe,
}

impl<'a> PlanCompiler<'a> {
    pub fn new(recipe: &'a Recipe, probe: &'a dyn DependencyProbe) -> Self {
        PlanCompiler { recipe, probe }
    }

    pub fn compile(&self, config: &ResolvedConfiguration, prefix: &Path) -> Result<BuildPlan, RiggingError> {
        let opts = config.options();
        self.assert_no_conflicts(opts)?;

        let mut ctx = self.base_context(opts, prefix)?;
        for dep in config.requirements() {
            if let Some(dep_prefix) = self.probe.availability(dep).prefix() {
                ctx.bind(format!("dep.{}.prefix", dep.name), dep_prefix.display().to_string());
            }
        }

        // Discovery first so its bindings are visible to every template.
        let mut pre_steps = Vec::new();
        let mut active_discovery = Vec::new();
        for rule in &self.recipe.discovery {
            if rule.when.evaluate(opts) {
                self.discover(rule, opts, &mut ctx, &mut pre_steps)?;
                active_discovery.push(rule);
            }
        }

        let mut args = ArgList::default();
        let mut env = ArgList::default();

        for arg in &self.recipe.cmake.args {
            args.push(expand_arg(&ctx, arg)?)?;
        }
        for flag in &self.recipe.flags {
            let holds = flag.when.evaluate(opts);
            let emitted = if holds { &flag.args } else { &flag.otherwise };
            for arg in emitted {
                args.push(expand_arg(&ctx, arg)?)?;
            }
            if holds {
                for var in &flag.env {
                    env.push(expand_arg(&ctx, var)?)?;
                }
            }
        }
        for dep in config.requirements() {
            for arg in &dep.args {
                args.push(expand_arg(&ctx, arg)?)?;
            }
        }
        for rule in active_discovery {
            for arg in &rule.args {
                args.push(expand_arg(&ctx, arg)?)?;
            }
        }

        let mut caveats = Vec::new();
        for caveat in &self.recipe.caveats {
            if caveat.when.evaluate(opts) {
                caveats.push(ctx.expand(&caveat.message)?);
            }
        }

        let mut extras = Vec::new();
        for extra in &self.recipe.install_extra {
            if extra.when.evaluate(opts) {
                extras.push(InstallCopy {
                    from: PathBuf::from(&extra.from),
                    to: PathBuf::from(ctx.expand(&extra.to)?),
                });
            }
        }

        let plan = BuildPlan {
            package: self.recipe.package.name.clone(),
            version: self.recipe.package.version.clone(),
            prefix: prefix.to_path_buf(),
            args: args.0,
            env: env.0,
            pre_steps,
            caveats,
            extras,
            verify: VerifyPlan::from_recipe(self.recipe, opts, prefix)?,
        };
        tracing::debug!(
            "compiled plan for {} {}: {} args, {} pre-steps",
            plan.package,
            plan.version,
            plan.args.len(),
            plan.pre_steps.len()
        );
        Ok(plan)
    }

    /// The validator already rejects these; reaching one here is a bug.
    fn assert_no_conflicts(&self, opts: &ResolvedOptions) -> Result<(), RiggingError> {
        for group in &self.recipe.conflicts {
            let active: Vec<&str> = group
                .options
                .iter()
                .filter(|id| opts.is_enabled(id))
                .map(String::as_str)
                .collect();
            if active.len() > 1 {
                return Err(RiggingError::PlanInvariant {
                    message: format!("exclusive options reached the compiler together: {}", active.join(", ")),
                });
            }
        }
        Ok(())
    }

    fn base_context(&self, opts: &ResolvedOptions, prefix: &Path) -> Result<TemplateContext, RiggingError> {
        let version = self.recipe.package.version()?;
        let platform = opts.platform();

        let mut ctx = TemplateContext::new();
        ctx.bind("prefix", prefix.display().to_string());
        for dir in ["lib", "include", "share", "bin"] {
            ctx.bind(dir, prefix.join(dir).display().to_string());
        }
        ctx.bind("version", version.to_string());
        ctx.bind("major", version.major.to_string());
        ctx.bind("minor", version.minor.to_string());
        ctx.bind("os", platform.os.clone());
        ctx.bind("arch", platform.arch.clone());
        ctx.bind("dylib", platform.dylib_extension());
        Ok(ctx)
    }

    fn discover(
        &self,
        rule: &DiscoveryRule,
        opts: &ResolvedOptions,
        ctx: &mut TemplateContext,
        pre_steps: &mut Vec<PreStep>,
    ) -> Result<(), RiggingError> {
        let selected: Vec<(&String, &String)> = rule
            .select
            .iter()
            .filter(|(id, _)| opts.is_enabled(id))
            .collect();
        let [(option, program)] = selected.as_slice() else {
            return Err(RiggingError::PlanInvariant {
                message: format!(
                    "discovery `{}` needs exactly one of [{}] enabled, found {}",
                    rule.name,
                    rule.select.keys().cloned().collect::<Vec<_>>().join(", "),
                    selected.len()
                ),
            });
        };
        tracing::debug!("discovering `{}` via `{}` (selected by {})", rule.name, program, option);

        let executable = self
            .probe
            .locate_program(program)
            .ok_or_else(|| RiggingError::MissingArtifact {
                dependency: rule.name.clone(),
                artifact: format!("`{}` executable", program),
                candidates: vec![format!("{} on PATH", program)],
            })?;
        ctx.bind(format!("{}.executable", rule.name), executable.display().to_string());

        for (query, snippet) in &rule.queries {
            let binding = format!("{}.{}", rule.name, query);
            let query_args = vec![rule.query_flag.clone(), snippet.clone()];
            let result = self.probe.query(&executable, &query_args).map_err(|reason| {
                RiggingError::MissingArtifact {
                    dependency: rule.name.clone(),
                    artifact: format!("{} ({})", binding, reason.trim()),
                    candidates: vec![executable.display().to_string()],
                }
            })?;

            let mut command = vec![executable.display().to_string()];
            command.extend(query_args);
            ctx.bind(binding.clone(), result.clone());
            pre_steps.push(PreStep {
                binding,
                command,
                result,
            });
        }

        if let Some(ref artifact) = rule.artifact {
            let mut probed = Vec::with_capacity(artifact.candidates.len());
            let mut found = None;
            for candidate in &artifact.candidates {
                let path = ctx.expand(candidate)?;
                probed.push(path.clone());
                if self.probe.exists(Path::new(&path)) {
                    found = Some(path);
                    break;
                }
            }
            match found {
                Some(path) => {
                    tracing::debug!("{}.{} = {}", rule.name, artifact.name, path);
                    ctx.bind(format!("{}.{}", rule.name, artifact.name), path);
                }
                None => {
                    return Err(RiggingError::MissingArtifact {
                        dependency: rule.name.clone(),
                        artifact: artifact.name.clone(),
                        candidates: probed,
                    })
                }
            }
        }

        Ok(())
    }
}

fn expand_arg(ctx: &TemplateContext, arg: &Arg) -> Result<Arg, RiggingError> {
    Ok(Arg::new(ctx.expand(&arg.key)?, ctx.expand(&arg.value)?))
}

/// Ordered arguments where each key is assigned at most once.
#[derive(Default)]
struct ArgList(Vec<Arg>);

impl ArgList {
    fn push(&mut self, arg: Arg) -> Result<(), RiggingError> {
        match self.0.iter().find(|a| a.key == arg.key) {
            Some(existing) if existing.value == arg.value => Ok(()),
            Some(existing) => Err(RiggingError::PlanInvariant {
                message: format!(
                    "`{}` assigned both `{}` and `{}`",
                    arg.key, existing.value, arg.value
                ),
            }),
            None => {
                self.0.push(arg);
                Ok(())
            }
        }
    }
}
