//! Recipe parsing and schema.
//!
//! A recipe declares one package's options, dependency edges and flag rules
//! as data. Loading a recipe also builds its [`OptionRegistry`] and runs the
//! static checks, so every `Recipe` value in circulation is known-consistent.

use std::collections::BTreeMap;
use std::path::Path;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::dependency::{Arg, DependencyRule};
use crate::core::errors::RiggingError;
use crate::core::option::OptionDecl;
use crate::core::predicate::Predicate;
use crate::core::registry::OptionRegistry;

/// The recipe shipped with the binary.
pub const BUNDLED_RECIPE: &str = include_str!("../../recipes/vtk.toml");

/// Package metadata from the `[package]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub source: Option<SourceSpec>,
}

impl PackageMetadata {
    /// Parse the version string as semver.
    pub fn version(&self) -> Result<Version, RiggingError> {
        Version::parse(&self.version).map_err(|e| {
            RiggingError::invalid_recipe(format!(
                "package version `{}` is not semver: {}",
                self.version, e
            ))
        })
    }
}

/// Where the sources come from. Informational; fetching happens elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub url: String,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub mirror: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawOption {
    id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    default: Option<toml::Value>,
    #[serde(default)]
    choices: Vec<String>,
}

impl RawOption {
    fn into_decl(self) -> Result<OptionDecl, RiggingError> {
        let is_choice = match self.kind.as_deref() {
            None => !self.choices.is_empty(),
            Some("switch") => false,
            Some("choice") => true,
            Some(other) => {
                return Err(RiggingError::invalid_recipe(format!(
                    "option `{}` has unknown kind `{}`",
                    self.id, other
                )))
            }
        };

        let decl = if is_choice {
            let default = match self.default {
                Some(toml::Value::String(s)) => s,
                None => self.choices.first().cloned().ok_or_else(|| {
                    RiggingError::invalid_recipe(format!("choice option `{}` has no choices", self.id))
                })?,
                Some(other) => {
                    return Err(RiggingError::invalid_recipe(format!(
                        "choice option `{}` needs a string default, found `{}`",
                        self.id, other
                    )))
                }
            };
            OptionDecl::choice(self.id, self.choices, default)
        } else {
            let default = match self.default {
                Some(toml::Value::Boolean(b)) => b,
                None => false,
                Some(other) => {
                    return Err(RiggingError::invalid_recipe(format!(
                        "switch option `{}` needs a boolean default, found `{}`",
                        self.id, other
                    )))
                }
            };
            OptionDecl::switch(self.id, default)
        };
        Ok(decl.with_description(self.description))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAlias {
    Simple(String),
    Full {
        canonical: String,
        #[serde(default)]
        invert: bool,
    },
}

/// At most one of `options` may be active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRule {
    pub options: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Arguments emitted depending on a predicate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagRule {
    #[serde(default)]
    pub when: Predicate,
    #[serde(default)]
    pub args: Vec<Arg>,
    /// Emitted instead of `args` when the predicate is false.
    #[serde(default)]
    pub otherwise: Vec<Arg>,
    /// Toolchain environment while the predicate holds.
    #[serde(default)]
    pub env: Vec<Arg>,
}

/// Unconditional configure arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CMakeSection {
    #[serde(default)]
    pub args: Vec<Arg>,
}

/// Locates an interpreter and introspects its install layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscoveryRule {
    pub name: String,
    #[serde(default)]
    pub when: Predicate,
    /// Option → program. Exactly one selected option is active whenever
    /// `when` holds.
    pub select: BTreeMap<String, String>,
    #[serde(default = "default_query_flag")]
    pub query_flag: String,
    /// Query name → snippet passed to the interpreter.
    #[serde(default)]
    pub queries: BTreeMap<String, String>,
    #[serde(default)]
    pub artifact: Option<ArtifactSearch>,
    #[serde(default)]
    pub args: Vec<Arg>,
}

fn default_query_flag() -> String {
    "-c".to_string()
}

/// Ordered candidate locations; the first that exists wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSearch {
    pub name: String,
    pub candidates: Vec<String>,
}

/// An advisory message printed after a successful install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caveat {
    #[serde(default)]
    pub when: Predicate,
    pub message: String,
}

/// A directory from the source tree copied into the prefix after install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallExtra {
    #[serde(default)]
    pub when: Predicate,
    pub from: String,
    pub to: String,
}

/// Post-install smoke test definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestSpec {
    /// Header directory relative to the prefix.
    #[serde(default)]
    pub include_dir: Option<String>,
    #[serde(default)]
    pub compiler: Option<String>,
    #[serde(default = "default_harness_name")]
    pub source_name: String,
    /// Harness source; `{major}` and `{minor}` expand to the package version.
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub entry_point: Option<EntryPoint>,
}

fn default_harness_name() -> String {
    "harness.cpp".to_string()
}

/// Installed executable invoked with a no-op command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPoint {
    pub path: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub when: Predicate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawRecipe {
    package: PackageMetadata,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default)]
    aliases: BTreeMap<String, RawAlias>,
    #[serde(default)]
    conflicts: Vec<ConflictRule>,
    #[serde(default)]
    dependencies: Vec<DependencyRule>,
    #[serde(default)]
    cmake: CMakeSection,
    #[serde(default)]
    flags: Vec<FlagRule>,
    #[serde(default)]
    discovery: Vec<DiscoveryRule>,
    #[serde(default)]
    caveats: Vec<Caveat>,
    #[serde(default)]
    install_extra: Vec<InstallExtra>,
    #[serde(default)]
    test: Option<TestSpec>,
}

/// A loaded, statically checked recipe.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub package: PackageMetadata,
    pub registry: OptionRegistry,
    pub conflicts: Vec<ConflictRule>,
    pub dependencies: Vec<DependencyRule>,
    pub cmake: CMakeSection,
    pub flags: Vec<FlagRule>,
    pub discovery: Vec<DiscoveryRule>,
    pub caveats: Vec<Caveat>,
    pub install_extra: Vec<InstallExtra>,
    pub test: Option<TestSpec>,
}

impl Recipe {
    /// Parse and check a recipe. `origin` names it in error messages.
    pub fn parse(contents: &str, origin: &str) -> Result<Self, RiggingError> {
        let raw: RawRecipe = toml::from_str(contents)
            .map_err(|e| RiggingError::invalid_recipe(format!("{}: {}", origin, e)))?;

        let mut registry = OptionRegistry::new();
        for option in raw.options {
            registry.register(option.into_decl()?)?;
        }
        for (alias, target) in raw.aliases {
            let (canonical, invert) = match target {
                RawAlias::Simple(canonical) => (canonical, false),
                RawAlias::Full { canonical, invert } => (canonical, invert),
            };
            registry.register_alias(alias, canonical, invert)?;
        }

        let recipe = Recipe {
            package: raw.package,
            registry,
            conflicts: raw.conflicts,
            dependencies: raw.dependencies,
            cmake: raw.cmake,
            flags: raw.flags,
            discovery: raw.discovery,
            caveats: raw.caveats,
            install_extra: raw.install_extra,
            test: raw.test,
        };

        recipe.package.version()?;
        crate::resolver::validate::check_recipe(&recipe)?;

        tracing::debug!(
            "loaded recipe `{}` {} from {} ({} options, {} dependency rules)",
            recipe.package.name,
            recipe.package.version,
            origin,
            recipe.registry.options().len(),
            recipe.dependencies.len()
        );

        Ok(recipe)
    }

    /// Load a recipe from a file.
    pub fn load(path: &Path) -> Result<Self, RiggingError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RiggingError::io(format!("failed to read recipe {}", path.display()), e)
        })?;
        Recipe::parse(&contents, &path.display().to_string())
    }

    /// The recipe shipped with the binary.
    pub fn bundled() -> Result<Self, RiggingError> {
        Recipe::parse(BUNDLED_RECIPE, "bundled recipe")
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }
}
