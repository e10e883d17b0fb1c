//! Dependency rules and the requirements they activate.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::predicate::Predicate;

/// A single `KEY=VALUE` toolchain argument or environment entry.
///
/// Written as a plain string in recipes; the key is everything before the
/// first `=`, so CMake typed keys like `CMAKE_INSTALL_RPATH:STRING` work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Arg {
    pub key: String,
    pub value: String,
}

impl Arg {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Arg {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl TryFrom<String> for Arg {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok(Arg::new(key.trim(), value.trim()))
            }
            _ => Err(format!("expected `KEY=VALUE`, found `{}`", s)),
        }
    }
}

impl From<Arg> for String {
    fn from(arg: Arg) -> String {
        arg.to_string()
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// When a dependency is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Only needed while building (e.g. cmake).
    Build,
    /// Linked or loaded by the installed artifact.
    #[default]
    Run,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Build => f.write_str("build"),
            Stage::Run => f.write_str("run"),
        }
    }
}

/// How to check whether a dependency is installed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeSpec {
    /// An executable on PATH.
    Program(String),
    /// A pkg-config module.
    PkgConfig(String),
    /// A file or directory that must exist.
    Path(PathBuf),
}

/// A declared dependency edge, active only when `when` holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DependencyRule {
    pub name: String,

    #[serde(default)]
    pub stage: Stage,

    #[serde(default = "default_true")]
    pub required: bool,

    #[serde(default)]
    pub when: Predicate,

    /// Must all hold whenever the dependency is active.
    #[serde(default)]
    pub constraints: Vec<Predicate>,

    /// Build options passed through to the dependency itself.
    #[serde(default)]
    pub options: Vec<String>,

    /// Toolchain arguments contributed while active.
    #[serde(default)]
    pub args: Vec<Arg>,

    #[serde(default)]
    pub probe: Option<ProbeSpec>,
}

fn default_true() -> bool {
    true
}

impl DependencyRule {
    pub fn new(name: impl Into<String>) -> Self {
        DependencyRule {
            name: name.into(),
            stage: Stage::Run,
            required: true,
            when: Predicate::Always,
            constraints: Vec::new(),
            options: Vec::new(),
            args: Vec::new(),
            probe: None,
        }
    }

    pub fn when(mut self, when: Predicate) -> Self {
        self.when = when;
        self
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn constraint(mut self, constraint: Predicate) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn dep_options(mut self, options: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push(Arg::new(key, value));
        self
    }

    pub fn probe(mut self, probe: ProbeSpec) -> Self {
        self.probe = Some(probe);
        self
    }

    /// The requirement this rule contributes once its predicate holds.
    pub fn to_requirement(&self) -> DependencyRequirement {
        DependencyRequirement {
            name: self.name.clone(),
            stage: self.stage,
            required: self.required,
            options: self.options.clone(),
            constraints: self.constraints.clone(),
            args: self.args.clone(),
            probe: self.probe.clone(),
            activated_by: self.when.options().into_iter().map(str::to_string).collect(),
        }
    }
}

/// An external dependency active for one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRequirement {
    pub name: String,
    pub stage: Stage,
    pub required: bool,
    pub options: Vec<String>,
    pub constraints: Vec<Predicate>,
    pub args: Vec<Arg>,
    pub probe: Option<ProbeSpec>,
    /// Options read by the predicate that activated this dependency.
    pub activated_by: Vec<String>,
}

impl fmt::Display for DependencyRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.options.is_empty() {
            write!(f, " [{}]", self.options.join(", "))?;
        }
        write!(f, " ({}", self.stage)?;
        if !self.required {
            write!(f, ", optional")?;
        }
        write!(f, ")")
    }
}
