//! Configuration file support for Rigging.
//!
//! Rigging reads two configuration file locations:
//! - Global: `~/.rigging/config.toml` - User-wide defaults
//! - Project: `.rigging/config.toml` - Overrides for the current directory
//!
//! Project config takes precedence over global config. Command-line flags
//! take precedence over both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Rigging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Per-dependency availability overrides
    pub dependencies: BTreeMap<String, DependencyOverride>,

    /// Post-install verification settings
    pub verify: VerifyConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Install prefix (None = the platform default)
    pub prefix: Option<PathBuf>,

    /// Where scratch build trees are created (None = system temp dir)
    pub work_dir: Option<PathBuf>,

    /// Default number of parallel jobs (None = let the generator decide)
    pub jobs: Option<usize>,

    /// Per-step toolchain timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Path to the cmake binary
    pub cmake: Option<PathBuf>,

    /// CMake generator (e.g. "Ninja")
    pub generator: Option<String>,
}

/// Overrides what the availability probe reports for one dependency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyOverride {
    /// Install root; implies present
    pub prefix: Option<PathBuf>,

    /// Force presence or absence
    pub present: Option<bool>,
}

/// Verification-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// C++ compiler used for the version harness
    pub compiler: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Build settings
        if other.build.prefix.is_some() {
            self.build.prefix = other.build.prefix;
        }
        if other.build.work_dir.is_some() {
            self.build.work_dir = other.build.work_dir;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.timeout_secs.is_some() {
            self.build.timeout_secs = other.build.timeout_secs;
        }
        if other.build.cmake.is_some() {
            self.build.cmake = other.build.cmake;
        }
        if other.build.generator.is_some() {
            self.build.generator = other.build.generator;
        }

        // Dependency overrides replace per entry
        self.dependencies.extend(other.dependencies);

        if other.verify.compiler.is_some() {
            self.verify.compiler = other.verify.compiler;
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.build.timeout_secs.map(Duration::from_secs)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.rigging/config.toml)
/// 2. Global config (~/.rigging/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    // Project config overrides global
    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global rigging config directory (~/.rigging).
fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".rigging"))
}

/// Get the global config path (~/.rigging/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.rigging/config.toml).
pub fn project_config_path(root: &Path) -> PathBuf {
    root.join(".rigging").join("config.toml")
}
