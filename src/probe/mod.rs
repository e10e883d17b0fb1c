//! Environment probes.
//!
//! Everything the pipeline learns about the host goes through the
//! [`DependencyProbe`] trait: whether a dependency is installed, where a
//! program lives, what an interpreter reports about itself, and whether a
//! candidate path exists. Probes are synchronous and cheap; a missing
//! artifact is a terminal configuration error, so nothing is retried.

pub mod system;

use std::path::{Path, PathBuf};

use crate::core::dependency::DependencyRequirement;

pub use system::SystemProbe;

/// Result of an availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Installed; `prefix` is its install root when the probe can tell.
    Present { prefix: Option<PathBuf> },
    Absent,
}

impl Availability {
    pub fn present() -> Self {
        Availability::Present { prefix: None }
    }

    pub fn at(prefix: impl Into<PathBuf>) -> Self {
        Availability::Present {
            prefix: Some(prefix.into()),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Availability::Present { .. })
    }

    pub fn prefix(&self) -> Option<&Path> {
        match self {
            Availability::Present { prefix } => prefix.as_deref(),
            Availability::Absent => None,
        }
    }
}

/// Synchronous queries against the build host.
pub trait DependencyProbe {
    /// Whether a dependency is installed, and where.
    fn availability(&self, dep: &DependencyRequirement) -> Availability;

    /// Locate a program on PATH.
    fn locate_program(&self, program: &str) -> Option<PathBuf>;

    /// Run `program args...` and return its trimmed standard output.
    fn query(&self, program: &Path, args: &[String]) -> Result<String, String>;

    /// Whether a candidate path exists.
    fn exists(&self, path: &Path) -> bool;
}
