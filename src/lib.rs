//! rigging - a declarative build-configuration resolver
//!
//! A recipe declares a package's build options, the dependencies each option
//! pulls in, which options conflict, and how the selection maps onto CMake
//! arguments. This crate turns a user's option request into a validated,
//! deterministic build plan, drives the toolchain with it and checks the
//! installed result.

pub mod builder;
pub mod core;
pub mod ops;
pub mod probe;
pub mod resolver;
pub mod util;

/// Test doubles for rigging unit tests.
///
/// Only compiled for tests. Provides in-memory implementations of the
/// probe, toolchain driver and verifier seams.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{OptionRequest, Recipe, RiggingError};
pub use builder::{BuildPlan, PlanCompiler};
pub use util::context::GlobalContext;
