//! High-level operations.
//!
//! Each function here backs one `rigging` subcommand and wires the
//! registry, resolver, compiler, driver and verifier together.

pub mod install;
pub mod resolve;
pub mod verify;

pub use install::{install, InstallOptions, InstallOutcome, InstallStage};
pub use resolve::{plan_build, resolve_configuration, resolve_requirements, Configured, PlanSettings, PlannedBuild};
pub use verify::{InstallVerifier, PostInstallVerifier, VerifyReport, VerifyStep};
