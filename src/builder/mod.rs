//! Build planning and toolchain execution.
//!
//! [`PlanCompiler`] turns a validated configuration into a [`BuildPlan`];
//! a [`ToolchainDriver`] runs it.

pub mod cmake;
pub mod driver;
pub mod plan;
pub mod template;

pub use cmake::CMakeDriver;
pub use driver::{DriverOptions, DriverOutput, ToolchainDriver};
pub use plan::{BuildPlan, PlanCompiler, VerifyPlan};
pub use template::TemplateContext;
