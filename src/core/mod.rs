//! Core data structures for rigging.
//!
//! This module contains the foundational types used throughout the pipeline:
//! - Option declarations, values and the alias-aware registry
//! - Predicates over resolved options
//! - Dependency rules and the requirements they produce
//! - The recipe format tying them together

pub mod dependency;
pub mod errors;
pub mod option;
pub mod predicate;
pub mod recipe;
pub mod registry;
pub mod resolved;

pub use dependency::{Arg, DependencyRequirement, DependencyRule, Stage};
pub use errors::{RiggingError, ValidationError, ValidationKind, VerificationError, VerifyCheck};
pub use option::{OptionDecl, OptionKind, OptionValue};
pub use predicate::Predicate;
pub use recipe::Recipe;
pub use registry::{OptionRegistry, OptionRequest};
pub use resolved::{Platform, ResolvedConfiguration, ResolvedOptions};
