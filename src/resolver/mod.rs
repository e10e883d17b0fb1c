//! Configuration resolution.
//!
//! Turns a resolved option snapshot into the set of active dependency
//! requirements and checks the result for contradictions. Both stages are
//! pure apart from the availability probe the validator consults.

pub mod graph;
pub mod validate;

pub use graph::DependencyGraphBuilder;
pub use validate::{check_recipe, validate_rules, ConflictValidator};
