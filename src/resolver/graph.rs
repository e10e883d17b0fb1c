//! Dependency graph builder.
//!
//! Evaluates every dependency rule against one resolved snapshot and keeps
//! the rules whose predicate holds, in declaration order.

use crate::core::dependency::{DependencyRequirement, DependencyRule};
use crate::core::resolved::ResolvedOptions;

pub struct DependencyGraphBuilder<'a> {
    rules: &'a [DependencyRule],
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(rules: &'a [DependencyRule]) -> Self {
        DependencyGraphBuilder { rules }
    }

    /// Compute the active requirements.
    ///
    /// Two active rules naming the same dependency merge into a single
    /// requirement (union of options, constraints and args).
    pub fn build(&self, opts: &ResolvedOptions) -> Vec<DependencyRequirement> {
        let mut active: Vec<DependencyRequirement> = Vec::new();

        for rule in self.rules {
            if !rule.when.evaluate(opts) {
                tracing::trace!("dependency `{}` inactive ({})", rule.name, rule.when);
                continue;
            }

            match active.iter_mut().find(|r| r.name == rule.name) {
                Some(existing) => {
                    tracing::debug!("merging repeated dependency rule for `{}`", rule.name);
                    merge_unique(&mut existing.options, &rule.options);
                    merge_unique(&mut existing.constraints, &rule.constraints);
                    merge_unique(&mut existing.args, &rule.args);
                    let activated_by: Vec<String> =
                        rule.when.options().into_iter().map(str::to_string).collect();
                    merge_unique(&mut existing.activated_by, &activated_by);
                    existing.required |= rule.required;
                    if existing.probe.is_none() {
                        existing.probe = rule.probe.clone();
                    }
                }
                None => active.push(rule.to_requirement()),
            }
        }

        tracing::debug!(
            "{} of {} dependency rules active",
            active.len(),
            self.rules.len()
        );
        active
    }
}

fn merge_unique<T: Clone + PartialEq>(into: &mut Vec<T>, from: &[T]) {
    for item in from {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}
