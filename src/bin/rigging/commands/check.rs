//! `rigging check` command

use anyhow::Result;
use serde_json::json;

use super::load_recipe;
use crate::cli::RecipeArgs;
use rigging::core::OptionRequest;
use rigging::resolver::DependencyGraphBuilder;
use rigging::util::shell::Status;
use rigging::util::{GlobalContext, Shell};

pub fn execute(args: RecipeArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    // loading runs the structural checks
    let recipe = load_recipe(&ctx, &args)?;

    let defaults = recipe.registry.resolve(&OptionRequest::new())?;
    let requirements = DependencyGraphBuilder::new(&recipe.dependencies).build(&defaults.options);

    if shell.is_json() {
        shell.json_event(&json!({
            "package": recipe.name(),
            "version": recipe.package.version,
            "options": recipe.registry.options().len(),
            "dependency_rules": recipe.dependencies.len(),
            "conflicts": recipe.conflicts.len(),
            "default_requirements": requirements.len(),
        }));
        return Ok(());
    }

    shell.status(
        Status::Finished,
        format!(
            "recipe `{}` {}: {} options, {} dependency rules, {} conflict groups ({} dependencies by default)",
            recipe.name(),
            recipe.package.version,
            recipe.registry.options().len(),
            recipe.dependencies.len(),
            recipe.conflicts.len(),
            requirements.len()
        ),
    );
    Ok(())
}
