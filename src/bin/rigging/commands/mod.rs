//! Command implementations

pub mod check;
pub mod completions;
pub mod deps;
pub mod install;
pub mod options;
pub mod plan;
pub mod verify;

use anyhow::Result;

use crate::cli::RecipeArgs;
use rigging::core::Recipe;
use rigging::probe::SystemProbe;
use rigging::util::GlobalContext;

/// The recipe named by `--recipe`, or the bundled one.
pub fn load_recipe(ctx: &GlobalContext, args: &RecipeArgs) -> Result<Recipe> {
    let recipe = match args.recipe {
        Some(ref path) => Recipe::load(&ctx.resolve_path(path))?,
        None => Recipe::bundled()?,
    };
    Ok(recipe)
}

pub fn system_probe(ctx: &GlobalContext) -> SystemProbe {
    SystemProbe::with_overrides(ctx.config().dependencies.clone())
}
