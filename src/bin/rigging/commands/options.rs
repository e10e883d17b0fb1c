//! `rigging options` command

use anyhow::Result;
use serde_json::json;

use super::load_recipe;
use crate::cli::OptionsArgs;
use rigging::core::{OptionKind, OptionValue};
use rigging::util::{GlobalContext, Shell};

pub fn execute(args: OptionsArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let recipe = load_recipe(&ctx, &args.recipe)?;

    if shell.is_json() {
        let aliases: Vec<_> = recipe
            .registry
            .aliases()
            .map(|(alias, target)| {
                json!({ "alias": alias, "canonical": target.canonical, "invert": target.invert })
            })
            .collect();
        shell.json_event(&json!({
            "package": recipe.name(),
            "version": recipe.package.version,
            "options": recipe.registry.options(),
            "aliases": aliases,
        }));
        return Ok(());
    }

    println!("{} {}", recipe.name(), recipe.package.version);
    for option in recipe.registry.options() {
        let values = match option.kind {
            OptionKind::Switch => "on|off".to_string(),
            OptionKind::Choice(ref choices) => choices.join("|"),
        };
        let default = match option.default {
            OptionValue::Switch(true) => "on".to_string(),
            OptionValue::Switch(false) => "off".to_string(),
            OptionValue::Choice(ref value) => value.clone(),
        };
        println!(
            "  {:<20} {:<14} [default: {}]  {}",
            option.id, values, default, option.description
        );
    }

    if args.aliases {
        println!();
        println!("deprecated aliases:");
        for (alias, target) in recipe.registry.aliases() {
            let replacement = if target.invert {
                format!("--without {}", target.canonical)
            } else {
                format!("--with {}", target.canonical)
            };
            println!("  {:<20} use {}", alias, replacement);
        }
    }

    Ok(())
}
