//! `rigging deps` command

use anyhow::Result;
use serde_json::json;

use super::{load_recipe, system_probe};
use crate::cli::DepsArgs;
use rigging::core::Platform;
use rigging::ops::{resolve_configuration, resolve_requirements};
use rigging::probe::{Availability, DependencyProbe};
use rigging::util::shell::Status;
use rigging::util::{GlobalContext, Shell};

pub fn execute(args: DepsArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let recipe = load_recipe(&ctx, &args.request.recipe)?;
    let probe = system_probe(&ctx);
    let request = args.request.to_request();

    shell.status(Status::Resolving, format!("{} {}", recipe.name(), recipe.package.version));
    let configured = if args.no_probe {
        resolve_requirements(&recipe, &request, Platform::host())?
    } else {
        resolve_configuration(&recipe, &request, &probe, Platform::host())?
    };
    for notice in &configured.notices {
        shell.status(Status::Deprecated, notice);
    }

    let config = &configured.config;
    if shell.is_json() {
        let notices: Vec<String> = configured.notices.iter().map(ToString::to_string).collect();
        shell.json_event(&json!({
            "options": config.options(),
            "requirements": config.requirements(),
            "notices": notices,
        }));
        return Ok(());
    }

    println!("enabled: {}", config.options().enabled().join(", "));
    for requirement in config.requirements() {
        if args.no_probe {
            println!("  {}", requirement);
            continue;
        }
        let availability = match probe.availability(requirement) {
            Availability::Present { prefix: Some(prefix) } => format!("found at {}", prefix.display()),
            Availability::Present { prefix: None } => "found".to_string(),
            Availability::Absent => "not found".to_string(),
        };
        println!("  {:<40} {}", requirement.to_string(), availability);
    }

    Ok(())
}
