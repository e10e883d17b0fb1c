//! `rigging plan` command
//!
//! Compiles the build plan and prints it without running the toolchain.

use anyhow::Result;

use super::{load_recipe, system_probe};
use crate::cli::PlanArgs;
use rigging::ops::{plan_build, PlanSettings};
use rigging::util::shell::Status;
use rigging::util::{GlobalContext, Shell};

pub fn execute(args: PlanArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let recipe = load_recipe(&ctx, &args.request.recipe)?;
    let prefix = ctx.install_prefix(args.prefix.as_deref(), recipe.name());

    shell.status(Status::Planning, format!("{} {}", recipe.name(), recipe.package.version));
    let planned = plan_build(
        &recipe,
        &args.request.to_request(),
        &system_probe(&ctx),
        &PlanSettings::new(prefix),
    )?;
    for notice in &planned.notices {
        shell.status(Status::Deprecated, notice);
    }

    let plan = &planned.plan;
    if shell.is_json() {
        shell.json_event(&serde_json::to_value(plan)?);
        return Ok(());
    }

    println!("# {} {} -> {}", plan.package, plan.version, plan.prefix.display());
    for step in &plan.pre_steps {
        println!("# {} = {}", step.binding, step.result);
    }
    for var in &plan.env {
        println!("{} \\", var);
    }
    println!("cmake \\");
    let args = plan.configure_args();
    for (i, arg) in args.iter().enumerate() {
        if i + 1 < args.len() {
            println!("  {} \\", arg);
        } else {
            println!("  {}", arg);
        }
    }
    for extra in &plan.extras {
        println!("# copy {} -> {}", extra.from.display(), extra.to.display());
    }

    for caveat in &plan.caveats {
        shell.caveat(caveat);
    }
    Ok(())
}
