//! `rigging verify` command
//!
//! Re-runs the post-install checks for an already installed prefix.

use anyhow::Result;

use super::load_recipe;
use crate::cli::VerifyArgs;
use rigging::builder::VerifyPlan;
use rigging::ops::{InstallVerifier, PostInstallVerifier};
use rigging::util::shell::Status;
use rigging::util::{GlobalContext, Shell};

pub fn execute(args: VerifyArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let recipe = load_recipe(&ctx, &args.request.recipe)?;
    let prefix = ctx.install_prefix(args.prefix.as_deref(), recipe.name());

    let resolution = recipe.registry.resolve(&args.request.to_request())?;
    let plan = VerifyPlan::from_recipe(&recipe, &resolution.options, &prefix)?;

    let compiler = args
        .compiler
        .clone()
        .or_else(|| ctx.config().verify.compiler.clone());
    shell.status(Status::Verifying, prefix.display());
    let report = PostInstallVerifier::new().with_compiler(compiler).verify(&plan)?;

    if shell.is_json() {
        shell.json_event(&serde_json::to_value(&report)?);
        return Ok(());
    }
    for step in &report.steps {
        if step.skipped {
            shell.note(format!("{} check skipped: {}", step.check, step.message));
        } else {
            shell.status(Status::Verified, format!("{} check: {}", step.check, step.message));
        }
    }
    Ok(())
}
