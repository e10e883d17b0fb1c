//! `rigging install` command

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;

use super::{load_recipe, system_probe};
use crate::cli::InstallArgs;
use rigging::builder::{CMakeDriver, DriverOptions};
use rigging::ops::{install, InstallOptions, InstallStage, PlanSettings, PostInstallVerifier};
use rigging::util::process::CancelToken;
use rigging::util::shell::{Spinner, Status};
use rigging::util::{GlobalContext, Shell};

pub fn execute(args: InstallArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let config = ctx.config();
    let recipe = load_recipe(&ctx, &args.request.recipe)?;
    let prefix = ctx.install_prefix(args.prefix.as_deref(), recipe.name());

    let source_dir = match args.source {
        Some(ref source) => ctx.resolve_path(source),
        None => ctx.cwd().to_path_buf(),
    };

    let cancel = interrupt_token()?;

    // CLI > project config > global config
    let mut driver = DriverOptions::new(source_dir);
    driver.cancel = cancel.clone();
    driver.work_dir = config.build.work_dir.clone();
    driver.jobs = args.jobs.or(config.build.jobs);
    driver.timeout = args.timeout.map(Duration::from_secs).or_else(|| config.timeout());
    driver.generator = args.generator.clone().or_else(|| config.build.generator.clone());
    driver.cmake = config.build.cmake.clone();

    let options = InstallOptions {
        settings: PlanSettings::new(&prefix),
        driver,
        skip_verify: args.skip_verify,
    };
    let verifier = PostInstallVerifier::new()
        .with_compiler(config.verify.compiler.clone())
        .with_cancel(cancel);

    let mut spinner: Option<Spinner<'_>> = None;
    let outcome = install(
        &recipe,
        &args.request.to_request(),
        &system_probe(&ctx),
        &CMakeDriver::new(),
        &verifier,
        &options,
        &mut |stage| match stage {
            InstallStage::Planned(planned) => {
                for notice in &planned.notices {
                    shell.status(Status::Deprecated, notice);
                }
                shell.status(
                    Status::Planning,
                    format!(
                        "{} {} ({} configure arguments)",
                        planned.plan.package,
                        planned.plan.version,
                        planned.plan.args.len()
                    ),
                );
            }
            InstallStage::Building(plan) => {
                spinner = Some(shell.spinner(
                    Status::Building,
                    format!("{} {}", plan.package, plan.version),
                ));
            }
            InstallStage::CopyingExtra { from, to } => {
                if let Some(s) = spinner.take() {
                    s.finish();
                }
                shell.status(Status::Copying, format!("{} to {}", from.display(), to.display()));
            }
            InstallStage::Verifying(plan) => {
                if let Some(s) = spinner.take() {
                    s.finish();
                }
                shell.status(Status::Verifying, plan.prefix.display());
            }
        },
    )?;
    if let Some(s) = spinner.take() {
        s.finish();
    }

    let plan = &outcome.planned.plan;
    if shell.is_json() {
        shell.json_event(&json!({
            "package": plan.package,
            "version": plan.version,
            "prefix": plan.prefix,
            "plan": plan,
            "verify": outcome.report,
        }));
        return Ok(());
    }

    match outcome.report {
        Some(ref report) => {
            for step in &report.steps {
                if !step.skipped {
                    shell.status(Status::Verified, format!("{} check: {}", step.check, step.message));
                }
            }
        }
        None => shell.warn("post-install checks were skipped"),
    }
    shell.status(
        Status::Installed,
        format!("{} {} to {}", plan.package, plan.version, plan.prefix.display()),
    );
    for caveat in outcome.caveats() {
        shell.caveat(caveat);
    }
    Ok(())
}

/// A token cancelled by the first SIGINT/SIGTERM. The running step's
/// process group is killed and the scratch build tree removed; a second
/// signal exits immediately.
fn interrupt_token() -> Result<CancelToken> {
    let token = CancelToken::new();
    let handler = token.clone();
    ctrlc::set_handler(move || {
        if handler.is_cancelled() {
            std::process::exit(130);
        }
        handler.cancel();
    })
    .context("failed to install interrupt handler")?;
    Ok(token)
}
