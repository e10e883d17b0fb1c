//! rigging CLI - declarative build-configuration resolver

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use rigging::core::RiggingError;
use rigging::util::shell::Shell;

fn main() {
    let cli = Cli::parse();
    let shell = cli.shell();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("rigging=debug")
        } else if cli.quiet || cli.json {
            EnvFilter::new("rigging=error")
        } else {
            EnvFilter::new("rigging=warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let Err(e) = run(cli, &shell) {
        std::process::exit(report(&e, &shell));
    }
}

fn run(cli: Cli, shell: &Shell) -> Result<()> {
    match cli.command {
        Commands::Options(args) => commands::options::execute(args, shell),
        Commands::Deps(args) => commands::deps::execute(args, shell),
        Commands::Plan(args) => commands::plan::execute(args, shell),
        Commands::Install(args) => commands::install::execute(args, shell),
        Commands::Verify(args) => commands::verify::execute(args, shell),
        Commands::Check(args) => commands::check::execute(args, shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print the error and return the process exit code.
fn report(e: &anyhow::Error, shell: &Shell) -> i32 {
    let Some(err) = e.downcast_ref::<RiggingError>() else {
        if shell.is_json() {
            shell.json_event(&serde_json::json!({ "error": format!("{:#}", e), "code": 1 }));
        } else {
            eprintln!("error: {:#}", e);
        }
        return 1;
    };

    if shell.is_json() {
        shell.json_event(&serde_json::json!({
            "error": err.to_string(),
            "code": err.exit_code(),
            "output": err.captured_output(),
        }));
    } else {
        rigging::util::diagnostic::emit(&err.to_diagnostic(), shell.use_color());
        if let Some(output) = err.captured_output() {
            if !output.trim().is_empty() {
                eprintln!("\n--- toolchain output ---\n{}", output.trim_end());
            }
        }
    }
    err.exit_code()
}
