//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;
use rigging::core::OptionRequest;
use rigging::util::shell::{ColorChoice, Shell};

/// rigging - resolve build options into a validated CMake build plan
#[derive(Parser)]
#[command(name = "rigging")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto", env = "RIGGING_COLOR")]
    pub color: ColorChoice,

    /// Print machine-readable JSON to stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn shell(&self) -> Shell {
        Shell::from_flags(self.quiet, self.verbose, self.color, self.json)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the options a recipe declares
    Options(OptionsArgs),

    /// Show the dependencies a selection of options activates
    Deps(DepsArgs),

    /// Compile and print the build plan without running anything
    Plan(PlanArgs),

    /// Build, install and verify the package
    Install(InstallArgs),

    /// Run the post-install checks against an existing prefix
    Verify(VerifyArgs),

    /// Check a recipe file for errors
    Check(RecipeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Clone)]
pub struct RecipeArgs {
    /// Recipe file (defaults to the bundled recipe)
    #[arg(long, env = "RIGGING_RECIPE")]
    pub recipe: Option<PathBuf>,
}

/// Option selection shared by every resolving command.
#[derive(Args, Clone)]
pub struct RequestArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,

    /// Enable an option (repeatable, comma-separated)
    #[arg(long = "with", value_name = "OPTION", value_delimiter = ',')]
    pub with: Vec<String>,

    /// Disable an option (repeatable, comma-separated)
    #[arg(long = "without", value_name = "OPTION", value_delimiter = ',')]
    pub without: Vec<String>,

    /// Set an option value
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,
}

impl RequestArgs {
    /// `--with`, then `--without`, then `-o`, each in command-line order.
    pub fn to_request(&self) -> OptionRequest {
        let mut request = OptionRequest::new();
        for id in &self.with {
            request = request.enable(id.as_str());
        }
        for id in &self.without {
            request = request.disable(id.as_str());
        }
        for entry in &self.options {
            request = request.push_entry(entry);
        }
        request
    }
}

#[derive(Args)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,

    /// Also list deprecated aliases
    #[arg(long)]
    pub aliases: bool,
}

#[derive(Args)]
pub struct DepsArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// List requirements without checking whether they are installed
    #[arg(long)]
    pub no_probe: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Install prefix
    #[arg(long)]
    pub prefix: Option<PathBuf>,
}

#[derive(Args)]
pub struct InstallArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Install prefix
    #[arg(long)]
    pub prefix: Option<PathBuf>,

    /// Unpacked package sources (defaults to the current directory)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Per-step timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// CMake generator
    #[arg(short = 'G', long)]
    pub generator: Option<String>,

    /// Skip the post-install checks
    #[arg(long)]
    pub skip_verify: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Install prefix to check
    #[arg(long)]
    pub prefix: Option<PathBuf>,

    /// C++ compiler for the version harness
    #[arg(long, env = "CXX")]
    pub compiler: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
