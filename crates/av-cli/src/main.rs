//! # avctl Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

/// AccrediVault CLI — compliance engine toolchain.
///
/// Recomputes control statuses over dataset files and lints evidence-rule
/// sets before import.
#[derive(Parser, Debug)]
#[command(name = "avctl", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Recompute every control status in a dataset file.
    Recompute(av_cli::recompute::RecomputeArgs),
    /// Validate an evidence-rule set.
    LintRules(av_cli::lint::LintArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Recompute(args) => {
            av_cli::recompute::run(&args)?;
        }
        Commands::LintRules(args) => {
            av_cli::lint::run(&args)?;
        }
    }

    Ok(())
}
