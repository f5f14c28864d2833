mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, check, diagrams, edit_diagram, fmt, render, ApplyArgs, CheckArgs, DiagramsArgs, EditDiagramArgs,
    FmtArgs, RenderArgs,
};

/// Sketchbook CLI - rich text sections with live diagrams
#[derive(Parser, Debug)]
#[command(name = "sketchbook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a section file against the rich text schema
    Check(CheckArgs),

    /// Normalize a section file's markup
    Fmt(FmtArgs),

    /// List the diagrams in a section
    Diagrams(DiagramsArgs),

    /// Render every diagram in a section
    Render(RenderArgs),

    /// Apply formatting commands to a selection
    Apply(ApplyArgs),

    /// Edit an external XML diagram with the configured editor
    EditDiagram(EditDiagramArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Check(args) => check(args, &cwd),
        Command::Fmt(args) => fmt(args, &cwd),
        Command::Diagrams(args) => diagrams(args, &cwd),
        Command::Render(args) => render(args, &cwd).await,
        Command::Apply(args) => apply(args, &cwd),
        Command::EditDiagram(args) => edit_diagram(args, &cwd).await,
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
