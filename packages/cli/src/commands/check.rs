use super::{load_document, read_markup, resolve};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Section markup file to validate
    pub file: PathBuf,
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    let path = resolve(cwd, &args.file);
    let markup = read_markup(&path)?;
    let state = load_document(&markup, &path)?;

    println!(
        "{} {} ({} positions, {} diagrams)",
        "✓".green(),
        args.file.display(),
        state.content_size(),
        state.diagrams().len()
    );

    if sketchbook_editor::serialize(&state) != markup {
        println!("  {}", "not normalized, run `sketchbook fmt --write`".dimmed());
    }

    Ok(())
}
