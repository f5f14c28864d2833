use super::{load_document, read_markup, resolve};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct DiagramsArgs {
    /// Section markup file
    pub file: PathBuf,
}

pub fn diagrams(args: DiagramsArgs, cwd: &str) -> Result<()> {
    let path = resolve(cwd, &args.file);
    let state = load_document(&read_markup(&path)?, &path)?;
    let placeholders = state.diagrams();

    if placeholders.is_empty() {
        println!("{}", "No diagrams found".yellow());
        return Ok(());
    }

    for placeholder in placeholders {
        println!(
            "{} {} @{} {}{}",
            placeholder.id.to_string().bright_white().bold(),
            placeholder.kind,
            placeholder.position,
            placeholder.source_hash,
            if placeholder.inline { " (inline)".dimmed().to_string() } else { String::new() }
        );
        for line in placeholder.source_text.lines() {
            println!("    {}", line.dimmed());
        }
    }

    Ok(())
}
