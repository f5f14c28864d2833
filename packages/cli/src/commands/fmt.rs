use super::{load_document, read_markup, resolve};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use sketchbook_editor::serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct FmtArgs {
    /// Section markup file to normalize
    pub file: PathBuf,

    /// Rewrite the file in place instead of printing
    #[arg(short, long)]
    pub write: bool,
}

pub fn fmt(args: FmtArgs, cwd: &str) -> Result<()> {
    let path = resolve(cwd, &args.file);
    let markup = read_markup(&path)?;
    let normalized = serialize(&load_document(&markup, &path)?);

    if !args.write {
        print!("{}", normalized);
        return Ok(());
    }

    if normalized == markup {
        println!("{} {} already formatted", "✓".green(), args.file.display());
    } else {
        fs::write(&path, normalized)?;
        println!("{} Formatted {}", "✓".green(), args.file.display());
    }

    Ok(())
}
