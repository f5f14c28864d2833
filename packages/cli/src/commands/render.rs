use super::{read_markup, resolve};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use sketchbook_editor::{Pipeline, SchemaRegistry, WidgetContent};
use sketchbook_render::RendererSet;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Section markup file
    pub file: PathBuf,

    /// Print rendered markup for each widget
    #[arg(short, long)]
    pub verbose: bool,
}

pub async fn render(args: RenderArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let path = resolve(cwd, &args.file);
    let markup = read_markup(&path)?;

    let renderer = Arc::new(RendererSet::from_config(&config.render));
    let mut pipeline = Pipeline::open(
        args.file.display().to_string(),
        &markup,
        Arc::new(SchemaRegistry::rich_text()),
        renderer,
        &config.render,
    )?;

    println!("{}", "🎨 Rendering diagrams...".bright_blue().bold());
    pipeline.settle().await;

    let mut rendered = 0;
    let mut failed = 0;
    for (placeholder, state) in pipeline.scheduler().widgets() {
        match state.content() {
            WidgetContent::Rendered(output) => {
                rendered += 1;
                println!("  {} {}", "✓".green(), placeholder.id);
                if args.verbose {
                    for line in output.markup.lines() {
                        println!("      {}", line.dimmed());
                    }
                }
            }
            WidgetContent::Error(error) => {
                failed += 1;
                println!("  {} {} - {}", "✗".red(), placeholder.id, error.to_string().red());
            }
            WidgetContent::Loading => {
                println!("  {} {} still loading", "…".yellow(), placeholder.id);
            }
        }
    }

    println!();
    if failed == 0 {
        println!("{} Rendered {} diagrams", "✅".green(), rendered);
    } else {
        println!("{} Rendered {} diagrams, {} failed", "⚠️".yellow(), rendered, failed);
    }

    Ok(())
}
