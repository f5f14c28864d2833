use super::{read_markup, resolve};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use sketchbook_editor::{DiagramId, Pipeline, SchemaRegistry};
use sketchbook_render::{CommandEditor, RendererSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct EditDiagramArgs {
    /// Section markup file
    pub file: PathBuf,

    /// Id of the external XML diagram to edit
    #[arg(long)]
    pub id: String,
}

/// Open a diagram in the configured external XML editor and write back the result
pub async fn edit_diagram(args: EditDiagramArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let spec = config
        .render
        .commands
        .xml_editor
        .clone()
        .ok_or_else(|| anyhow!("No xmlEditor command configured in sketchbook.config.json"))?;

    let path = resolve(cwd, &args.file);
    let markup = read_markup(&path)?;
    let mut pipeline = Pipeline::open(
        args.file.display().to_string(),
        &markup,
        Arc::new(SchemaRegistry::rich_text()),
        Arc::new(RendererSet::from_config(&config.render)),
        &config.render,
    )?;

    let id = DiagramId::new(args.id);
    println!("✏️  Editing {} with {}", id.to_string().bright_white(), spec.program);
    pipeline
        .edit_external_diagram(&id, &CommandEditor::new(spec))
        .await?;

    fs::write(&path, pipeline.save())?;
    println!("{} Updated {}", "✓".green(), args.file.display());

    Ok(())
}
