use super::{load_document, read_markup, resolve};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use sketchbook_editor::{Command, DiagramKind, DocumentState, EditSession, HistoryConfig, Length, Selection};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Section markup file to edit
    pub file: PathBuf,

    /// Selection start position
    #[arg(long, default_value_t = 0)]
    pub from: usize,

    /// Selection end position (defaults to --from)
    #[arg(long)]
    pub to: Option<usize>,

    /// Toggle a mark over the selection (bold, italic, subscript, ...)
    #[arg(long)]
    pub toggle: Vec<String>,

    /// Set the font size of the selection, e.g. 18pt or 1.5em
    #[arg(long)]
    pub font_size: Option<Length>,

    /// Insert a flowchart diagram block at the end of the selection
    #[arg(long)]
    pub insert_flowchart: Option<String>,

    /// Rewrite the file in place instead of printing
    #[arg(short, long)]
    pub write: bool,
}

impl ApplyArgs {
    fn selection(&self) -> Selection {
        Selection::new(self.from, self.to.unwrap_or(self.from))
    }

    fn commands(&self) -> Vec<Command> {
        let mut commands: Vec<Command> = self
            .toggle
            .iter()
            .map(|mark_type| Command::ToggleMark {
                mark_type: mark_type.clone(),
            })
            .collect();
        if let Some(size) = self.font_size {
            commands.push(Command::SetFontSize { size });
        }
        commands
    }
}

pub fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let path = resolve(cwd, &args.file);
    let state = load_document(&read_markup(&path)?, &path)?;

    let session = run_edits(state, &args, &config.history)?;
    let output = session.serialize();

    if args.write {
        fs::write(&path, &output)?;
        println!(
            "{} Applied {} edits to {}",
            "✓".green(),
            session.history().undo_levels(),
            args.file.display()
        );
    } else {
        print!("{}", output);
    }

    Ok(())
}

/// Run the requested commands in order over one session
pub(crate) fn run_edits(state: DocumentState, args: &ApplyArgs, history: &HistoryConfig) -> Result<EditSession> {
    let mut session = EditSession::new("cli", state).with_history_config(history);
    let selection = args.selection();
    if selection.to() > session.state().content_size() {
        return Err(anyhow!(
            "Selection {}..{} is outside the document (0..{})",
            selection.from(),
            selection.to(),
            session.state().content_size()
        ));
    }

    for command in args.commands() {
        session.set_selection(selection);
        session
            .apply(&command)
            .map_err(|e| anyhow!("{} failed: {}", command.name(), e))?;
    }

    if let Some(source) = &args.insert_flowchart {
        session.set_selection(Selection::cursor(selection.to()));
        session.insert_diagram(DiagramKind::Flowchart, source.clone())?;
    }

    Ok(session)
}
