//! # Diagram Renderers
//!
//! External renderers are opaque: they take diagram source and eventually
//! produce visual markup or fail. The scheduler only ever sees the
//! [`DiagramRenderer`] trait.
//!
//! Built-in implementations:
//! - [`FlowchartTextRenderer`](crate::flowchart::FlowchartTextRenderer) for `A->B` scripts
//! - [`XmlPassthroughRenderer`] for payloads produced by the external XML editor
//! - [`CommandRenderer`] piping source through any external program

use crate::config::{CommandSpec, RenderConfig};
use crate::error::RenderError;
use crate::flowchart::FlowchartTextRenderer;
use futures::future::BoxFuture;
use futures::FutureExt;
use sketchbook_schema::DiagramKind;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub type RenderFuture = BoxFuture<'static, Result<RenderedOutput, RenderError>>;
pub type EditFuture = BoxFuture<'static, Result<String, RenderError>>;

/// Visual markup produced by a renderer
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOutput {
    pub markup: String,
}

impl RenderedOutput {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }
}

/// Turns diagram source into visual markup
///
/// Implementations must not borrow `source` past the call: the returned
/// future is spawned onto the runtime.
pub trait DiagramRenderer: Send + Sync {
    fn render(&self, kind: DiagramKind, source: &str) -> RenderFuture;
}

/// Interactive editing surface for external XML diagrams
///
/// Resolves with the updated XML once the user saves.
pub trait DiagramEditor: Send + Sync {
    fn edit(&self, xml: &str) -> EditFuture;
}

/// Dispatches to one renderer per diagram kind
#[derive(Clone, Default)]
pub struct RendererSet {
    renderers: HashMap<DiagramKind, Arc<dyn DiagramRenderer>>,
}

impl RendererSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in renderers for every kind
    pub fn builtin() -> Self {
        Self::new()
            .with(DiagramKind::Flowchart, FlowchartTextRenderer)
            .with(DiagramKind::ExternalXml, XmlPassthroughRenderer)
    }

    /// Built-in renderers, replaced by configured external commands
    pub fn from_config(config: &RenderConfig) -> Self {
        let mut set = Self::builtin();
        for kind in DiagramKind::ALL {
            if let Some(spec) = config.commands.for_kind(kind) {
                set.insert(kind, CommandRenderer::new(spec.clone()));
            }
        }
        set
    }

    pub fn with(mut self, kind: DiagramKind, renderer: impl DiagramRenderer + 'static) -> Self {
        self.insert(kind, renderer);
        self
    }

    pub fn insert(&mut self, kind: DiagramKind, renderer: impl DiagramRenderer + 'static) {
        self.renderers.insert(kind, Arc::new(renderer));
    }

    pub fn get(&self, kind: DiagramKind) -> Option<&Arc<dyn DiagramRenderer>> {
        self.renderers.get(&kind)
    }
}

impl DiagramRenderer for RendererSet {
    fn render(&self, kind: DiagramKind, source: &str) -> RenderFuture {
        match self.renderers.get(&kind) {
            Some(renderer) => renderer.render(kind, source),
            None => futures::future::ready(Err(RenderError::NoRenderer(kind.to_string()))).boxed(),
        }
    }
}

/// Accepts external-editor XML as-is once it is well formed
pub struct XmlPassthroughRenderer;

impl DiagramRenderer for XmlPassthroughRenderer {
    fn render(&self, _kind: DiagramKind, source: &str) -> RenderFuture {
        let result = check_xml(source).map(|_| RenderedOutput::new(source));
        futures::future::ready(result).boxed()
    }
}

fn check_xml(source: &str) -> Result<(), RenderError> {
    if source.trim().is_empty() {
        return Err(RenderError::invalid_source(1, "empty diagram"));
    }

    sketchbook_markup::parse_markup(source).map_err(|error| {
        let line = source[..error.pos().min(source.len())].matches('\n').count() + 1;
        RenderError::invalid_source(line, error.to_string())
    })?;

    Ok(())
}

/// Pipes diagram source through an external program
///
/// The program reads source on stdin and writes markup on stdout. A non-zero
/// exit status is a failure carrying stderr.
pub struct CommandRenderer {
    spec: CommandSpec,
}

impl CommandRenderer {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl DiagramRenderer for CommandRenderer {
    fn render(&self, _kind: DiagramKind, source: &str) -> RenderFuture {
        let spec = self.spec.clone();
        let input = source.to_string();
        async move { run_command(&spec, &input).await.map(RenderedOutput::new) }.boxed()
    }
}

/// External XML editor launched as a process
pub struct CommandEditor {
    spec: CommandSpec,
}

impl CommandEditor {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl DiagramEditor for CommandEditor {
    fn edit(&self, xml: &str) -> EditFuture {
        let spec = self.spec.clone();
        let input = xml.to_string();
        async move {
            let updated = run_command(&spec, &input).await?;
            check_xml(&updated)?;
            Ok::<_, RenderError>(updated)
        }
        .boxed()
    }
}

async fn run_command(spec: &CommandSpec, input: &str) -> Result<String, RenderError> {
    let failure = |message: String| RenderError::Command {
        program: spec.program.clone(),
        message,
    };

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| failure(e.to_string()))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .await
            .map_err(|e| failure(e.to_string()))?;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| failure(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(failure(format!("{} ({})", stderr, output.status)));
    }

    String::from_utf8(output.stdout).map_err(|e| failure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_xml_passthrough_accepts_well_formed() {
        let xml = r#"<mxGraphModel><root><mxCell id="0"/></root></mxGraphModel>"#;
        let output = XmlPassthroughRenderer
            .render(DiagramKind::ExternalXml, xml)
            .await
            .unwrap();
        assert_eq!(output.markup, xml);
    }

    #[tokio::test]
    async fn test_xml_passthrough_reports_line() {
        let xml = "<mxGraphModel>\n<root>\n</mxGraphModel>";
        let error = XmlPassthroughRenderer
            .render(DiagramKind::ExternalXml, xml)
            .await
            .unwrap_err();
        assert!(matches!(error, RenderError::InvalidSource { line: 3, .. }));
    }

    #[tokio::test]
    async fn test_renderer_set_missing_kind() {
        let set = RendererSet::new().with(DiagramKind::Flowchart, FlowchartTextRenderer);
        let error = set.render(DiagramKind::ExternalXml, "<a/>").await.unwrap_err();
        assert_eq!(error, RenderError::NoRenderer("external_xml".to_string()));
    }

    #[tokio::test]
    async fn test_command_renderer_missing_program() {
        let renderer = CommandRenderer::new(CommandSpec {
            program: "sketchbook-no-such-renderer".to_string(),
            args: vec![],
        });
        let error = renderer.render(DiagramKind::Flowchart, "A->B").await.unwrap_err();
        assert!(matches!(error, RenderError::Command { .. }));
        assert!(error.is_transient());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_renderer_pipes_source() {
        let renderer = CommandRenderer::new(CommandSpec {
            program: "cat".to_string(),
            args: vec![],
        });
        let output = renderer.render(DiagramKind::Flowchart, "A->B").await.unwrap();
        assert_eq!(output.markup, "A->B");
    }
}
