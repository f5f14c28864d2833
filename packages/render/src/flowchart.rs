//! # Flowchart Text Renderer
//!
//! Renders small flowchart scripts to a text diagram.
//!
//! ```text
//! flowchart LR
//! start[Start] -> check -> done[Done]
//! check -> retry
//! ```
//!
//! - An optional `flowchart <direction>` header comes first.
//! - Every other non-empty line is an edge chain `A -> B -> C` (`->` or `-->`).
//!   Several statements may share a line separated by `;`.
//! - A node may carry a label on any mention: `id[Label]`.
//! - Lines starting with `%%` are comments.

use crate::error::RenderError;
use crate::renderer::{DiagramRenderer, RenderFuture, RenderedOutput};
use futures::FutureExt;
use sketchbook_schema::DiagramKind;
use std::collections::HashMap;

const DIRECTIONS: [&str; 5] = ["TD", "TB", "LR", "RL", "BT"];

/// Parsed flowchart
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Flowchart {
    pub direction: String,
    /// Node ids in first-mention order
    pub nodes: Vec<String>,
    pub labels: HashMap<String, String>,
    pub edges: Vec<(String, String)>,
}

impl Flowchart {
    pub fn label<'a>(&'a self, id: &'a str) -> &'a str {
        self.labels.get(id).map(String::as_str).unwrap_or(id)
    }
}

pub fn parse_flowchart(source: &str) -> Result<Flowchart, RenderError> {
    let mut chart = Flowchart {
        direction: "TD".to_string(),
        ..Flowchart::default()
    };
    let mut seen_statement = false;

    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with("%%") {
            continue;
        }

        if !seen_statement {
            let header = line
                .strip_prefix("flowchart")
                .or_else(|| line.strip_prefix("graph"))
                .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace));
            if let Some(rest) = header {
                let direction = rest.trim();
                if !direction.is_empty() {
                    if !DIRECTIONS.contains(&direction) {
                        return Err(RenderError::invalid_source(
                            line_no,
                            format!("invalid direction '{}' (expected TD/TB/LR/RL/BT)", direction),
                        ));
                    }
                    chart.direction = direction.to_string();
                }
                seen_statement = true;
                continue;
            }
        }
        seen_statement = true;

        for statement in line.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            parse_statement(statement, line_no, &mut chart)?;
        }
    }

    if chart.edges.is_empty() {
        return Err(RenderError::invalid_source(1, "flowchart has no edges"));
    }

    Ok(chart)
}

fn parse_statement(statement: &str, line_no: usize, chart: &mut Flowchart) -> Result<(), RenderError> {
    let normalized = statement.replace("-->", "->");
    let parts: Vec<&str> = normalized.split("->").map(str::trim).collect();

    if parts.len() < 2 {
        return Err(RenderError::invalid_source(
            line_no,
            format!("expected an edge like A->B, found '{}'", statement),
        ));
    }

    let mut previous: Option<String> = None;
    for part in parts {
        let id = parse_node(part, line_no, chart)?;
        if let Some(from) = previous.take() {
            chart.edges.push((from, id.clone()));
        }
        previous = Some(id);
    }

    Ok(())
}

fn parse_node(token: &str, line_no: usize, chart: &mut Flowchart) -> Result<String, RenderError> {
    let (id, label) = match token.find('[') {
        Some(open) => {
            let Some(inner) = token[open + 1..].strip_suffix(']') else {
                return Err(RenderError::invalid_source(
                    line_no,
                    format!("unclosed label in '{}'", token),
                ));
            };
            (token[..open].trim(), Some(inner.trim()))
        }
        None => (token, None),
    };

    if id.is_empty() {
        return Err(RenderError::invalid_source(line_no, "edge is missing a node"));
    }
    if !id.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(RenderError::invalid_source(
            line_no,
            format!("invalid node id '{}'", id),
        ));
    }

    if let Some(label) = label {
        if label.is_empty() {
            return Err(RenderError::invalid_source(line_no, format!("empty label on '{}'", id)));
        }
        match chart.labels.get(id) {
            Some(existing) if existing != label => {
                return Err(RenderError::invalid_source(
                    line_no,
                    format!("conflicting label for '{}': '{}' vs '{}'", id, existing, label),
                ));
            }
            _ => {
                chart.labels.insert(id.to_string(), label.to_string());
            }
        }
    }

    if !chart.nodes.iter().any(|n| n == id) {
        chart.nodes.push(id.to_string());
    }

    Ok(id.to_string())
}

/// Render a parsed flowchart as escaped preformatted text
pub fn render_flowchart_text(chart: &Flowchart) -> String {
    let mut lines = vec![format!(
        "flowchart {} ({} nodes, {} edges)",
        chart.direction,
        chart.nodes.len(),
        chart.edges.len()
    )];
    for (from, to) in &chart.edges {
        lines.push(format!("[{}] --> [{}]", chart.label(from), chart.label(to)));
    }

    format!(
        "<pre class=\"flowchart\">{}</pre>",
        escape(&lines.join("\n"))
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Built-in renderer for flowchart scripts
pub struct FlowchartTextRenderer;

impl DiagramRenderer for FlowchartTextRenderer {
    fn render(&self, _kind: DiagramKind, source: &str) -> RenderFuture {
        let result = parse_flowchart(source).map(|chart| RenderedOutput::new(render_flowchart_text(&chart)));
        futures::future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_edge() {
        let chart = parse_flowchart("A->B").unwrap();
        assert_eq!(chart.nodes, vec!["A", "B"]);
        assert_eq!(chart.edges, vec![("A".to_string(), "B".to_string())]);
        assert_eq!(chart.direction, "TD");
    }

    #[test]
    fn test_parse_header_chain_and_labels() {
        let chart = parse_flowchart("flowchart LR\nstart[Start] --> check -> done[Done]; check -> start").unwrap();
        assert_eq!(chart.direction, "LR");
        assert_eq!(chart.nodes, vec!["start", "check", "done"]);
        assert_eq!(chart.edges.len(), 3);
        assert_eq!(chart.label("start"), "Start");
        assert_eq!(chart.label("check"), "check");
    }

    #[test]
    fn test_malformed_syntax_rejected() {
        let error = parse_flowchart("malformed-syntax").unwrap_err();
        assert!(matches!(error, RenderError::InvalidSource { line: 1, .. }));
    }

    #[test]
    fn test_missing_node_reports_line() {
        let error = parse_flowchart("A->B\n%% note\nB->").unwrap_err();
        assert!(matches!(error, RenderError::InvalidSource { line: 3, .. }));
    }

    #[test]
    fn test_conflicting_labels_rejected() {
        assert!(parse_flowchart("a[One]->b\nb->a[Two]").is_err());
    }

    #[test]
    fn test_invalid_direction() {
        let error = parse_flowchart("flowchart XY\nA->B").unwrap_err();
        assert!(error.to_string().contains("XY"));
    }

    #[test]
    fn test_render_text_is_escaped() {
        let chart = parse_flowchart("a[x<y]->b").unwrap();
        let text = render_flowchart_text(&chart);
        assert!(text.starts_with("<pre class=\"flowchart\">"));
        assert!(text.contains("[x&lt;y] --&gt; [b]"));
    }
}
