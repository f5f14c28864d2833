use crate::error::RenderError;
use crate::renderer::RenderedOutput;

/// What a widget slot currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetContent {
    /// Not rendered yet, or a render is in flight
    Loading,
    Rendered(RenderedOutput),
    /// Inline, non-fatal error indicator
    Error(RenderError),
}

impl WidgetContent {
    pub fn is_loading(&self) -> bool {
        matches!(self, WidgetContent::Loading)
    }
}

/// Host-side view region a widget's rendered output is patched into
///
/// Slots are outside the document tree: patching one never touches
/// document state.
pub trait WidgetSlot: Send {
    fn patch(&mut self, content: &WidgetContent);
}
