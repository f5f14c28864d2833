//! # Render Scheduler
//!
//! Keeps rendered diagram output consistent with the latest document state
//! while renders run asynchronously.
//!
//! ## Per-widget state machine
//!
//! ```text
//! Unrendered ──▶ Rendering ──▶ Rendered
//!                    │
//!                    └───────▶ Errored
//! ```
//!
//! ## Design
//!
//! - `update` diffs the new placeholder list against the current widgets by
//!   `(id, source hash)`. Unchanged widgets are left alone. Changed or new
//!   ones are served from the cache, adopt a render already in flight for
//!   the same source, or get a fresh render dispatched.
//! - Every request for a widget takes a new generation number. A completion
//!   is applied only if its generation is still the latest one requested for
//!   that widget, so the last edit always wins. Stale results are dropped
//!   without being cached.
//! - Renders run as tokio tasks and report back over an mpsc channel. The
//!   owner applies completions with `recv_completion`/`drain_completions`,
//!   so all scheduler state is mutated from one place.
//! - Renderer failures, panics and timeouts all end in `Errored`. Nothing
//!   propagates out of the scheduler.

use crate::cache::{CacheEntry, CacheKey, RenderCache};
use crate::config::RenderConfig;
use crate::decorations::WidgetPlaceholder;
use crate::error::RenderError;
use crate::renderer::{DiagramRenderer, RenderedOutput};
use crate::slot::{WidgetContent, WidgetSlot};
use futures::FutureExt;
use sketchbook_schema::{DiagramId, DiagramKind, SourceHash};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Render state of one widget
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetState {
    Unrendered,
    Rendering {
        generation: u64,
        source_hash: SourceHash,
    },
    Rendered {
        generation: u64,
        source_hash: SourceHash,
        output: RenderedOutput,
    },
    Errored {
        generation: u64,
        source_hash: SourceHash,
        error: RenderError,
    },
}

impl WidgetState {
    pub fn content(&self) -> WidgetContent {
        match self {
            WidgetState::Unrendered | WidgetState::Rendering { .. } => WidgetContent::Loading,
            WidgetState::Rendered { output, .. } => WidgetContent::Rendered(output.clone()),
            WidgetState::Errored { error, .. } => WidgetContent::Error(error.clone()),
        }
    }

    fn settled(generation: u64, source_hash: SourceHash, result: Result<RenderedOutput, RenderError>) -> Self {
        match result {
            Ok(output) => WidgetState::Rendered {
                generation,
                source_hash,
                output,
            },
            Err(error) => WidgetState::Errored {
                generation,
                source_hash,
                error,
            },
        }
    }
}

/// Result message sent by a render task
#[derive(Debug)]
struct Completion {
    id: DiagramId,
    source_hash: SourceHash,
    source_text: String,
    generation: u64,
    result: Result<RenderedOutput, RenderError>,
}

/// What happened to a completion when it was applied
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// Stored and patched into the widget's slot
    Applied { id: DiagramId, generation: u64 },
    /// A newer request for the widget exists; result dropped
    Stale { id: DiagramId, generation: u64 },
    /// The widget no longer exists; result dropped
    Orphaned { id: DiagramId, generation: u64 },
}

struct Widget {
    placeholder: WidgetPlaceholder,
    state: WidgetState,
    /// Latest generation requested for this widget
    requested: u64,
}

pub struct RenderScheduler {
    renderer: Arc<dyn DiagramRenderer>,
    timeout: Duration,
    widgets: HashMap<DiagramId, Widget>,
    /// Widget ids in document order
    order: Vec<DiagramId>,
    slots: HashMap<DiagramId, Box<dyn WidgetSlot>>,
    cache: RenderCache,
    /// Renders still running, by source, with their generation
    in_flight: HashMap<CacheKey, u64>,
    next_generation: u64,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl RenderScheduler {
    pub fn new(renderer: Arc<dyn DiagramRenderer>, config: &RenderConfig) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            renderer,
            timeout: config.timeout(),
            widgets: HashMap::new(),
            order: Vec::new(),
            slots: HashMap::new(),
            cache: RenderCache::new(config.cache_capacity),
            in_flight: HashMap::new(),
            next_generation: 0,
            completions_tx,
            completions_rx,
        }
    }

    /// Reconcile widgets with a freshly derived placeholder list
    ///
    /// Must be called from within a tokio runtime: new renders are spawned.
    pub fn update(&mut self, placeholders: &[WidgetPlaceholder]) {
        let current: HashSet<&DiagramId> = placeholders.iter().map(|p| &p.id).collect();

        // Step 1: release widgets whose placeholder disappeared
        let removed: Vec<DiagramId> = self
            .widgets
            .keys()
            .filter(|id| !current.contains(id))
            .cloned()
            .collect();
        for id in removed {
            debug!(id = %id, "releasing widget");
            self.widgets.remove(&id);
            self.slots.remove(&id);
        }

        // Step 2: schedule new and changed widgets
        for placeholder in placeholders {
            match self.widgets.get_mut(&placeholder.id) {
                Some(widget)
                    if widget.placeholder.source_hash == placeholder.source_hash
                        && widget.placeholder.source_text == placeholder.source_text =>
                {
                    // Unchanged source; only the position may have moved
                    widget.placeholder.position = placeholder.position;
                }
                _ => self.schedule(placeholder),
            }
        }

        self.order = placeholders.iter().map(|p| p.id.clone()).collect();
    }

    fn schedule(&mut self, placeholder: &WidgetPlaceholder) {
        let generation = self.bump_generation();
        let key: CacheKey = (placeholder.id.clone(), placeholder.source_hash);

        let state = if let Some(entry) = self
            .cache
            .get(&placeholder.id, placeholder.source_hash, &placeholder.source_text)
        {
            debug!(id = %placeholder.id, hash = %placeholder.source_hash, "render cache hit");
            WidgetState::settled(generation, placeholder.source_hash, entry.result.clone())
        } else if let Some(&in_flight) = self.in_flight.get(&key) {
            debug!(id = %placeholder.id, generation = in_flight, "adopting in-flight render");
            self.insert_widget(placeholder, in_flight, WidgetState::Rendering {
                generation: in_flight,
                source_hash: placeholder.source_hash,
            });
            return;
        } else {
            self.dispatch(placeholder, generation);
            self.in_flight.insert(key, generation);
            WidgetState::Rendering {
                generation,
                source_hash: placeholder.source_hash,
            }
        };

        self.insert_widget(placeholder, generation, state);
    }

    fn insert_widget(&mut self, placeholder: &WidgetPlaceholder, requested: u64, state: WidgetState) {
        let content = state.content();
        self.widgets.insert(
            placeholder.id.clone(),
            Widget {
                placeholder: placeholder.clone(),
                state,
                requested,
            },
        );
        self.patch_slot(&placeholder.id, &content);
    }

    fn dispatch(&self, placeholder: &WidgetPlaceholder, generation: u64) {
        debug!(
            id = %placeholder.id,
            hash = %placeholder.source_hash,
            generation,
            "dispatching render"
        );

        let renderer = Arc::clone(&self.renderer);
        let tx = self.completions_tx.clone();
        let timeout = self.timeout;
        let kind: DiagramKind = placeholder.kind;
        let id = placeholder.id.clone();
        let source_hash = placeholder.source_hash;
        let source_text = placeholder.source_text.clone();

        tokio::spawn(async move {
            let render = AssertUnwindSafe(async { renderer.render(kind, &source_text).await }).catch_unwind();

            let result = match tokio::time::timeout(timeout, render).await {
                Ok(Ok(result)) => result,
                Ok(Err(panic)) => Err(RenderError::Panicked(panic_message(panic))),
                Err(_) => Err(RenderError::TimedOut(timeout)),
            };

            // The receiver is gone only if the scheduler was dropped
            let _ = tx.send(Completion {
                id,
                source_hash,
                source_text,
                generation,
                result,
            });
        });
    }

    /// Wait for the next render to finish and apply it
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn recv_completion(&mut self) -> Option<CompletionOutcome> {
        if self.in_flight.is_empty() {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        Some(self.apply_completion(completion))
    }

    /// Apply every completion that has already arrived, without waiting
    pub fn drain_completions(&mut self) -> Vec<CompletionOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.completions_rx.try_recv() {
            outcomes.push(self.apply_completion(completion));
        }
        outcomes
    }

    /// Wait until every dispatched render has reported back
    pub async fn settle(&mut self) -> Vec<CompletionOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.recv_completion().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    fn apply_completion(&mut self, completion: Completion) -> CompletionOutcome {
        let key: CacheKey = (completion.id.clone(), completion.source_hash);
        if self.in_flight.get(&key) == Some(&completion.generation) {
            self.in_flight.remove(&key);
        }

        let id = completion.id.clone();
        let generation = completion.generation;

        let Some(widget) = self.widgets.get_mut(&completion.id) else {
            debug!(id = %id, generation, "discarding render for released widget");
            return CompletionOutcome::Orphaned { id, generation };
        };

        if widget.requested != completion.generation {
            debug!(
                id = %id,
                generation,
                latest = widget.requested,
                "discarding stale render"
            );
            return CompletionOutcome::Stale { id, generation };
        }

        if let Err(error) = &completion.result {
            warn!(id = %id, error = %error, "diagram render failed");
        }

        widget.state = WidgetState::settled(generation, completion.source_hash, completion.result.clone());
        let content = widget.state.content();

        let cacheable = match &completion.result {
            Ok(_) => true,
            Err(error) => !error.is_transient(),
        };
        if cacheable {
            let current = self.current_keys();
            self.cache.insert(
                CacheEntry::new(
                    completion.id,
                    completion.source_hash,
                    completion.source_text,
                    completion.result,
                    generation,
                ),
                &current,
            );
        }

        self.patch_slot(&id, &content);
        CompletionOutcome::Applied { id, generation }
    }

    /// Attach a host slot to a widget; it is patched with the current content at once
    pub fn mount_slot(&mut self, id: DiagramId, mut slot: Box<dyn WidgetSlot>) {
        let content = self
            .widgets
            .get(&id)
            .map(|widget| widget.state.content())
            .unwrap_or(WidgetContent::Loading);
        slot.patch(&content);
        self.slots.insert(id, slot);
    }

    pub fn unmount_slot(&mut self, id: &DiagramId) -> Option<Box<dyn WidgetSlot>> {
        self.slots.remove(id)
    }

    fn patch_slot(&mut self, id: &DiagramId, content: &WidgetContent) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.patch(content);
        }
    }

    fn current_keys(&self) -> HashSet<CacheKey> {
        self.widgets
            .values()
            .map(|w| (w.placeholder.id.clone(), w.placeholder.source_hash))
            .collect()
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    pub fn state(&self, id: &DiagramId) -> Option<&WidgetState> {
        self.widgets.get(id).map(|w| &w.state)
    }

    pub fn content(&self, id: &DiagramId) -> Option<WidgetContent> {
        self.state(id).map(WidgetState::content)
    }

    /// Current widgets in document order
    pub fn widgets(&self) -> Vec<(&WidgetPlaceholder, &WidgetState)> {
        self.order
            .iter()
            .filter_map(|id| self.widgets.get(id))
            .map(|w| (&w.placeholder, &w.state))
            .collect()
    }

    /// Number of renders still running, stale ones included
    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
