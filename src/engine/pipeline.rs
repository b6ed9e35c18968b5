// src/engine/pipeline.rs
//
// The lazy waterfall. Calls only queue work; nothing executes until the
// Scheduled handle returned by done() is driven. Errors recorded during
// queueing (unknown op, duplicate entry/exit) short-circuit the run before
// any step executes, and the first step failure stops the waterfall.

use std::sync::Arc;

use thiserror::Error;

use crate::engine::codec::{DefaultCodec, Image, ImageCodec};
use crate::engine::events::{EventKind, Observers, PipelineEvent};
use crate::engine::registry::{default_registry, OpContext, OperationFn, Registry, Role};
use crate::error::PipeError;
use crate::ops::Params;

/// A failed run: the error plus whatever image the waterfall had produced
/// before it stopped.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunError {
    pub error: PipeError,
    pub image: Option<Image>,
}

enum ParamsSlot {
    /// Params given at enqueue time, private to this step.
    Own(Params),
    /// Bound to the pipeline's shared bag; earlier steps can leave data here.
    Shared,
}

struct Step {
    name: String,
    role: Role,
    func: OperationFn,
    params: ParamsSlot,
}

/// An ordered, reusable queue of named operations over one image.
pub struct Pipeline {
    registry: Arc<Registry>,
    codec: Arc<dyn ImageCodec>,
    queue: Vec<Step>,
    shared: Params,
    error: Option<PipeError>,
    observers: Observers,
}

impl Pipeline {
    /// A pipeline over the process-default registry.
    pub fn new() -> Self {
        Self::with_registry(default_registry())
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            codec: Arc::new(DefaultCodec),
            queue: Vec::new(),
            shared: Params::default(),
            error: None,
            observers: Observers::default(),
        }
    }

    /// Swap the pixel backend.
    pub fn with_codec(mut self, codec: impl ImageCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    // =========================================================================
    // QUEUEING
    // =========================================================================

    /// Queue a registered operation with its own params.
    pub fn apply(mut self, name: &str, params: impl Into<Params>) -> Self {
        self.enqueue(name, Some(params.into()));
        self
    }

    /// Queue a registered operation bound to the shared-params bag.
    pub fn apply_shared(mut self, name: &str) -> Self {
        self.enqueue(name, None);
        self
    }

    /// Queue every `(name, params)` pair in order.
    pub fn apply_all(mut self, steps: impl IntoIterator<Item = (&'static str, Params)>) -> Self {
        for (name, params) in steps {
            self.enqueue(name, Some(params));
        }
        self
    }

    /// Queue a one-off closure without registering it.
    pub fn apply_fn<F>(mut self, name: impl Into<String>, func: F, params: Option<Params>) -> Self
    where
        F: Fn(&mut Params, &mut Option<Image>, &mut OpContext) -> Result<(), PipeError>
            + Send
            + Sync
            + 'static,
    {
        if self.error.is_none() {
            self.push_step(Step {
                name: name.into(),
                role: Role::Middle,
                func: Arc::new(func),
                params: params.map_or(ParamsSlot::Shared, ParamsSlot::Own),
            });
        }
        self
    }

    /// Queue the entry operation for `src`.
    pub fn open(self, src: impl Into<crate::engine::Source>) -> Self {
        self.apply("from", Params::src(src))
    }

    pub fn resize(self, params: impl Into<Params>) -> Self {
        self.apply("resize", params)
    }

    pub fn crop(self, params: impl Into<Params>) -> Self {
        self.apply("crop", params)
    }

    /// Queue the exit operation for `dst`.
    pub fn save(self, dst: impl Into<crate::engine::Destination>) -> Self {
        self.apply("to", Params::dst(dst))
    }

    fn enqueue(&mut self, name: &str, params: Option<Params>) {
        if self.error.is_some() {
            return;
        }
        let Some(op) = self.registry.get(name) else {
            self.error = Some(PipeError::operation_not_found(name.to_owned()));
            return;
        };
        self.push_step(Step {
            name: name.to_owned(),
            role: op.role,
            func: op.func,
            params: params.map_or(ParamsSlot::Shared, ParamsSlot::Own),
        });
    }

    fn push_step(&mut self, step: Step) {
        // Entry and exit operations are singletons per pipeline.
        if step.role != Role::Middle && self.queue.iter().any(|s| s.role == step.role) {
            self.error = Some(PipeError::duplicate_operation(step.name));
            return;
        }
        tracing::debug!(op = %step.name, "queueing");
        match step.role {
            // The entry op decodes first no matter when it was queued.
            Role::Entry => self.queue.insert(0, step),
            Role::Middle | Role::Exit => self.queue.push(step),
        }
    }

    // =========================================================================
    // OBSERVATION
    // =========================================================================

    /// Observe every event.
    pub fn on(mut self, handler: impl FnMut(&PipelineEvent) + 'static) -> Self {
        self.observers.subscribe(None, handler);
        self
    }

    /// Observe one event kind.
    pub fn on_kind(mut self, kind: EventKind, handler: impl FnMut(&PipelineEvent) + 'static) -> Self {
        self.observers.subscribe(Some(kind), handler);
        self
    }

    // =========================================================================
    // SCHEDULING
    // =========================================================================

    /// Seal the queue and hand back a lazy run handle. The exit operation is
    /// moved to the back; observers may still subscribe on the handle before
    /// anything executes.
    pub fn done(&mut self) -> Scheduled<'_> {
        if let Some(pos) = self.queue.iter().position(|s| s.role == Role::Exit) {
            if pos != self.queue.len() - 1 {
                let exit = self.queue.remove(pos);
                self.queue.push(exit);
            }
        }
        tracing::debug!(steps = self.queue.len(), "pipeline scheduled");
        Scheduled { pipeline: self }
    }

    /// Reset queue, shared params, and the error slot. Observers persist.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.shared = Params::default();
        self.error = None;
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn execute(&mut self) -> Result<Image, RunError> {
        self.observers.emit(&PipelineEvent::Start);

        let steps = std::mem::take(&mut self.queue);
        let mut shared = std::mem::take(&mut self.shared);
        let mut error = self.error.take();
        let codec = Arc::clone(&self.codec);
        let registry = Arc::clone(&self.registry);
        let mut image: Option<Image> = None;

        if error.is_none() {
            for mut step in steps {
                let params_repr = match &step.params {
                    ParamsSlot::Own(p) => format!("{p:?}"),
                    ParamsSlot::Shared => format!("{shared:?}"),
                };
                self.observers.emit(&PipelineEvent::OperationBefore {
                    name: step.name.clone(),
                    params: params_repr,
                });
                tracing::trace!(op = %step.name, "step");

                let mut ctx = OpContext::new(codec.as_ref(), registry.as_ref());
                let result = {
                    let params = match &mut step.params {
                        ParamsSlot::Own(p) => p,
                        ParamsSlot::Shared => &mut shared,
                    };
                    (step.func)(params, &mut image, &mut ctx)
                };

                for message in ctx.warnings {
                    tracing::warn!(op = %step.name, %message);
                    self.observers.emit(&PipelineEvent::Warning { message });
                }
                let params_repr = match &step.params {
                    ParamsSlot::Own(p) => format!("{p:?}"),
                    ParamsSlot::Shared => format!("{shared:?}"),
                };
                self.observers.emit(&PipelineEvent::OperationAfter {
                    name: step.name.clone(),
                    params: params_repr,
                });

                if let Err(e) = result {
                    error = Some(e);
                    break;
                }
            }
        }

        // Finalize: the pipeline is already back to idle (queue and shared
        // bag were taken above), so it is immediately reusable.
        self.error = None;
        let outcome = match (error, image) {
            (Some(e), image) => Err(RunError { error: e, image }),
            (None, Some(img)) => Ok(img),
            (None, None) => Err(RunError {
                error: PipeError::validation("pipeline", "produced no image"),
                image: None,
            }),
        };

        match &outcome {
            Ok(_) => {
                tracing::debug!("pipeline succeeded");
                self.observers.emit(&PipelineEvent::Success);
                self.observers.emit(&PipelineEvent::End { success: true });
            }
            Err(failed) => {
                tracing::debug!(error = %failed.error, "pipeline failed");
                self.observers.emit(&PipelineEvent::Error {
                    message: failed.error.to_string(),
                    category: failed.error.category(),
                });
                self.observers.emit(&PipelineEvent::End { success: false });
            }
        }
        outcome
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.queue.iter().map(|s| s.name.as_str()).collect();
        f.debug_struct("Pipeline")
            .field("queue", &names)
            .field("error", &self.error)
            .finish()
    }
}

/// A sealed pipeline waiting to run. Nothing executes until [`Scheduled::run`]
/// is called, so subscribing after `done()` never misses an event.
#[must_use = "a scheduled pipeline does nothing until run"]
pub struct Scheduled<'a> {
    pipeline: &'a mut Pipeline,
}

impl Scheduled<'_> {
    /// Observe every event of the upcoming run.
    pub fn on(self, handler: impl FnMut(&PipelineEvent) + 'static) -> Self {
        self.pipeline.observers.subscribe(None, handler);
        self
    }

    /// Observe one event kind of the upcoming run.
    pub fn on_kind(self, kind: EventKind, handler: impl FnMut(&PipelineEvent) + 'static) -> Self {
        self.pipeline.observers.subscribe(Some(kind), handler);
        self
    }

    /// Drive the waterfall to completion.
    pub fn run(self) -> Result<Image, RunError> {
        self.pipeline.execute()
    }

    /// Callback-style adapter around [`Scheduled::run`].
    pub fn run_with(self, callback: impl FnOnce(Result<Image, RunError>)) {
        callback(self.run());
    }
}
