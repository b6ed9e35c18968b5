// src/engine/events.rs
//
// Typed pipeline lifecycle events and the observer list that delivers them.

use crate::error::ErrorCategory;

/// Everything a pipeline announces while it runs.
#[derive(Clone, Debug)]
pub enum PipelineEvent {
    /// The waterfall is about to execute.
    Start,
    /// A step is about to run.
    OperationBefore { name: String, params: String },
    /// A step's callback has fired, successfully or not. The params repr
    /// reflects any values the step's constraint hook resolved in place.
    OperationAfter { name: String, params: String },
    /// Every step completed.
    Success,
    /// A step failed; the waterfall short-circuited.
    Error {
        message: String,
        category: ErrorCategory,
    },
    /// Always emitted last, after `Success` or `Error`.
    End { success: bool },
    /// A recoverable oddity reported by an operation.
    Warning { message: String },
}

/// Discriminant used to subscribe to one event kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Start,
    OperationBefore,
    OperationAfter,
    Success,
    Error,
    End,
    Warning,
}

impl PipelineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Start => EventKind::Start,
            Self::OperationBefore { .. } => EventKind::OperationBefore,
            Self::OperationAfter { .. } => EventKind::OperationAfter,
            Self::Success => EventKind::Success,
            Self::Error { .. } => EventKind::Error,
            Self::End { .. } => EventKind::End,
            Self::Warning { .. } => EventKind::Warning,
        }
    }
}

type Handler = Box<dyn FnMut(&PipelineEvent)>;

/// Registered observers. A handler with no kind filter sees every event.
#[derive(Default)]
pub struct Observers {
    handlers: Vec<(Option<EventKind>, Handler)>,
}

impl Observers {
    pub fn subscribe(&mut self, kind: Option<EventKind>, handler: impl FnMut(&PipelineEvent) + 'static) {
        self.handlers.push((kind, Box::new(handler)));
    }

    pub fn emit(&mut self, event: &PipelineEvent) {
        let kind = event.kind();
        for (filter, handler) in &mut self.handlers {
            if filter.is_none() || *filter == Some(kind) {
                handler(event);
            }
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Observers({} handlers)", self.handlers.len())
    }
}
