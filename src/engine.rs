// src/engine.rs
//
// Engine facade: wires the io/codec/hooks/registry/events/pipeline modules
// together and re-exports the public surface.

pub mod codec;
pub mod events;
pub mod hooks;
pub mod io;
pub mod operations;
pub mod pipeline;
pub mod registry;

/// Largest accepted dimension on either axis, decode and resize alike.
pub const MAX_DIMENSION: u32 = 32768;

/// Largest accepted total pixel count (decompression-bomb guard).
pub const MAX_PIXELS: u64 = 100_000_000;

pub use codec::{check_dimensions, DefaultCodec, Image, ImageCodec};
pub use events::{EventKind, Observers, PipelineEvent};
pub use hooks::{crop_constraints, resize_constraints, HookConfig, HookFn, OffsetReference};
pub use io::{Destination, Loaded, SharedBuffer, Source};
pub use pipeline::{Pipeline, RunError, Scheduled};
pub use registry::{default_registry, OpContext, OperationFn, RegisteredOp, Registry, Role};
