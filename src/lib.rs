//! imagepipe - lazy image-transformation pipelines.
//!
//! Operations are queued by name, sealed with [`Pipeline::done`], and nothing
//! touches pixels until the returned [`Scheduled`] handle is run. Geometry
//! requests (`width`, `height`, `x`, `y`) accept plain pixel values or
//! formula strings like `"x50-8"` resolved against the source image, and the
//! resize/crop constraint hooks guarantee the codec is only ever asked for
//! targets that fit inside the source.
//!
//! ```no_run
//! use imagepipe::Params;
//!
//! let mut pipeline = imagepipe::open("photo.jpg")
//!     .resize(Params::width("x50"))
//!     .crop(Params::size(400, 400).with_anchor("tl"))
//!     .save("thumb.png");
//! let image = pipeline.done().run()?;
//! # Ok::<(), imagepipe::RunError>(())
//! ```

pub mod engine;
pub mod error;
pub mod geometry;
pub mod ops;

pub use engine::{
    default_registry, DefaultCodec, Destination, EventKind, HookConfig, HookFn, Image, ImageCodec,
    OffsetReference, OpContext, OperationFn, Pipeline, PipelineEvent, Registry, RunError,
    Scheduled, SharedBuffer, Source,
};
pub use error::{ErrorCategory, PipeError};
pub use ops::{Dim, Format, Params, Region};

/// Start a pipeline on the process-default registry with the entry operation
/// queued for `src`.
pub fn open(src: impl Into<Source>) -> Pipeline {
    Pipeline::new().open(src)
}

/// One-call convenience: open `src`, apply `steps` in order, save to `dst`.
pub fn transform(
    src: impl Into<Source>,
    steps: impl IntoIterator<Item = (&'static str, Params)>,
    dst: impl Into<Destination>,
) -> Result<Image, RunError> {
    let mut pipeline = open(src).apply_all(steps).save(dst);
    pipeline.done().run()
}

/// The crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
