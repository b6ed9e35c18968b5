// src/engine/operations.rs
//
// Built-in operations: decode (from/open), resize, crop, encode (to/save).
// Geometry policy lives in the constraint hooks; these functions wire params,
// hooks, and the codec together and decide when no pixel work is needed.
// They only take the image out of the slot at the moment pixels actually
// change hands, so a failure leaves the last good image in place.

use crate::engine::codec::Image;
use crate::engine::registry::OpContext;
use crate::error::PipeError;
use crate::ops::{Format, Params, Region};

/// Entry operation: read the source bytes and decode them into the slot.
pub fn from(
    params: &mut Params,
    image: &mut Option<Image>,
    ctx: &mut OpContext,
) -> Result<(), PipeError> {
    let source = params
        .source
        .as_ref()
        .ok_or_else(|| PipeError::validation("source", "is required to open an image"))?;

    let loaded = source.load()?;
    let bytes = loaded.as_bytes();
    if bytes.is_empty() {
        return Err(PipeError::empty_input(source.describe()));
    }

    tracing::trace!(source = %source.describe(), len = bytes.len(), "decoding");
    *image = Some(ctx.codec.decode(bytes)?);
    Ok(())
}

/// Resize to the constrained target, skipping the codec when nothing changes.
pub fn resize(
    params: &mut Params,
    image: &mut Option<Image>,
    ctx: &mut OpContext,
) -> Result<(), PipeError> {
    let current = image
        .as_ref()
        .ok_or_else(|| PipeError::validation("resize", "requires a decoded image"))?;
    if current.is_empty() {
        return Ok(());
    }

    if let Some(hook) = ctx.hook("resize", "constraints") {
        hook(params, current, &ctx.config)?;
    }

    let width = params
        .width
        .as_px()
        .ok_or_else(|| PipeError::validation("width", "did not resolve to a pixel value"))?;
    let height = params
        .height
        .as_px()
        .ok_or_else(|| PipeError::validation("height", "did not resolve to a pixel value"))?;

    if (width, height) == (current.width(), current.height()) {
        return Ok(());
    }

    tracing::trace!(width, height, "resizing");
    let owned = image
        .take()
        .ok_or_else(|| PipeError::internal("image slot emptied mid-operation"))?;
    *image = Some(ctx.codec.resize(owned, width, height)?);
    Ok(())
}

/// Crop to the constrained region, skipping the codec for a full-frame crop.
pub fn crop(
    params: &mut Params,
    image: &mut Option<Image>,
    ctx: &mut OpContext,
) -> Result<(), PipeError> {
    let current = image
        .as_ref()
        .ok_or_else(|| PipeError::validation("crop", "requires a decoded image"))?;
    if current.is_empty() {
        return Ok(());
    }

    if let Some(hook) = ctx.hook("crop", "constraints") {
        hook(params, current, &ctx.config)?;
    }

    let region = params
        .resolved_region()
        .ok_or_else(|| PipeError::validation("region", "did not resolve to pixel values"))?;

    let full_frame = Region {
        width: current.width(),
        height: current.height(),
        x: 0,
        y: 0,
    };
    if region == full_frame {
        return Ok(());
    }

    tracing::trace!(?region, "cropping");
    let owned = image
        .take()
        .ok_or_else(|| PipeError::internal("image slot emptied mid-operation"))?;
    *image = Some(ctx.codec.crop(owned, region)?);
    Ok(())
}

/// Exit operation: encode and write out, leaving the image in the slot.
pub fn to(
    params: &mut Params,
    image: &mut Option<Image>,
    ctx: &mut OpContext,
) -> Result<(), PipeError> {
    let current = image
        .as_ref()
        .ok_or_else(|| PipeError::validation("save", "requires a decoded image"))?;
    let dest = params
        .dest
        .as_mut()
        .ok_or_else(|| PipeError::validation("dest", "is required to save an image"))?;

    // Explicit override beats destination extension beats source format.
    let format = params
        .format
        .or_else(|| dest.path().and_then(Format::from_extension))
        .or(current.source_format())
        .ok_or_else(|| PipeError::unsupported_format("no output format could be inferred"))?;

    if params.progressive && format == Format::Jpeg {
        ctx.warn("progressive JPEG is not supported by the default codec; encoding baseline");
    }

    let quality = params.quality.unwrap_or(80);
    let bytes = ctx.codec.encode(current, format, quality)?;
    tracing::trace!(format = format.as_str(), len = bytes.len(), "encoded");
    dest.write(&bytes)
}
