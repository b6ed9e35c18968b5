// src/ops.rs
//
// Operation parameter model.
// The wire-facing shapes (scalars, pairs, formula strings) normalize into one
// canonical Params bag that every operation and constraint hook reads from
// and writes back into.

use std::path::Path;

use crate::engine::{Destination, Source};
use crate::error::PipeError;
use crate::geometry;

/// A requested width/height/x/y before resolution.
///
/// Either unset, a concrete pixel value, or a formula string resolved against
/// a context-supplied reference value (see [`crate::geometry`]).
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Dim {
    #[default]
    Unset,
    Px(f64),
    Formula(String),
}

impl Dim {
    /// Resolve this spec against a reference value.
    ///
    /// Unset resolves to `0` - callers special-case "0 means use the source
    /// dimension" in the constraint hooks.
    pub fn resolve(&self, reference: f64) -> Result<f64, PipeError> {
        match self {
            Dim::Unset => Ok(0.0),
            Dim::Px(v) => Ok(*v),
            Dim::Formula(spec) => geometry::compute_formula(spec, reference),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Dim::Unset)
    }

    /// The resolved pixel value, if this spec has already been resolved to a
    /// concrete non-negative integer by a constraint hook.
    pub fn as_px(&self) -> Option<u32> {
        match self {
            Dim::Px(v) if *v >= 0.0 => Some(v.round() as u32),
            _ => None,
        }
    }
}

impl From<u32> for Dim {
    fn from(v: u32) -> Self {
        Dim::Px(f64::from(v))
    }
}

impl From<i32> for Dim {
    fn from(v: i32) -> Self {
        Dim::Px(f64::from(v))
    }
}

impl From<f64> for Dim {
    fn from(v: f64) -> Self {
        Dim::Px(v)
    }
}

impl From<&str> for Dim {
    fn from(v: &str) -> Self {
        Dim::Formula(v.to_owned())
    }
}

impl From<String> for Dim {
    fn from(v: String) -> Self {
        Dim::Formula(v)
    }
}

impl<T: Into<Dim>> From<Option<T>> for Dim {
    fn from(v: Option<T>) -> Self {
        v.map_or(Dim::Unset, Into::into)
    }
}

/// Output format for encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Jpeg,
    Png,
    WebP,
    Bmp,
}

impl Format {
    pub fn from_name(name: &str) -> Result<Self, PipeError> {
        match name.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "bmp" => Ok(Self::Bmp),
            other => Err(PipeError::unsupported_format(other.to_owned())),
        }
    }

    /// Infer a format from a destination path's extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_name(ext).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
        }
    }
}

/// A resolved crop/resize target region, post constraint resolution.
///
/// Invariant: `x + width <= source_width` and `y + height <= source_height`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Region {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// The canonical parameter bag shared by all operations.
///
/// Operations only read the fields they care about; a step enqueued without
/// explicit params is bound to the pipeline's shared bag instead, which lets
/// one operation leave data for a later one.
#[derive(Debug, Default)]
pub struct Params {
    /// Entry operation input (`from`/`open`).
    pub source: Option<Source>,
    /// Exit operation output (`to`/`save`).
    pub dest: Option<Destination>,
    pub width: Dim,
    pub height: Dim,
    pub x: Dim,
    pub y: Dim,
    /// Landmark selector: names the point in the source to read `x`/`y` from.
    pub anchor: Option<String>,
    /// Direction the crop region extends from the landmark point.
    pub gravity: Option<String>,
    /// Explicit output format override (beats destination extension).
    pub format: Option<Format>,
    /// Encode quality 1-100, JPEG/WebP only.
    pub quality: Option<u8>,
    /// Progressive encoding, JPEG only.
    pub progressive: bool,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a `(width, height)` pair.
    pub fn size(width: impl Into<Dim>, height: impl Into<Dim>) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
            ..Self::default()
        }
    }

    /// Normalize a full `(width, height, x, y)` region request.
    pub fn region(
        width: impl Into<Dim>,
        height: impl Into<Dim>,
        x: impl Into<Dim>,
        y: impl Into<Dim>,
    ) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
            x: x.into(),
            y: y.into(),
            ..Self::default()
        }
    }

    /// Normalize a width-only request (height follows the aspect ratio).
    pub fn width(width: impl Into<Dim>) -> Self {
        Self {
            width: width.into(),
            ..Self::default()
        }
    }

    pub fn src(source: impl Into<Source>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    pub fn dst(dest: impl Into<Destination>) -> Self {
        Self {
            dest: Some(dest.into()),
            ..Self::default()
        }
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn with_gravity(mut self, gravity: impl Into<String>) -> Self {
        self.gravity = Some(gravity.into());
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn progressive(mut self) -> Self {
        self.progressive = true;
        self
    }

    /// The resolved region, available once a constraint hook has written
    /// concrete values back into the bag.
    pub fn resolved_region(&self) -> Option<Region> {
        Some(Region {
            width: self.width.as_px()?,
            height: self.height.as_px()?,
            x: self.x.as_px()?,
            y: self.y.as_px()?,
        })
    }
}

impl From<(u32, u32)> for Params {
    fn from(pair: (u32, u32)) -> Self {
        Params::size(pair.0, pair.1)
    }
}

impl From<u32> for Params {
    fn from(width: u32) -> Self {
        Params::width(width)
    }
}

impl From<(u32, u32, u32, u32)> for Params {
    fn from(region: (u32, u32, u32, u32)) -> Self {
        Params::region(region.0, region.1, region.2, region.3)
    }
}
