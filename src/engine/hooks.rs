// src/engine/hooks.rs
//
// Constraint hooks: the mutable step between "what the caller asked for" and
// "what the codec is told to do". Each built-in geometry operation looks up
// its hook by name right before touching pixels; replacing the hook in the
// registry replaces the policy.

use std::sync::Arc;

use crate::engine::codec::Image;
use crate::error::PipeError;
use crate::geometry::{resolve_anchor_origin, resolve_anchor_point};
use crate::ops::{Dim, Params};

/// A constraint hook rewrites the params in place against the current image.
pub type HookFn = Arc<dyn Fn(&mut Params, &Image, &HookConfig) -> Result<(), PipeError> + Send + Sync>;

/// Which source dimension crop offset formulas resolve against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OffsetReference {
    /// `x` against source width, `y` against source height.
    #[default]
    MatchingAxis,
    /// Both offsets against source height. Compatibility mode for callers
    /// that relied on the historical behavior.
    SourceHeight,
}

/// Tunables shared by every hook invocation in a registry.
#[derive(Clone, Copy, Debug, Default)]
pub struct HookConfig {
    pub crop_offset_reference: OffsetReference,
}

/// Shared dimension rule for resize and crop targets:
/// zero (or unset) means the full source extent, a negative value is a
/// per-side deduction from the source, and anything larger than the source
/// clamps down to it. Never returns a negative value. A deduction that
/// consumes the whole source clamps to exactly `0`, which the codec later
/// rejects - an over-deducted request is an error, not a silent no-op.
fn constrain_extent(value: f64, source: f64) -> f64 {
    let v = if value == 0.0 {
        source
    } else if value < 0.0 {
        source + 2.0 * value
    } else {
        value.min(source)
    };
    v.max(0.0)
}

/// Default `resize:constraints` hook.
///
/// Resolves width/height formulas against the source dimensions, applies the
/// shared extent rule, then shrinks the larger relative request so the source
/// aspect ratio is preserved. Writes rounded pixel values back.
pub fn resize_constraints(
    params: &mut Params,
    image: &Image,
    _config: &HookConfig,
) -> Result<(), PipeError> {
    let src_w = f64::from(image.width());
    let src_h = f64::from(image.height());

    let mut width = constrain_extent(params.width.resolve(src_w)?, src_w);
    let mut height = constrain_extent(params.height.resolve(src_h)?, src_h);

    // The smaller relative request wins; the other axis follows the ratio.
    let ratio = src_w / src_h;
    if width / src_w <= height / src_h {
        height = width / ratio;
    } else {
        width = height * ratio;
    }

    params.width = Dim::Px(width.round());
    params.height = Dim::Px(height.round());
    Ok(())
}

/// Default `crop:constraints` hook.
///
/// Resolves the region request into concrete `(width, height, x, y)` values
/// guaranteed to sit inside the source image.
pub fn crop_constraints(
    params: &mut Params,
    image: &Image,
    config: &HookConfig,
) -> Result<(), PipeError> {
    let src_w = f64::from(image.width());
    let src_h = f64::from(image.height());

    let (ref_x, ref_y) = match config.crop_offset_reference {
        OffsetReference::MatchingAxis => (src_w, src_h),
        OffsetReference::SourceHeight => (src_h, src_h),
    };

    // Integer geometry before the containment clamps below: rounding after
    // clamping could push a fractional extent back outside the source.
    let width = constrain_extent(params.width.resolve(src_w)?, src_w).round();
    let height = constrain_extent(params.height.resolve(src_h)?, src_h).round();

    // Omitted offsets default to the image center.
    let mut x = if params.x.is_unset() {
        (src_w / 2.0).round()
    } else {
        params.x.resolve(ref_x)?
    };
    let mut y = if params.y.is_unset() {
        (src_h / 2.0).round()
    } else {
        params.y.resolve(ref_y)?
    };

    // An anchor names a landmark in the source; it overrides x/y and, absent
    // an explicit gravity, pulls the region toward itself.
    if let Some(anchor) = params.anchor.as_deref() {
        let (ax, ay) = resolve_anchor_point(Some(anchor), src_w, src_h);
        x = ax;
        y = ay;
        if params.gravity.is_none() {
            params.gravity = params.anchor.clone();
        }
    }

    let (origin_x, origin_y) =
        resolve_anchor_origin(params.gravity.as_deref(), width, height, x, y);
    let mut origin_x = origin_x.round();
    let mut origin_y = origin_y.round();

    // Shift the region back inside the source, then clamp the origin.
    if origin_x + width > src_w {
        origin_x = src_w - width;
    }
    if origin_y + height > src_h {
        origin_y = src_h - height;
    }
    origin_x = origin_x.clamp(0.0, (src_w - 1.0).max(0.0));
    origin_y = origin_y.clamp(0.0, (src_h - 1.0).max(0.0));

    params.width = Dim::Px(width);
    params.height = Dim::Px(height);
    params.x = Dim::Px(origin_x);
    params.y = Dim::Px(origin_y);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Region;
    use image::DynamicImage;

    fn blank(width: u32, height: u32) -> Image {
        Image::new(
            DynamicImage::ImageRgb8(image::RgbImage::new(width, height)),
            None,
        )
    }

    fn config() -> HookConfig {
        HookConfig::default()
    }

    mod resize_tests {
        use super::*;

        fn resolved(params: &mut Params, img: &Image) -> (u32, u32) {
            resize_constraints(params, img, &config()).unwrap();
            (params.width.as_px().unwrap(), params.height.as_px().unwrap())
        }

        #[test]
        fn negative_width_is_a_per_side_deduction() {
            let mut p = Params::width(-10);
            assert_eq!(resolved(&mut p, &blank(512, 512)), (492, 492));
        }

        #[test]
        fn zero_and_unset_mean_source_size() {
            let mut p = Params::new();
            assert_eq!(resolved(&mut p, &blank(640, 480)), (640, 480));

            let mut p = Params::size(0, 0);
            assert_eq!(resolved(&mut p, &blank(640, 480)), (640, 480));
        }

        #[test]
        fn upscale_clamps_to_source() {
            let mut p = Params::size(10_000, 10_000);
            assert_eq!(resolved(&mut p, &blank(640, 480)), (640, 480));
        }

        #[test]
        fn smaller_relative_request_wins() {
            // 320/640 = 0.5 beats 480/480 = 1.0, so height follows
            let mut p = Params::size(320, 0);
            assert_eq!(resolved(&mut p, &blank(640, 480)), (320, 240));

            let mut p = Params::size(0, 240);
            assert_eq!(resolved(&mut p, &blank(640, 480)), (320, 240));
        }

        #[test]
        fn formula_resolves_against_source_axis() {
            let mut p = Params::size("x50", 0);
            assert_eq!(resolved(&mut p, &blank(640, 480)), (320, 240));
        }

        #[test]
        fn invalid_formula_propagates() {
            let mut p = Params::size("woot", 0);
            assert!(resize_constraints(&mut p, &blank(64, 64), &config()).is_err());
        }
    }

    mod crop_tests {
        use super::*;

        fn resolved(params: &mut Params, img: &Image, cfg: &HookConfig) -> Region {
            crop_constraints(params, img, cfg).unwrap();
            params.resolved_region().unwrap()
        }

        #[test]
        fn anchor_tl_pins_region_to_origin() {
            let mut p = Params::size(4, 4).with_anchor("tl");
            let r = resolved(&mut p, &blank(8, 8), &config());
            assert_eq!(
                r,
                Region {
                    width: 4,
                    height: 4,
                    x: 0,
                    y: 0
                }
            );
        }

        #[test]
        fn default_is_centered() {
            let mut p = Params::size(4, 4);
            let r = resolved(&mut p, &blank(8, 8), &config());
            assert_eq!(
                r,
                Region {
                    width: 4,
                    height: 4,
                    x: 2,
                    y: 2
                }
            );
        }

        #[test]
        fn anchor_br_hugs_far_corner() {
            let mut p = Params::size(4, 4).with_anchor("br");
            let r = resolved(&mut p, &blank(8, 8), &config());
            assert_eq!(r, Region { width: 4, height: 4, x: 4, y: 4 });
        }

        #[test]
        fn fractional_formula_region_stays_inside() {
            // x25 of a 10-px axis is 2.5; the rounded-up extent must not
            // push the shifted region past the source edge
            let mut p = Params::region("x25", "x25", 100, 100);
            let r = resolved(&mut p, &blank(10, 10), &config());
            assert!(r.x + r.width <= 10);
            assert!(r.y + r.height <= 10);
            assert_eq!(
                r,
                Region {
                    width: 3,
                    height: 3,
                    x: 7,
                    y: 7
                }
            );
        }

        #[test]
        fn over_deducted_extent_clamps_to_zero() {
            let mut p = Params::size(-10, -10);
            let r = resolved(&mut p, &blank(8, 8), &config());
            assert_eq!((r.width, r.height), (0, 0));
        }

        #[test]
        fn region_never_escapes_source() {
            let mut p = Params::region(6, 6, 100, 100);
            let r = resolved(&mut p, &blank(8, 8), &config());
            assert!(r.x + r.width <= 8);
            assert!(r.y + r.height <= 8);
        }

        #[test]
        fn zero_size_means_full_source() {
            let mut p = Params::new();
            let r = resolved(&mut p, &blank(8, 6), &config());
            assert_eq!(
                r,
                Region {
                    width: 8,
                    height: 6,
                    x: 0,
                    y: 0
                }
            );
        }

        #[test]
        fn offset_reference_axis_is_configurable() {
            // x25 of the reference axis: 640 wide, 480 tall source
            let matching = config();
            let legacy = HookConfig {
                crop_offset_reference: OffsetReference::SourceHeight,
            };

            let mut p = Params::region(4, 4, "x25", "x25").with_gravity("tl");
            let r = resolved(&mut p, &blank(640, 480), &matching);
            assert_eq!((r.x, r.y), (160, 120));

            let mut p = Params::region(4, 4, "x25", "x25").with_gravity("tl");
            let r = resolved(&mut p, &blank(640, 480), &legacy);
            assert_eq!((r.x, r.y), (120, 120));
        }

        #[test]
        fn explicit_gravity_beats_anchor_direction() {
            // anchor br picks the landmark (8,8); gravity tl extends the
            // region down-right from it, then the clamp pulls it back inside
            let mut p = Params::size(4, 4).with_anchor("br").with_gravity("tl");
            let r = resolved(&mut p, &blank(8, 8), &config());
            assert_eq!(r, Region { width: 4, height: 4, x: 4, y: 4 });
        }
    }
}
