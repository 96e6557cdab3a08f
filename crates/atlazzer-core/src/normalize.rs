//! Post-processing of packed layouts: canonical origin, unit extent, pixel mapping.

use crate::config::Units;
use crate::geometry::{Bounds, bounding_box};
use crate::model::{PixelRect, Region};

/// Moves the layout to the origin and, with `target = Some(t)`, scales it so
/// its longer side measures `t`.
///
/// After the call the minimum `x` and `y` over `regions` are exactly 0.
/// Returns the final bounds, or `None` for an empty slice.
pub fn normalize<K>(regions: &mut [Region<K>], target: Option<f64>) -> Option<Bounds> {
    let b = bounding_box(regions)?;
    if let Some(t) = target {
        let longest = b.longest_side();
        if longest > 0.0 {
            let k = t / longest;
            for r in regions.iter_mut() {
                r.x *= k;
                r.y *= k;
                r.w *= k;
                r.h *= k;
            }
        }
    }
    translate_to_origin(regions);
    bounding_box(regions)
}

/// Shifts `regions` so the smallest `x` and `y` become 0.
pub fn translate_to_origin<K>(regions: &mut [Region<K>]) {
    let Some(b) = bounding_box(regions) else {
        return;
    };
    for r in regions.iter_mut() {
        // x - min_x is exactly 0 for the extreme region
        r.x -= b.min_x;
        r.y -= b.min_y;
    }
}

/// Rounded pixel rectangle of `region` on an `atlas_w x atlas_h` sheet.
pub fn to_pixels<K>(region: &Region<K>, atlas_w: u32, atlas_h: u32, units: Units) -> PixelRect {
    let (sx, sy) = match units {
        Units::Relative => (atlas_w as f64, atlas_h as f64),
        Units::Pixels => (1.0, 1.0),
    };
    let px = |v: f64, s: f64| (v * s).round().max(0.0) as u32;
    PixelRect::new(
        px(region.x, sx),
        px(region.y, sy),
        px(region.w, sx),
        px(region.h, sy),
    )
}

/// Converts a pixel length along an atlas side of `atlas_extent` into region units.
pub fn from_pixels(px: u32, atlas_extent: u32, units: Units) -> f64 {
    match units {
        Units::Relative => px as f64 / atlas_extent as f64,
        Units::Pixels => px as f64,
    }
}
