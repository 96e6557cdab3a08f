use crate::geometry::Rect;
use crate::model::{Margin, Region};

pub mod pow2;
pub mod resolver;
pub mod shelf;

/// Builds working rects (region size inflated by margin) indexed into `regions`.
pub(crate) fn footprints<K>(regions: &[Region<K>], fallback: Margin) -> Vec<Rect> {
    regions
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let m = r.margin_or(fallback);
            Rect::new(
                i,
                r.x - m.left,
                r.y - m.top,
                r.w + m.horizontal(),
                r.h + m.vertical(),
            )
        })
        .collect()
}

/// Copies footprint positions back onto their regions, stripping the margin band.
/// Sizes are left untouched.
pub(crate) fn write_back<K>(regions: &mut [Region<K>], rects: &[Rect], fallback: Margin) {
    for rect in rects {
        let region = &mut regions[rect.index];
        let m = region.margin_or(fallback);
        region.x = rect.x + m.left;
        region.y = rect.y + m.top;
    }
}
