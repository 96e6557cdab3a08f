//! Decreasing-height shelf packer.

use crate::geometry::Rect;

/// Packs `rects` into shelves no wider than `target_width`.
///
/// Rects are visited tallest first (stable for equal heights) and only their
/// `x`/`y` change. A rect wider than the target still gets a shelf of its own.
/// Returns the total height used.
pub fn pack_shelves(rects: &mut [Rect], target_width: f64) -> f64 {
    let mut order: Vec<usize> = (0..rects.len()).collect();
    order.sort_by(|&a, &b| rects[b].h.total_cmp(&rects[a].h));

    let mut dx = 0.0;
    let mut dy = 0.0;
    let mut shelf_h = 0.0;
    let mut shelf_len = 0usize;
    for i in order {
        let r = &mut rects[i];
        if shelf_len == 0 {
            shelf_h = r.h;
        } else if dx + r.w > target_width {
            dy += shelf_h;
            dx = 0.0;
            shelf_h = r.h;
            shelf_len = 0;
        }
        r.x = dx;
        r.y = dy;
        dx += r.w;
        shelf_len += 1;
    }
    if shelf_len > 0 { dy + shelf_h } else { 0.0 }
}
