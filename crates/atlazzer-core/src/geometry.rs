//! Shared geometric model: working rectangles, collision tests, measurement and cost metrics.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::model::{PixelRect, Region};

/// Tolerance separating "touching" from "overlapping".
/// Edges that meet within `BIAS` do not count as an intersection.
pub const BIAS: f64 = 1e-7;

/// Read access to an axis-aligned rectangle.
pub trait Rectangle {
    fn x(&self) -> f64;
    fn y(&self) -> f64;
    fn w(&self) -> f64;
    fn h(&self) -> f64;

    fn right(&self) -> f64 {
        self.x() + self.w()
    }
    fn bottom(&self) -> f64 {
        self.y() + self.h()
    }
    fn area(&self) -> f64 {
        self.w() * self.h()
    }
}

/// Working copy of a region for a single packing attempt.
///
/// `index` points back into the caller's region slice; `w,h` are the
/// footprint (region size plus margin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(index: usize, x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { index, x, y, w, h }
    }
}

impl Rectangle for Rect {
    fn x(&self) -> f64 {
        self.x
    }
    fn y(&self) -> f64 {
        self.y
    }
    fn w(&self) -> f64 {
        self.w
    }
    fn h(&self) -> f64 {
        self.h
    }
}

impl<K> Rectangle for Region<K> {
    fn x(&self) -> f64 {
        self.x
    }
    fn y(&self) -> f64 {
        self.y
    }
    fn w(&self) -> f64 {
        self.w
    }
    fn h(&self) -> f64 {
        self.h
    }
}

impl Rectangle for PixelRect {
    fn x(&self) -> f64 {
        self.x as f64
    }
    fn y(&self) -> f64 {
        self.y as f64
    }
    fn w(&self) -> f64 {
        self.w as f64
    }
    fn h(&self) -> f64 {
        self.h as f64
    }
}

/// True iff `a` and `b` overlap on both axes by more than [`BIAS`].
#[inline]
pub fn intersects<A: Rectangle + ?Sized, B: Rectangle + ?Sized>(a: &A, b: &B) -> bool {
    a.x() < b.right() - BIAS
        && a.right() - BIAS > b.x()
        && a.y() < b.bottom() - BIAS
        && a.bottom() - BIAS > b.y()
}

/// Zero-tolerance overlap test.
#[inline]
pub fn intersects_exact<A: Rectangle + ?Sized, B: Rectangle + ?Sized>(a: &A, b: &B) -> bool {
    a.x() < b.right() && a.right() > b.x() && a.y() < b.bottom() && a.bottom() > b.y()
}

/// True iff any unordered pair of `items` intersects.
pub fn any_collision<T: Rectangle>(items: &[T]) -> bool {
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if intersects(&items[i], &items[j]) {
                return true;
            }
        }
    }
    false
}

/// Min/max corners of a set of rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
    pub fn longest_side(&self) -> f64 {
        self.width().max(self.height())
    }
}

/// Bounding box of `items`; `None` when empty.
pub fn bounding_box<T: Rectangle>(items: &[T]) -> Option<Bounds> {
    let first = items.first()?;
    let mut b = Bounds {
        min_x: first.x(),
        min_y: first.y(),
        max_x: first.right(),
        max_y: first.bottom(),
    };
    for r in &items[1..] {
        b.min_x = b.min_x.min(r.x());
        b.min_y = b.min_y.min(r.y());
        b.max_x = b.max_x.max(r.right());
        b.max_y = b.max_y.max(r.bottom());
    }
    Some(b)
}

/// Snaps `v` down onto the lattice of `step`.
#[inline]
pub fn snap(v: f64, step: f64) -> f64 {
    (v / step).floor() * step
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Quantization step for the stochastic search.
///
/// Dimensions are scaled by `scale` and rounded so the GCD runs on integers.
/// A GCD above `max_units` is replaced by its largest divisor within
/// `[min_units, max_units]`, so the step still divides every dimension and
/// regions can sit flush. A GCD below `min_units` is raised to it.
pub fn grid_step<T: Rectangle>(items: &[T], scale: u32, min_units: u32, max_units: u32) -> f64 {
    let scale_f = scale as f64;
    let (lo, hi) = (min_units as u64, max_units as u64);
    let g = items
        .iter()
        .flat_map(|r| [r.w(), r.h()])
        .map(|v| (v * scale_f).round().max(0.0) as u64)
        .fold(0u64, gcd);
    let units = if g > hi {
        // no divisor in range: the finest allowed step misses the fewest contacts
        (lo.max(1)..=hi).rev().find(|d| g % d == 0).unwrap_or(lo)
    } else {
        g.max(lo)
    };
    units as f64 / scale_f
}

/// Ranking function for candidate layouts. Lower is better.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CostMetric {
    /// `|w - h| * (w * h)` of the bounding box: penalizes area and non-square aspect.
    Square,
    /// Bounding box area minus the summed rect areas (dead space).
    #[default]
    Occupied,
}

impl CostMetric {
    /// Cost of a non-empty layout. Empty layouts cost 0.
    pub fn cost<T: Rectangle>(&self, items: &[T]) -> f64 {
        let Some(b) = bounding_box(items) else {
            return 0.0;
        };
        let (w, h) = (b.width(), b.height());
        match self {
            CostMetric::Square => (w - h).abs() * (w * h),
            CostMetric::Occupied => w * h - items.iter().map(|r| r.area()).sum::<f64>(),
        }
    }
}

impl FromStr for CostMetric {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "square" => Ok(Self::Square),
            "occupied" => Ok(Self::Occupied),
            _ => Err(()),
        }
    }
}
