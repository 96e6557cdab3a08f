use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Strategy;
use crate::error::{AtlasError, Result};
use crate::packer::pow2::Pow2Warning;

/// Per-side band kept free around a region.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Margin {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub right: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub bottom: f64,
}

impl Margin {
    pub fn uniform(v: f64) -> Self {
        Self {
            left: v,
            right: v,
            top: v,
            bottom: v,
        }
    }
    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }
    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
    pub fn is_valid(&self) -> bool {
        [self.left, self.right, self.top, self.bottom]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Smallest factor accepted by [`Region::scale`].
pub const MIN_SCALE_FACTOR: f64 = 0.001;

/// A logical rectangle to be packed.
///
/// `key` is an opaque token owned by the caller (file name, mesh name, ...);
/// packers carry it through untouched. `x,y` is the top-left corner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Region<K = String> {
    pub key: K,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub w: f64,
    pub h: f64,
    /// Overrides the configured uniform margin when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
}

impl<K> Region<K> {
    pub fn new(key: K, w: f64, h: f64) -> Self {
        Self {
            key,
            x: 0.0,
            y: 0.0,
            w,
            h,
            margin: None,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_margin(mut self, margin: Margin) -> Self {
        self.margin = Some(margin);
        self
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// Scales width and height by `factor`, keeping the position.
    /// Factors below [`MIN_SCALE_FACTOR`] (and NaN) are raised to it.
    pub fn scale(&mut self, factor: f64) {
        let f = factor.max(MIN_SCALE_FACTOR);
        self.w *= f;
        self.h *= f;
    }

    /// Effective margin given the configured default band.
    pub fn margin_or(&self, fallback: Margin) -> Margin {
        self.margin.unwrap_or(fallback)
    }
}

/// Checks sizes and margins of every region before any packing work starts.
pub(crate) fn validate_regions<K>(regions: &[Region<K>]) -> Result<()> {
    for (i, r) in regions.iter().enumerate() {
        if !(r.w.is_finite() && r.h.is_finite()) || r.w <= 0.0 || r.h <= 0.0 {
            return Err(AtlasError::InvalidInput(format!(
                "region #{} has non-positive size {}x{}",
                i, r.w, r.h
            )));
        }
        if !(r.x.is_finite() && r.y.is_finite()) {
            return Err(AtlasError::InvalidInput(format!(
                "region #{} has a non-finite position ({}, {})",
                i, r.x, r.y
            )));
        }
        if let Some(m) = &r.margin {
            if !m.is_valid() {
                return Err(AtlasError::InvalidInput(format!(
                    "region #{} has a negative or non-finite margin",
                    i
                )));
            }
        }
    }
    Ok(())
}

/// Axis-aligned rectangle in atlas pixels. `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &PixelRect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
}

/// Summary of a pack command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackReport {
    pub strategy: Strategy,
    /// Trials run (1 for the deterministic packers).
    pub trials: usize,
    /// Cost of the winning layout (randomized resolver only).
    pub cost: Option<f64>,
    /// Final layout size after post-processing.
    pub width: f64,
    pub height: f64,
    /// Sum of region areas after post-processing.
    pub used_area: f64,
    pub elapsed: Duration,
    /// Power-of-two precondition warnings (empty for other strategies).
    pub warnings: Vec<Pow2Warning>,
}

impl PackReport {
    /// Occupancy ratio: used area / layout area (0.0 to 1.0).
    pub fn occupancy(&self) -> f64 {
        let total = self.width * self.height;
        if total > 0.0 { self.used_area / total } else { 0.0 }
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Strategy: {:?}, Trials: {}, Size: {:.4}x{:.4}, Occupancy: {:.2}%, Warnings: {}",
            self.strategy,
            self.trials,
            self.width,
            self.height,
            self.occupancy() * 100.0,
            self.warnings.len(),
        )
    }
}
