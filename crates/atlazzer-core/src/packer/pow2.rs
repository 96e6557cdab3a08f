//! Fixed-atlas quadtree packer for square power-of-two regions.
//!
//! Regions are expected in decreasing size order. Each one occupies a cell at
//! depth `d = floor(log2(side / item))`; cells are handed out in Morton order
//! (even slot bits select the x cell, odd bits the y cell), so equal-sized
//! siblings fill a quadrant before the next one is touched. Inputs outside that
//! precondition still get a placement together with a [`Pow2Warning`].

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::error::{AtlasError, Result};
use crate::model::PixelRect;

/// A violated precondition. The layout is still produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pow2Warning {
    NonSquare { index: usize, w: u32, h: u32 },
    NotPowerOfTwo { index: usize, side: u32 },
    /// Item is larger than the one before it.
    Unsorted { index: usize, side: u32, previous: u32 },
    /// Atlas is not a square power of two; the quadtree spans `min(width, height)`.
    AtlasShape { width: u32, height: u32 },
}

impl fmt::Display for Pow2Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pow2Warning::NonSquare { index, w, h } => {
                write!(f, "item #{} is not square ({}x{})", index, w, h)
            }
            Pow2Warning::NotPowerOfTwo { index, side } => {
                write!(f, "item #{} side {} is not a power of two", index, side)
            }
            Pow2Warning::Unsorted {
                index,
                side,
                previous,
            } => write!(
                f,
                "item #{} (side {}) is larger than its predecessor (side {})",
                index, side, previous
            ),
            Pow2Warning::AtlasShape { width, height } => {
                write!(f, "atlas {}x{} is not a square power of two", width, height)
            }
        }
    }
}

/// Placements in input order plus any precondition warnings.
#[derive(Debug, Clone)]
pub struct Pow2Layout {
    pub rects: Vec<PixelRect>,
    pub warnings: Vec<Pow2Warning>,
}

fn is_pow2(v: u32) -> bool {
    v != 0 && (v & (v - 1)) == 0
}

/// Splits a Morton slot index into `(x_cell, y_cell)`.
pub fn decode_slot(slot: u64) -> (u32, u32) {
    let mut cx = 0u32;
    let mut cy = 0u32;
    let mut bit = 0;
    let mut s = slot;
    while s != 0 {
        if s & 1 == 1 {
            if bit % 2 == 0 {
                cx |= 1 << (bit / 2);
            } else {
                cy |= 1 << (bit / 2);
            }
        }
        s >>= 1;
        bit += 1;
    }
    (cx, cy)
}

pub struct Pow2Packer {
    width: u32,
    height: u32,
    side: u32,
    depth: u32,
    // cells consumed at `depth`
    cursor: u64,
    previous: Option<u32>,
    warnings: Vec<Pow2Warning>,
}

impl Pow2Packer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(AtlasError::InvalidDimensions { width, height });
        }
        let mut warnings = Vec::new();
        if width != height || !is_pow2(width) || !is_pow2(height) {
            warnings.push(Pow2Warning::AtlasShape { width, height });
        }
        Ok(Self {
            width,
            height,
            side: width.min(height),
            depth: 0,
            cursor: 0,
            previous: None,
            warnings,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Cells still free at the current depth.
    pub fn free_slots(&self) -> u64 {
        (1u64 << (2 * self.depth)).saturating_sub(self.cursor)
    }

    pub fn warnings(&self) -> &[Pow2Warning] {
        &self.warnings
    }

    /// Deepest level whose cell side still holds `item`.
    fn depth_for(&self, item: u32) -> Option<u32> {
        if item > self.side {
            return None;
        }
        let mut d = 0;
        while d < 31 && (self.side >> (d + 1)) >= item {
            d += 1;
        }
        Some(d)
    }

    /// Places the next item. `index` is only used to label warnings.
    pub fn place(&mut self, index: usize, w: u32, h: u32) -> Result<PixelRect> {
        if w == 0 || h == 0 {
            return Err(AtlasError::InvalidInput(format!(
                "item #{} has zero size {}x{}",
                index, w, h
            )));
        }
        let item = w.max(h);
        if w != h {
            self.warnings.push(Pow2Warning::NonSquare { index, w, h });
        }
        if !is_pow2(item) {
            self.warnings
                .push(Pow2Warning::NotPowerOfTwo { index, side: item });
        }
        if let Some(previous) = self.previous {
            if item > previous {
                self.warnings.push(Pow2Warning::Unsorted {
                    index,
                    side: item,
                    previous,
                });
            }
        }
        self.previous = Some(item);

        let d = self.depth_for(item).ok_or(AtlasError::OutOfSpace)?;
        if d > self.depth {
            self.cursor <<= 2 * (d - self.depth);
        } else if d < self.depth {
            let div = 1u64 << (2 * (self.depth - d));
            self.cursor = self.cursor.div_ceil(div);
        }
        self.depth = d;
        if self.free_slots() == 0 {
            return Err(AtlasError::OutOfSpace);
        }
        let slot = self.cursor;
        self.cursor += 1;

        let (cx, cy) = decode_slot(slot);
        let cell = self.side >> d;
        Ok(PixelRect::new(cx * cell, cy * cell, w, h))
    }

    /// Packs `sizes` in the given order into a `width x height` atlas.
    pub fn pack(width: u32, height: u32, sizes: &[(u32, u32)]) -> Result<Pow2Layout> {
        let labeled: Vec<(usize, u32, u32)> = sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| (i, w, h))
            .collect();
        Self::pack_labeled(width, height, &labeled)
    }

    /// Like [`Pow2Packer::pack`] but warnings carry the caller's label for each item.
    pub fn pack_labeled(width: u32, height: u32, items: &[(usize, u32, u32)]) -> Result<Pow2Layout> {
        let mut packer = Self::new(width, height)?;
        let mut rects = Vec::with_capacity(items.len());
        for &(label, w, h) in items {
            rects.push(packer.place(label, w, h)?);
        }
        for w in &packer.warnings {
            warn!(warning = %w, "power-of-two precondition");
        }
        Ok(Pow2Layout {
            rects,
            warnings: packer.warnings,
        })
    }
}
