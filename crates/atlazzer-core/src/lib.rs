//! Core library for packing texture regions into atlases.
//!
//! - Strategies: randomized resolver (scatter / resolve / compact / score, best of N),
//!   power-of-two quadtree, decreasing-height shelves
//! - Geometry: biased intersection test, bounding boxes, grid step, cost metrics
//! - Normalization: origin at zero, longer side scaled to 1, pixel mapping
//! - Data model is serde-serializable; a JSON exporter is provided for the CLI crate.
//!
//! Quick example:
//! ```ignore
//! use atlazzer_core::{PackConfig, Region, pack};
//! # fn main() -> anyhow::Result<()> {
//! let mut regions = vec![
//!   Region::new("a".to_string(), 0.5, 0.25),
//!   Region::new("b".to_string(), 0.25, 0.25),
//! ];
//! let cfg = PackConfig { time_budget_secs: 0.5, seed: Some(7), ..Default::default() };
//! let report = pack(&mut regions, &cfg)?;
//! println!("trials: {}", report.trials);
//! # Ok(()) }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod model;
pub mod normalize;
pub mod packer;
pub mod pipeline;

pub use config::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use pipeline::*;

/// Convenience prelude for common types and functions.
/// Importing `atlazzer_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{CostMetric, PackConfig, PackConfigBuilder, Strategy, Units};
    pub use crate::error::AtlasError;
    pub use crate::geometry::{BIAS, Bounds, Rect, Rectangle, any_collision, bounding_box, intersects};
    pub use crate::model::{Margin, PackReport, PixelRect, Region};
    pub use crate::normalize::{normalize, to_pixels};
    pub use crate::packer::pow2::{Pow2Layout, Pow2Packer, Pow2Warning};
    pub use crate::{pack, pack_power_of_two, pack_randomized, pack_randomized_with_rng, pack_shelves};
}
