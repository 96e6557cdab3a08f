use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub use crate::geometry::CostMetric;

/// Packing strategies.
/// Key notes:
///   - `Randomized` is a best-of-N stochastic search bounded by `time_budget_secs` / `max_trials`
///   - `PowerOfTwo` and `Shelf` are deterministic single-pass packers
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Scatter, resolve collisions, compact toward the origin, keep the cheapest trial.
    #[default]
    Randomized,
    /// Quadtree slots for square power-of-two regions in a fixed atlas.
    PowerOfTwo,
    /// Decreasing-height shelves up to a target row width.
    Shelf,
}

impl FromStr for Strategy {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "randomized" | "random" => Ok(Self::Randomized),
            "pow2" | "power_of_two" | "poweroftwo" => Ok(Self::PowerOfTwo),
            "shelf" | "shelves" => Ok(Self::Shelf),
            _ => Err(()),
        }
    }
}

/// Unit system of region coordinates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Fractions of the atlas size (0..1).
    #[default]
    Relative,
    /// Atlas pixels.
    Pixels,
}

impl FromStr for Units {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relative" | "rel" => Ok(Self::Relative),
            "pixels" | "px" => Ok(Self::Pixels),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackConfig {
    #[serde(default)]
    pub strategy: Strategy,

    /// Wall-clock budget for the randomized resolver (seconds).
    /// At least one trial always runs.
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: f64,
    /// Optional hard cap on randomized trials. `Some(0)` runs nothing.
    #[serde(default)]
    pub max_trials: Option<usize>,
    /// Rescale the randomized layout so its longer side is 1.
    #[serde(default = "default_rescale")]
    pub rescale: bool,
    #[serde(default)]
    pub cost_metric: CostMetric,
    /// Uniform margin in atlas pixels, used by regions without their own margin.
    /// The power-of-two packer places regions on fixed quadtree cells and ignores it.
    #[serde(default)]
    pub margin: f64,

    /// Atlas width in pixels.
    #[serde(default = "default_atlas_dim")]
    pub atlas_width: u32,
    /// Atlas height in pixels.
    #[serde(default = "default_atlas_dim")]
    pub atlas_height: u32,
    #[serde(default)]
    pub units: Units,

    /// Seed for the randomized resolver. None draws from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Per-trial cap on collision resolution sweeps.
    #[serde(default = "default_max_resolve_rounds")]
    pub max_resolve_rounds: usize,
    /// Compaction passes per trial. None uses the region count.
    #[serde(default)]
    pub compact_passes: Option<usize>,
    /// Grid step quantization: dimensions are multiplied by the grid scale before the GCD.
    /// None uses one unit per atlas pixel (see [`PackConfig::effective_grid_scale`]).
    #[serde(default)]
    pub grid_scale: Option<u32>,
    /// Step bounds in grid units (atlas pixels by default).
    #[serde(default = "default_grid_min_units")]
    pub grid_min_units: u32,
    #[serde(default = "default_grid_max_units")]
    pub grid_max_units: u32,

    /// Target row width for the shelf packer (region units).
    /// None uses the atlas width (pixels) or 1.0 (relative).
    #[serde(default)]
    pub shelf_width: Option<f64>,
    /// Turn power-of-two precondition warnings into errors.
    #[serde(default)]
    pub strict_pow2: bool,
    /// Evaluate randomized trials in parallel when feature "parallel" is on.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            time_budget_secs: default_time_budget_secs(),
            max_trials: None,
            rescale: default_rescale(),
            cost_metric: CostMetric::default(),
            margin: 0.0,
            atlas_width: default_atlas_dim(),
            atlas_height: default_atlas_dim(),
            units: Units::default(),
            seed: None,
            max_resolve_rounds: default_max_resolve_rounds(),
            compact_passes: None,
            grid_scale: None,
            grid_min_units: default_grid_min_units(),
            grid_max_units: default_grid_max_units(),
            shelf_width: None,
            strict_pow2: false,
            parallel: false,
        }
    }
}

impl PackConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - Atlas dimensions are zero
    /// - Margin or time budget are negative or not finite
    /// - Grid or resolver limits are degenerate
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AtlasError;

        if self.atlas_width == 0 || self.atlas_height == 0 {
            return Err(AtlasError::InvalidDimensions {
                width: self.atlas_width,
                height: self.atlas_height,
            });
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(AtlasError::InvalidConfig(format!(
                "margin must be a finite value >= 0 (got {})",
                self.margin
            )));
        }
        if !self.time_budget_secs.is_finite() || self.time_budget_secs < 0.0 {
            return Err(AtlasError::InvalidConfig(format!(
                "time_budget_secs must be a finite value >= 0 (got {})",
                self.time_budget_secs
            )));
        }
        if self.grid_scale == Some(0) {
            return Err(AtlasError::InvalidConfig("grid_scale must be > 0".into()));
        }
        if self.grid_min_units == 0 || self.grid_min_units > self.grid_max_units {
            return Err(AtlasError::InvalidConfig(format!(
                "grid units range [{}, {}] is empty or includes 0",
                self.grid_min_units, self.grid_max_units
            )));
        }
        if self.max_resolve_rounds == 0 {
            return Err(AtlasError::InvalidConfig(
                "max_resolve_rounds must be > 0".into(),
            ));
        }
        if let Some(w) = self.shelf_width {
            if !w.is_finite() || w <= 0.0 {
                return Err(AtlasError::InvalidConfig(format!(
                    "shelf_width must be a finite value > 0 (got {})",
                    w
                )));
            }
        }
        Ok(())
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_secs_f64(self.time_budget_secs)
    }

    /// Uniform margin expressed in region units.
    pub fn margin_in_units(&self) -> crate::model::Margin {
        match self.units {
            Units::Pixels => crate::model::Margin::uniform(self.margin),
            Units::Relative => crate::model::Margin {
                left: self.margin / self.atlas_width as f64,
                right: self.margin / self.atlas_width as f64,
                top: self.margin / self.atlas_height as f64,
                bottom: self.margin / self.atlas_height as f64,
            },
        }
    }

    /// Multiplier that turns region units into integer grid units.
    ///
    /// Relative layouts are quantized per atlas pixel of the longer atlas side,
    /// pixel layouts per pixel, so the default `[1, 20]` step bounds mean
    /// 1 to 20 pixels in both unit systems.
    pub fn effective_grid_scale(&self) -> u32 {
        match (self.grid_scale, self.units) {
            (Some(s), _) => s,
            (None, Units::Relative) => self.atlas_width.max(self.atlas_height),
            (None, Units::Pixels) => 1,
        }
    }

    /// Row width handed to the shelf packer.
    pub fn effective_shelf_width(&self) -> f64 {
        match (self.shelf_width, self.units) {
            (Some(w), _) => w,
            (None, Units::Pixels) => self.atlas_width as f64,
            (None, Units::Relative) => 1.0,
        }
    }
}

fn default_time_budget_secs() -> f64 {
    5.0
}
fn default_rescale() -> bool {
    true
}
fn default_atlas_dim() -> u32 {
    1024
}
fn default_max_resolve_rounds() -> usize {
    10_000
}
fn default_grid_min_units() -> u32 {
    1
}
fn default_grid_max_units() -> u32 {
    20
}

/// Builder for `PackConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackConfigBuilder {
    cfg: PackConfig,
}

impl PackConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PackConfig::default(),
        }
    }
    pub fn strategy(mut self, v: Strategy) -> Self {
        self.cfg.strategy = v;
        self
    }
    pub fn time_budget_secs(mut self, v: f64) -> Self {
        self.cfg.time_budget_secs = v;
        self
    }
    pub fn max_trials(mut self, v: Option<usize>) -> Self {
        self.cfg.max_trials = v;
        self
    }
    pub fn rescale(mut self, v: bool) -> Self {
        self.cfg.rescale = v;
        self
    }
    pub fn cost_metric(mut self, v: CostMetric) -> Self {
        self.cfg.cost_metric = v;
        self
    }
    pub fn margin(mut self, v: f64) -> Self {
        self.cfg.margin = v;
        self
    }
    pub fn with_atlas_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.atlas_width = w;
        self.cfg.atlas_height = h;
        self
    }
    pub fn units(mut self, v: Units) -> Self {
        self.cfg.units = v;
        self
    }
    pub fn seed(mut self, v: Option<u64>) -> Self {
        self.cfg.seed = v;
        self
    }
    pub fn max_resolve_rounds(mut self, v: usize) -> Self {
        self.cfg.max_resolve_rounds = v;
        self
    }
    pub fn compact_passes(mut self, v: Option<usize>) -> Self {
        self.cfg.compact_passes = v;
        self
    }
    pub fn grid(mut self, scale: Option<u32>, min_units: u32, max_units: u32) -> Self {
        self.cfg.grid_scale = scale;
        self.cfg.grid_min_units = min_units;
        self.cfg.grid_max_units = max_units;
        self
    }
    pub fn shelf_width(mut self, v: Option<f64>) -> Self {
        self.cfg.shelf_width = v;
        self
    }
    pub fn strict_pow2(mut self, v: bool) -> Self {
        self.cfg.strict_pow2 = v;
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn build(self) -> PackConfig {
        self.cfg
    }
}

impl PackConfig {
    /// Create a fluent builder for `PackConfig`.
    pub fn builder() -> PackConfigBuilder {
        PackConfigBuilder::new()
    }
}
