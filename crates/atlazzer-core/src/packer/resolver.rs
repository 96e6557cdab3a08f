//! Randomized collision-resolution packer.
//!
//! Every trial runs Scatter -> Resolve -> Compact -> Score on a fresh copy of the
//! working rects; the cheapest collision-free trial wins. All positions live on a
//! lattice of `step` so that regions can be compacted flush against each other.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::PackConfig;
use crate::geometry::{CostMetric, Rect, any_collision, bounding_box, grid_step, intersects, snap};

/// Tunables for a single resolver run.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub metric: CostMetric,
    pub max_resolve_rounds: usize,
    pub compact_passes: Option<usize>,
    pub grid_scale: u32,
    pub grid_min_units: u32,
    pub grid_max_units: u32,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self::from(&PackConfig::default())
    }
}

impl From<&PackConfig> for ResolverOptions {
    fn from(cfg: &PackConfig) -> Self {
        Self {
            metric: cfg.cost_metric,
            max_resolve_rounds: cfg.max_resolve_rounds,
            compact_passes: cfg.compact_passes,
            grid_scale: cfg.effective_grid_scale(),
            grid_min_units: cfg.grid_min_units,
            grid_max_units: cfg.grid_max_units,
        }
    }
}

/// Stop conditions for [`Resolver::search`]. At least one trial runs unless
/// `max_trials` is `Some(0)`.
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub time_budget: Duration,
    pub max_trials: Option<usize>,
    pub parallel: bool,
}

/// A finished, collision-free layout and its cost.
#[derive(Debug, Clone)]
pub struct Trial {
    pub rects: Vec<Rect>,
    pub cost: f64,
}

/// Outcome of a search: best trial (if any) and how many trials ran.
#[derive(Debug, Clone)]
pub struct Search {
    pub best: Option<Trial>,
    pub trials: usize,
}

pub struct Resolver {
    template: Vec<Rect>,
    step: f64,
    border: f64,
    opts: ResolverOptions,
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

impl Resolver {
    /// Prepares a resolver for `rects`. Positions are only used to size the scatter area.
    ///
    /// `rects` must be non-empty.
    pub fn new(rects: Vec<Rect>, opts: ResolverOptions) -> Self {
        let step = grid_step(
            &rects,
            opts.grid_scale,
            opts.grid_min_units,
            opts.grid_max_units,
        );
        let border = bounding_box(&rects)
            .map(|b| b.longest_side())
            .unwrap_or(0.0)
            .max(1.0)
            * 2.0;
        Self {
            template: rects,
            step,
            border,
            opts,
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn border(&self) -> f64 {
        self.border
    }

    /// Random grid-aligned placement of every rect inside `[0, border)`.
    pub fn scatter<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Rect> {
        let step = self.step;
        let cells = |extent: f64| ((self.border - extent) / step).floor().max(0.0) as u64;
        self.template
            .iter()
            .map(|r| {
                let cx = rng.gen_range(0..=cells(r.w));
                let cy = rng.gen_range(0..=cells(r.h));
                Rect::new(r.index, cx as f64 * step, cy as f64 * step, r.w, r.h)
            })
            .collect()
    }

    /// Bubbles collisions apart: each overlapping rect jumps to a random side of a
    /// random offender. Returns whether the layout became collision-free within
    /// `max_resolve_rounds` sweeps.
    pub fn resolve<R: Rng + ?Sized>(&self, rects: &mut [Rect], rng: &mut R) -> bool {
        let step = self.step;
        for _ in 0..self.opts.max_resolve_rounds {
            if !any_collision(rects) {
                return true;
            }
            for i in 0..rects.len() {
                let hits: Vec<usize> = (0..rects.len())
                    .filter(|&j| j != i && intersects(&rects[i], &rects[j]))
                    .collect();
                let Some(&j) = hits.choose(rng) else {
                    continue;
                };
                let nb = rects[j];
                let r = &mut rects[i];
                match rng.gen_range(0..4u8) {
                    0 => r.x = snap(nb.x + nb.w + step, step),
                    1 => r.x = snap(nb.x - r.w - step, step),
                    2 => r.y = snap(nb.y + nb.h + step, step),
                    _ => r.y = snap(nb.y - r.h - step, step),
                }
            }
        }
        !any_collision(rects)
    }

    /// Greedy slide of every rect toward the origin, one grid step at a time.
    pub fn compact(&self, rects: &mut [Rect]) {
        let passes = self.opts.compact_passes.unwrap_or(rects.len());
        for _ in 0..passes {
            let mut moved = false;
            for i in 0..rects.len() {
                moved |= self.slide(rects, i, Axis::X);
                moved |= self.slide(rects, i, Axis::Y);
            }
            // A pass without movement is a fixed point.
            if !moved {
                break;
            }
        }
    }

    fn slide(&self, rects: &mut [Rect], i: usize, axis: Axis) -> bool {
        let step = self.step;
        let start = match axis {
            Axis::X => rects[i].x,
            Axis::Y => rects[i].y,
        };
        let cells = (start / step).round() as i64;
        if cells <= 0 {
            return false;
        }
        let mut landed = 0;
        for k in (0..cells).rev() {
            set_axis(&mut rects[i], axis, k as f64 * step);
            if collides_with_others(rects, i) {
                landed = k + 1;
                break;
            }
        }
        if landed == cells {
            set_axis(&mut rects[i], axis, start);
            false
        } else {
            set_axis(&mut rects[i], axis, landed as f64 * step);
            true
        }
    }

    /// One full trial. `None` when collisions could not be resolved.
    pub fn trial<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Trial> {
        let mut rects = self.scatter(rng);
        if !self.resolve(&mut rects, rng) {
            return None;
        }
        if let Some(b) = bounding_box(&rects) {
            for r in rects.iter_mut() {
                r.x -= b.min_x;
                r.y -= b.min_y;
            }
        }
        self.compact(&mut rects);
        let cost = self.opts.metric.cost(&rects);
        Some(Trial { rects, cost })
    }

    /// Runs trials until `limits` say stop and keeps the first cheapest one.
    ///
    /// Every trial gets its own `StdRng` seeded from `rng`, so a given seed and
    /// trial cap produce the same winner sequentially or in parallel.
    pub fn search<R: Rng + ?Sized>(&self, rng: &mut R, limits: SearchLimits) -> Search {
        let start = Instant::now();
        let mut best: Option<Trial> = None;
        let mut trials = 0usize;
        loop {
            let batch = self.batch_size(limits, trials);
            if batch == 0 {
                break;
            }
            let seeds: Vec<u64> = (0..batch).map(|_| rng.r#gen::<u64>()).collect();
            for outcome in self.run_batch(&seeds, limits.parallel) {
                trials += 1;
                match outcome {
                    Some(t) => {
                        trace!(trial = trials, cost = t.cost, "trial scored");
                        if best.as_ref().is_none_or(|b| t.cost < b.cost) {
                            best = Some(t);
                        }
                    }
                    None => trace!(trial = trials, "trial left collisions"),
                }
            }
            if start.elapsed() > limits.time_budget {
                break;
            }
        }
        Search { best, trials }
    }

    fn batch_size(&self, limits: SearchLimits, done: usize) -> usize {
        let want = if limits.parallel { parallel_width() } else { 1 };
        match limits.max_trials {
            Some(cap) => want.min(cap.saturating_sub(done)),
            None => want,
        }
    }

    #[cfg(feature = "parallel")]
    fn run_batch(&self, seeds: &[u64], parallel: bool) -> Vec<Option<Trial>> {
        if parallel {
            seeds
                .par_iter()
                .map(|&s| self.trial(&mut StdRng::seed_from_u64(s)))
                .collect()
        } else {
            self.run_batch_seq(seeds)
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_batch(&self, seeds: &[u64], _parallel: bool) -> Vec<Option<Trial>> {
        self.run_batch_seq(seeds)
    }

    fn run_batch_seq(&self, seeds: &[u64]) -> Vec<Option<Trial>> {
        seeds
            .iter()
            .map(|&s| self.trial(&mut StdRng::seed_from_u64(s)))
            .collect()
    }
}

#[cfg(feature = "parallel")]
fn parallel_width() -> usize {
    rayon::current_num_threads().max(1)
}

#[cfg(not(feature = "parallel"))]
fn parallel_width() -> usize {
    1
}

fn set_axis(r: &mut Rect, axis: Axis, v: f64) {
    match axis {
        Axis::X => r.x = v,
        Axis::Y => r.y = v,
    }
}

fn collides_with_others(rects: &[Rect], i: usize) -> bool {
    let r = &rects[i];
    rects
        .iter()
        .enumerate()
        .any(|(j, other)| j != i && intersects(r, other))
}
