use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::{PackConfig, Strategy, Units};
use crate::error::{AtlasError, Result};
use crate::geometry::{Bounds, bounding_box};
use crate::model::{PackReport, Region, validate_regions};
use crate::normalize::normalize;
use crate::packer::pow2::Pow2Packer;
use crate::packer::resolver::{Resolver, ResolverOptions, SearchLimits};
use crate::packer::{footprints, shelf, write_back};

#[instrument(skip_all)]
/// Packs `regions` in place with the strategy selected by `cfg.strategy`.
///
/// Notes:
/// - Configuration and region sizes are validated before any work; on error
///   the regions are left untouched.
/// - Keys are never inspected.
pub fn pack<K>(regions: &mut [Region<K>], cfg: &PackConfig) -> Result<PackReport> {
    match cfg.strategy {
        Strategy::Randomized => pack_randomized(regions, cfg),
        Strategy::PowerOfTwo => pack_power_of_two(regions, cfg),
        Strategy::Shelf => pack_shelves(regions, cfg),
    }
}

/// Randomized resolver with the RNG taken from `cfg.seed` (or entropy).
pub fn pack_randomized<K>(regions: &mut [Region<K>], cfg: &PackConfig) -> Result<PackReport> {
    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    pack_randomized_with_rng(regions, cfg, &mut rng)
}

#[instrument(skip_all, fields(regions = regions.len()))]
/// Randomized resolver driven by a caller-supplied random source.
///
/// Runs trials until the time budget or `max_trials` is exhausted, then writes
/// the cheapest collision-free layout back. With `rescale` the longer side of
/// the result is 1; the minimum corner is always at the origin.
pub fn pack_randomized_with_rng<K, R: Rng + ?Sized>(
    regions: &mut [Region<K>],
    cfg: &PackConfig,
    rng: &mut R,
) -> Result<PackReport> {
    cfg.validate()?;
    if regions.is_empty() {
        return Err(AtlasError::InvalidInput(
            "randomized packing needs at least one region".into(),
        ));
    }
    validate_regions(regions)?;

    let start = Instant::now();
    let margin = cfg.margin_in_units();
    let resolver = Resolver::new(footprints(regions, margin), ResolverOptions::from(cfg));
    debug!(
        step = resolver.step(),
        border = resolver.border(),
        "resolver prepared"
    );
    let search = resolver.search(
        rng,
        SearchLimits {
            time_budget: cfg.time_budget(),
            max_trials: cfg.max_trials,
            parallel: cfg.parallel,
        },
    );
    let Some(best) = search.best else {
        warn!(trials = search.trials, "no collision-free layout found");
        return Err(AtlasError::InfeasiblePacking {
            trials: search.trials,
        });
    };
    debug!(trials = search.trials, cost = best.cost, "best trial selected");

    write_back(regions, &best.rects, margin);
    let bounds = normalize(regions, cfg.rescale.then_some(1.0));
    Ok(report(
        Strategy::Randomized,
        regions,
        bounds,
        search.trials,
        Some(best.cost),
        start,
        Vec::new(),
    ))
}

#[instrument(skip_all, fields(regions = regions.len()))]
/// Quadtree placement into the configured power-of-two atlas.
///
/// Regions are visited by longer side, largest first (stable). Sizes are read
/// as pixels or as atlas fractions depending on `cfg.units`, and positions are
/// written back in the same units. Precondition violations are reported as
/// warnings, or rejected when `cfg.strict_pow2` is set. Margins do not apply:
/// cells are fixed by the quadtree.
pub fn pack_power_of_two<K>(regions: &mut [Region<K>], cfg: &PackConfig) -> Result<PackReport> {
    cfg.validate()?;
    validate_regions(regions)?;
    if cfg.margin > 0.0 || regions.iter().any(|r| r.margin.is_some()) {
        warn!(
            margin = cfg.margin,
            "margins are ignored by the power-of-two packer"
        );
    }
    let start = Instant::now();
    let (aw, ah) = (cfg.atlas_width, cfg.atlas_height);
    let to_px = |v: f64, extent: u32| -> u32 {
        let px = match cfg.units {
            Units::Pixels => v,
            Units::Relative => v * extent as f64,
        };
        px.round().max(1.0) as u32
    };

    let mut items: Vec<(usize, u32, u32)> = regions
        .iter()
        .enumerate()
        .map(|(i, r)| (i, to_px(r.w, aw), to_px(r.h, ah)))
        .collect();
    items.sort_by(|a, b| b.1.max(b.2).cmp(&a.1.max(a.2)));

    let layout = Pow2Packer::pack_labeled(aw, ah, &items)?;
    if cfg.strict_pow2 && !layout.warnings.is_empty() {
        return Err(AtlasError::PreconditionViolated(layout.warnings));
    }

    for (&(i, _, _), px) in items.iter().zip(&layout.rects) {
        let r = &mut regions[i];
        match cfg.units {
            Units::Pixels => {
                r.x = px.x as f64;
                r.y = px.y as f64;
            }
            Units::Relative => {
                r.x = px.x as f64 / aw as f64;
                r.y = px.y as f64 / ah as f64;
            }
        }
    }
    let bounds = bounding_box(regions);
    Ok(report(
        Strategy::PowerOfTwo,
        regions,
        bounds,
        1,
        None,
        start,
        layout.warnings,
    ))
}

#[instrument(skip_all, fields(regions = regions.len()))]
/// Decreasing-height shelves up to `cfg.effective_shelf_width()`.
///
/// Margins widen the footprint used for placement but are stripped from the
/// reported positions. Sizes never change. An empty slice is a no-op.
pub fn pack_shelves<K>(regions: &mut [Region<K>], cfg: &PackConfig) -> Result<PackReport> {
    cfg.validate()?;
    validate_regions(regions)?;
    let start = Instant::now();
    let margin = cfg.margin_in_units();
    let mut rects = footprints(regions, margin);
    let width = cfg.effective_shelf_width();
    let height = shelf::pack_shelves(&mut rects, width);
    debug!(width, height, "shelves packed");
    write_back(regions, &rects, margin);
    let bounds = bounding_box(regions);
    Ok(report(
        Strategy::Shelf,
        regions,
        bounds,
        1,
        None,
        start,
        Vec::new(),
    ))
}

fn report<K>(
    strategy: Strategy,
    regions: &[Region<K>],
    bounds: Option<Bounds>,
    trials: usize,
    cost: Option<f64>,
    start: Instant,
    warnings: Vec<crate::packer::pow2::Pow2Warning>,
) -> PackReport {
    let (width, height) = bounds.map(|b| (b.max_x, b.max_y)).unwrap_or((0.0, 0.0));
    PackReport {
        strategy,
        trials,
        cost,
        width,
        height,
        used_area: regions.iter().map(|r| r.area()).sum(),
        elapsed: start.elapsed(),
        warnings,
    }
}
