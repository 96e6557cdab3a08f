use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use atlazzer_core::config::{CostMetric, Strategy, Units};
use atlazzer_core::{PackConfig, PackReport, Region, pack, to_json};
use clap::{ArgAction, Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "atlazzer",
    about = "Pack texture regions into an atlas layout",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show a spinner while the randomized resolver runs (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack with the randomized heuristic (scatter / resolve / compact, best of N)
    Randomized(PackArgs),
    /// Pack a fixed power-of-two quadtree layout
    Pow2(PackArgs),
    /// Pack with decreasing-height shelves
    Shelf(PackArgs),
    /// Generate random regions, pack once, print trials + occupancy + time
    Bench(BenchArgs),
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    // Input/Output
    /// Region file (JSON or YAML): a list of {key, w, h, x?, y?, margin?}
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output JSON file (stdout when absent)
    #[arg(short, long, help_heading = "Input/Output")]
    out: Option<PathBuf>,
    /// YAML config file path (fields override flags)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,

    // Atlas
    /// Atlas width in pixels
    #[arg(long, default_value_t = 1024, help_heading = "Atlas")]
    atlas_width: u32,
    /// Atlas height in pixels
    #[arg(long, default_value_t = 1024, help_heading = "Atlas")]
    atlas_height: u32,
    /// Region units: relative | pixels
    #[arg(long, default_value = "relative", help_heading = "Atlas")]
    units: String,
    /// Uniform margin in pixels
    #[arg(long, default_value_t = 0.0, help_heading = "Atlas")]
    margin: f64,

    // Randomized resolver
    /// Time budget in seconds
    #[arg(long, default_value_t = 5.0, help_heading = "Randomized")]
    time_budget: f64,
    /// Stop after this many trials
    #[arg(long, help_heading = "Randomized")]
    max_trials: Option<usize>,
    /// Scale the result so the longer side is 1
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Randomized")]
    rescale: bool,
    /// Cost metric: square | occupied
    #[arg(long, default_value = "occupied", help_heading = "Randomized")]
    metric: String,
    /// RNG seed (random when absent)
    #[arg(long, help_heading = "Randomized")]
    seed: Option<u64>,
    /// Per-trial cap on collision resolution sweeps
    #[arg(long, default_value_t = 10_000, help_heading = "Randomized")]
    max_resolve_rounds: usize,
    /// Compaction passes per trial (defaults to the region count)
    #[arg(long, help_heading = "Randomized")]
    compact_passes: Option<usize>,
    /// Grid quantization scale (defaults to one unit per atlas pixel)
    #[arg(long, help_heading = "Randomized")]
    grid_scale: Option<u32>,
    /// Smallest grid step in grid units
    #[arg(long, default_value_t = 1, help_heading = "Randomized")]
    grid_min: u32,
    /// Largest grid step in grid units
    #[arg(long, default_value_t = 20, help_heading = "Randomized")]
    grid_max: u32,
    /// Run trials in parallel (requires core feature `parallel`)
    #[arg(long, default_value_t = false, help_heading = "Randomized")]
    parallel: bool,

    // Shelf / pow2
    /// Shelf row width in region units (defaults to the atlas width or 1.0)
    #[arg(long, help_heading = "Shelf/Pow2")]
    shelf_width: Option<f64>,
    /// Fail instead of warning on non-square or non-power-of-two regions
    #[arg(long, default_value_t = false, help_heading = "Shelf/Pow2")]
    strict_pow2: bool,

    // Export
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: pack and log stats but do not write output
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct BenchArgs {
    /// Strategy: randomized | pow2 | shelf
    #[arg(long, value_parser = ["randomized", "pow2", "shelf"], default_value = "randomized")]
    strategy: String,
    /// Number of regions to generate
    #[arg(long, default_value_t = 20)]
    count: usize,
    /// Seed for region generation and the resolver
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Time budget (seconds)
    #[arg(long, default_value_t = 1.0)]
    time_budget: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Randomized(args) => run_pack(args, Strategy::Randomized, progress),
        Commands::Pow2(args) => run_pack(args, Strategy::PowerOfTwo, false),
        Commands::Shelf(args) => run_pack(args, Strategy::Shelf, false),
        Commands::Bench(b) => run_bench(b),
    }
}

fn run_pack(cli: &PackArgs, strategy: Strategy, show_progress: bool) -> anyhow::Result<()> {
    let mut cfg = PackConfig {
        strategy,
        time_budget_secs: cli.time_budget,
        max_trials: cli.max_trials,
        rescale: cli.rescale,
        cost_metric: parse_metric(&cli.metric)?,
        margin: cli.margin,
        atlas_width: cli.atlas_width,
        atlas_height: cli.atlas_height,
        units: parse_units(&cli.units)?,
        seed: cli.seed,
        max_resolve_rounds: cli.max_resolve_rounds,
        compact_passes: cli.compact_passes,
        grid_scale: cli.grid_scale,
        grid_min_units: cli.grid_min,
        grid_max_units: cli.grid_max,
        shelf_width: cli.shelf_width,
        strict_pow2: cli.strict_pow2,
        parallel: cli.parallel,
    };
    // Config file sets options en bloc; the subcommand still decides the strategy
    if let Some(path) = &cli.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        cfg = y.into_pack_config(cfg)?;
    }
    cfg.validate()?;

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let mut regions = load_regions(&cli.input)?;
    info!(count = regions.len(), "loaded regions");

    let report = with_spinner(show_progress, || pack(&mut regions, &cfg))?;
    for w in &report.warnings {
        warn!(warning = %w, "layout may overlap");
    }
    log_report(&report);

    if cli.dry_run {
        return Ok(());
    }
    let json = serde_json::to_string_pretty(&to_json(&regions, &cfg, Some(&report)))?;
    match &cli.out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
            info!(?path, regions = regions.len(), "layout written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_bench(b: &BenchArgs) -> anyhow::Result<()> {
    use rand::{Rng, SeedableRng};
    use std::time::Instant;

    let strategy: Strategy = b
        .strategy
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown strategy: {}", b.strategy))?;
    let mut rng = rand::rngs::StdRng::seed_from_u64(b.seed);
    let mut regions: Vec<Region> = (0..b.count)
        .map(|i| {
            let (w, h) = match strategy {
                // square power-of-two sides from 16 to 128 px
                Strategy::PowerOfTwo => {
                    let side = 16u32 << rng.gen_range(0..4u32);
                    (side as f64, side as f64)
                }
                _ => (
                    rng.gen_range(8..=128) as f64,
                    rng.gen_range(8..=128) as f64,
                ),
            };
            Region::new(format!("bench_{}", i), w, h)
        })
        .collect();
    let cfg = PackConfig {
        strategy,
        units: Units::Pixels,
        time_budget_secs: b.time_budget,
        seed: Some(b.seed),
        atlas_width: 2048,
        atlas_height: 2048,
        ..Default::default()
    };
    let start = Instant::now();
    let report = pack(&mut regions, &cfg)?;
    let dur = start.elapsed();
    println!("{}", report.summary());
    println!(
        "regions={} cost={} time={}",
        b.count,
        report
            .cost
            .map(|c| format!("{:.6}", c))
            .unwrap_or_else(|| "-".into()),
        fmt_dur(dur)
    );
    Ok(())
}

fn fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1.0 {
        format!("{:.3} ms", ms)
    } else {
        format!("{:.3} µs", d.as_secs_f64() * 1_000_000.0)
    }
}

fn with_spinner<T>(show: bool, f: impl FnOnce() -> T) -> T {
    use indicatif::{ProgressBar, ProgressStyle};
    if !show {
        return f();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("searching layouts");
    pb.enable_steady_tick(Duration::from_millis(100));
    let out = f();
    pb.finish_and_clear();
    out
}

fn log_report(report: &PackReport) {
    info!(
        strategy = ?report.strategy,
        trials = report.trials,
        cost = ?report.cost,
        width = report.width,
        height = report.height,
        occupancy = format!("{:.2}%", report.occupancy() * 100.0),
        elapsed = fmt_dur(report.elapsed),
        "stats"
    );
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegionFile {
    List(Vec<Region>),
    Doc { regions: Vec<Region> },
}

fn load_regions(path: &Path) -> anyhow::Result<Vec<Region>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "yaml" | "yml"))
        .unwrap_or(false);
    let file: RegionFile = if is_yaml {
        serde_yaml::from_str(&text).with_context(|| format!("parse {}", path.display()))?
    } else {
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?
    };
    Ok(match file {
        RegionFile::List(v) => v,
        RegionFile::Doc { regions } => regions,
    })
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    time_budget_secs: Option<f64>,
    max_trials: Option<usize>,
    rescale: Option<bool>,
    cost_metric: Option<String>,
    margin: Option<f64>,
    atlas_width: Option<u32>,
    atlas_height: Option<u32>,
    units: Option<String>,
    seed: Option<u64>,
    max_resolve_rounds: Option<usize>,
    compact_passes: Option<usize>,
    grid_scale: Option<u32>,
    grid_min_units: Option<u32>,
    grid_max_units: Option<u32>,
    shelf_width: Option<f64>,
    strict_pow2: Option<bool>,
    parallel: Option<bool>,
}

impl YamlConfig {
    fn into_pack_config(self, mut cfg: PackConfig) -> anyhow::Result<PackConfig> {
        if let Some(v) = self.time_budget_secs {
            cfg.time_budget_secs = v;
        }
        if let Some(v) = self.max_trials {
            cfg.max_trials = Some(v);
        }
        if let Some(v) = self.rescale {
            cfg.rescale = v;
        }
        if let Some(v) = self.cost_metric {
            cfg.cost_metric = parse_metric(&v)?;
        }
        if let Some(v) = self.margin {
            cfg.margin = v;
        }
        if let Some(v) = self.atlas_width {
            cfg.atlas_width = v;
        }
        if let Some(v) = self.atlas_height {
            cfg.atlas_height = v;
        }
        if let Some(v) = self.units {
            cfg.units = parse_units(&v)?;
        }
        if let Some(v) = self.seed {
            cfg.seed = Some(v);
        }
        if let Some(v) = self.max_resolve_rounds {
            cfg.max_resolve_rounds = v;
        }
        if let Some(v) = self.compact_passes {
            cfg.compact_passes = Some(v);
        }
        if let Some(v) = self.grid_scale {
            cfg.grid_scale = Some(v);
        }
        if let Some(v) = self.grid_min_units {
            cfg.grid_min_units = v;
        }
        if let Some(v) = self.grid_max_units {
            cfg.grid_max_units = v;
        }
        if let Some(v) = self.shelf_width {
            cfg.shelf_width = Some(v);
        }
        if let Some(v) = self.strict_pow2 {
            cfg.strict_pow2 = v;
        }
        if let Some(v) = self.parallel {
            cfg.parallel = v;
        }
        Ok(cfg)
    }
}

fn parse_metric(s: &str) -> anyhow::Result<CostMetric> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown cost metric: {} (expected square|occupied)", s))
}

fn parse_units(s: &str) -> anyhow::Result<Units> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown units: {} (expected relative|pixels)", s))
}
