//! hexsweep: run a scan scheduler against a pool of simulated workers.
//!
//! The driver owns the scheduler and ticks it from the main thread: while
//! the queue is empty it asks for a refill, and it forwards pause, resume
//! and relocation events at the ticks given on the command line.

mod worker;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use uuid::Uuid;

use hexsweep_core::config::load_dotenv;
use hexsweep_core::status::new_shared_status;
use hexsweep_core::{Coordinate, ScanConfig, SchedulerConfig, SchedulerKind, SphericalEarth};
use hexsweep_queue::QueueSet;
use hexsweep_scheduler::{build_scheduler, InMemoryPoiStore, PointOfInterest};

use crate::worker::WorkerPool;

// ── CLI ─────────────────────────────────────────────────────────────

/// Hex-grid scan scheduler driver.
#[derive(Parser, Debug)]
#[command(name = "hexsweep", version, about)]
struct Cli {
    /// Config profile; keys are read as {PROFILE}_{KEY} first.
    #[arg(long, env = "HEXSWEEP_PROFILE", default_value = "")]
    profile: String,

    /// Scheduler variant: hexsearch, filtered or timewindowed.
    #[arg(long)]
    scheduler: Option<SchedulerKind>,

    /// Number of spiral rings, center included.
    #[arg(long)]
    step_limit: Option<i64>,

    /// Use the wide step spacing tuned for points of interest.
    #[arg(long)]
    only_poi: bool,

    #[arg(long)]
    workers: Option<usize>,

    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Scan center as "lat,lng".
    #[arg(long, value_parser = parse_coordinate)]
    center: Option<Coordinate>,

    /// JSON array of known points of interest.
    #[arg(long, env = "HEXSWEEP_POI_FILE")]
    poi_file: Option<PathBuf>,

    /// Number of driver ticks before shutting down.
    #[arg(long, default_value_t = 50)]
    ticks: u32,

    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Simulated duration of one scan.
    #[arg(long, default_value_t = 5)]
    scan_ms: u64,

    /// Pause scanning at this tick.
    #[arg(long)]
    pause_after: Option<u32>,

    /// Resume scanning at this tick.
    #[arg(long)]
    resume_after: Option<u32>,

    /// Move the scan center at `--move-after`.
    #[arg(long, value_parser = parse_coordinate, requires = "move_after")]
    move_to: Option<Coordinate>,

    #[arg(long)]
    move_after: Option<u32>,
}

fn parse_coordinate(s: &str) -> Result<Coordinate, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"lat,lng\", got {:?}", s))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {}", e))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("bad longitude: {}", e))?;
    let coord = Coordinate::new(lat, lng);
    if !coord.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
        return Err(format!("coordinate out of range: {}", s));
    }
    Ok(coord)
}

/// Command-line flags win over environment config.
fn apply_overrides(config: &mut ScanConfig, cli: &Cli) -> Result<()> {
    if let Some(kind) = cli.scheduler {
        config.scheduler_kind = kind;
    }
    if cli.step_limit.is_some() || cli.only_poi {
        config.scheduler = SchedulerConfig::new(
            cli.only_poi || config.scheduler.only_points_of_interest,
            cli.step_limit
                .unwrap_or_else(|| i64::from(config.scheduler.step_limit)),
        )?;
    }
    if let Some(workers) = cli.workers {
        config.workers = workers.max(1);
    }
    if let Some(capacity) = cli.queue_capacity {
        anyhow::ensure!(capacity > 0, "--queue-capacity must be positive");
        config.queue_capacity = Some(capacity);
    }
    if cli.center.is_some() {
        config.center = cli.center;
    }
    Ok(())
}

fn load_points(path: &Path) -> Result<InMemoryPoiStore> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading points of interest from {}", path.display()))?;
    let points: Vec<PointOfInterest> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing points of interest in {}", path.display()))?;
    let points = points.into_iter().map(|p| match p.appear_seconds {
        Some(secs) => PointOfInterest::timed(p.location, secs),
        None => p,
    });
    Ok(InMemoryPoiStore::from_points(points))
}

// ── Main ────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let mut config = ScanConfig::for_profile(&cli.profile).context("loading scan config")?;
    apply_overrides(&mut config, &cli)?;

    let run_id = Uuid::new_v4();
    info!(run_id = %run_id, "hexsweep starting");
    config.log_summary();

    let store = match &cli.poi_file {
        Some(path) => {
            let store = load_points(path)?;
            info!("Loaded {} points of interest from {}", store.len(), path.display());
            store
        }
        None => InMemoryPoiStore::new(),
    };

    let queues = QueueSet::new(1, config.queue_capacity)?;
    let statuses = new_shared_status(config.workers);
    let mut scheduler = build_scheduler(
        config.scheduler_kind,
        queues.clone(),
        Arc::clone(&statuses),
        &config.scheduler,
        Arc::new(SphericalEarth),
        Arc::new(store),
    );

    match config.center {
        Some(center) => scheduler.location_changed(center),
        None => warn!("No scan center configured; set CENTER_LAT/CENTER_LNG or --center"),
    }

    let pool = WorkerPool::spawn(
        Arc::clone(queues.primary()),
        Arc::clone(&statuses),
        Duration::from_millis(cli.scan_ms),
    );

    let tick = Duration::from_millis(cli.tick_ms);
    let mut paused = false;
    for n in 1..=cli.ticks {
        if cli.pause_after == Some(n) {
            paused = true;
        }
        if paused && cli.resume_after == Some(n) {
            paused = false;
            scheduler.resume_notify();
        }
        if let (Some(at), Some(to)) = (cli.move_after, cli.move_to) {
            if at == n {
                scheduler.location_changed(to);
            }
        }

        if paused {
            scheduler.pause_notify();
        } else if queues.is_empty() {
            if let Err(e) = scheduler.schedule() {
                warn!(tick = n, error = %e, "schedule failed, retrying next tick");
            }
        }
        thread::sleep(tick);
    }

    pool.shutdown();

    let drained = queues.drain_all();
    let summary = {
        let list = statuses
            .read()
            .map_err(|_| anyhow::anyhow!("worker status lock poisoned"))?;
        serde_json::json!({
            "run_id": run_id.to_string(),
            "config": config.redacted_summary(),
            "queue": queues.primary().stats().to_string(),
            "left_in_queue": drained,
            "workers": &*list,
        })
    };
    info!(run_id = %run_id, "hexsweep finished");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
