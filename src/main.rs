mod config;

use std::path::PathBuf;

use anyhow::Context;
use occgrid_navigation::{
    NavigationError, OccupancyGrid, Occupancy, Path, PlannerConfig, RangeScan, SharedGrid,
    inflate_obstacles, load_grid, shortest_path, simulate_range_scan,
};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

use crate::config::{AppConfig, PathQuery, ScanQuery};

/// Outcome of one configured query, tagged with its position in the config.
enum QueryOutcome {
    Path {
        index: usize,
        query: PathQuery,
        result: Result<Option<Path>, NavigationError>,
    },
    Scan {
        index: usize,
        query: ScanQuery,
        result: Result<RangeScan, NavigationError>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH));
    let settings = config::load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let grid = load_map(&settings, &config_path)?.into_shared();
    let planner = settings.planner.to_planner_config();
    planner.validate().context("invalid [planner] settings")?;

    run(grid, planner, settings).await
}

fn load_map(settings: &AppConfig, config_path: &std::path::Path) -> anyhow::Result<OccupancyGrid> {
    let image = settings.map.image_path(config_path);
    let grid = load_grid(&image, &settings.map.load_options())
        .with_context(|| format!("loading map {}", image.display()))?;
    info!(
        map = %image.display(),
        width = grid.info().width(),
        height = grid.info().height(),
        resolution = grid.info().resolution(),
        occupied = grid.count(Occupancy::Occupied),
        unknown = grid.count(Occupancy::Unknown),
        "Map loaded"
    );

    if settings.map.inflation_radius > 0.0 {
        let inflated = inflate_obstacles(&grid, settings.map.inflation_radius)?;
        info!(
            radius = settings.map.inflation_radius,
            occupied = inflated.count(Occupancy::Occupied),
            "Obstacles inflated"
        );
        return Ok(inflated);
    }
    Ok(grid)
}

/// Runs every configured query on the blocking pool and reports them in config order.
async fn run(grid: SharedGrid, planner: PlannerConfig, settings: AppConfig) -> anyhow::Result<()> {
    let mut handles = Vec::new();

    for (index, query) in settings.paths.into_iter().enumerate() {
        let grid = SharedGrid::clone(&grid);
        handles.push(tokio::task::spawn_blocking(move || {
            let (start, goal) = query.cells();
            let result = shortest_path(&grid, start, goal, &planner);
            QueryOutcome::Path {
                index,
                query,
                result,
            }
        }));
    }

    for (index, query) in settings.scans.into_iter().enumerate() {
        let grid = SharedGrid::clone(&grid);
        handles.push(tokio::task::spawn_blocking(move || {
            let result = query.sensor().and_then(|sensor| {
                simulate_range_scan(&grid, &query.pose(), &sensor, query.unknown_as_occupied)
            });
            QueryOutcome::Scan {
                index,
                query,
                result,
            }
        }));
    }

    info!(queries = handles.len(), "Queries dispatched");

    for handle in handles {
        match handle.await? {
            QueryOutcome::Path {
                index,
                query,
                result,
            } => report_path(index, &query, &grid, result),
            QueryOutcome::Scan {
                index,
                query,
                result,
            } => report_scan(index, &query, result),
        }
    }

    Ok(())
}

fn report_path(
    index: usize,
    query: &PathQuery,
    grid: &OccupancyGrid,
    result: Result<Option<Path>, NavigationError>,
) {
    let (start, goal) = query.cells();
    match result {
        Ok(Some(path)) => {
            info!(
                query = index,
                %start,
                %goal,
                cells = path.len(),
                cost = path.cost,
                length = path.world_length(grid.info()),
                "Path found"
            );
            let waypoints: Vec<String> = path.cells.iter().map(ToString::to_string).collect();
            println!("path {}: {}", index, waypoints.join(" -> "));
        }
        Ok(None) => info!(query = index, %start, %goal, "No path"),
        Err(e) => warn!(query = index, %start, %goal, "Path query failed: {}", e),
    }
}

fn report_scan(index: usize, query: &ScanQuery, result: Result<RangeScan, NavigationError>) {
    let pose = query.pose();
    match result {
        Ok(scan) => {
            info!(
                query = index,
                %pose,
                beams = scan.ranges.len(),
                returns = scan.num_returns(),
                "Scan simulated"
            );
            let readings: Vec<String> = scan
                .ranges
                .iter()
                .map(|r| r.map_or_else(|| "-".to_string(), |d| format!("{:.2}", d)))
                .collect();
            println!("scan {}: {}", index, readings.join(" "));
        }
        Err(e) => warn!(query = index, %pose, "Scan query failed: {}", e),
    }
}
