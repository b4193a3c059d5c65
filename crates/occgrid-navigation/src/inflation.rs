//! Obstacle inflation.
//!
//! Both operations stamp a disk-shaped kernel around every occupied cell.
//! Distances are measured between cell centres, so a cell is inside the
//! disk exactly when its centre lies within the radius of the obstacle
//! cell's centre.

use occgrid_geometry::Cell;
use tracing::debug;

use crate::error::NavigationError;
use crate::map::{Occupancy, OccupancyGrid};

/// Offset of a kernel cell and its centre-to-centre distance in world units.
struct KernelCell {
    dx: i32,
    dy: i32,
    distance: f64,
}

/// All offsets whose centres lie within `radius` of the origin cell's centre.
///
/// Offsets are limited to `max_reach` cells per axis; anything further cannot
/// land inside a grid whose larger side is `max_reach + 1` cells.
fn disk_kernel(radius: f64, resolution: f64, max_reach: u32) -> Vec<KernelCell> {
    let reach = (radius / resolution).floor().min(f64::from(max_reach)) as i32;
    let mut kernel = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let distance = f64::from(dx).hypot(f64::from(dy)) * resolution;
            if distance <= radius {
                kernel.push(KernelCell { dx, dy, distance });
            }
        }
    }
    kernel
}

fn check_radius(radius: f64, what: &str) -> Result<(), NavigationError> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(NavigationError::invalid(format!(
            "{what} must be finite and non-negative, got {radius}"
        )));
    }
    Ok(())
}

/// Distance from every cell to the nearest occupied cell, up to `max_distance`.
///
/// Returns one entry per cell in linear-index order: `Some(d)` when an
/// occupied cell centre lies within `max_distance` (world units) of the
/// cell's centre, `None` otherwise. Occupied cells read `Some(0.0)`.
///
/// # Errors
/// * `NavigationError::InvalidArgument` - if `max_distance` is negative or not finite
pub fn obstacle_distances(
    grid: &OccupancyGrid,
    max_distance: f64,
) -> Result<Vec<Option<f64>>, NavigationError> {
    check_radius(max_distance, "max distance")?;

    let info = grid.info();
    let max_reach = info.width().max(info.height()).saturating_sub(1);
    let kernel = disk_kernel(max_distance, info.resolution(), max_reach);
    let mut distances: Vec<Option<f64>> = vec![None; info.num_cells()];

    for (index, state) in grid.data().iter().enumerate() {
        if *state != Occupancy::Occupied {
            continue;
        }
        let cell = info.index_cell(index)?;
        for k in &kernel {
            // Cells past the grid edge are simply skipped.
            let (Some(x), Some(y)) = (cell.x.checked_add(k.dx), cell.y.checked_add(k.dy)) else {
                continue;
            };
            let Ok(target) = info.cell_index(Cell::new(x, y)) else {
                continue;
            };
            let slot = &mut distances[target];
            if slot.is_none_or(|d| k.distance < d) {
                *slot = Some(k.distance);
            }
        }
    }

    Ok(distances)
}

/// Grows occupied regions by `radius` world units.
///
/// Returns a new grid in which every cell whose centre lies within `radius`
/// of an occupied cell's centre is occupied, whatever its previous state
/// (unknown cells included). Cells outside every disk keep their state.
/// A radius of zero returns an identical copy.
///
/// # Errors
/// * `NavigationError::InvalidArgument` - if `radius` is negative or not finite
pub fn inflate_obstacles(
    grid: &OccupancyGrid,
    radius: f64,
) -> Result<OccupancyGrid, NavigationError> {
    check_radius(radius, "inflation radius")?;
    if radius == 0.0 {
        return Ok(grid.clone());
    }

    let distances = obstacle_distances(grid, radius)?;
    let data: Vec<Occupancy> = grid
        .data()
        .iter()
        .zip(&distances)
        .map(|(&state, d)| if d.is_some() { Occupancy::Occupied } else { state })
        .collect();

    let inflated = OccupancyGrid::from_cells(*grid.info(), data)?;
    debug!(
        radius,
        occupied_before = grid.count(Occupancy::Occupied),
        occupied_after = inflated.count(Occupancy::Occupied),
        "Inflated obstacles"
    );
    Ok(inflated)
}
