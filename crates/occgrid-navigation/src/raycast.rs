//! Ray casting over occupancy grids.
//!
//! Rays are walked with the DDA algorithm of Amanatides & Woo: at each step the
//! walk advances to whichever cell boundary the ray reaches first, so every
//! cell the continuous ray passes through is visited (a supercover walk). A
//! Bresenham line, which visits one cell per major-axis step, can slip
//! between two diagonally touching obstacles. This walk cannot.
//!
//! Boundary ties are resolved the same way everywhere:
//! - direction components smaller than [`DIRECTION_EPSILON`] are treated as zero,
//!   so rays along a grid axis stay inside a single row or column;
//! - when the ray reaches an x and a y boundary at the same distance, x steps first;
//! - a point lying exactly on a boundary belongs to the cell with the larger coordinate.

use nalgebra::Vector3;
use occgrid_geometry::{Cell, GridMetadata, WorldPoint};

use crate::error::NavigationError;
use crate::map::{Occupancy, OccupancyGrid};

/// Direction components with a smaller magnitude than this are snapped to zero.
pub const DIRECTION_EPSILON: f64 = 1e-12;

/// Iterator over the cells crossed by a ray, in order.
///
/// Yields `(Cell, t)` pairs where `t` is the distance along the ray at which it
/// enters the cell (`0.0` for the starting cell). The iterator is unbounded;
/// callers stop it by distance or when it leaves the grid.
#[derive(Debug, Clone)]
pub struct RayTraversal {
    /// Cell the walk is currently in.
    current: Cell,
    /// Step direction per axis (-1, 0 or 1).
    step: [i32; 2],
    /// Distance along the ray to the next boundary per axis.
    t_max: [f64; 2],
    /// Distance along the ray between boundaries per axis.
    t_delta: [f64; 2],
    /// Whether the starting cell has been yielded yet.
    first: bool,
}

impl RayTraversal {
    /// Starts a walk from a world point along a world-frame direction.
    ///
    /// The direction should have unit length for `t` to be a distance in world
    /// units; only its component in the grid plane moves the walk.
    pub fn new(meta: &GridMetadata, origin: &WorldPoint, direction: &Vector3<f64>) -> Self {
        let resolution = meta.resolution();
        let local = meta.origin().inverse_transform_point(origin);
        let dir = meta.origin().inverse_transform_vector(direction);
        Self::in_grid_frame(
            meta.point_cell(origin),
            [local.x / resolution, local.y / resolution],
            [dir.x, dir.y],
            resolution,
        )
    }

    /// Starts a walk in grid-frame cell units.
    ///
    /// `pos` is the start in cell units, `dir` the direction in the grid frame
    /// and `cell_size` the length of one cell edge along the ray parameter.
    fn in_grid_frame(start: Cell, pos: [f64; 2], dir: [f64; 2], cell_size: f64) -> Self {
        let coord = [f64::from(start.x), f64::from(start.y)];
        let mut step = [0i32; 2];
        let mut t_max = [f64::INFINITY; 2];
        let mut t_delta = [f64::INFINITY; 2];

        for i in 0..2 {
            let d = dir[i];
            if d.abs() < DIRECTION_EPSILON {
                continue;
            }
            step[i] = if d > 0.0 { 1 } else { -1 };
            t_delta[i] = cell_size / d.abs();
            let boundary = if d > 0.0 { coord[i] + 1.0 } else { coord[i] };
            t_max[i] = (boundary - pos[i]) * cell_size / d;
        }

        Self {
            current: start,
            step,
            t_max,
            t_delta,
            first: true,
        }
    }
}

impl Iterator for RayTraversal {
    type Item = (Cell, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.first {
            self.first = false;
            return Some((self.current, 0.0));
        }

        // Ties step along x first.
        let axis = if self.t_max[0] <= self.t_max[1] { 0 } else { 1 };
        let t = self.t_max[axis];
        if !t.is_finite() {
            // No component of the ray lies in the grid plane.
            return None;
        }

        if axis == 0 {
            self.current.x = self.current.x.checked_add(self.step[0])?;
        } else {
            self.current.y = self.current.y.checked_add(self.step[1])?;
        }
        self.t_max[axis] += self.t_delta[axis];

        Some((self.current, t))
    }
}

/// The first blocking cell found by [`cast_ray`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin to the point where the ray entered `cell`.
    pub distance: f64,
    /// The blocking cell.
    pub cell: Cell,
    /// State of the blocking cell.
    pub occupancy: Occupancy,
}

pub(crate) fn blocks_ray(state: Occupancy, unknown_as_occupied: bool) -> bool {
    match state {
        Occupancy::Occupied => true,
        Occupancy::Unknown => unknown_as_occupied,
        Occupancy::Free => false,
    }
}

/// Casts a ray through the grid and reports the first blocking cell.
///
/// The walk stops with no hit when it leaves the grid or when the next cell
/// is entered beyond `max_range`. A ray starting inside an occupied cell
/// hits at distance zero.
///
/// # Arguments
/// * `grid` - The grid to cast against
/// * `origin` - Start of the ray in world coordinates
/// * `bearing` - World-frame heading of the ray, in radians
/// * `max_range` - Maximum distance to search
/// * `unknown_as_occupied` - Whether unknown cells block the ray
///
/// # Errors
/// * `NavigationError::InvalidArgument` - for a negative or non-finite
///   `max_range`, a non-finite bearing or a non-finite origin
pub fn cast_ray(
    grid: &OccupancyGrid,
    origin: &WorldPoint,
    bearing: f64,
    max_range: f64,
    unknown_as_occupied: bool,
) -> Result<Option<RayHit>, NavigationError> {
    if !max_range.is_finite() || max_range < 0.0 {
        return Err(NavigationError::invalid(
            "max range must be finite and non-negative",
        ));
    }
    if !bearing.is_finite() {
        return Err(NavigationError::invalid("bearing must be finite"));
    }
    if !origin.coords.iter().all(|c| c.is_finite()) {
        return Err(NavigationError::invalid("ray origin must be finite"));
    }

    let direction = Vector3::new(bearing.cos(), bearing.sin(), 0.0);
    for (cell, t) in RayTraversal::new(grid.info(), origin, &direction) {
        if t > max_range {
            break;
        }
        let Some(state) = grid.cell_state(cell) else {
            break;
        };
        if blocks_ray(state, unknown_as_occupied) {
            return Ok(Some(RayHit {
                distance: t,
                cell,
                occupancy: state,
            }));
        }
    }

    Ok(None)
}

/// Lists the cells crossed by the segment joining two cell centres, both ends
/// included.
pub fn ray_trace(from: Cell, to: Cell) -> impl Iterator<Item = Cell> {
    let dx = f64::from(to.x) - f64::from(from.x);
    let dy = f64::from(to.y) - f64::from(from.y);
    let len = dx.hypot(dy);
    let dir = if len > 0.0 { [dx / len, dy / len] } else { [0.0, 0.0] };
    let pos = [f64::from(from.x) + 0.5, f64::from(from.y) + 0.5];

    // A supercover walk between two cells visits at most |dx| + |dy| + 1 cells.
    let max_cells = (dx.abs() + dy.abs()) as usize + 1;
    let mut reached = false;
    RayTraversal::in_grid_frame(from, pos, dir, 1.0)
        .map(|(cell, _)| cell)
        .take(max_cells)
        .take_while(move |&cell| {
            if reached {
                return false;
            }
            reached = cell == to;
            true
        })
}

/// Tests whether the straight segment between two cell centres is clear.
///
/// Every cell the segment crosses, both endpoints included, must be free
/// (or unknown, when `unknown_as_occupied` is false).
///
/// # Errors
/// * `NavigationError::OutOfBounds` - if either endpoint is outside the grid
pub fn line_of_sight(
    grid: &OccupancyGrid,
    from: Cell,
    to: Cell,
    unknown_as_occupied: bool,
) -> Result<bool, NavigationError> {
    grid.info().cell_index(from)?;
    grid.info().cell_index(to)?;

    Ok(ray_trace(from, to).all(|cell| {
        grid.cell_state(cell)
            .is_some_and(|state| !blocks_ray(state, unknown_as_occupied))
    }))
}
