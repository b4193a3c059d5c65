//! Navigation primitives over 2D occupancy grids.
//!
//! The crate is organised around one read-only aggregate, [`OccupancyGrid`],
//! and the operations that borrow it:
//!
//! - [`raycast`]: supercover ray casting and line-of-sight checks
//! - [`scan`]: range sensor simulation on top of the ray caster
//! - [`shortest_path`]: A* and Dijkstra search over traversable cells
//! - [`inflation`]: obstacle growth and bounded distance fields
//! - [`store`]: loading and saving grids as PGM graymaps
//!
//! None of the operations mutate their input grid, so a [`SharedGrid`] can be
//! handed to any number of threads.

pub mod error;
pub mod inflation;
pub mod map;
pub mod raycast;
pub mod scan;
pub mod shortest_path;
pub mod store;

pub use error::NavigationError;
pub use inflation::{inflate_obstacles, obstacle_distances};
pub use map::{OCCUPIED, Occupancy, OccupancyGrid, SharedGrid, UNKNOWN, UNOCCUPIED};
pub use raycast::{RayHit, RayTraversal, cast_ray, line_of_sight, ray_trace};
pub use scan::{RangeScan, SensorDescription, simulate_range_scan};
pub use shortest_path::{
    Connectivity, CostPolicy, Heuristic, Path, PathResult, PlannerConfig, ProximityPenalty,
    ShortestPathTree, UnknownCellPolicy, shortest_path, shortest_path_detailed,
    shortest_path_world, single_source_shortest_paths,
};
pub use store::{LoadOptions, load_grid, save_grid};

pub use occgrid_geometry::{Cell, GridLocation, GridMetadata, Pose, WorldPoint};
