//! Map-related functionality for navigation.
//!
//! This module provides the occupancy grid aggregate and the conventional
//! occupancy constants.

pub mod occupancy_grid;

pub use occupancy_grid::{OCCUPIED, Occupancy, OccupancyGrid, SharedGrid, UNKNOWN, UNOCCUPIED};
