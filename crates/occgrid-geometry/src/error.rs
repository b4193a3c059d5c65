#![warn(missing_docs)]

//! Error types for the grid geometry library.
//!
//! This module defines the errors raised by coordinate conversions and by the
//! validating constructors of grid metadata.

use crate::Cell;
use thiserror::Error;

/// Errors that can occur in grid coordinate calculations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A cell lies outside the grid's extent.
    /// Returned by indexing conversions; cells are never silently clamped.
    #[error("cell {cell} is outside a {width}x{height} grid")]
    CellOutOfBounds {
        /// The offending cell.
        cell: Cell,
        /// Grid width in cells.
        width: u32,
        /// Grid height in cells.
        height: u32,
    },
    /// A linear index lies outside `[0, width * height)`.
    #[error("index {index} is outside a grid of {len} cells")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Number of cells in the grid.
        len: usize,
    },
    /// A structural precondition was violated, such as a non-positive resolution.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl GeometryError {
    /// Returns true for either out-of-bounds variant.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            GeometryError::CellOutOfBounds { .. } | GeometryError::IndexOutOfBounds { .. }
        )
    }
}
