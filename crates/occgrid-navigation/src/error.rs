//! This module defines the error types used by the `occgrid-navigation` crate.

#![warn(missing_docs)]

use occgrid_geometry::GeometryError;
use thiserror::Error;

/// Error type for navigation operations.
///
/// This enum encapsulates all possible errors that can occur during
/// grid queries, ray casting, planning and map persistence. "No path" is not
/// an error: planners report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// A cell, index or world point falls outside the grid's extent.
    #[error("map access out of bounds: {0}")]
    OutOfBounds(GeometryError),
    /// A structural precondition was violated (negative radius, empty sweep, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A persisted map could not be interpreted.
    #[error("malformed map metadata: {0}")]
    MalformedMetadata(String),
    /// Filesystem failure while loading or saving a map.
    #[error("map i/o failed: {0}")]
    Io(#[from] std::io::Error),
    /// The planner reached its expansion cap before settling the goal.
    #[error("search aborted after expanding {nodes_explored} cells")]
    SearchLimitExceeded {
        /// Number of cells expanded before giving up.
        nodes_explored: usize,
    },
}

impl NavigationError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        NavigationError::InvalidArgument(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        NavigationError::MalformedMetadata(msg.into())
    }
}

impl From<GeometryError> for NavigationError {
    fn from(err: GeometryError) -> Self {
        match err {
            GeometryError::InvalidArgument(msg) => NavigationError::InvalidArgument(msg.to_string()),
            other => NavigationError::OutOfBounds(other),
        }
    }
}
