#![warn(missing_docs)]
#![doc = "Coordinate math for 2D occupancy grids."]
#![doc = ""]
#![doc = "This crate provides cells, poses and grid metadata, and the conversions between"]
#![doc = "discrete cell coordinates, row-major linear indices and continuous world coordinates."]

use core::f64::consts::PI;
use core::fmt;
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub mod metadata;

pub use error::GeometryError;
pub use metadata::{GridLocation, GridMetadata};

/// A point in world coordinates.
pub type WorldPoint = Point3<f64>;

/// A discrete grid coordinate.
///
/// Cells carry no bounds of their own; whether a cell is valid depends on the
/// [`GridMetadata`] it is checked against. Coordinates are signed so that cells
/// computed from world points outside the grid can still be represented.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    /// Column index.
    pub x: i32,
    /// Row index.
    pub y: i32,
}

impl Cell {
    /// Creates a new `Cell`.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the cell displaced by `(dx, dy)`.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Rigid placement of a frame in the world (position + unit quaternion).
///
/// Used both as the origin of a grid (the world pose of cell (0, 0)'s corner)
/// and as the placement of a range sensor.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Rigid transformation from the local frame to the world frame.
    pub isometry: Isometry3<f64>,
}

impl Pose {
    /// Creates an identity pose (no rotation, no translation).
    pub fn identity() -> Self {
        Self {
            isometry: Isometry3::identity(),
        }
    }

    /// Creates a pose from a position and an orientation.
    pub fn new(position: WorldPoint, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            isometry: Isometry3::from_parts(Translation3::from(position.coords), orientation),
        }
    }

    /// Creates a planar pose at `(x, y, 0)` rotated by `yaw` radians about the z axis.
    ///
    /// # Arguments
    ///
    /// * `x`: World-frame x position.
    /// * `y`: World-frame y position.
    /// * `yaw`: Heading in radians, counter-clockwise from the world x axis.
    pub fn from_xy_yaw(x: f64, y: f64, yaw: f64) -> Self {
        Self {
            isometry: Isometry3::new(Vector3::new(x, y, 0.0), Vector3::z() * yaw),
        }
    }

    /// Returns the position of the frame in world coordinates.
    pub fn position(&self) -> WorldPoint {
        Point3::from(self.isometry.translation.vector)
    }

    /// Returns the orientation of the frame.
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.isometry.rotation
    }

    /// Returns the heading (rotation about the world z axis), in `[-PI, PI]`.
    pub fn yaw(&self) -> f64 {
        self.isometry.rotation.euler_angles().2
    }

    /// Maps a point expressed in this frame into the world frame.
    pub fn transform_point(&self, local: &WorldPoint) -> WorldPoint {
        self.isometry.transform_point(local)
    }

    /// Maps a world point into this frame.
    pub fn inverse_transform_point(&self, world: &WorldPoint) -> WorldPoint {
        self.isometry.inverse_transform_point(world)
    }

    /// Maps a world-frame direction into this frame (rotation only).
    pub fn inverse_transform_vector(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.isometry.inverse_transform_vector(world)
    }

    /// Composes this pose with another pose.
    ///
    /// `self.compose(&other)` applies `other` first, then `self`.
    pub fn compose(&self, other: &Pose) -> Pose {
        Self {
            isometry: self.isometry * other.isometry,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.position();
        write!(
            f,
            "(x: {:.3}, y: {:.3}, z: {:.3}, yaw: {:.3} rad)",
            p.x,
            p.y,
            p.z,
            self.yaw()
        )
    }
}

/// Normalize an angle to be within `[-PI, PI)`.
///
/// Angles at `PI` will be normalized to `-PI`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle % (2.0 * PI);
    if a >= PI {
        a - 2.0 * PI
    } else if a < -PI {
        a + 2.0 * PI
    } else {
        a
    }
}
