//! Grid metadata and the coordinate conversions defined by it.
//!
//! Every component that turns cells into array positions or world points goes
//! through [`GridMetadata`]. Linear indices are row-major: `index = y * width + x`,
//! with cell (0, 0) at the origin corner of the grid.

use core::fmt;
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Cell, GeometryError, Pose, WorldPoint};

/// Resolution, extent and placement of an occupancy grid.
///
/// Deserialization goes through [`GridMetadata::new`], so decoded metadata
/// holds the same guarantees as constructed metadata.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawGridMetadata"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetadata {
    /// World units per cell edge. Always finite and positive.
    resolution: f64,
    /// Number of columns.
    width: u32,
    /// Number of rows.
    height: u32,
    /// World pose of the outer corner of cell (0, 0).
    origin: Pose,
}

/// Unchecked wire form of [`GridMetadata`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawGridMetadata {
    resolution: f64,
    width: u32,
    height: u32,
    origin: Pose,
}

#[cfg(feature = "serde")]
impl TryFrom<RawGridMetadata> for GridMetadata {
    type Error = GeometryError;

    fn try_from(raw: RawGridMetadata) -> Result<Self, Self::Error> {
        Self::new(raw.resolution, raw.width, raw.height, raw.origin)
    }
}

/// Largest width or height; cell coordinates are `i32`.
const MAX_DIMENSION: u32 = i32::MAX as u32;

impl GridMetadata {
    /// Creates grid metadata.
    ///
    /// # Arguments
    /// * `resolution` - World units per cell edge
    /// * `width` - Number of columns (may be zero)
    /// * `height` - Number of rows (may be zero)
    /// * `origin` - World pose of cell (0, 0)'s corner
    ///
    /// # Errors
    ///
    /// Returns `Err(GeometryError::InvalidArgument)` if `resolution` is not a
    /// positive finite number, if `width` or `height` exceeds `i32::MAX`, or if
    /// `width * height` overflows `usize`.
    pub fn new(
        resolution: f64,
        width: u32,
        height: u32,
        origin: Pose,
    ) -> Result<Self, GeometryError> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(GeometryError::InvalidArgument(
                "resolution must be positive and finite",
            ));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(GeometryError::InvalidArgument(
                "grid dimensions must fit in i32 cell coordinates",
            ));
        }
        if (width as usize).checked_mul(height as usize).is_none() {
            return Err(GeometryError::InvalidArgument(
                "grid dimensions too large, would cause overflow",
            ));
        }

        Ok(Self {
            resolution,
            width,
            height,
            origin,
        })
    }

    /// Gets the resolution of the grid.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Gets the number of columns.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Gets the number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Gets the origin pose of the grid.
    pub fn origin(&self) -> &Pose {
        &self.origin
    }

    /// Total number of cells, `width * height`.
    pub fn num_cells(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn contains_cell(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    /// Converts a cell to its row-major linear index.
    ///
    /// # Errors
    ///
    /// Returns `Err(GeometryError::CellOutOfBounds)` if the cell is outside the grid.
    pub fn cell_index(&self, cell: Cell) -> Result<usize, GeometryError> {
        if !self.contains_cell(cell) {
            return Err(GeometryError::CellOutOfBounds {
                cell,
                width: self.width,
                height: self.height,
            });
        }
        Ok(cell.y as usize * self.width as usize + cell.x as usize)
    }

    /// Converts a linear index back to its cell. Inverse of [`Self::cell_index`].
    ///
    /// # Errors
    ///
    /// Returns `Err(GeometryError::IndexOutOfBounds)` if `index >= width * height`.
    pub fn index_cell(&self, index: usize) -> Result<Cell, GeometryError> {
        let len = self.num_cells();
        if index >= len {
            return Err(GeometryError::IndexOutOfBounds { index, len });
        }
        let width = self.width as usize;
        Ok(Cell::new((index % width) as i32, (index / width) as i32))
    }

    /// Returns the cell containing a world point.
    ///
    /// The point is brought into the grid frame with the inverse origin pose and
    /// floored by the resolution, so a point exactly on a cell boundary belongs
    /// to the cell with the larger coordinate. No bounds check is performed;
    /// combine with [`Self::within_bounds`]. Non-finite coordinates map to
    /// `i32::MIN`, which is never inside a grid.
    pub fn point_cell(&self, point: &WorldPoint) -> Cell {
        let local = self.origin.inverse_transform_point(point);
        Cell::new(
            floor_to_cell(local.x / self.resolution),
            floor_to_cell(local.y / self.resolution),
        )
    }

    /// Returns the world coordinates of the geometric centre of a cell.
    pub fn cell_center(&self, cell: Cell) -> WorldPoint {
        self.grid_to_world(f64::from(cell.x) + 0.5, f64::from(cell.y) + 0.5)
    }

    /// Returns the linear index of the cell containing a world point.
    ///
    /// # Errors
    ///
    /// Returns `Err(GeometryError::CellOutOfBounds)` if the point is outside the grid.
    pub fn point_index(&self, point: &WorldPoint) -> Result<usize, GeometryError> {
        self.cell_index(self.point_cell(point))
    }

    /// Non-failing bounds test for a cell or a world point.
    pub fn within_bounds<L: GridLocation + ?Sized>(&self, location: &L) -> bool {
        self.contains_cell(location.to_cell(self))
    }

    /// Returns the four world-frame corners of a cell's footprint, counter-clockwise
    /// starting at the corner nearest the grid origin.
    pub fn cell_corners(&self, cell: Cell) -> [WorldPoint; 4] {
        let x = f64::from(cell.x);
        let y = f64::from(cell.y);
        [
            self.grid_to_world(x, y),
            self.grid_to_world(x + 1.0, y),
            self.grid_to_world(x + 1.0, y + 1.0),
            self.grid_to_world(x, y + 1.0),
        ]
    }

    /// Returns the four world-frame corners of the whole grid, counter-clockwise.
    pub fn grid_corners(&self) -> [WorldPoint; 4] {
        let w = f64::from(self.width);
        let h = f64::from(self.height);
        [
            self.grid_to_world(0.0, 0.0),
            self.grid_to_world(w, 0.0),
            self.grid_to_world(w, h),
            self.grid_to_world(0.0, h),
        ]
    }

    /// Iterates over every cell of the grid in linear-index order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + use<> {
        let width = self.width as i32;
        let height = self.height as i32;
        (0..height).flat_map(move |y| (0..width).map(move |x| Cell::new(x, y)))
    }

    /// Maps continuous grid coordinates (in cells) to a world point.
    fn grid_to_world(&self, gx: f64, gy: f64) -> WorldPoint {
        self.origin.transform_point(&Point3::new(
            gx * self.resolution,
            gy * self.resolution,
            0.0,
        ))
    }
}

fn floor_to_cell(v: f64) -> i32 {
    if v.is_nan() {
        i32::MIN
    } else {
        // `as` saturates for values outside the i32 range.
        v.floor() as i32
    }
}

impl fmt::Display for GridMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} cells, resolution: {:.3}, origin: {}",
            self.width, self.height, self.resolution, self.origin
        )
    }
}

/// Something that can be located on a grid: a [`Cell`] or a world point.
pub trait GridLocation {
    /// Returns the cell this location falls in.
    fn to_cell(&self, meta: &GridMetadata) -> Cell;
}

impl GridLocation for Cell {
    fn to_cell(&self, _meta: &GridMetadata) -> Cell {
        *self
    }
}

impl GridLocation for WorldPoint {
    fn to_cell(&self, meta: &GridMetadata) -> Cell {
        meta.point_cell(self)
    }
}
