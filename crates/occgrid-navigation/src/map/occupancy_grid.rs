//! Occupancy grid implementation.
//!
//! An [`OccupancyGrid`] pairs [`GridMetadata`] with a flat, row-major array of
//! [`Occupancy`] values. It is the root aggregate that ray casting, scan
//! simulation, inflation and planning borrow read-only.

#![warn(missing_docs)]

use std::fmt;
use std::sync::Arc;

use occgrid_geometry::{Cell, GridMetadata, WorldPoint};

use crate::error::NavigationError;

/// Conventional byte value of an occupied cell.
pub const OCCUPIED: i8 = 100;
/// Conventional byte value of a free cell.
pub const UNOCCUPIED: i8 = 0;
/// Conventional byte value of a cell with no information.
pub const UNKNOWN: i8 = -1;

/// Raw values at or above this are decoded as occupied.
const OCCUPIED_THRESHOLD: i8 = 50;

/// Occupancy state of a single cell.
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Occupancy {
    /// Known to be free space.
    #[default]
    Free = UNOCCUPIED,
    /// Known to contain an obstacle.
    Occupied = OCCUPIED,
    /// No information available about this cell.
    Unknown = UNKNOWN,
}

impl Occupancy {
    /// Converts the Occupancy to its conventional byte representation.
    pub fn as_i8(self) -> i8 {
        self as i8
    }

    /// Decodes a raw byte value.
    ///
    /// Negative values are unknown, values of 50 and above are occupied and
    /// everything else is free.
    pub fn from_i8(value: i8) -> Self {
        if value < 0 {
            Occupancy::Unknown
        } else if value >= OCCUPIED_THRESHOLD {
            Occupancy::Occupied
        } else {
            Occupancy::Free
        }
    }

    /// Single-character symbol used by the text rendering of a grid.
    pub fn symbol(self) -> char {
        match self {
            Occupancy::Free => '.',
            Occupancy::Occupied => '#',
            Occupancy::Unknown => '?',
        }
    }
}

impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occupancy::Free => write!(f, "Free"),
            Occupancy::Occupied => write!(f, "Occupied"),
            Occupancy::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Reference-counted, read-only handle for sharing one grid between callers.
pub type SharedGrid = Arc<OccupancyGrid>;

/// A 2D occupancy grid: metadata plus one [`Occupancy`] per cell.
///
/// Deserialization goes through [`OccupancyGrid::from_cells`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawOccupancyGrid"))]
pub struct OccupancyGrid {
    /// Resolution, extent and placement.
    info: GridMetadata,
    /// Row-major cell states, `len == width * height`.
    data: Vec<Occupancy>,
}

/// Unchecked wire form of [`OccupancyGrid`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawOccupancyGrid {
    info: GridMetadata,
    data: Vec<Occupancy>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawOccupancyGrid> for OccupancyGrid {
    type Error = NavigationError;

    fn try_from(raw: RawOccupancyGrid) -> Result<Self, Self::Error> {
        Self::from_cells(raw.info, raw.data)
    }
}

impl OccupancyGrid {
    /// Creates a grid with every cell free.
    pub fn new(info: GridMetadata) -> Self {
        Self::filled(info, Occupancy::Free)
    }

    /// Creates a grid with every cell set to `value`.
    pub fn filled(info: GridMetadata, value: Occupancy) -> Self {
        Self {
            info,
            data: vec![value; info.num_cells()],
        }
    }

    /// Creates a grid from an existing row-major cell array.
    ///
    /// # Errors
    /// * `NavigationError::InvalidArgument` - if `data.len() != width * height`
    pub fn from_cells(info: GridMetadata, data: Vec<Occupancy>) -> Result<Self, NavigationError> {
        if data.len() != info.num_cells() {
            return Err(NavigationError::invalid(format!(
                "expected {} cells for a {}x{} grid, got {}",
                info.num_cells(),
                info.width(),
                info.height(),
                data.len()
            )));
        }
        Ok(Self { info, data })
    }

    /// Creates a grid from conventional byte values (see [`Occupancy::from_i8`]).
    ///
    /// # Errors
    /// * `NavigationError::InvalidArgument` - if `raw.len() != width * height`
    pub fn from_raw(info: GridMetadata, raw: &[i8]) -> Result<Self, NavigationError> {
        Self::from_cells(info, raw.iter().copied().map(Occupancy::from_i8).collect())
    }

    /// Gets the grid metadata.
    pub fn info(&self) -> &GridMetadata {
        &self.info
    }

    /// Gets a reference to the underlying cell data.
    pub fn data(&self) -> &[Occupancy] {
        &self.data
    }

    /// Encodes the cells as conventional byte values.
    pub fn to_raw(&self) -> Vec<i8> {
        self.data.iter().map(|o| o.as_i8()).collect()
    }

    /// Gets the state of a cell.
    ///
    /// # Errors
    /// * `NavigationError::OutOfBounds` - if the cell is outside the grid
    pub fn get(&self, cell: Cell) -> Result<Occupancy, NavigationError> {
        let index = self.info.cell_index(cell)?;
        Ok(self.data[index])
    }

    /// Sets the state of a cell.
    ///
    /// # Errors
    /// * `NavigationError::OutOfBounds` - if the cell is outside the grid
    pub fn set(&mut self, cell: Cell, value: Occupancy) -> Result<(), NavigationError> {
        let index = self.info.cell_index(cell)?;
        self.data[index] = value;
        Ok(())
    }

    /// Gets the state of the cell containing a world point.
    ///
    /// # Errors
    /// * `NavigationError::OutOfBounds` - if the point is outside the grid
    pub fn get_at_world(&self, point: &WorldPoint) -> Result<Occupancy, NavigationError> {
        let index = self.info.point_index(point)?;
        Ok(self.data[index])
    }

    /// Sets the state of the cell containing a world point.
    ///
    /// # Errors
    /// * `NavigationError::OutOfBounds` - if the point is outside the grid
    pub fn set_at_world(
        &mut self,
        point: &WorldPoint,
        value: Occupancy,
    ) -> Result<(), NavigationError> {
        let index = self.info.point_index(point)?;
        self.data[index] = value;
        Ok(())
    }

    /// Looks up a cell, returning `None` when it lies outside the grid.
    pub(crate) fn cell_state(&self, cell: Cell) -> Option<Occupancy> {
        self.info.cell_index(cell).ok().map(|i| self.data[i])
    }

    /// Sets every cell to `value`.
    pub fn fill(&mut self, value: Occupancy) {
        self.data.fill(value);
    }

    /// Counts the cells in a given state.
    pub fn count(&self, value: Occupancy) -> usize {
        self.data.iter().filter(|&&o| o == value).count()
    }

    /// Wraps the grid in a [`SharedGrid`] handle.
    pub fn into_shared(self) -> SharedGrid {
        Arc::new(self)
    }
}

impl fmt::Display for OccupancyGrid {
    /// Renders the grid with the highest row first, so +y points up.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OccupancyGrid ({})", self.info)?;

        let width = self.info.width() as usize;
        if width == 0 {
            return Ok(());
        }
        for row in self.data.chunks(width).rev() {
            for cell in row {
                write!(f, "{}", cell.symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
