//! Grid persistence as Netpbm graymaps (PGM).
//!
//! Both the ASCII (`P2`) and binary (`P5`) variants are read, with 8-bit
//! samples only. Grids are always written as `P5`. Pixels are interpreted
//! the way ROS map servers do it: dark pixels are occupied, light pixels
//! free, and the band between the two thresholds unknown. Image row 0 is
//! the top of the map, so rows are flipped against grid `y`.
//!
//! A PGM file holds cell states only. Resolution and origin travel in
//! [`LoadOptions`] (the `[map]` table of the application config), so a
//! save/load round trip keeps the placement only when the same options are
//! passed back to [`load_grid`].

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use occgrid_geometry::{GridMetadata, Pose};
use tracing::debug;

use crate::error::NavigationError;
use crate::map::{Occupancy, OccupancyGrid};

/// Pixel written for free cells.
const FREE_PIXEL: u8 = 254;
/// Pixel written for occupied cells.
const OCCUPIED_PIXEL: u8 = 0;
/// Pixel written for unknown cells.
const UNKNOWN_PIXEL: u8 = 205;

/// Placement and pixel thresholds for [`load_grid`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadOptions {
    /// World units per cell.
    pub resolution: f64,
    /// World pose of the bottom-left corner of the image.
    pub origin: Pose,
    /// Occupancy probability above which a pixel is occupied.
    pub occupied_thresh: f64,
    /// Occupancy probability below which a pixel is free.
    pub free_thresh: f64,
    /// Treat light pixels as occupied instead of dark ones.
    pub negate: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            origin: Pose::identity(),
            occupied_thresh: 0.65,
            free_thresh: 0.196,
            negate: false,
        }
    }
}

impl LoadOptions {
    /// Options with the given resolution and default thresholds.
    pub fn with_resolution(resolution: f64) -> Self {
        Self {
            resolution,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), NavigationError> {
        let in_unit = |t: f64| t.is_finite() && (0.0..=1.0).contains(&t);
        if !in_unit(self.occupied_thresh) || !in_unit(self.free_thresh) {
            return Err(NavigationError::invalid("thresholds must lie in [0, 1]"));
        }
        if self.free_thresh > self.occupied_thresh {
            return Err(NavigationError::invalid(format!(
                "free_thresh ({}) exceeds occupied_thresh ({})",
                self.free_thresh, self.occupied_thresh
            )));
        }
        Ok(())
    }

    /// Classifies one pixel.
    fn classify(&self, value: u32, maxval: u32) -> Occupancy {
        let p = f64::from(value) / f64::from(maxval);
        let occ = if self.negate { p } else { 1.0 - p };
        if occ > self.occupied_thresh {
            Occupancy::Occupied
        } else if occ < self.free_thresh {
            Occupancy::Free
        } else {
            Occupancy::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Ascii,
    Binary,
}

/// Cursor over the whitespace-separated header fields of a PGM file.
struct HeaderReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> HeaderReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Skips whitespace and `#` comments running to the end of a line.
    fn skip_separators(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'#' {
                while self.bytes.get(self.pos).is_some_and(|&c| c != b'\n') {
                    self.pos += 1;
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn token(&mut self) -> Option<&'a [u8]> {
        self.skip_separators();
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'#')
        {
            self.pos += 1;
        }
        if self.pos > start {
            Some(&self.bytes[start..self.pos])
        } else {
            None
        }
    }

    fn number(&mut self, what: &str) -> Result<u32, NavigationError> {
        let token = self
            .token()
            .ok_or_else(|| NavigationError::malformed(format!("missing {what}")))?;
        std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                NavigationError::malformed(format!(
                    "invalid {what}: {:?}",
                    String::from_utf8_lossy(token)
                ))
            })
    }
}

/// Reads an occupancy grid from a PGM file.
///
/// # Errors
/// * `NavigationError::Io` - if the file cannot be read
/// * `NavigationError::MalformedMetadata` - for a bad header, an unsupported
///   magic number, a maxval outside `1..=255` or truncated pixel data
/// * `NavigationError::InvalidArgument` - for invalid thresholds or resolution
pub fn load_grid(
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<OccupancyGrid, NavigationError> {
    let path = path.as_ref();
    options.validate()?;
    let bytes = fs::read(path)?;
    let grid = parse_pgm(&bytes, options)?;
    debug!(
        path = %path.display(),
        width = grid.info().width(),
        height = grid.info().height(),
        resolution = grid.info().resolution(),
        occupied = grid.count(Occupancy::Occupied),
        unknown = grid.count(Occupancy::Unknown),
        "Loaded grid"
    );
    Ok(grid)
}

fn parse_pgm(bytes: &[u8], options: &LoadOptions) -> Result<OccupancyGrid, NavigationError> {
    let mut header = HeaderReader::new(bytes);
    let encoding = match header.token() {
        Some(b"P2") => Encoding::Ascii,
        Some(b"P5") => Encoding::Binary,
        Some(other) => {
            return Err(NavigationError::malformed(format!(
                "unsupported magic number {:?}",
                String::from_utf8_lossy(other)
            )));
        }
        None => return Err(NavigationError::malformed("empty file")),
    };
    let width = header.number("width")?;
    let height = header.number("height")?;
    let maxval = header.number("maxval")?;
    if !(1..=255).contains(&maxval) {
        return Err(NavigationError::malformed(format!(
            "maxval {maxval} is outside 1..=255"
        )));
    }

    let info = GridMetadata::new(options.resolution, width, height, options.origin)?;
    let (w, h) = (width as usize, height as usize);

    let pixels: Vec<u32> = match encoding {
        Encoding::Binary => {
            // Exactly one whitespace byte separates the header from the samples.
            let start = header.pos + 1;
            let data = bytes
                .get(start..)
                .filter(|data| data.len() >= w * h)
                .ok_or_else(|| {
                    NavigationError::malformed(format!(
                        "expected {} pixel bytes after the header",
                        w * h
                    ))
                })?;
            data[..w * h].iter().map(|&b| u32::from(b)).collect()
        }
        Encoding::Ascii => (0..w * h)
            .map(|_| header.number("pixel value"))
            .collect::<Result<_, _>>()?,
    };

    if let Some(bad) = pixels.iter().find(|&&v| v > maxval) {
        return Err(NavigationError::malformed(format!(
            "pixel value {bad} exceeds maxval {maxval}"
        )));
    }

    let mut cells = vec![Occupancy::Unknown; w * h];
    for (row, chunk) in pixels.chunks(w.max(1)).enumerate().take(h) {
        let y = h - 1 - row;
        for (x, &value) in chunk.iter().enumerate() {
            cells[y * w + x] = options.classify(value, maxval);
        }
    }

    OccupancyGrid::from_cells(info, cells)
}

/// Writes a grid as a binary PGM file.
///
/// Free cells are written as 254, occupied cells as 0 and unknown cells as
/// 205, so the cells load back unchanged with the default thresholds. The
/// resolution is written as a header comment for readers; [`load_grid`]
/// ignores it, and the origin is not written at all. Reloading without the
/// original [`LoadOptions`] yields resolution 1 at the identity origin.
///
/// # Errors
/// * `NavigationError::Io` - if the file cannot be written
pub fn save_grid(grid: &OccupancyGrid, path: impl AsRef<Path>) -> Result<(), NavigationError> {
    let path = path.as_ref();
    let info = grid.info();
    let width = info.width() as usize;

    let mut file = BufWriter::new(fs::File::create(path)?);
    writeln!(file, "P5")?;
    writeln!(file, "# resolution {}", info.resolution())?;
    writeln!(file, "{} {}", info.width(), info.height())?;
    writeln!(file, "255")?;

    if width > 0 {
        let mut row_pixels = Vec::with_capacity(width);
        for row in grid.data().chunks(width).rev() {
            row_pixels.clear();
            row_pixels.extend(row.iter().map(|cell| match cell {
                Occupancy::Free => FREE_PIXEL,
                Occupancy::Occupied => OCCUPIED_PIXEL,
                Occupancy::Unknown => UNKNOWN_PIXEL,
            }));
            file.write_all(&row_pixels)?;
        }
    }
    file.flush()?;

    debug!(
        path = %path.display(),
        width = info.width(),
        height = info.height(),
        "Saved grid"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use occgrid_geometry::Cell;
    use std::env::temp_dir;
    use std::path::PathBuf;

    /// Fresh scratch directory per test.
    fn scratch_dir(name: &str) -> PathBuf {
        let dir = temp_dir().join(format!("occgrid_store_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_save_and_load_grid() {
        let dir = scratch_dir("round_trip");
        let path = dir.join("map.pgm");

        let origin = Pose::from_xy_yaw(-1.0, 2.0, 0.0);
        let info = GridMetadata::new(0.05, 4, 3, origin).unwrap();
        let mut grid = OccupancyGrid::new(info);
        grid.set(Cell::new(0, 0), Occupancy::Occupied).unwrap();
        grid.set(Cell::new(3, 2), Occupancy::Unknown).unwrap();
        grid.set(Cell::new(1, 2), Occupancy::Occupied).unwrap();

        save_grid(&grid, &path).unwrap();
        let options = LoadOptions {
            resolution: 0.05,
            origin,
            ..LoadOptions::default()
        };
        let loaded = load_grid(&path, &options).unwrap();
        assert_eq!(loaded, grid);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_placement_comes_from_options() {
        let dir = scratch_dir("placement");
        let path = dir.join("map.pgm");

        let origin = Pose::from_xy_yaw(-1.0, 2.0, 0.3);
        let info = GridMetadata::new(0.05, 3, 2, origin).unwrap();
        let mut grid = OccupancyGrid::new(info);
        grid.set(Cell::new(2, 1), Occupancy::Occupied).unwrap();
        save_grid(&grid, &path).unwrap();

        let bare = load_grid(&path, &LoadOptions::default()).unwrap();
        assert_eq!(bare.data(), grid.data());
        assert_eq!(bare.info().resolution(), 1.0);
        assert_eq!(*bare.info().origin(), Pose::identity());

        let placed = load_grid(
            &path,
            &LoadOptions {
                resolution: 0.05,
                origin,
                ..LoadOptions::default()
            },
        )
        .unwrap();
        assert_eq!(placed, grid);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_ascii_rows_are_flipped() {
        let text = "P2\n# a comment line\n3 2\n255\n0 255 205\n255 255 0\n";
        let grid = parse_pgm(text.as_bytes(), &LoadOptions::default()).unwrap();

        assert_eq!(grid.info().width(), 3);
        assert_eq!(grid.info().height(), 2);
        // First image row is the top of the map.
        assert_eq!(grid.get(Cell::new(0, 1)).unwrap(), Occupancy::Occupied);
        assert_eq!(grid.get(Cell::new(1, 1)).unwrap(), Occupancy::Free);
        assert_eq!(grid.get(Cell::new(2, 1)).unwrap(), Occupancy::Unknown);
        assert_eq!(grid.get(Cell::new(0, 0)).unwrap(), Occupancy::Free);
        assert_eq!(grid.get(Cell::new(2, 0)).unwrap(), Occupancy::Occupied);
    }

    #[test]
    fn test_negate_and_maxval() {
        let text = "P2 2 1 15 15 0";
        let plain = parse_pgm(text.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(plain.data(), &[Occupancy::Free, Occupancy::Occupied]);

        let negated = LoadOptions {
            negate: true,
            ..LoadOptions::default()
        };
        let inverted = parse_pgm(text.as_bytes(), &negated).unwrap();
        assert_eq!(inverted.data(), &[Occupancy::Occupied, Occupancy::Free]);
    }

    #[test]
    fn test_binary_header_with_comment() {
        let mut bytes = b"P5\n# made by hand\n2 2\n255\n".to_vec();
        bytes.extend_from_slice(&[0, 254, 205, 0]);
        let grid = parse_pgm(&bytes, &LoadOptions::with_resolution(0.5)).unwrap();
        assert_eq!(grid.info().resolution(), 0.5);
        assert_eq!(
            grid.data(),
            &[
                Occupancy::Unknown,
                Occupancy::Occupied,
                Occupancy::Occupied,
                Occupancy::Free
            ]
        );
    }

    #[test]
    fn test_malformed_files() {
        let options = LoadOptions::default();
        let cases: [&[u8]; 7] = [
            b"",
            b"P6\n2 2\n255\n",
            b"P5\n2 x\n255\n",
            b"P5\n2 2\n0\n",
            b"P5\n2 2\n65535\n",
            b"P5\n2 2\n255\n\x00\x00\x00",
            b"P2\n2 2\n255\n0 0 300 0\n",
        ];
        for bytes in cases {
            assert!(
                matches!(
                    parse_pgm(bytes, &options),
                    Err(NavigationError::MalformedMetadata(_))
                ),
                "accepted {:?}",
                String::from_utf8_lossy(bytes)
            );
        }

        // Truncated ASCII data.
        assert!(matches!(
            parse_pgm(b"P2\n2 2\n255\n0 0 0", &options),
            Err(NavigationError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_invalid_options() {
        let text = b"P2 1 1 255 0";
        let bad_resolution = LoadOptions::with_resolution(0.0);
        assert!(matches!(
            parse_pgm(text, &bad_resolution),
            Err(NavigationError::InvalidArgument(_))
        ));

        let dir = scratch_dir("invalid_options");
        let path = dir.join("tiny.pgm");
        fs::write(&path, text).unwrap();
        let crossed = LoadOptions {
            free_thresh: 0.9,
            occupied_thresh: 0.1,
            ..LoadOptions::default()
        };
        assert!(matches!(
            load_grid(&path, &crossed),
            Err(NavigationError::InvalidArgument(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file() {
        let path = temp_dir().join("occgrid_store_missing").join("nope.pgm");
        assert!(matches!(
            load_grid(&path, &LoadOptions::default()),
            Err(NavigationError::Io(_))
        ));
    }
}
