//! Range sensor simulation.
//!
//! [`simulate_range_scan`] sweeps a planar range sensor across its bearings
//! and casts one ray per bearing, producing what an ideal sensor placed at
//! the given pose would read.

use nalgebra::Vector3;
use occgrid_geometry::{Pose, WorldPoint};
use tracing::debug;

use crate::error::NavigationError;
use crate::map::OccupancyGrid;
use crate::raycast::cast_ray;

/// Angular sweep and range limits of a planar range sensor.
///
/// Bearings are relative to the sensor's heading: reading `i` is taken at
/// `angle_min + i * angle_increment`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorDescription {
    /// Bearing of the first reading (radians).
    pub angle_min: f64,
    /// Angle between consecutive readings (radians).
    pub angle_increment: f64,
    /// Number of readings per scan.
    pub sample_count: usize,
    /// Returns closer than this are discarded (world units).
    pub range_min: f64,
    /// Maximum sensing distance (world units).
    pub range_max: f64,
}

impl SensorDescription {
    /// Creates a sensor description.
    pub fn new(
        angle_min: f64,
        angle_increment: f64,
        sample_count: usize,
        range_min: f64,
        range_max: f64,
    ) -> Self {
        Self {
            angle_min,
            angle_increment,
            sample_count,
            range_min,
            range_max,
        }
    }

    /// Creates a sensor description covering `[angle_min, angle_max]`.
    ///
    /// The sample count is `round(1 + (angle_max - angle_min) / angle_increment)`,
    /// so both end bearings are sampled when the span is a whole number of increments.
    ///
    /// # Errors
    /// * `NavigationError::InvalidArgument` - if the increment is zero or
    ///   points away from `angle_max`, or any value is not finite
    pub fn from_angle_range(
        angle_min: f64,
        angle_max: f64,
        angle_increment: f64,
        range_min: f64,
        range_max: f64,
    ) -> Result<Self, NavigationError> {
        if !angle_min.is_finite() || !angle_max.is_finite() || !angle_increment.is_finite() {
            return Err(NavigationError::invalid("sensor angles must be finite"));
        }
        if angle_increment == 0.0 {
            return Err(NavigationError::invalid("angle increment must be non-zero"));
        }
        let steps = (angle_max - angle_min) / angle_increment;
        if steps < 0.0 {
            return Err(NavigationError::invalid(
                "angle increment does not move from angle_min towards angle_max",
            ));
        }

        let sensor = Self::new(
            angle_min,
            angle_increment,
            (1.0 + steps).round() as usize,
            range_min,
            range_max,
        );
        sensor.validate()?;
        Ok(sensor)
    }

    /// Checks the description for values a scan cannot be produced from.
    ///
    /// # Errors
    /// * `NavigationError::InvalidArgument` - for a zero sample count, non-finite
    ///   angles, a negative `range_min`, or a `range_max` that is not finite or
    ///   below `range_min`
    pub fn validate(&self) -> Result<(), NavigationError> {
        if self.sample_count == 0 {
            return Err(NavigationError::invalid("sample count must be positive"));
        }
        if !self.angle_min.is_finite() || !self.angle_increment.is_finite() {
            return Err(NavigationError::invalid("sensor angles must be finite"));
        }
        if !self.range_min.is_finite() || self.range_min < 0.0 {
            return Err(NavigationError::invalid(
                "range_min must be finite and non-negative",
            ));
        }
        if !self.range_max.is_finite() || self.range_max < self.range_min {
            return Err(NavigationError::invalid(format!(
                "range_max ({}) must be finite and at least range_min ({})",
                self.range_max, self.range_min
            )));
        }
        Ok(())
    }

    /// Sensor-frame bearing of reading `i`.
    pub fn bearing(&self, i: usize) -> f64 {
        self.angle_min + i as f64 * self.angle_increment
    }

    /// Sensor-frame bearing of the last reading.
    pub fn angle_max(&self) -> f64 {
        self.bearing(self.sample_count.saturating_sub(1))
    }
}

/// The readings of one simulated scan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeScan {
    /// The sensor the scan was produced with.
    pub sensor: SensorDescription,
    /// One reading per bearing; `None` when nothing was hit within range.
    pub ranges: Vec<Option<f64>>,
}

impl RangeScan {
    /// Number of readings that returned a distance.
    pub fn num_returns(&self) -> usize {
        self.ranges.iter().filter(|r| r.is_some()).count()
    }

    /// World-frame points at which the beams hit, for a scan taken from `pose`.
    ///
    /// Readings without a return are skipped.
    pub fn endpoints(&self, pose: &Pose) -> Vec<WorldPoint> {
        let position = pose.position();
        let yaw = pose.yaw();
        self.ranges
            .iter()
            .enumerate()
            .filter_map(|(i, range)| {
                let r = (*range)?;
                let bearing = yaw + self.sensor.bearing(i);
                Some(position + Vector3::new(bearing.cos(), bearing.sin(), 0.0) * r)
            })
            .collect()
    }
}

/// Simulates a range scan taken from `sensor_pose`.
///
/// Each reading casts a ray from the sensor position at the world bearing
/// `yaw(sensor_pose) + angle_min + i * angle_increment`, bounded by
/// `range_max`. Hits closer than `range_min` read as `None`, like a real
/// sensor's dead zone.
///
/// # Errors
/// * `NavigationError::InvalidArgument` - if the sensor description is invalid
///   or the pose is not finite
pub fn simulate_range_scan(
    grid: &OccupancyGrid,
    sensor_pose: &Pose,
    sensor: &SensorDescription,
    unknown_as_occupied: bool,
) -> Result<RangeScan, NavigationError> {
    sensor.validate()?;

    let origin = sensor_pose.position();
    let yaw = sensor_pose.yaw();

    let mut ranges = Vec::with_capacity(sensor.sample_count);
    for i in 0..sensor.sample_count {
        let hit = cast_ray(
            grid,
            &origin,
            yaw + sensor.bearing(i),
            sensor.range_max,
            unknown_as_occupied,
        )?;
        ranges.push(
            hit.map(|h| h.distance)
                .filter(|&distance| distance >= sensor.range_min),
        );
    }

    let scan = RangeScan {
        sensor: *sensor,
        ranges,
    };
    debug!(
        x = origin.x,
        y = origin.y,
        yaw,
        samples = sensor.sample_count,
        returns = scan.num_returns(),
        "Simulated range scan"
    );
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Occupancy;
    use approx::assert_relative_eq;
    use core::f64::consts::{FRAC_PI_2, PI};
    use occgrid_geometry::{Cell, GridMetadata};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// 8x8 room at 0.25 resolution with walls along the border cells.
    fn walled_room() -> OccupancyGrid {
        let info = GridMetadata::new(0.25, 8, 8, Pose::identity()).unwrap();
        let mut grid = OccupancyGrid::new(info);
        for i in 0..8 {
            for cell in [
                Cell::new(i, 0),
                Cell::new(i, 7),
                Cell::new(0, i),
                Cell::new(7, i),
            ] {
                grid.set(cell, Occupancy::Occupied).unwrap();
            }
        }
        grid
    }

    #[test]
    fn test_scan_in_room() {
        let grid = walled_room();
        let sensor = SensorDescription::from_angle_range(-PI, FRAC_PI_2, FRAC_PI_2, 0.0, 5.0)
            .unwrap();
        assert_eq!(sensor.sample_count, 4);

        let scan =
            simulate_range_scan(&grid, &Pose::from_xy_yaw(1.0, 1.0, 0.0), &sensor, false).unwrap();
        assert_eq!(scan.ranges.len(), 4);
        for range in &scan.ranges {
            assert_relative_eq!(range.unwrap(), 0.75, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_sensor_yaw_rotates_beams() {
        let mut grid = walled_room();
        // Open the right wall so only the heading decides what is hit.
        for y in 1..7 {
            grid.set(Cell::new(7, y), Occupancy::Free).unwrap();
        }
        let sensor = SensorDescription::new(0.0, 0.1, 1, 0.0, 5.0);

        let facing_right =
            simulate_range_scan(&grid, &Pose::from_xy_yaw(1.0, 1.0, 0.0), &sensor, false).unwrap();
        assert_eq!(facing_right.ranges, vec![None]);

        let facing_up =
            simulate_range_scan(&grid, &Pose::from_xy_yaw(1.0, 1.0, FRAC_PI_2), &sensor, false)
                .unwrap();
        assert_relative_eq!(facing_up.ranges[0].unwrap(), 0.75, epsilon = 1e-9);
    }

    #[test]
    fn test_range_limits() {
        let grid = walled_room();
        let pose = Pose::from_xy_yaw(1.0, 1.0, 0.0);

        let dead_zone = SensorDescription::new(0.0, FRAC_PI_2, 4, 1.0, 5.0);
        let scan = simulate_range_scan(&grid, &pose, &dead_zone, false).unwrap();
        assert!(scan.ranges.iter().all(Option::is_none));

        let short = SensorDescription::new(0.0, FRAC_PI_2, 4, 0.0, 0.5);
        let scan = simulate_range_scan(&grid, &pose, &short, false).unwrap();
        assert_eq!(scan.num_returns(), 0);
    }

    #[test]
    fn test_unknown_cells_as_obstacles() {
        let mut grid = walled_room();
        grid.set(Cell::new(5, 4), Occupancy::Unknown).unwrap();
        let sensor = SensorDescription::new(0.0, 0.1, 1, 0.0, 5.0);
        let pose = Pose::from_xy_yaw(1.0, 1.0, 0.0);

        let ignoring = simulate_range_scan(&grid, &pose, &sensor, false).unwrap();
        assert_relative_eq!(ignoring.ranges[0].unwrap(), 0.75, epsilon = 1e-9);

        let blocking = simulate_range_scan(&grid, &pose, &sensor, true).unwrap();
        assert_relative_eq!(blocking.ranges[0].unwrap(), 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_endpoints() {
        let grid = walled_room();
        let pose = Pose::from_xy_yaw(1.0, 1.0, 0.0);
        let sensor = SensorDescription::new(0.0, FRAC_PI_2, 2, 0.0, 5.0);
        let scan = simulate_range_scan(&grid, &pose, &sensor, false).unwrap();

        let points = scan.endpoints(&pose);
        assert_eq!(points.len(), 2);
        assert_relative_eq!(points[0].x, 1.75, epsilon = 1e-9);
        assert_relative_eq!(points[0].y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(points[1].x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(points[1].y, 1.75, epsilon = 1e-9);
    }

    #[test]
    fn test_scan_length_matches_sample_count() {
        let grid = walled_room();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let sensor = SensorDescription::new(
                rng.random_range(-PI..PI),
                rng.random_range(0.001..0.5),
                rng.random_range(1..200),
                0.0,
                rng.random_range(0.0..4.0),
            );
            let pose = Pose::from_xy_yaw(
                rng.random_range(-1.0..3.0),
                rng.random_range(-1.0..3.0),
                rng.random_range(-PI..PI),
            );
            let scan = simulate_range_scan(&grid, &pose, &sensor, true).unwrap();
            assert_eq!(scan.ranges.len(), sensor.sample_count);
        }
    }

    #[test]
    fn test_invalid_sensor() {
        let grid = walled_room();
        let pose = Pose::identity();

        let inverted = SensorDescription::new(0.0, 0.1, 10, 2.0, 1.0);
        assert!(matches!(
            simulate_range_scan(&grid, &pose, &inverted, false),
            Err(NavigationError::InvalidArgument(_))
        ));
        assert!(SensorDescription::from_angle_range(0.0, 1.0, 0.0, 0.0, 1.0).is_err());
        assert!(SensorDescription::from_angle_range(0.0, 1.0, -0.1, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_empty_sweep_rejected() {
        let grid = walled_room();
        let empty = SensorDescription::new(0.0, 0.1, 0, 0.0, 3.0);
        assert!(matches!(
            simulate_range_scan(&grid, &Pose::identity(), &empty, false),
            Err(NavigationError::InvalidArgument(_))
        ));
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_from_angle_range_counts() {
        let sensor = SensorDescription::from_angle_range(-1.0, 1.0, 0.5, 0.1, 10.0).unwrap();
        assert_eq!(sensor.sample_count, 5);
        assert_relative_eq!(sensor.angle_max(), 1.0, epsilon = 1e-12);

        let single = SensorDescription::from_angle_range(0.3, 0.3, 0.1, 0.0, 1.0).unwrap();
        assert_eq!(single.sample_count, 1);
    }
}
