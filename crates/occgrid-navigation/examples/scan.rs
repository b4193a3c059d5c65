use std::f64::consts::PI;

use occgrid_navigation::{
    Cell, GridMetadata, Occupancy, OccupancyGrid, Pose, SensorDescription, simulate_range_scan,
};

fn main() -> anyhow::Result<()> {
    // 4m x 3m room at 5cm resolution with a pillar in the middle.
    let info = GridMetadata::new(0.05, 80, 60, Pose::identity())?;
    let mut grid = OccupancyGrid::new(info);
    for cell in info.cells() {
        let wall = cell.x == 0 || cell.y == 0 || cell.x == 79 || cell.y == 59;
        let pillar = (38..42).contains(&cell.x) && (28..32).contains(&cell.y);
        if wall || pillar {
            grid.set(cell, Occupancy::Occupied)?;
        }
    }
    // A doorway of unknown space in the right wall.
    for y in 25..35 {
        grid.set(Cell::new(79, y), Occupancy::Unknown)?;
    }

    let sensor = SensorDescription::from_angle_range(-PI, PI - PI / 8.0, PI / 8.0, 0.1, 5.0)?;
    let pose = Pose::from_xy_yaw(1.0, 1.5, 0.0);

    for unknown_as_occupied in [false, true] {
        let scan = simulate_range_scan(&grid, &pose, &sensor, unknown_as_occupied)?;
        println!(
            "\nScan from {} (unknown as occupied: {}), {} of {} beams returned:",
            pose,
            unknown_as_occupied,
            scan.num_returns(),
            scan.ranges.len()
        );
        for (i, range) in scan.ranges.iter().enumerate() {
            let bearing = sensor.bearing(i).to_degrees();
            match range {
                Some(r) => println!("  {:>7.1} deg: {:.3} m", bearing, r),
                None => println!("  {:>7.1} deg: no return", bearing),
            }
        }
    }

    Ok(())
}
