use occgrid_navigation::{
    Cell, GridMetadata, Occupancy, OccupancyGrid, PlannerConfig, Pose, ProximityPenalty,
    WorldPoint, inflate_obstacles, shortest_path,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> anyhow::Result<()> {
    // 20x20 grid with 0.1m resolution, with its corner at (-1.0, -1.0) in world coordinates.
    let info = GridMetadata::new(0.1, 20, 20, Pose::from_xy_yaw(-1.0, -1.0, 0.0))?;
    let mut grid = OccupancyGrid::new(info);

    // 15 random rectangular obstacles, at most 2 cells on a side.
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..15 {
        let x0 = rng.random_range(0..20);
        let y0 = rng.random_range(0..20);
        let w = rng.random_range(1..=2);
        let h = rng.random_range(1..=2);
        for y in y0..(y0 + h).min(20) {
            for x in x0..(x0 + w).min(20) {
                grid.set(Cell::new(x, y), Occupancy::Occupied)?;
            }
        }
    }
    println!("Grid after random generation:\n{}", grid);

    let inflated = inflate_obstacles(&grid, 0.1)?;
    println!("Grid after inflation by 0.1m:\n{}", inflated);

    let p = WorldPoint::new(-0.55, -0.55, 0.0);
    let cell = info.point_cell(&p);
    let back = info.cell_center(cell);
    println!(
        "World point ({:.2}, {:.2}) maps to cell {}, whose centre is ({:.2}, {:.2})",
        p.x, p.y, cell, back.x, back.y
    );

    let start = Cell::new(0, 0);
    let goal = Cell::new(19, 19);
    let mut config = PlannerConfig::eight_connected();
    config.cost_policy.allow_blocked_endpoints = true;
    config.cost_policy.proximity = Some(ProximityPenalty {
        radius: 0.3,
        weight: 2.0,
    });

    match shortest_path(&inflated, start, goal, &config)? {
        Some(path) => {
            println!("Path with {} cells, cost {:.3}:", path.len(), path.cost);
            for point in path.to_world(&info) {
                println!("  ({:.2}, {:.2})", point.x, point.y);
            }
        }
        None => println!("No path from {} to {} in the inflated grid.", start, goal),
    }

    Ok(())
}
