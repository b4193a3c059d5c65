use std::collections::HashSet;

use occgrid_navigation::{
    Cell, GridMetadata, Occupancy, OccupancyGrid, PlannerConfig, Pose, shortest_path_detailed,
};

fn main() -> anyhow::Result<()> {
    // '#' = blocked, '.' = walkable. The first row is y = 0.
    let rows = [
        "..........", // Row 0
        ".##....##.", // Row 1
        "....#.....", // Row 2
        "..####.#..", // Row 3
        ".....#.#..", // Row 4
        ".###.#.##.", // Row 5
        "...#......", // Row 6
        ".#.#.###..", // Row 7
        ".#......#.", // Row 8
        "...###....", // Row 9
    ];

    let info = GridMetadata::new(1.0, 10, 10, Pose::identity())?;
    let cells = rows
        .iter()
        .flat_map(|row| row.chars())
        .map(|c| if c == '#' { Occupancy::Occupied } else { Occupancy::Free })
        .collect();
    let grid = OccupancyGrid::from_cells(info, cells)?;

    let start = Cell::new(0, 0);
    let goal = Cell::new(9, 9);

    println!("Grid:");
    print_grid(&grid, start, goal, &HashSet::new());
    println!("\nStart: {}, Goal: {}", start, goal);

    for (name, config) in [
        ("4-connected", PlannerConfig::four_connected()),
        ("8-connected", PlannerConfig::eight_connected()),
    ] {
        let result = shortest_path_detailed(&grid, start, goal, &config)?;
        match result.path {
            Some(path) => {
                println!(
                    "\n{}: {} cells, cost {:.3}, {} cells expanded",
                    name,
                    path.len(),
                    path.cost,
                    result.nodes_explored
                );
                let on_path: HashSet<Cell> = path.cells.iter().copied().collect();
                print_grid(&grid, start, goal, &on_path);
            }
            None => println!("\n{}: no path found.", name),
        }
    }

    Ok(())
}

fn print_grid(grid: &OccupancyGrid, start: Cell, goal: Cell, path: &HashSet<Cell>) {
    for y in 0..grid.info().height() as i32 {
        for x in 0..grid.info().width() as i32 {
            let cell = Cell::new(x, y);
            let symbol = if cell == start {
                'S'
            } else if cell == goal {
                'G'
            } else if path.contains(&cell) {
                '*'
            } else if matches!(grid.get(cell), Ok(Occupancy::Occupied)) {
                'X'
            } else {
                '.'
            };
            print!("{} ", symbol);
        }
        println!();
    }
}
