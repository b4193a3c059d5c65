use occgrid_geometry::*;

fn main() {
    let resolution = 0.05;
    let origin = Pose::from_xy_yaw(-1.0, -0.5, 0.3);
    let meta_result = GridMetadata::new(resolution, 40, 20, origin);

    match meta_result {
        Ok(meta) => {
            println!("Grid: {}", meta);
            println!("  Corners:");
            for corner in meta.grid_corners() {
                println!("    ({:.3}, {:.3})", corner.x, corner.y);
            }

            let cells = [Cell::new(0, 0), Cell::new(39, 19), Cell::new(12, 7), Cell::new(40, 0)];
            println!("\nCell conversions:");
            for cell in cells {
                match meta.cell_index(cell) {
                    Ok(index) => {
                        let center = meta.cell_center(cell);
                        println!(
                            "  {} -> index {:>3}, centre ({:.3}, {:.3}), back to {}",
                            cell,
                            index,
                            center.x,
                            center.y,
                            meta.point_cell(&center)
                        );
                    }
                    Err(e) => println!("  {} -> {}", cell, e),
                }
            }

            let probe = WorldPoint::new(0.2, 0.4, 0.0);
            println!(
                "\nWorld point ({:.2}, {:.2}) falls in cell {} (within bounds: {})",
                probe.x,
                probe.y,
                meta.point_cell(&probe),
                meta.within_bounds(&probe)
            );
        }
        Err(e) => {
            eprintln!("Failed to create grid metadata: {}", e);
            eprintln!("Please ensure the resolution ({}) is positive.", resolution);
        }
    }
}
