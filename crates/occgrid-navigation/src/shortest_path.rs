/*

Shortest paths over an occupancy grid.

A* = f(n) = g(n) + h(n)

Where:
    n = a traversable cell
    g(n) = cost of the cheapest known path from the start to n
    h(n) = lower bound on the cost from n to the goal (heuristic)
    f(n) = estimated cost of the cheapest path through n

Edges join a cell to its 4 or 8 neighbours. Entering a cell costs the move
length (1 along an axis, `diagonal_cost` diagonally) times (1 + penalty of
the entered cell). Penalties are never negative, so each heuristic below is
a lower bound on the obstacle-free cost and the search stays optimal.

Loop:
    - pop the open cell with lowest f(n); ties go to the cell pushed first
    - skip it if it was already settled
    - if it is the goal, walk the parent links back to the start
    - otherwise relax every neighbour, in a fixed order

*/

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use occgrid_geometry::{Cell, GridMetadata, WorldPoint};
use tracing::debug;

use crate::error::NavigationError;
use crate::inflation::obstacle_distances;
use crate::map::{Occupancy, OccupancyGrid};

/// Cell adjacency used by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Connectivity {
    /// Axis-aligned moves only.
    Four,
    /// Axis-aligned and diagonal moves.
    #[default]
    Eight,
}

/// Axis-aligned moves first, then diagonals: down, left, right, up.
static AXIS_MOVES: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
static DIAGONAL_MOVES: [(i32, i32); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

impl Connectivity {
    fn moves(self) -> impl Iterator<Item = (i32, i32)> {
        let diagonals: &[(i32, i32)] = match self {
            Connectivity::Four => &[],
            Connectivity::Eight => &DIAGONAL_MOVES,
        };
        AXIS_MOVES.iter().chain(diagonals).copied()
    }
}

/// Lower bound used to order the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Heuristic {
    /// No estimate; the search degenerates to Dijkstra's algorithm.
    Dijkstra,
    /// Straight-line distance between cells.
    Euclidean,
    /// Exact cost on an obstacle-free grid under the configured connectivity
    /// (Manhattan distance with four neighbours).
    #[default]
    Octile,
}

/// How unknown cells are treated by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnknownCellPolicy {
    /// Unknown cells are never entered.
    #[default]
    Impassable,
    /// Unknown cells may be entered at an extra penalty.
    Traversable {
        /// Penalty added to the cell (>= 0).
        penalty: f64,
    },
}

/// Extra cost for cells near occupied cells.
///
/// A cell at distance `d < radius` from the nearest occupied cell centre
/// carries a penalty of `weight * (1 - d / radius)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProximityPenalty {
    /// Distance (world units) at which the penalty vanishes.
    pub radius: f64,
    /// Penalty of a cell touching an obstacle.
    pub weight: f64,
}

/// Traversal costs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostPolicy {
    /// Cost of a diagonal move relative to an axis-aligned one.
    pub diagonal_cost: f64,
    /// Treatment of unknown cells.
    pub unknown: UnknownCellPolicy,
    /// Optional penalty for passing close to obstacles.
    pub proximity: Option<ProximityPenalty>,
    /// Lets the start and goal lie in non-traversable cells.
    pub allow_blocked_endpoints: bool,
    /// Lets diagonal moves squeeze between two blocked axis neighbours.
    pub allow_corner_cutting: bool,
}

impl Default for CostPolicy {
    fn default() -> Self {
        Self {
            diagonal_cost: std::f64::consts::SQRT_2,
            unknown: UnknownCellPolicy::default(),
            proximity: None,
            allow_blocked_endpoints: false,
            allow_corner_cutting: false,
        }
    }
}

/// Planner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannerConfig {
    /// Neighbour set.
    pub connectivity: Connectivity,
    /// Move and cell costs.
    pub cost_policy: CostPolicy,
    /// Frontier ordering.
    pub heuristic: Heuristic,
    /// Upper bound on the number of expanded cells.
    pub max_expansions: Option<usize>,
}

impl PlannerConfig {
    /// Four-connected planning with default costs.
    pub fn four_connected() -> Self {
        Self {
            connectivity: Connectivity::Four,
            ..Self::default()
        }
    }

    /// Eight-connected planning with default costs.
    pub fn eight_connected() -> Self {
        Self {
            connectivity: Connectivity::Eight,
            ..Self::default()
        }
    }

    /// Checks costs and penalties.
    ///
    /// # Errors
    /// * `NavigationError::InvalidArgument` - for a non-positive or non-finite
    ///   diagonal cost, or a negative or non-finite penalty or radius
    pub fn validate(&self) -> Result<(), NavigationError> {
        let policy = &self.cost_policy;
        if !policy.diagonal_cost.is_finite() || policy.diagonal_cost <= 0.0 {
            return Err(NavigationError::invalid(
                "diagonal cost must be finite and positive",
            ));
        }
        if let UnknownCellPolicy::Traversable { penalty } = policy.unknown {
            if !penalty.is_finite() || penalty < 0.0 {
                return Err(NavigationError::invalid(
                    "unknown cell penalty must be finite and non-negative",
                ));
            }
        }
        if let Some(proximity) = policy.proximity {
            if !proximity.radius.is_finite() || proximity.radius < 0.0 {
                return Err(NavigationError::invalid(
                    "proximity radius must be finite and non-negative",
                ));
            }
            if !proximity.weight.is_finite() || proximity.weight < 0.0 {
                return Err(NavigationError::invalid(
                    "proximity weight must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }
}

/// A path through the grid.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    /// Cells from start to goal, both included.
    pub cells: Vec<Cell>,
    /// Sum of the edge costs along the path.
    pub cost: f64,
}

impl Path {
    /// Number of cells in the path.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the path has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell centres along the path.
    pub fn to_world(&self, info: &GridMetadata) -> Vec<WorldPoint> {
        self.cells.iter().map(|&c| info.cell_center(c)).collect()
    }

    /// Length of the polyline through the cell centres, in world units.
    pub fn world_length(&self, info: &GridMetadata) -> f64 {
        self.cells
            .windows(2)
            .map(|w| nalgebra::distance(&info.cell_center(w[0]), &info.cell_center(w[1])))
            .sum()
    }
}

/// Result of a search along with search statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// The path found, or `None` if the goal is unreachable.
    pub path: Option<Path>,
    /// Number of cells settled by the search.
    pub nodes_explored: usize,
}

#[derive(Copy, Clone, Debug)]
struct State {
    f_score: f64,
    seq: u64,
    index: usize,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

// The priority queue depends on `Ord`.
// Explicitly implement the trait so the queue becomes a min-heap
// instead of a max-heap.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Flip both keys: lowest f first, then the earliest insertion.
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const NO_PARENT: usize = usize::MAX;

/// Per-cell penalties; `None` marks a cell the planner may not enter.
struct CostField {
    penalties: Vec<Option<f64>>,
}

impl CostField {
    fn build(
        grid: &OccupancyGrid,
        policy: &CostPolicy,
        endpoints: &[usize],
    ) -> Result<Self, NavigationError> {
        let proximity = match policy.proximity {
            Some(p) if p.radius > 0.0 && p.weight > 0.0 => {
                Some((p, obstacle_distances(grid, p.radius)?))
            }
            _ => None,
        };

        let mut penalties: Vec<Option<f64>> = grid
            .data()
            .iter()
            .enumerate()
            .map(|(i, state)| {
                let base = match state {
                    Occupancy::Free => Some(0.0),
                    Occupancy::Unknown => match policy.unknown {
                        UnknownCellPolicy::Impassable => None,
                        UnknownCellPolicy::Traversable { penalty } => Some(penalty),
                    },
                    Occupancy::Occupied => None,
                }?;
                let near = proximity.as_ref().map_or(0.0, |(p, distances)| {
                    distances[i].map_or(0.0, |d| p.weight * (1.0 - d / p.radius).max(0.0))
                });
                Some(base + near)
            })
            .collect();

        if policy.allow_blocked_endpoints {
            for &i in endpoints {
                penalties[i].get_or_insert(0.0);
            }
        }

        Ok(Self { penalties })
    }

    fn penalty(&self, info: &GridMetadata, cell: Cell) -> Option<f64> {
        let index = info.cell_index(cell).ok()?;
        self.penalties[index]
    }
}

/// Search state for one planner call.
struct Search<'a> {
    info: &'a GridMetadata,
    config: &'a PlannerConfig,
    costs: CostField,
    g_score: Vec<f64>,
    came_from: Vec<usize>,
    closed: Vec<bool>,
    open: BinaryHeap<State>,
    seq: u64,
    expanded: usize,
}

impl<'a> Search<'a> {
    fn new(
        grid: &'a OccupancyGrid,
        config: &'a PlannerConfig,
        endpoints: &[usize],
    ) -> Result<Self, NavigationError> {
        let n = grid.info().num_cells();
        Ok(Self {
            info: grid.info(),
            config,
            costs: CostField::build(grid, &config.cost_policy, endpoints)?,
            g_score: vec![f64::INFINITY; n],
            came_from: vec![NO_PARENT; n],
            closed: vec![false; n],
            open: BinaryHeap::new(),
            seq: 0,
            expanded: 0,
        })
    }

    fn passable(&self, index: usize) -> bool {
        self.costs.penalties[index].is_some()
    }

    fn push(&mut self, index: usize, f_score: f64) {
        self.open.push(State {
            f_score,
            seq: self.seq,
            index,
        });
        self.seq += 1;
    }

    /// Runs until `goal` is settled (`Ok(true)`) or the frontier empties (`Ok(false)`).
    fn run(
        &mut self,
        start: usize,
        goal: Option<usize>,
        heuristic: impl Fn(Cell) -> f64,
    ) -> Result<bool, NavigationError> {
        self.g_score[start] = 0.0;
        let start_cell = self.info.index_cell(start)?;
        self.push(start, heuristic(start_cell));

        let diagonal_cost = self.config.cost_policy.diagonal_cost;
        let corner_cutting = self.config.cost_policy.allow_corner_cutting;

        while let Some(State { index: current, .. }) = self.open.pop() {
            if self.closed[current] {
                continue;
            }
            self.closed[current] = true;
            self.expanded += 1;

            if goal == Some(current) {
                return Ok(true);
            }
            if self
                .config
                .max_expansions
                .is_some_and(|limit| self.expanded >= limit)
            {
                return Err(NavigationError::SearchLimitExceeded {
                    nodes_explored: self.expanded,
                });
            }

            let cell = self.info.index_cell(current)?;
            for (dx, dy) in self.config.connectivity.moves() {
                let neighbor = cell.offset(dx, dy);
                let Ok(next) = self.info.cell_index(neighbor) else {
                    continue;
                };
                let Some(penalty) = self.costs.penalties[next] else {
                    continue;
                };
                if self.closed[next] {
                    continue;
                }

                let diagonal = dx != 0 && dy != 0;
                if diagonal
                    && !corner_cutting
                    && (self.costs.penalty(self.info, cell.offset(dx, 0)).is_none()
                        || self.costs.penalty(self.info, cell.offset(0, dy)).is_none())
                {
                    continue;
                }

                let step = if diagonal { diagonal_cost } else { 1.0 };
                let tentative_g_score = self.g_score[current] + step * (1.0 + penalty);
                if tentative_g_score < self.g_score[next] {
                    self.came_from[next] = current;
                    self.g_score[next] = tentative_g_score;
                    self.push(next, tentative_g_score + heuristic(neighbor));
                }
            }
        }

        Ok(false)
    }
}

fn reconstruct_path(
    info: &GridMetadata,
    came_from: &[usize],
    mut current: usize,
    cost: f64,
) -> Result<Path, NavigationError> {
    let mut cells = vec![info.index_cell(current)?];
    while came_from[current] != NO_PARENT {
        current = came_from[current];
        cells.push(info.index_cell(current)?);
    }
    cells.reverse();
    Ok(Path { cells, cost })
}

/// Heuristic value between two cells, in axis-move units.
fn estimate(config: &PlannerConfig, from: Cell, to: Cell) -> f64 {
    let dx = f64::from(from.x.abs_diff(to.x));
    let dy = f64::from(from.y.abs_diff(to.y));
    let diagonal_cost = config.cost_policy.diagonal_cost;

    match (config.heuristic, config.connectivity) {
        (Heuristic::Dijkstra, _) => 0.0,
        (Heuristic::Euclidean, Connectivity::Four) => dx.hypot(dy),
        (Heuristic::Euclidean, Connectivity::Eight) => {
            // A diagonal move covers sqrt(2) for `diagonal_cost`.
            dx.hypot(dy) * (diagonal_cost / std::f64::consts::SQRT_2).min(1.0)
        }
        (Heuristic::Octile, Connectivity::Four) => dx + dy,
        (Heuristic::Octile, Connectivity::Eight) => {
            let (dmin, dmax) = if dx < dy { (dx, dy) } else { (dy, dx) };
            if diagonal_cost < 1.0 {
                // Zig-zagging diagonals beat axis moves; each move still
                // shrinks the larger offset by at most one.
                dmax * diagonal_cost
            } else {
                (dmax - dmin) + dmin * diagonal_cost.min(2.0)
            }
        }
    }
}

/// Finds a minimum-cost path from `start` to `goal`.
///
/// Returns `Ok(None)` when the goal is unreachable, including when the start
/// or goal cell cannot be entered (unless
/// [`CostPolicy::allow_blocked_endpoints`] is set). The result is
/// deterministic: the same grid and configuration always give the same path.
///
/// # Errors
/// * `NavigationError::OutOfBounds` - if `start` or `goal` is outside the grid
/// * `NavigationError::InvalidArgument` - if the configuration is invalid
/// * `NavigationError::SearchLimitExceeded` - if `max_expansions` is reached
pub fn shortest_path(
    grid: &OccupancyGrid,
    start: Cell,
    goal: Cell,
    config: &PlannerConfig,
) -> Result<Option<Path>, NavigationError> {
    shortest_path_detailed(grid, start, goal, config).map(|result| result.path)
}

/// Like [`shortest_path`], but also reports how many cells were expanded.
///
/// # Errors
/// Same as [`shortest_path`].
pub fn shortest_path_detailed(
    grid: &OccupancyGrid,
    start: Cell,
    goal: Cell,
    config: &PlannerConfig,
) -> Result<PathResult, NavigationError> {
    config.validate()?;
    let info = grid.info();
    let start_index = info.cell_index(start)?;
    let goal_index = info.cell_index(goal)?;

    let mut search = Search::new(grid, config, &[start_index, goal_index])?;
    if !search.passable(start_index) || !search.passable(goal_index) {
        debug!(%start, %goal, "Start or goal is not traversable");
        return Ok(PathResult {
            path: None,
            nodes_explored: 0,
        });
    }

    let found = search.run(start_index, Some(goal_index), |cell| {
        estimate(config, cell, goal)
    })?;

    let path = if found {
        Some(reconstruct_path(
            info,
            &search.came_from,
            goal_index,
            search.g_score[goal_index],
        )?)
    } else {
        None
    };

    debug!(
        %start,
        %goal,
        nodes_explored = search.expanded,
        path_cells = path.as_ref().map_or(0, Path::len),
        cost = path.as_ref().map_or(f64::INFINITY, |p| p.cost),
        "Shortest path search finished"
    );

    Ok(PathResult {
        path,
        nodes_explored: search.expanded,
    })
}

/// Plans between two world points and returns the cell centres of the path.
///
/// # Errors
/// Same as [`shortest_path`]; points outside the grid give `OutOfBounds`.
pub fn shortest_path_world(
    grid: &OccupancyGrid,
    start: &WorldPoint,
    goal: &WorldPoint,
    config: &PlannerConfig,
) -> Result<Option<Vec<WorldPoint>>, NavigationError> {
    let info = grid.info();
    let path = shortest_path(grid, info.point_cell(start), info.point_cell(goal), config)?;
    Ok(path.map(|p| p.to_world(info)))
}

/// Minimum costs from one source cell to every reachable cell.
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    info: GridMetadata,
    source: Cell,
    distances: Vec<f64>,
    came_from: Vec<usize>,
}

impl ShortestPathTree {
    /// The source cell of the tree.
    pub fn source(&self) -> Cell {
        self.source
    }

    /// Cost of the cheapest path from the source to `cell`, if it is reachable.
    pub fn distance(&self, cell: Cell) -> Option<f64> {
        let index = self.info.cell_index(cell).ok()?;
        let d = self.distances[index];
        d.is_finite().then_some(d)
    }

    /// Cheapest path from the source to `cell`, if it is reachable.
    pub fn path_to(&self, cell: Cell) -> Option<Path> {
        let cost = self.distance(cell)?;
        let index = self.info.cell_index(cell).ok()?;
        reconstruct_path(&self.info, &self.came_from, index, cost).ok()
    }

    /// Number of reachable cells, the source included.
    pub fn reachable_count(&self) -> usize {
        self.distances.iter().filter(|d| d.is_finite()).count()
    }
}

/// Runs Dijkstra's algorithm from `source` over the whole reachable region.
///
/// The heuristic setting of `config` is ignored. An impassable source yields
/// a tree in which nothing is reachable.
///
/// # Errors
/// * `NavigationError::OutOfBounds` - if `source` is outside the grid
/// * `NavigationError::InvalidArgument` - if the configuration is invalid
/// * `NavigationError::SearchLimitExceeded` - if `max_expansions` is reached
pub fn single_source_shortest_paths(
    grid: &OccupancyGrid,
    source: Cell,
    config: &PlannerConfig,
) -> Result<ShortestPathTree, NavigationError> {
    config.validate()?;
    let info = *grid.info();
    let source_index = info.cell_index(source)?;

    let mut search = Search::new(grid, config, &[source_index])?;
    if search.passable(source_index) {
        search.run(source_index, None, |_| 0.0)?;
    }
    debug!(%source, nodes_explored = search.expanded, "Shortest path tree built");

    Ok(ShortestPathTree {
        info,
        source,
        distances: search.g_score,
        came_from: search.came_from,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use occgrid_geometry::Pose;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::SQRT_2;

    /// Builds a grid from text rows; the first row is y = 0.
    /// '#' is occupied, '?' unknown and anything else free.
    fn grid_from_rows(rows: &[&str]) -> OccupancyGrid {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let info = GridMetadata::new(1.0, width, height, Pose::identity()).unwrap();
        let cells = rows
            .iter()
            .flat_map(|row| row.chars())
            .map(|c| match c {
                '#' => Occupancy::Occupied,
                '?' => Occupancy::Unknown,
                _ => Occupancy::Free,
            })
            .collect();
        OccupancyGrid::from_cells(info, cells).unwrap()
    }

    fn empty(width: u32, height: u32) -> OccupancyGrid {
        OccupancyGrid::new(GridMetadata::new(1.0, width, height, Pose::identity()).unwrap())
    }

    fn assert_valid_path(grid: &OccupancyGrid, path: &Path, config: &PlannerConfig) {
        for cell in &path.cells {
            assert_eq!(grid.get(*cell).unwrap(), Occupancy::Free);
        }
        for w in path.cells.windows(2) {
            let dx = (w[1].x - w[0].x).abs();
            let dy = (w[1].y - w[0].y).abs();
            match config.connectivity {
                Connectivity::Four => assert_eq!(dx + dy, 1),
                Connectivity::Eight => assert!(dx <= 1 && dy <= 1 && dx + dy >= 1),
            }
        }
    }

    #[test]
    fn test_astar_simple_path() {
        let grid = empty(5, 5);
        let config = PlannerConfig::four_connected();
        let start = Cell::new(0, 0);
        let goal = Cell::new(4, 4);

        let path = shortest_path(&grid, start, goal, &config).unwrap().unwrap();
        assert_eq!(path.len(), 9);
        assert_eq!(path.cells[0], start);
        assert_eq!(*path.cells.last().unwrap(), goal);
        assert_relative_eq!(path.cost, 8.0);
        assert_valid_path(&grid, &path, &config);

        let again = shortest_path(&grid, start, goal, &config).unwrap().unwrap();
        assert_eq!(path, again);
    }

    #[test]
    fn test_astar_around_walls() {
        let grid = grid_from_rows(&[
            "....#",
            "##.#.",
            ".....",
            ".####",
            ".....",
        ]);
        let config = PlannerConfig::four_connected();
        let path = shortest_path(&grid, Cell::new(0, 0), Cell::new(4, 4), &config)
            .unwrap()
            .unwrap();
        // Through the gap at (2, 1), back west to (0, 2), then down the left edge.
        assert_eq!(path.len(), 13);
        assert_relative_eq!(path.cost, 12.0);
        assert_valid_path(&grid, &path, &config);
    }

    #[test]
    fn test_astar_no_path() {
        let grid = grid_from_rows(&["...", "###", "..."]);
        for config in [PlannerConfig::four_connected(), PlannerConfig::eight_connected()] {
            let path = shortest_path(&grid, Cell::new(0, 0), Cell::new(2, 2), &config).unwrap();
            assert!(path.is_none());
        }
    }

    #[test]
    fn test_astar_start_or_goal_blocked() {
        let grid = grid_from_rows(&["...", ".#.", "..."]);
        let mut config = PlannerConfig::four_connected();
        let blocked = Cell::new(1, 1);
        let free = Cell::new(2, 2);

        assert!(shortest_path(&grid, blocked, free, &config).unwrap().is_none());
        assert!(shortest_path(&grid, free, blocked, &config).unwrap().is_none());

        config.cost_policy.allow_blocked_endpoints = true;
        let path = shortest_path(&grid, blocked, free, &config).unwrap().unwrap();
        assert_eq!(path.cells[0], blocked);
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_astar_start_equals_goal() {
        let grid = empty(3, 3);
        let path = shortest_path(&grid, Cell::new(1, 1), Cell::new(1, 1), &PlannerConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(path.cells, vec![Cell::new(1, 1)]);
        assert_eq!(path.cost, 0.0);
    }

    #[test]
    fn test_out_of_bounds_endpoints() {
        let grid = empty(3, 3);
        let config = PlannerConfig::default();
        assert!(matches!(
            shortest_path(&grid, Cell::new(-1, 0), Cell::new(1, 1), &config),
            Err(NavigationError::OutOfBounds(_))
        ));
        assert!(matches!(
            shortest_path(&grid, Cell::new(0, 0), Cell::new(1, 3), &config),
            Err(NavigationError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_diagonal_moves() {
        let grid = empty(5, 5);
        let config = PlannerConfig::eight_connected();
        let path = shortest_path(&grid, Cell::new(0, 0), Cell::new(4, 4), &config)
            .unwrap()
            .unwrap();
        assert_eq!(path.len(), 5);
        assert_relative_eq!(path.cost, 4.0 * SQRT_2, epsilon = 1e-12);
        assert_relative_eq!(path.world_length(grid.info()), 4.0 * SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn test_corner_cutting() {
        let grid = grid_from_rows(&[".#", ".."]);
        let mut config = PlannerConfig::eight_connected();
        let start = Cell::new(0, 0);
        let goal = Cell::new(1, 1);

        let path = shortest_path(&grid, start, goal, &config).unwrap().unwrap();
        assert_eq!(path.cells, vec![start, Cell::new(0, 1), goal]);
        assert_relative_eq!(path.cost, 2.0);

        config.cost_policy.allow_corner_cutting = true;
        let path = shortest_path(&grid, start, goal, &config).unwrap().unwrap();
        assert_eq!(path.cells, vec![start, goal]);
        assert_relative_eq!(path.cost, SQRT_2);
    }

    #[test]
    fn test_unknown_cell_policy() {
        let grid = grid_from_rows(&["...", "???", "..."]);
        let mut config = PlannerConfig::four_connected();
        let start = Cell::new(0, 0);
        let goal = Cell::new(0, 2);

        assert!(shortest_path(&grid, start, goal, &config).unwrap().is_none());

        config.cost_policy.unknown = UnknownCellPolicy::Traversable { penalty: 0.5 };
        let path = shortest_path(&grid, start, goal, &config).unwrap().unwrap();
        assert_eq!(path.cells, vec![start, Cell::new(0, 1), goal]);
        assert_relative_eq!(path.cost, 1.5 + 1.0);
    }

    #[test]
    fn test_proximity_penalty_keeps_clearance() {
        let grid = grid_from_rows(&[
            ".........",
            ".........",
            "....#....",
            ".........",
            ".........",
        ]);
        let obstacle = Cell::new(4, 2);
        let clearance_sq = |c: &Cell| (c.x - obstacle.x).pow(2) + (c.y - obstacle.y).pow(2);
        let start = Cell::new(0, 2);
        let goal = Cell::new(8, 2);

        let mut config = PlannerConfig::four_connected();
        let plain = shortest_path(&grid, start, goal, &config).unwrap().unwrap();
        assert_eq!(plain.len(), 11);
        assert!(plain.cells.iter().any(|c| clearance_sq(c) < 4));

        config.cost_policy.proximity = Some(ProximityPenalty {
            radius: 2.5,
            weight: 10.0,
        });
        let careful = shortest_path(&grid, start, goal, &config).unwrap().unwrap();
        assert!(careful.cells.iter().all(|c| clearance_sq(c) >= 4));
        assert!(careful.cost > plain.cost);
    }

    #[test]
    fn test_octile_optimal_with_cheap_diagonals() {
        let mut rng = StdRng::seed_from_u64(23);
        for _ in 0..300 {
            let info = GridMetadata::new(1.0, 12, 12, Pose::identity()).unwrap();
            let cells = (0..144)
                .map(|_| {
                    if rng.random_bool(0.3) {
                        Occupancy::Occupied
                    } else {
                        Occupancy::Free
                    }
                })
                .collect();
            let mut grid = OccupancyGrid::from_cells(info, cells).unwrap();
            let start = Cell::new(rng.random_range(0..12), rng.random_range(0..12));
            let goal = Cell::new(rng.random_range(0..12), rng.random_range(0..12));
            grid.set(start, Occupancy::Free).unwrap();
            grid.set(goal, Occupancy::Free).unwrap();

            let mut dijkstra = PlannerConfig {
                heuristic: Heuristic::Dijkstra,
                ..PlannerConfig::eight_connected()
            };
            dijkstra.cost_policy.diagonal_cost = 0.5;
            let octile = PlannerConfig {
                heuristic: Heuristic::Octile,
                ..dijkstra
            };

            let reference = shortest_path(&grid, start, goal, &dijkstra).unwrap();
            let path = shortest_path(&grid, start, goal, &octile).unwrap();
            assert_eq!(reference.is_some(), path.is_some());
            if let (Some(r), Some(p)) = (reference, path) {
                assert_relative_eq!(r.cost, p.cost, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_heuristics_agree_on_cost() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..30 {
            let info = GridMetadata::new(1.0, 20, 20, Pose::identity()).unwrap();
            let cells = (0..400)
                .map(|_| {
                    if rng.random_bool(0.25) {
                        Occupancy::Occupied
                    } else {
                        Occupancy::Free
                    }
                })
                .collect();
            let mut grid = OccupancyGrid::from_cells(info, cells).unwrap();
            let start = Cell::new(0, 0);
            let goal = Cell::new(19, 19);
            grid.set(start, Occupancy::Free).unwrap();
            grid.set(goal, Occupancy::Free).unwrap();

            for connectivity in [Connectivity::Four, Connectivity::Eight] {
                for diagonal_cost in [0.5, 1.0, SQRT_2, 1.9, 3.0] {
                    let mut base = PlannerConfig {
                        connectivity,
                        heuristic: Heuristic::Dijkstra,
                        ..PlannerConfig::default()
                    };
                    base.cost_policy.diagonal_cost = diagonal_cost;
                    let reference = shortest_path(&grid, start, goal, &base).unwrap();

                    for heuristic in [Heuristic::Euclidean, Heuristic::Octile] {
                        let config = PlannerConfig { heuristic, ..base };
                        let path = shortest_path(&grid, start, goal, &config).unwrap();
                        match (&reference, &path) {
                            (None, None) => {}
                            (Some(r), Some(p)) => {
                                assert_relative_eq!(r.cost, p.cost, epsilon = 1e-9);
                                assert_valid_path(&grid, p, &config);
                            }
                            _ => panic!(
                                "heuristic {:?} disagrees on reachability (diagonal {})",
                                heuristic, diagonal_cost
                            ),
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_heuristic_reduces_expansions() {
        let grid = empty(30, 30);
        let start = Cell::new(0, 0);
        let goal = Cell::new(29, 29);
        let dijkstra = PlannerConfig {
            heuristic: Heuristic::Dijkstra,
            ..PlannerConfig::eight_connected()
        };
        let octile = PlannerConfig::eight_connected();

        let slow = shortest_path_detailed(&grid, start, goal, &dijkstra).unwrap();
        let fast = shortest_path_detailed(&grid, start, goal, &octile).unwrap();
        assert!(fast.nodes_explored < slow.nodes_explored);
        assert_relative_eq!(
            slow.path.unwrap().cost,
            fast.path.unwrap().cost,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_search_limit() {
        let grid = empty(50, 50);
        let config = PlannerConfig {
            max_expansions: Some(10),
            ..PlannerConfig::four_connected()
        };
        assert!(matches!(
            shortest_path(&grid, Cell::new(0, 0), Cell::new(49, 49), &config),
            Err(NavigationError::SearchLimitExceeded { nodes_explored: 10 })
        ));
    }

    #[test]
    fn test_invalid_config() {
        let grid = empty(3, 3);
        let mut config = PlannerConfig::default();
        config.cost_policy.diagonal_cost = 0.0;
        assert!(matches!(
            shortest_path(&grid, Cell::new(0, 0), Cell::new(2, 2), &config),
            Err(NavigationError::InvalidArgument(_))
        ));

        let mut config = PlannerConfig::default();
        config.cost_policy.unknown = UnknownCellPolicy::Traversable { penalty: -1.0 };
        assert!(config.validate().is_err());

        let mut config = PlannerConfig::default();
        config.cost_policy.proximity = Some(ProximityPenalty {
            radius: -1.0,
            weight: 1.0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_world_wrapper() {
        let info = GridMetadata::new(0.5, 10, 10, Pose::from_xy_yaw(-2.5, -2.5, 0.0)).unwrap();
        let grid = OccupancyGrid::new(info);
        let points = shortest_path_world(
            &grid,
            &WorldPoint::new(-2.4, -2.4, 0.0),
            &WorldPoint::new(-1.1, -2.4, 0.0),
            &PlannerConfig::four_connected(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(points.len(), 3);
        assert_relative_eq!(points[0].x, -2.25, epsilon = 1e-12);
        assert_relative_eq!(points[2].x, -1.25, epsilon = 1e-12);

        assert!(matches!(
            shortest_path_world(
                &grid,
                &WorldPoint::new(-3.0, 0.0, 0.0),
                &WorldPoint::new(0.0, 0.0, 0.0),
                &PlannerConfig::default()
            ),
            Err(NavigationError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_single_source_tree() {
        let grid = grid_from_rows(&["....", ".##.", "...."]);
        let config = PlannerConfig::four_connected();
        let tree = single_source_shortest_paths(&grid, Cell::new(0, 0), &config).unwrap();

        assert_eq!(tree.source(), Cell::new(0, 0));
        assert_eq!(tree.reachable_count(), 10);
        assert_eq!(tree.distance(Cell::new(0, 0)), Some(0.0));
        assert_eq!(tree.distance(Cell::new(3, 2)), Some(5.0));
        assert_eq!(tree.distance(Cell::new(1, 1)), None);
        assert_eq!(tree.distance(Cell::new(9, 9)), None);

        let path = tree.path_to(Cell::new(3, 2)).unwrap();
        assert_eq!(path.len(), 6);
        let direct = shortest_path(&grid, Cell::new(0, 0), Cell::new(3, 2), &config)
            .unwrap()
            .unwrap();
        assert_relative_eq!(path.cost, direct.cost);

        let blocked = single_source_shortest_paths(&grid, Cell::new(1, 1), &config).unwrap();
        assert_eq!(blocked.reachable_count(), 0);
    }
}
