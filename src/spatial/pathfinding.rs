//! A* pathfinding over the terrain grid
//!
//! 8-directional movement with per-tile cost multipliers. Water and mountain
//! cells are never expanded. Impassable endpoints are first resolved to the
//! nearest passable cell. Paths come back as cell-center waypoints.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::core::config::SimulationConfig;
use crate::core::types::{Cell, Vec2};
use crate::spatial::terrain::{ring, TerrainGrid};
use crate::spatial::tile::Tile;

/// Why no path could be produced
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    #[error("no passable cell near start {0:?}")]
    StartUnreachable(Cell),

    #[error("no passable cell near goal {0:?}")]
    GoalUnreachable(Cell),

    #[error("no route from {from:?} to {to:?}")]
    NoRoute { from: Cell, to: Cell },

    #[error("search budget exhausted after {0} nodes")]
    SearchLimit(usize),
}

/// Per-call search options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathOptions {
    /// Walk through cells occupied by structures
    pub ignore_structures: bool,
    /// Strongly favor constructed roads (long-distance travel)
    pub prefer_roads: bool,
}

impl PathOptions {
    pub fn through_structures() -> Self {
        Self {
            ignore_structures: true,
            prefer_roads: false,
        }
    }

    pub fn long_distance() -> Self {
        Self {
            ignore_structures: false,
            prefer_roads: true,
        }
    }
}

/// Terrain cost table and search bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathCosts {
    pub forest: f32,
    pub road: f32,
    pub preferred_road: f32,
    pub endpoint_search_radius: i32,
    pub max_nodes: usize,
}

impl Default for PathCosts {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

impl PathCosts {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            forest: config.forest_cost,
            road: config.road_cost,
            preferred_road: config.preferred_road_cost,
            endpoint_search_radius: config.endpoint_search_radius,
            max_nodes: config.max_path_nodes,
        }
    }

    /// Multiplier for entering a tile
    pub fn terrain_factor(&self, tile: Tile, prefer_roads: bool) -> f32 {
        match tile {
            Tile::Forest => self.forest,
            Tile::Road if prefer_roads => self.preferred_road,
            Tile::Road => self.road,
            _ => 1.0,
        }
    }
}

/// Node in the A* open set
#[derive(Debug, Clone, Copy)]
struct PathNode {
    cell: Cell,
    f_cost: OrderedFloat<f32>,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; cell order keeps ties deterministic
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* planner bound to one grid and an optional set of structure cells
pub struct PathPlanner<'a> {
    grid: &'a TerrainGrid,
    blocked: Option<&'a AHashSet<Cell>>,
    costs: PathCosts,
}

impl<'a> PathPlanner<'a> {
    pub fn new(grid: &'a TerrainGrid, costs: PathCosts) -> Self {
        Self {
            grid,
            blocked: None,
            costs,
        }
    }

    /// Treat these cells (structure footprints) as obstacles unless a
    /// call sets `ignore_structures`
    pub fn with_blocked(mut self, blocked: &'a AHashSet<Cell>) -> Self {
        self.blocked = Some(blocked);
        self
    }

    /// Find a path between two world positions
    ///
    /// Returns cell-center waypoints, first at the (resolved) start cell and
    /// last at the (resolved) goal cell.
    pub fn find_path(
        &self,
        start: Vec2,
        end: Vec2,
        options: PathOptions,
    ) -> Result<Vec<Vec2>, PathError> {
        let start_cell = self.grid.world_to_cell(start);
        let end_cell = self.grid.world_to_cell(end);
        let cells = self.find_cell_path(start_cell, end_cell, options)?;
        Ok(cells_to_waypoints(self.grid, &cells))
    }

    /// Find a path between two cells, resolving impassable endpoints
    pub fn find_cell_path(
        &self,
        start: Cell,
        goal: Cell,
        options: PathOptions,
    ) -> Result<Vec<Cell>, PathError> {
        let start = self
            .resolve_endpoint(start)
            .ok_or(PathError::StartUnreachable(start))?;
        let goal = self
            .resolve_endpoint(goal)
            .ok_or(PathError::GoalUnreachable(goal))?;

        if start == goal {
            return Ok(vec![start]);
        }

        self.astar(start, goal, options)
    }

    /// Nearest passable in-bounds cell to `cell`, searching outward ring by ring
    pub fn resolve_endpoint(&self, cell: Cell) -> Option<Cell> {
        if self.grid.is_passable(cell) {
            return Some(cell);
        }
        for r in 1..=self.costs.endpoint_search_radius {
            let found = ring(cell, r)
                .filter(|c| self.grid.is_passable(*c))
                .min_by_key(|c| {
                    let dc = c.col - cell.col;
                    let dr = c.row - cell.row;
                    (dc * dc + dr * dr, *c)
                });
            if found.is_some() {
                return found;
            }
        }
        None
    }

    fn is_open(&self, cell: Cell, start: Cell, goal: Cell, options: PathOptions) -> bool {
        if !self.grid.is_passable(cell) {
            return false;
        }
        if options.ignore_structures || cell == start || cell == goal {
            return true;
        }
        !self.blocked.is_some_and(|b| b.contains(&cell))
    }

    fn astar(&self, start: Cell, goal: Cell, options: PathOptions) -> Result<Vec<Cell>, PathError> {
        let mut open_set = BinaryHeap::new();
        let mut came_from: AHashMap<Cell, Cell> = AHashMap::new();
        let mut g_scores: AHashMap<Cell, f32> = AHashMap::new();
        let mut closed: AHashSet<Cell> = AHashSet::new();
        let mut expanded = 0usize;

        g_scores.insert(start, 0.0);
        open_set.push(PathNode {
            cell: start,
            f_cost: OrderedFloat(heuristic(start, goal)),
        });

        while let Some(current) = open_set.pop() {
            if current.cell == goal {
                return Ok(reconstruct_path(&came_from, current.cell));
            }
            if !closed.insert(current.cell) {
                continue;
            }

            expanded += 1;
            if expanded > self.costs.max_nodes {
                return Err(PathError::SearchLimit(expanded));
            }

            let current_g = g_scores.get(&current.cell).copied().unwrap_or(f32::INFINITY);

            for neighbor in current.cell.neighbors() {
                if closed.contains(&neighbor) || !self.is_open(neighbor, start, goal, options) {
                    continue;
                }

                let diagonal = neighbor.is_diagonal_to(&current.cell);
                if diagonal {
                    // No corner cutting past an impassable orthogonal cell
                    let side_a = Cell::new(neighbor.col, current.cell.row);
                    let side_b = Cell::new(current.cell.col, neighbor.row);
                    if !self.grid.is_passable(side_a) || !self.grid.is_passable(side_b) {
                        continue;
                    }
                }

                let Some(tile) = self.grid.tile_at(neighbor) else {
                    continue;
                };
                let base = if diagonal { std::f32::consts::SQRT_2 } else { 1.0 };
                let step = base * self.costs.terrain_factor(tile, options.prefer_roads);

                let tentative_g = current_g + step;
                let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(f32::INFINITY);

                if tentative_g < neighbor_g {
                    came_from.insert(neighbor, current.cell);
                    g_scores.insert(neighbor, tentative_g);
                    open_set.push(PathNode {
                        cell: neighbor,
                        f_cost: OrderedFloat(tentative_g + heuristic(neighbor, goal)),
                    });
                }
            }
        }

        Err(PathError::NoRoute {
            from: start,
            to: goal,
        })
    }
}

/// Manhattan distance in cell units
fn heuristic(cell: Cell, goal: Cell) -> f32 {
    cell.manhattan(&goal) as f32
}

/// Reconstruct path from came_from map
fn reconstruct_path(came_from: &AHashMap<Cell, Cell>, mut current: Cell) -> Vec<Cell> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Cell centers for each cell of a path
pub fn cells_to_waypoints(grid: &TerrainGrid, cells: &[Cell]) -> Vec<Vec2> {
    cells.iter().map(|c| grid.cell_to_world(*c)).collect()
}

/// Cells under each waypoint of a path
pub fn waypoints_to_cells(grid: &TerrainGrid, waypoints: &[Vec2]) -> Vec<Cell> {
    waypoints.iter().map(|p| grid.world_to_cell(*p)).collect()
}

/// Calculate path cost (sum of step costs after the first cell)
pub fn path_cost(grid: &TerrainGrid, path: &[Cell], costs: &PathCosts, prefer_roads: bool) -> f32 {
    path.windows(2)
        .filter_map(|w| {
            let tile = grid.tile_at(w[1])?;
            let base = if w[0].is_diagonal_to(&w[1]) {
                std::f32::consts::SQRT_2
            } else {
                1.0
            };
            Some(base * costs.terrain_factor(tile, prefer_roads))
        })
        .sum()
}
