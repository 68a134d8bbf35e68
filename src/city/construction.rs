//! Construction system - structure build progress and road laying
//!
//! Road work is measured in world units: a grass cell costs one cell size of
//! work, a forest cell costs `road_forest_time_factor` times that, and a cell
//! that is already road costs nothing. Work carries over between steps, so
//! total progress depends only on elapsed time, not on step granularity.

use crate::city::road::Road;
use crate::city::structure::StructureKind;
use crate::core::config::SimulationConfig;
use crate::core::types::Cell;
use crate::spatial::terrain::TerrainGrid;
use crate::spatial::tile::Tile;

/// Result of a builder's contribution to a structure
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContributionResult {
    /// Work contributed, structure still under construction
    InProgress { progress: f32 },
    /// Work contributed, structure is now complete
    Completed,
}

/// Advance a build by `dt` seconds; progress is a fraction in [0, 1]
pub fn apply_build_work(progress: &mut f32, kind: StructureKind, dt: f32) -> ContributionResult {
    let build_time = kind.build_time().max(f32::EPSILON);
    *progress = (*progress + dt / build_time).min(1.0);
    if *progress >= 1.0 {
        ContributionResult::Completed
    } else {
        ContributionResult::InProgress {
            progress: *progress,
        }
    }
}

/// Units of work needed to lay road on a cell
pub fn road_cell_work(tile: Tile, config: &SimulationConfig) -> f32 {
    match tile {
        Tile::Road => 0.0,
        Tile::Forest => config.cell_size * config.road_forest_time_factor,
        _ => config.cell_size,
    }
}

/// Wood consumed to lay road on a cell
pub fn road_cell_wood(tile: Tile, config: &SimulationConfig) -> u32 {
    match tile {
        Tile::Road => 0,
        _ => config.road_wood_per_cell(),
    }
}

/// One cell a builder can realize this step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadCellStep {
    pub cell: Cell,
    pub wood_cost: u32,
    /// Wood gained from clearing forest on this cell
    pub forest_bonus: Option<u32>,
}

/// Cells realized this step and the work carried into the next
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoadWorkPlan {
    pub steps: Vec<RoadCellStep>,
    pub leftover: f32,
    /// Stopped early for lack of wood
    pub starved: bool,
}

impl RoadWorkPlan {
    pub fn finishes(&self, road: &Road) -> bool {
        road.cells_built() + self.steps.len() >= road.len()
    }
}

/// Plan how far `budget` units of work (and `wood` in stock) take a road
pub fn plan_road_work(
    road: &Road,
    grid: &TerrainGrid,
    budget: f32,
    mut wood: u32,
    config: &SimulationConfig,
) -> RoadWorkPlan {
    let mut plan = RoadWorkPlan {
        leftover: budget,
        ..RoadWorkPlan::default()
    };

    for cell in road.tiles().iter().skip(road.cells_built()) {
        let tile = grid.tile_at(*cell).unwrap_or(Tile::Grass);
        let work = road_cell_work(tile, config);
        if plan.leftover < work {
            return plan;
        }
        let wood_cost = road_cell_wood(tile, config);
        if wood < wood_cost {
            plan.starved = true;
            // Do not bank more than one cell of work while waiting for wood
            plan.leftover = plan.leftover.min(work);
            return plan;
        }
        wood -= wood_cost;
        let forest_bonus = (tile == Tile::Forest).then_some(config.road_forest_bonus);
        if let Some(bonus) = forest_bonus {
            wood += bonus;
        }
        plan.leftover -= work;
        plan.steps.push(RoadCellStep {
            cell: *cell,
            wood_cost,
            forest_bonus,
        });
    }

    // Road complete: nothing to carry over
    plan.leftover = 0.0;
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RoadId;
    use slotmap::SlotMap;

    fn straight_road(grid: &TerrainGrid, cells: i32) -> Road {
        let mut ids: SlotMap<RoadId, ()> = SlotMap::with_key();
        let tiles: Vec<Cell> = (0..cells).map(|c| Cell::new(c, 0)).collect();
        Road::new(
            ids.insert(()),
            grid.cell_to_world(tiles[0]),
            grid.cell_to_world(*tiles.last().unwrap()),
            None,
            None,
            tiles,
        )
    }

    #[test]
    fn test_build_work_completes_after_build_time() {
        let mut progress = 0.0;
        let kind = StructureKind::House;
        let quarter = kind.build_time() / 4.0;
        for _ in 0..3 {
            assert!(matches!(
                apply_build_work(&mut progress, kind, quarter),
                ContributionResult::InProgress { .. }
            ));
        }
        assert_eq!(apply_build_work(&mut progress, kind, quarter), ContributionResult::Completed);
        assert_eq!(progress, 1.0);
    }

    #[test]
    fn test_cell_work_by_tile() {
        let config = SimulationConfig::default();
        assert_eq!(road_cell_work(Tile::Grass, &config), 20.0);
        assert_eq!(road_cell_work(Tile::Forest, &config), 40.0);
        assert_eq!(road_cell_work(Tile::Road, &config), 0.0);
        assert_eq!(road_cell_wood(Tile::Road, &config), 0);
    }

    #[test]
    fn test_plan_respects_budget() {
        let config = SimulationConfig::default();
        let grid = TerrainGrid::new(10, 1, 20.0, 0.0, Tile::Grass);
        let road = straight_road(&grid, 10);
        let plan = plan_road_work(&road, &grid, 50.0, 100, &config);
        assert_eq!(plan.steps.len(), 2);
        assert!((plan.leftover - 10.0).abs() < 0.001);
        assert!(!plan.starved);
    }

    #[test]
    fn test_plan_stops_without_wood() {
        let config = SimulationConfig::default();
        let grid = TerrainGrid::new(10, 1, 20.0, 0.0, Tile::Grass);
        let road = straight_road(&grid, 10);
        let plan = plan_road_work(&road, &grid, 200.0, 3, &config);
        assert_eq!(plan.steps.len(), 3);
        assert!(plan.starved);
        assert!(plan.leftover <= 20.0);
    }

    #[test]
    fn test_forest_bonus_funds_following_cells() {
        let config = SimulationConfig::default();
        let mut grid = TerrainGrid::new(4, 1, 20.0, 0.0, Tile::Grass);
        grid.set_tile(Cell::new(0, 0), Tile::Forest);
        let road = straight_road(&grid, 4);
        let plan = plan_road_work(&road, &grid, 1000.0, 1, &config);
        assert_eq!(plan.steps.len(), 4);
        assert_eq!(plan.steps[0].forest_bonus, Some(config.road_forest_bonus));
        assert!(plan.steps[1..].iter().all(|s| s.forest_bonus.is_none()));
        assert!(plan.finishes(&road));
        assert_eq!(plan.leftover, 0.0);
    }

    #[test]
    fn test_granularity_independent() {
        let config = SimulationConfig::default();
        let grid = TerrainGrid::new(10, 1, 20.0, 0.0, Tile::Grass);
        let road = straight_road(&grid, 10);

        let coarse = plan_road_work(&road, &grid, 120.0, 100, &config);

        let mut fine_road = road.clone();
        let mut leftover = 0.0;
        for _ in 0..12 {
            let plan = plan_road_work(&fine_road, &grid, leftover + 10.0, 100, &config);
            for _ in &plan.steps {
                fine_road.advance();
            }
            leftover = plan.leftover;
        }
        assert_eq!(coarse.steps.len(), fine_road.cells_built());
    }
}
