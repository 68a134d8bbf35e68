//! Simulation state - the arenas every system reads and writes
//!
//! Entities live in generational slot maps and refer to each other by id.
//! A lookup through a stale id yields `None`; callers treat that as "the
//! referent is gone" and recover locally.

use ahash::AHashSet;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::agent::{Agent, AgentKind, AgentRole};
use crate::city::network::is_connected;
use crate::city::road::Road;
use crate::city::settlement::{PlannedRoad, Settlement};
use crate::city::stockpile::Materials;
use crate::city::structure::{Structure, StructureKind};
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, Cell, RoadId, SettlementId, StructureId, Tick, Vec2};
use crate::simulation::messages::MessageLog;
use crate::spatial::overlay::PlannedRoadOverlay;
use crate::spatial::pathfinding::{PathCosts, PathPlanner};
use crate::spatial::site::{SiteError, SiteLocator, SiteQuery};
use crate::spatial::terrain::TerrainGrid;
use crate::spatial::tile::Tile;

/// A paid-for structure waiting for a builder of its settlement
///
/// The site stays reserved (counts as occupied) until the task is taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildTask {
    pub id: u64,
    pub kind: StructureKind,
    pub settlement: SettlementId,
    pub position: Vec2,
    pub paid: Materials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    pub config: SimulationConfig,
    pub grid: TerrainGrid,
    pub overlay: PlannedRoadOverlay,
    pub settlements: SlotMap<SettlementId, Settlement>,
    pub structures: SlotMap<StructureId, Structure>,
    pub roads: SlotMap<RoadId, Road>,
    pub agents: SlotMap<AgentId, Agent>,
    pub build_tasks: Vec<BuildTask>,
    next_task_id: u64,
    pub messages: MessageLog,
    pub(crate) rng: ChaCha8Rng,
    pub tick: Tick,
    /// Simulated seconds since start
    pub elapsed: f32,
}

impl SimulationState {
    pub fn new(config: SimulationConfig, grid: TerrainGrid, seed: u64) -> Self {
        let messages = MessageLog::new(config.message_capacity);
        Self {
            config,
            grid,
            overlay: PlannedRoadOverlay::new(),
            settlements: SlotMap::with_key(),
            structures: SlotMap::with_key(),
            roads: SlotMap::with_key(),
            agents: SlotMap::with_key(),
            build_tasks: Vec::new(),
            next_task_id: 0,
            messages,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            elapsed: 0.0,
        }
    }

    /// Found a settlement at the cell containing `position`
    pub fn add_settlement(&mut self, name: impl Into<String>, position: Vec2) -> SettlementId {
        let position = self.grid.snap(self.grid.clamp_to_buffer(position));
        let cell = self.grid.world_to_cell(position);
        self.grid.set_tile(cell, Tile::Settlement);
        let base_capacity = self.config.base_capacity;
        let name = name.into();
        tracing::info!("Settlement {} founded at ({:.0}, {:.0})", name, position.x, position.y);
        self.settlements
            .insert_with_key(|id| Settlement::new(id, name, position, base_capacity))
    }

    pub fn spawn_agent(
        &mut self,
        settlement: SettlementId,
        role: AgentRole,
        position: Vec2,
    ) -> AgentId {
        tracing::debug!("Spawning {:?} at ({:.0}, {:.0})", role.kind(), position.x, position.y);
        self.agents
            .insert_with_key(|id| Agent::new(id, position, settlement, role))
    }

    /// Place a completed structure. Markets get their trader on the next
    /// structure pass.
    pub fn spawn_structure(
        &mut self,
        kind: StructureKind,
        position: Vec2,
        settlement: SettlementId,
    ) -> StructureId {
        let config = &self.config;
        self.structures
            .insert_with_key(|id| Structure::new(id, kind, position, settlement, config))
    }

    /// Insert a road along a fixed tile path; cells not yet road are marked
    /// on the planned-road overlay
    pub fn add_road(
        &mut self,
        owner: Option<SettlementId>,
        partner: Option<SettlementId>,
        start: Vec2,
        end: Vec2,
        tiles: Vec<Cell>,
    ) -> RoadId {
        for cell in &tiles {
            if self.grid.tile_at(*cell) != Some(Tile::Road) {
                self.overlay.mark(*cell);
            }
        }
        self.roads
            .insert_with_key(|id| Road::new(id, start, end, owner, partner, tiles))
    }

    /// Ask a settlement's builders for a structure
    pub fn enqueue_build(&mut self, settlement: SettlementId, kind: StructureKind) -> bool {
        match self.settlements.get_mut(settlement) {
            Some(s) => {
                s.build_queue.enqueue(kind);
                true
            }
            None => false,
        }
    }

    /// Drop every queued entry for a settlement
    pub fn cancel_builds(&mut self, settlement: SettlementId) -> usize {
        self.settlements
            .get_mut(settlement)
            .map(|s| {
                let n = s.build_queue.len();
                s.build_queue.clear();
                n
            })
            .unwrap_or(0)
    }

    /// Create a global build task: pick a site, pay up front and reserve it
    ///
    /// `Ok(None)` when the settlement cannot afford the structure.
    pub fn create_build_task(
        &mut self,
        settlement: SettlementId,
        kind: StructureKind,
    ) -> Result<Option<u64>> {
        let Some(origin) = self.settlements.get(settlement).map(|s| s.position) else {
            return Err(SimError::EntityNotFound(format!("settlement {:?}", settlement)));
        };
        let cost = kind.cost();
        if !self.settlements[settlement].stockpile.has_materials(&cost) {
            return Ok(None);
        }
        let position = self.find_site(origin, kind, None)?;
        if !self.settlements[settlement].stockpile.consume_materials(&cost) {
            return Ok(None);
        }
        let id = self.next_task_id;
        self.next_task_id += 1;
        tracing::debug!(
            "Build task {} for {} at ({:.0}, {:.0})",
            id,
            kind.name(),
            position.x,
            position.y
        );
        self.build_tasks.push(BuildTask {
            id,
            kind,
            settlement,
            position,
            paid: cost,
        });
        Ok(Some(id))
    }

    /// Hand a player-planned road to the settlement nearest its start
    pub fn plan_road(&mut self, from: Vec2, to: Vec2) -> Option<SettlementId> {
        let owner = self.nearest_settlement(from)?;
        self.settlements[owner]
            .planned_roads
            .push(PlannedRoad { from, to });
        Some(owner)
    }

    pub fn nearest_settlement(&self, pos: Vec2) -> Option<SettlementId> {
        self.settlements
            .values()
            .min_by(|a, b| {
                a.position
                    .distance_squared(&pos)
                    .total_cmp(&b.position.distance_squared(&pos))
            })
            .map(|s| s.id)
    }

    /// Cells occupied by completed structures
    pub fn structure_cells(&self) -> AHashSet<Cell> {
        self.structures
            .values()
            .map(|s| self.grid.world_to_cell(s.position))
            .collect()
    }

    /// Positions a new structure must keep its distance from: structures,
    /// settlements, in-progress builds and reserved task sites
    pub fn occupied_sites(&self, exclude: Option<AgentId>) -> Vec<Vec2> {
        let mut occupied: Vec<Vec2> = self.structures.values().map(|s| s.position).collect();
        occupied.extend(self.settlements.values().map(|s| s.position));
        occupied.extend(
            self.agents
                .values()
                .filter(|a| Some(a.id) != exclude)
                .filter_map(|a| a.reserved_site()),
        );
        occupied.extend(self.build_tasks.iter().map(|t| t.position));
        occupied
    }

    /// Search for a site for `kind` around `origin`
    pub fn find_site(
        &self,
        origin: Vec2,
        kind: StructureKind,
        exclude: Option<AgentId>,
    ) -> std::result::Result<Vec2, SiteError> {
        let occupied = self.occupied_sites(exclude);
        let locator = SiteLocator::new(&self.grid, &occupied, &self.config);
        locator.find_site(&SiteQuery::new(origin, kind.requirement(&self.config), &self.config))
    }

    pub fn path_planner<'a>(&'a self, blocked: &'a AHashSet<Cell>) -> PathPlanner<'a> {
        PathPlanner::new(&self.grid, PathCosts::from_config(&self.config)).with_blocked(blocked)
    }

    /// Whether roads link `a` and `b`
    pub fn roads_connect(&self, a: Vec2, b: Vec2, usable_only: bool) -> bool {
        is_connected(&self.roads, a, b, self.config.connection_radius, usable_only)
    }

    /// Reserve a worker slot, releasing the worker from any other structure
    pub fn assign_worker(&mut self, structure: StructureId, agent: AgentId) -> bool {
        if !self.structures.contains_key(structure) {
            return false;
        }
        for (id, s) in self.structures.iter_mut() {
            if id != structure {
                s.release(agent);
            }
        }
        let target = &mut self.structures[structure];
        target.try_assign(agent) || target.has_worker(agent)
    }

    pub fn release_worker(&mut self, agent: AgentId) {
        for s in self.structures.values_mut() {
            s.release(agent);
        }
    }

    pub fn count_agents(&self, settlement: SettlementId, kind: AgentKind) -> u32 {
        self.agents
            .values()
            .filter(|a| a.settlement == settlement && a.kind() == kind)
            .count() as u32
    }

    /// Structure kinds already on their way for a settlement: queued global
    /// tasks plus builds in progress
    pub fn pending_builds(&self, settlement: SettlementId, kind: StructureKind) -> usize {
        let tasks = self
            .build_tasks
            .iter()
            .filter(|t| t.settlement == settlement && t.kind == kind)
            .count();
        let building = self
            .agents
            .values()
            .filter(|a| a.settlement == settlement && a.building_kind() == Some(kind))
            .count();
        tasks + building
    }

    pub fn message(&mut self, text: impl Into<String>) {
        self.messages.show(self.tick, text);
    }

    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::stockpile::ResourceType;

    fn state() -> SimulationState {
        let config = SimulationConfig::default();
        let grid = TerrainGrid::new(40, 40, config.cell_size, config.edge_buffer, Tile::Grass);
        SimulationState::new(config, grid, 7)
    }

    #[test]
    fn test_settlement_marks_tile() {
        let mut s = state();
        let id = s.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        let pos = s.settlements[id].position;
        assert_eq!(s.grid.tile_at_world(pos), Some(Tile::Settlement));
    }

    #[test]
    fn test_build_task_pays_up_front_and_reserves_site() {
        let mut s = state();
        let id = s.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        s.settlements[id].stockpile.add(ResourceType::Wood, 100);
        s.settlements[id].stockpile.add(ResourceType::Stone, 10);

        let task = s.create_build_task(id, StructureKind::House).unwrap();
        assert!(task.is_some());
        assert_eq!(s.settlements[id].stockpile.get(ResourceType::Wood), 80);
        assert_eq!(s.settlements[id].stockpile.get(ResourceType::Stone), 5);

        let site = s.build_tasks[0].position;
        assert!(s.occupied_sites(None).contains(&site));
    }

    #[test]
    fn test_unaffordable_task_is_not_created() {
        let mut s = state();
        let id = s.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        assert_eq!(s.create_build_task(id, StructureKind::Market).unwrap(), None);
        assert!(s.build_tasks.is_empty());
    }

    #[test]
    fn test_impossible_site_refunds_nothing_and_errors() {
        let mut s = state();
        let id = s.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        s.settlements[id].stockpile.add(ResourceType::Wood, 100);
        let result = s.create_build_task(id, StructureKind::Fishery);
        assert!(result.is_err());
        assert_eq!(s.settlements[id].stockpile.get(ResourceType::Wood), 100);
    }

    #[test]
    fn test_worker_held_by_one_structure() {
        let mut s = state();
        let home = s.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        let farm = s.spawn_structure(StructureKind::Farm, Vec2::new(300.0, 300.0), home);
        let mill = s.spawn_structure(StructureKind::LumberMill, Vec2::new(500.0, 300.0), home);
        let worker = s.spawn_agent(home, AgentRole::worker(), Vec2::new(400.0, 400.0));

        assert!(s.assign_worker(farm, worker));
        assert!(s.assign_worker(mill, worker));
        assert!(!s.structures[farm].has_worker(worker));
        assert!(s.structures[mill].has_worker(worker));
    }

    #[test]
    fn test_plan_road_goes_to_nearest_settlement() {
        let mut s = state();
        let a = s.add_settlement("Ashford", Vec2::new(100.0, 100.0));
        let _b = s.add_settlement("Brook", Vec2::new(700.0, 700.0));
        assert_eq!(s.plan_road(Vec2::new(120.0, 100.0), Vec2::new(400.0, 100.0)), Some(a));
        assert_eq!(s.settlements[a].planned_roads.len(), 1);
    }
}
