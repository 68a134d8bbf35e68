//! Read-only views for presentation
//!
//! Views are plain data detached from the arenas; a renderer can hold them
//! across steps without borrowing the simulation.

use serde::Serialize;

use crate::agent::{AgentKind, AgentStateTag};
use crate::city::settlement::HousingUrgency;
use crate::city::stockpile::ResourceType;
use crate::city::structure::StructureKind;
use crate::core::types::{AgentId, Cell, RoadId, SettlementId, StructureId, Vec2};
use crate::simulation::state::SimulationState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentView {
    pub id: AgentId,
    pub kind: AgentKind,
    pub settlement: SettlementId,
    pub position: Vec2,
    pub state: AgentStateTag,
    /// Remaining waypoints of the current path
    pub path: Vec<Vec2>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureView {
    pub id: StructureId,
    pub kind: StructureKind,
    pub settlement: SettlementId,
    pub position: Vec2,
    pub workers: usize,
    pub worker_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadView {
    pub id: RoadId,
    pub built: Vec<Cell>,
    pub planned: Vec<Cell>,
    pub completion: f32,
    pub claimed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementView {
    pub id: SettlementId,
    pub name: String,
    pub position: Vec2,
    pub population: u32,
    pub capacity: u32,
    pub traders: u32,
    pub housing: HousingUrgency,
    pub resources: Vec<(ResourceType, u32)>,
    pub queued_builds: usize,
    pub road_needs: usize,
}

pub fn agent_views(state: &SimulationState) -> Vec<AgentView> {
    state
        .agents
        .values()
        .map(|a| AgentView {
            id: a.id,
            kind: a.kind(),
            settlement: a.settlement,
            position: a.position,
            state: a.state_tag(),
            path: a.path().map(|p| p.remaining().to_vec()).unwrap_or_default(),
        })
        .collect()
}

pub fn structure_views(state: &SimulationState) -> Vec<StructureView> {
    state
        .structures
        .values()
        .map(|s| StructureView {
            id: s.id,
            kind: s.kind,
            settlement: s.settlement,
            position: s.position,
            workers: s.workers().len(),
            worker_capacity: s.worker_capacity,
        })
        .collect()
}

pub fn road_views(state: &SimulationState) -> Vec<RoadView> {
    state
        .roads
        .values()
        .map(|r| RoadView {
            id: r.id,
            built: r.built_cells().to_vec(),
            planned: r.tiles()[r.cells_built()..].to_vec(),
            completion: r.completion(),
            claimed: r.is_claimed(),
        })
        .collect()
}

pub fn settlement_view(state: &SimulationState, id: SettlementId) -> Option<SettlementView> {
    let s = state.settlements.get(id)?;
    Some(SettlementView {
        id: s.id,
        name: s.name.clone(),
        position: s.position,
        population: s.population(),
        capacity: s.capacity,
        traders: s.traders,
        housing: s.needs.housing,
        resources: ResourceType::ALL
            .iter()
            .map(|r| (*r, s.stockpile.get(*r)))
            .collect(),
        queued_builds: s.build_queue.len(),
        road_needs: s.needs.roads.len(),
    })
}

pub fn settlement_views(state: &SimulationState) -> Vec<SettlementView> {
    state
        .settlements
        .keys()
        .filter_map(|id| settlement_view(state, id))
        .collect()
}
