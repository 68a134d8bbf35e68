//! Worker state machine
//!
//! Workers take a free slot at a producing structure of their settlement,
//! extract a load, haul it home and go back. A road linking the workplace to
//! the settlement lets them carry more per trip.

use serde::{Deserialize, Serialize};

use crate::agent::movement::{self, MoveOutcome};
use crate::agent::{Agent, AgentRole, Command, Target, WorkerData};
use crate::city::structure::{Structure, StructureKind};
use crate::simulation::state::SimulationState;
use crate::spatial::pathfinding::PathOptions;
use crate::spatial::tile::Tile;

/// Candidate workplaces tried per step before giving up
const MAX_WORKPLACE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Idle,
    Moving,
    Working,
    Transporting,
    Wandering,
}

pub fn step(state: &SimulationState, agent: &mut Agent, dt: f32) -> Vec<Command> {
    let mut commands = Vec::new();
    let mut data = match &agent.role {
        AgentRole::Worker(w) => w.clone(),
        _ => return commands,
    };

    match data.state {
        WorkerState::Idle => idle(state, agent, &mut data, dt, &mut commands),
        WorkerState::Moving => moving(state, agent, &mut data, dt, &mut commands),
        WorkerState::Working => working(state, agent, &mut data, dt, &mut commands),
        WorkerState::Transporting => transporting(state, agent, &mut data, dt, &mut commands),
        WorkerState::Wandering => wandering(state, agent, &mut data, dt),
    }

    agent.role = AgentRole::Worker(data);
    commands
}

/// The worker's structure, if it still exists and still lists the worker
fn workplace<'a>(state: &'a SimulationState, agent: &Agent, data: &WorkerData) -> Option<&'a Structure> {
    state
        .structures
        .get(data.workplace?)
        .filter(|s| s.has_worker(agent.id))
}

/// Drop everything, handing back any held slot right away
fn go_idle(agent: &mut Agent, data: &mut WorkerData, commands: &mut Vec<Command>) {
    if data.workplace.take().is_some() {
        commands.push(Command::ReleaseWorker { agent: agent.id });
    }
    data.state = WorkerState::Idle;
    data.carrying = None;
    data.timer = 0.0;
    agent.clear_target();
}

fn idle(
    state: &SimulationState,
    agent: &mut Agent,
    data: &mut WorkerData,
    dt: f32,
    commands: &mut Vec<Command>,
) {
    agent.idle_time += dt;

    // Still holding a slot (e.g. after an interrupted trip): go back to it
    if let Some(place) = workplace(state, agent, data) {
        agent.set_target(Target::Structure(place.id), place.position);
        data.state = WorkerState::Moving;
        agent.idle_time = 0.0;
        return;
    }

    let mut candidates: Vec<&Structure> = state
        .structures
        .values()
        .filter(|s| s.settlement == agent.settlement)
        .filter(|s| s.kind.produces().is_some() && s.has_free_slot())
        .collect();
    candidates.sort_by(|a, b| {
        a.position
            .distance_squared(&agent.position)
            .total_cmp(&b.position.distance_squared(&agent.position))
    });

    for place in candidates.into_iter().take(MAX_WORKPLACE_ATTEMPTS) {
        let path = movement::plan_waypoints(state, agent.position, place.position, PathOptions::default());
        if let Ok(path) = path {
            commands.push(Command::AssignWorker {
                structure: place.id,
                agent: agent.id,
            });
            data.workplace = Some(place.id);
            data.state = WorkerState::Moving;
            agent.set_target(Target::Structure(place.id), place.position);
            agent.receive_path(path);
            agent.idle_time = 0.0;
            return;
        }
    }

    if agent.idle_time >= state.config.wander_cooldown {
        agent.idle_time = 0.0;
        if let Some(spot) = movement::wander_target(state, agent) {
            agent.set_target(Target::Position(spot), spot);
            data.state = WorkerState::Wandering;
        }
    }
}

fn moving(
    state: &SimulationState,
    agent: &mut Agent,
    data: &mut WorkerData,
    dt: f32,
    commands: &mut Vec<Command>,
) {
    let Some(place) = workplace(state, agent, data) else {
        go_idle(agent, data, commands);
        return;
    };
    agent.set_target(Target::Structure(place.id), place.position);
    match movement::move_toward_target(state, agent, PathOptions::default(), state.config.agent_speed, dt) {
        Ok((MoveOutcome::Arrived, _)) => {
            data.state = WorkerState::Working;
            data.timer = 0.0;
        }
        Ok((MoveOutcome::Moving, _)) => {}
        Err(e) => {
            tracing::debug!("Worker {:?} cannot reach workplace: {}", agent.id, e);
            go_idle(agent, data, commands);
        }
    }
}

fn working(
    state: &SimulationState,
    agent: &mut Agent,
    data: &mut WorkerData,
    dt: f32,
    commands: &mut Vec<Command>,
) {
    let Some(place) = workplace(state, agent, data) else {
        go_idle(agent, data, commands);
        return;
    };
    let Some(resource) = place.kind.produces() else {
        go_idle(agent, data, commands);
        return;
    };
    let Some(home) = state.settlements.get(agent.settlement) else {
        return;
    };

    data.timer += dt;
    if data.timer < place.kind.extraction_time() {
        return;
    }
    data.timer = 0.0;

    let mut amount = state.config.carry_capacity;
    if place.kind == StructureKind::LumberMill {
        let center = state.grid.world_to_cell(place.position);
        let radius = state.config.forest_check_radius + 2;
        match state.grid.nearest_tile(center, radius, Tile::Forest) {
            Some(cell) => {
                commands.push(Command::HarvestForest { cell });
                amount = state.config.wood_per_harvest;
            }
            // No forest left nearby: this cycle yields nothing
            None => return,
        }
    }

    if state.roads_connect(place.position, home.position, true) {
        amount = (amount as f32 * state.config.road_carry_multiplier).floor() as u32;
    }

    data.carrying = Some((resource, amount));
    data.state = WorkerState::Transporting;
    agent.set_target(Target::Settlement(home.id), home.position);
}

fn transporting(
    state: &SimulationState,
    agent: &mut Agent,
    data: &mut WorkerData,
    dt: f32,
    commands: &mut Vec<Command>,
) {
    let Some(home) = state.settlements.get(agent.settlement) else {
        go_idle(agent, data, commands);
        return;
    };
    agent.set_target(Target::Settlement(home.id), home.position);

    match movement::move_toward_target(state, agent, PathOptions::default(), state.config.agent_speed, dt) {
        Ok((MoveOutcome::Moving, _)) => {}
        Ok((MoveOutcome::Arrived, _)) => {
            if let Some((resource, amount)) = data.carrying.take() {
                commands.push(Command::Deliver {
                    settlement: home.id,
                    structure: data.workplace,
                    resource,
                    amount,
                });
            }
            match workplace(state, agent, data) {
                Some(place) => {
                    agent.set_target(Target::Structure(place.id), place.position);
                    data.state = WorkerState::Moving;
                }
                None => go_idle(agent, data, commands),
            }
        }
        Err(e) => {
            // Load is lost; keep the slot and start over
            tracing::debug!("Worker {:?} cannot reach home: {}", agent.id, e);
            data.carrying = None;
            data.timer = 0.0;
            data.state = WorkerState::Working;
            if let Some(place) = workplace(state, agent, data) {
                agent.set_target(Target::Structure(place.id), place.position);
            }
        }
    }
}

fn wandering(state: &SimulationState, agent: &mut Agent, data: &mut WorkerData, dt: f32) {
    match movement::move_toward_target(state, agent, PathOptions::default(), state.config.agent_speed, dt) {
        Ok((MoveOutcome::Moving, _)) => {}
        _ => {
            data.state = WorkerState::Idle;
            agent.clear_target();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::stockpile::ResourceType;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{AgentId, Cell, Vec2};
    use crate::spatial::terrain::TerrainGrid;

    fn world() -> SimulationState {
        let config = SimulationConfig::default();
        let grid = TerrainGrid::new(40, 40, config.cell_size, config.edge_buffer, Tile::Grass);
        SimulationState::new(config, grid, 5)
    }

    fn run(state: &mut SimulationState, id: AgentId, dt: f32) {
        let mut agent = state.agents[id].clone();
        let commands = step(state, &mut agent, dt);
        state.agents[id] = agent;
        let mut events = Vec::new();
        for c in commands {
            c.apply(state, &mut events);
        }
    }

    #[test]
    fn test_worker_fills_slot_and_delivers() {
        let mut state = world();
        let home = state.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        let farm = state.spawn_structure(StructureKind::Farm, Vec2::new(250.0, 410.0), home);
        let pos = state.settlements[home].position;
        let w = state.spawn_agent(home, AgentRole::worker(), pos);

        run(&mut state, w, 0.5);
        assert!(state.structures[farm].has_worker(w));

        for _ in 0..60 {
            run(&mut state, w, 0.5);
        }
        assert!(state.settlements[home].stockpile.get(ResourceType::Food) >= 10);
    }

    #[test]
    fn test_capacity_is_respected() {
        let mut state = world();
        let home = state.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        let quarry = state.spawn_structure(StructureKind::Quarry, Vec2::new(250.0, 410.0), home);
        let pos = state.settlements[home].position;
        let workers: Vec<_> = (0..4)
            .map(|_| state.spawn_agent(home, AgentRole::worker(), pos))
            .collect();
        for w in &workers {
            run(&mut state, *w, 0.5);
        }
        assert_eq!(state.structures[quarry].workers().len(), 2);
        let placed = workers
            .iter()
            .filter(|w| state.agents[**w].as_worker().and_then(|d| d.workplace).is_some())
            .count();
        assert_eq!(placed, 2);
    }

    #[test]
    fn test_stranded_worker_frees_slot_in_same_step() {
        let mut state = world();
        let home = state.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        let quarry = state.spawn_structure(StructureKind::Quarry, Vec2::new(250.0, 410.0), home);

        // First worker holds a slot but stands on a cell walled in by water
        let island = Cell::new(5, 5);
        for cell in island.neighbors() {
            state.grid.set_tile(cell, Tile::Water);
        }
        let shore = state.grid.cell_to_world(island);
        let stranded = state.spawn_agent(home, AgentRole::worker(), shore);
        assert!(state.assign_worker(quarry, stranded));
        if let AgentRole::Worker(data) = &mut state.agents[stranded].role {
            data.workplace = Some(quarry);
            data.state = WorkerState::Moving;
        }

        let pos = state.settlements[home].position;
        let busy = state.spawn_agent(home, AgentRole::worker(), pos);
        assert!(state.assign_worker(quarry, busy));
        if let AgentRole::Worker(data) = &mut state.agents[busy].role {
            data.workplace = Some(quarry);
            data.state = WorkerState::Working;
        }
        let newcomer = state.spawn_agent(home, AgentRole::worker(), pos);
        assert!(!state.structures[quarry].has_free_slot());

        let mut events = Vec::new();
        crate::simulation::tick::step_agents(&mut state, 0.1, &mut events);

        assert!(!state.structures[quarry].has_worker(stranded));
        assert!(state.structures[quarry].has_worker(newcomer));
        assert_eq!(state.structures[quarry].workers().len(), 2);
        assert_eq!(state.agents[stranded].as_worker().and_then(|d| d.workplace), None);
        assert_eq!(state.agents[newcomer].as_worker().and_then(|d| d.workplace), Some(quarry));
    }

    #[test]
    fn test_lumber_mill_without_forest_yields_nothing() {
        let mut state = world();
        let home = state.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        state.spawn_structure(StructureKind::LumberMill, Vec2::new(250.0, 410.0), home);
        let pos = state.settlements[home].position;
        let w = state.spawn_agent(home, AgentRole::worker(), pos);
        for _ in 0..60 {
            run(&mut state, w, 0.5);
        }
        assert_eq!(state.settlements[home].stockpile.get(ResourceType::Wood), 0);
        assert_eq!(state.agents[w].as_worker().map(|d| d.state), Some(WorkerState::Working));
    }

    #[test]
    fn test_lumber_mill_clears_forest() {
        let mut state = world();
        let home = state.add_settlement("Ashford", Vec2::new(400.0, 400.0));
        let mill_pos = Vec2::new(250.0, 410.0);
        state.spawn_structure(StructureKind::LumberMill, mill_pos, home);
        let forest = Cell::new(13, 22);
        state.grid.set_tile(forest, Tile::Forest);
        let pos = state.settlements[home].position;
        let w = state.spawn_agent(home, AgentRole::worker(), pos);
        for _ in 0..60 {
            run(&mut state, w, 0.5);
        }
        assert_eq!(state.grid.tile_at(forest), Some(Tile::Grass));
        assert_eq!(state.settlements[home].stockpile.get(ResourceType::Wood), 10);
    }
}
