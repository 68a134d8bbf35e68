//! Tick system - orchestrates simulation updates
//!
//! One step runs, in order:
//! settlement needs -> agents -> structure upkeep -> forest regrowth
//!
//! Agents are evaluated one at a time in arena order. Each agent's commands
//! are applied before the next agent runs, so a site or road claimed early in
//! the step is already taken for everyone after.

use ahash::AHashSet;

use crate::agent::{step_agent, AgentKind};
use crate::city::stockpile::ResourceType;
use crate::city::structure::StructureKind;
use crate::core::types::{AgentId, RoadId, SettlementId, StructureId, Tick};
use crate::simulation::needs::{generate_build_task, refresh_settlement};
use crate::simulation::state::SimulationState;
use crate::simulation::structures::{prune_workers, staff_markets, update_houses};

/// Events generated during a simulation tick
///
/// Returned by `run_simulation_tick` for logs and presentation.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    /// A settlement paid for a structure and queued it globally
    BuildTaskCreated {
        settlement: SettlementId,
        kind: StructureKind,
        task: u64,
    },
    StructureCompleted {
        structure: StructureId,
        kind: StructureKind,
        settlement: SettlementId,
    },
    /// Site was lost before completion; materials went back
    ConstructionFailed {
        kind: StructureKind,
        settlement: SettlementId,
    },
    RoadStarted {
        road: RoadId,
        settlement: SettlementId,
        cells: usize,
    },
    RoadCompleted { road: RoadId },
    ResourcesDelivered {
        settlement: SettlementId,
        resource: ResourceType,
        amount: u32,
    },
    TradeCompleted {
        agent: AgentId,
        settlement: SettlementId,
        distance: f32,
        payout: u32,
    },
    AgentSpawned {
        agent: AgentId,
        kind: AgentKind,
        settlement: SettlementId,
    },
    ForestRegrown { cells: usize, tick: Tick },
}

/// Advance the world by `dt` seconds
pub fn run_simulation_tick(state: &mut SimulationState, dt: f32) -> Vec<SimulationEvent> {
    let mut events = Vec::new();

    update_settlements(state, &mut events);
    step_agents(state, dt, &mut events);
    prune_workers(state);
    update_houses(state, dt, &mut events);
    staff_markets(state, &mut events);
    regrow_forests(state, &mut events);

    state.tick += 1;
    state.elapsed += dt;
    events
}

/// Run `steps` ticks, collecting every event
pub fn run_simulation(state: &mut SimulationState, steps: u64, dt: f32) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    for _ in 0..steps {
        events.extend(run_simulation_tick(state, dt));
    }
    events
}

/// Refresh needs and let each settlement create at most one build task
pub fn update_settlements(state: &mut SimulationState, events: &mut Vec<SimulationEvent>) {
    let ids: Vec<SettlementId> = state.settlements.keys().collect();
    for id in ids {
        refresh_settlement(state, id);
        if let Some(task) = generate_build_task(state, id) {
            if let Some(t) = state.build_tasks.iter().find(|t| t.id == task) {
                events.push(SimulationEvent::BuildTaskCreated {
                    settlement: id,
                    kind: t.kind,
                    task,
                });
            }
        }
    }
}

/// Step every agent, applying its commands before moving on
pub fn step_agents(state: &mut SimulationState, dt: f32, events: &mut Vec<SimulationEvent>) {
    let ids: Vec<AgentId> = state.agents.keys().collect();
    for id in ids {
        let Some(mut agent) = state.agents.get(id).cloned() else {
            continue;
        };
        let commands = step_agent(state, &mut agent, dt);
        if let Some(slot) = state.agents.get_mut(id) {
            *slot = agent;
        }
        for command in commands {
            command.apply(state, events);
        }
    }
}

fn regrow_forests(state: &mut SimulationState, events: &mut Vec<SimulationEvent>) {
    if state.config.regrowth_samples == 0 {
        return;
    }
    let mut protected: AHashSet<_> = state.overlay.cells().clone();
    protected.extend(state.structure_cells());

    let samples = state.config.regrowth_samples;
    let chance = state.config.regrowth_chance;
    let grown = state.grid.regrow(&mut state.rng, samples, chance, &protected);
    if grown > 0 {
        tracing::trace!("{} forest cells regrew", grown);
        events.push(SimulationEvent::ForestRegrown {
            cells: grown,
            tick: state.tick,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentRole;
    use crate::core::config::SimulationConfig;
    use crate::core::types::Vec2;
    use crate::spatial::terrain::TerrainGrid;
    use crate::spatial::tile::Tile;

    fn world() -> SimulationState {
        let config = SimulationConfig::default();
        let grid = TerrainGrid::new(50, 50, config.cell_size, config.edge_buffer, Tile::Grass);
        SimulationState::new(config, grid, 21)
    }

    #[test]
    fn test_tick_advances_clock() {
        let mut state = world();
        run_simulation(&mut state, 10, 0.5);
        assert_eq!(state.tick, 10);
        assert!((state.elapsed - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_settlement_grows_a_house() {
        let mut state = world();
        let id = state.add_settlement("Ashford", Vec2::new(500.0, 500.0));
        state.settlements[id].stockpile.add(ResourceType::Wood, 200);
        state.settlements[id].stockpile.add(ResourceType::Stone, 50);
        state.settlements[id].stockpile.add(ResourceType::Food, 200);
        state.settlements[id].stockpile.add(ResourceType::Iron, 200);
        let pos = state.settlements[id].position;
        state.spawn_agent(id, AgentRole::builder(), pos);

        let events = run_simulation(&mut state, 200, 0.5);
        assert!(events
            .iter()
            .any(|e| matches!(e, SimulationEvent::StructureCompleted { kind: StructureKind::House, .. })));
    }

    #[test]
    fn test_agents_see_earlier_reservations() {
        let mut state = world();
        let id = state.add_settlement("Ashford", Vec2::new(500.0, 500.0));
        state.settlements[id].stockpile.add(ResourceType::Wood, 100);
        state.settlements[id].stockpile.add(ResourceType::Stone, 20);
        state.enqueue_build(id, StructureKind::House);
        state.enqueue_build(id, StructureKind::House);
        let pos = state.settlements[id].position;
        let a = state.spawn_agent(id, AgentRole::builder(), pos);
        let b = state.spawn_agent(id, AgentRole::builder(), pos);

        let mut events = Vec::new();
        step_agents(&mut state, 0.5, &mut events);

        let site_a = state.agents[a].reserved_site().unwrap();
        let site_b = state.agents[b].reserved_site().unwrap();
        assert!(site_a.distance(&site_b) >= state.config.structure_spacing);
        assert!(state.settlements[id].build_queue.is_empty());
        assert_eq!(state.settlements[id].stockpile.get(ResourceType::Wood), 60);
    }
}
