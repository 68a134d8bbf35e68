//! Structure upkeep - house spawning, market staffing, worker list pruning

use ahash::AHashMap;

use crate::agent::{AgentKind, AgentRole};
use crate::city::structure::{StructureKind, StructureState};
use crate::core::types::{AgentId, SettlementId, StructureId};
use crate::simulation::state::SimulationState;
use crate::simulation::tick::SimulationEvent;

/// Drop worker ids whose agent is gone or now works elsewhere
pub fn prune_workers(state: &mut SimulationState) -> usize {
    let assignments: AHashMap<AgentId, StructureId> = state
        .agents
        .values()
        .filter_map(|a| Some((a.id, a.as_worker()?.workplace?)))
        .collect();

    let mut dropped = 0;
    for (id, structure) in state.structures.iter_mut() {
        dropped += structure.retain_workers(|w| assignments.get(&w) == Some(&id));
    }
    if dropped > 0 {
        tracing::debug!("Pruned {} stale worker assignments", dropped);
    }
    dropped
}

/// Role for the next newcomer: roughly one builder per `workers_per_builder`
/// workers
pub fn next_role(builders: u32, workers: u32, workers_per_builder: u32) -> AgentKind {
    if builders * workers_per_builder < workers {
        AgentKind::Builder
    } else {
        AgentKind::Worker
    }
}

/// Count down house timers and spawn newcomers while there is room
pub fn update_houses(state: &mut SimulationState, dt: f32, events: &mut Vec<SimulationEvent>) {
    let settlement_ids: Vec<SettlementId> = state.settlements.keys().collect();
    for settlement in settlement_ids {
        let houses: Vec<StructureId> = state
            .structures
            .values()
            .filter(|s| s.settlement == settlement && s.kind == StructureKind::House)
            .map(|s| s.id)
            .collect();
        if houses.is_empty() {
            continue;
        }

        let mut builders = state.count_agents(settlement, AgentKind::Builder);
        let mut workers = state.count_agents(settlement, AgentKind::Worker);
        let house_capacity = state.config.house_capacity;
        let capacity = state.config.base_capacity + houses.len() as u32 * house_capacity;
        let mut unhoused = builders + workers;

        for house in houses {
            let population = builders + workers;
            let occupants = unhoused.min(house_capacity);
            unhoused -= occupants;

            let position = state.structures[house].position;
            let spawn_interval = state.config.spawn_interval;
            let mut spawn = false;
            if let StructureState::Housing {
                occupants: current,
                spawn_countdown,
            } = &mut state.structures[house].state
            {
                *current = occupants;
                if population < capacity {
                    *spawn_countdown -= dt;
                    if *spawn_countdown <= 0.0 {
                        *spawn_countdown = spawn_interval;
                        spawn = true;
                    }
                }
            }
            if !spawn {
                continue;
            }

            let kind = next_role(builders, workers, state.config.workers_per_builder);
            let role = match kind {
                AgentKind::Builder => {
                    builders += 1;
                    AgentRole::builder()
                }
                _ => {
                    workers += 1;
                    AgentRole::worker()
                }
            };
            let agent = state.spawn_agent(settlement, role, position);
            events.push(SimulationEvent::AgentSpawned {
                agent,
                kind,
                settlement,
            });
        }
    }
}

/// Every market keeps exactly one trader of its own
pub fn staff_markets(state: &mut SimulationState, events: &mut Vec<SimulationEvent>) {
    let markets: Vec<(StructureId, SettlementId)> = state
        .structures
        .values()
        .filter(|s| s.kind == StructureKind::Market)
        .filter(|s| match s.state {
            StructureState::Market { trader: Some(t) } => !state
                .agents
                .get(t)
                .and_then(|a| a.as_trader())
                .is_some_and(|d| d.home_market == Some(s.id)),
            _ => true,
        })
        .map(|s| (s.id, s.settlement))
        .collect();

    for (market, settlement) in markets {
        let position = state.structures[market].position;
        let agent = state.spawn_agent(settlement, AgentRole::trader(Some(market)), position);
        if let StructureState::Market { trader } = &mut state.structures[market].state {
            *trader = Some(agent);
        }
        events.push(SimulationEvent::AgentSpawned {
            agent,
            kind: AgentKind::Trader,
            settlement,
        });
    }
}
