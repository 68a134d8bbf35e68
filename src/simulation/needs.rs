//! Need evaluation - recompute what each settlement lacks
//!
//! Population counters, housing urgency, resource shortages and road needs
//! are all rebuilt from the entity arenas on every refresh, so they never
//! drift from the agents and structures they describe.

use crate::agent::AgentKind;
use crate::city::settlement::{HousingUrgency, RoadNeed, RoadTarget, Settlement, SettlementNeeds};
use crate::city::stockpile::ResourceType;
use crate::city::structure::StructureKind;
use crate::core::config::SimulationConfig;
use crate::core::types::SettlementId;
use crate::simulation::state::SimulationState;

/// Housing urgency from occupancy, house count and growth
///
/// At or above 90% occupancy is critical, 75% high, 70% normal. Below that a
/// settlement with fewer than three houses still wants one. A growing
/// settlement with fewer than two houses escalates one tier.
pub fn housing_urgency(population: u32, capacity: u32, houses: u32, growing: bool) -> HousingUrgency {
    let occupancy = if capacity == 0 {
        1.0
    } else {
        population as f32 / capacity as f32
    };

    let base = if occupancy >= 0.9 {
        HousingUrgency::Critical
    } else if occupancy >= 0.75 {
        HousingUrgency::High
    } else if occupancy >= 0.7 || houses < 3 {
        HousingUrgency::Normal
    } else {
        HousingUrgency::None
    };

    if growing && houses < 2 {
        base.escalate()
    } else {
        base
    }
}

/// Producer kinds for every resource below the shortage threshold
pub fn resource_needs(settlement: &Settlement, config: &SimulationConfig) -> Vec<StructureKind> {
    let mut kinds = Vec::new();
    for resource in ResourceType::ALL {
        if resource == ResourceType::Gold {
            continue;
        }
        if settlement.stockpile.get(resource) < config.resource_need_threshold {
            for kind in StructureKind::producers_of(resource) {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
        }
    }
    kinds
}

/// Road needs of one settlement, most urgent first
///
/// Busy structures without a road home (priority = worker saturation),
/// unconnected settlements (priority grows with their population and falls
/// with distance) and player-planned roads (fixed high priority). Roads that
/// are still under construction count as connections here so the same pair
/// is never planned twice.
pub fn road_needs(state: &SimulationState, id: SettlementId) -> Vec<RoadNeed> {
    let Some(settlement) = state.settlements.get(id) else {
        return Vec::new();
    };
    let config = &state.config;
    let origin = settlement.position;
    let mut needs = Vec::new();

    for structure in state.structures.values() {
        if structure.settlement != id || structure.workers().is_empty() {
            continue;
        }
        if structure.position.distance(&origin) < config.min_road_length {
            continue;
        }
        if state.roads_connect(origin, structure.position, false) {
            continue;
        }
        needs.push(RoadNeed {
            target: RoadTarget::Structure(structure.id),
            from: origin,
            to: structure.position,
            priority: structure.saturation(),
        });
    }

    for other in state.settlements.values() {
        if other.id == id {
            continue;
        }
        let distance = other.position.distance(&origin);
        if distance < config.min_road_length || state.roads_connect(origin, other.position, false) {
            continue;
        }
        needs.push(RoadNeed {
            target: RoadTarget::Settlement(other.id),
            from: origin,
            to: other.position,
            priority: other.population() as f32 / distance * config.settlement_road_weight,
        });
    }

    for planned in &settlement.planned_roads {
        if state.roads_connect(planned.from, planned.to, false) {
            continue;
        }
        needs.push(RoadNeed {
            target: RoadTarget::Planned {
                from: planned.from,
                to: planned.to,
            },
            from: planned.from,
            to: planned.to,
            priority: config.planned_road_priority,
        });
    }

    needs.sort_unstable_by(|a, b| b.priority.total_cmp(&a.priority));
    needs
}

/// Refresh counters and needs for one settlement
pub fn refresh_settlement(state: &mut SimulationState, id: SettlementId) {
    if !state.settlements.contains_key(id) {
        return;
    }
    let builders = state.count_agents(id, AgentKind::Builder);
    let workers = state.count_agents(id, AgentKind::Worker);
    let traders = state.count_agents(id, AgentKind::Trader);
    let houses = state
        .structures
        .values()
        .filter(|s| s.settlement == id && s.kind == StructureKind::House)
        .count() as u32;
    let roads = road_needs(state, id);

    // Planned roads that now have a road are done
    let connected: Vec<bool> = state.settlements[id]
        .planned_roads
        .iter()
        .map(|p| state.roads_connect(p.from, p.to, false))
        .collect();

    let config = &state.config;
    let settlement = &mut state.settlements[id];
    let mut flags = connected.into_iter();
    settlement.planned_roads.retain(|_| !flags.next().unwrap_or(false));

    settlement.last_population = settlement.population();
    settlement.builders = builders;
    settlement.workers = workers;
    settlement.traders = traders;
    settlement.houses = houses;
    settlement.capacity = config.base_capacity + houses * config.house_capacity;

    let housing = housing_urgency(
        settlement.population(),
        settlement.capacity,
        houses,
        settlement.is_growing(),
    );
    let resources = resource_needs(settlement, config);
    settlement.needs = SettlementNeeds {
        housing,
        resources,
        roads,
    };
}

/// Turn at most one unmet need into a paid-for global build task
///
/// Urgent housing (High or Critical) goes first, then resource shortages.
/// Kinds already queued, reserved or under construction are
/// skipped, as are producers of a kind that still has free worker slots.
pub fn generate_build_task(state: &mut SimulationState, id: SettlementId) -> Option<u64> {
    let settlement = state.settlements.get(id)?;
    let needs = &settlement.needs;

    let mut candidates = Vec::new();
    if needs.housing >= HousingUrgency::High {
        candidates.push(StructureKind::House);
    }
    candidates.extend(needs.resources.iter().copied());

    for kind in candidates {
        if state.pending_builds(id, kind) > 0 || state.settlements[id].build_queue.pending(kind) > 0 {
            continue;
        }
        let understaffed = kind != StructureKind::House
            && state
                .structures
                .values()
                .any(|s| s.settlement == id && s.kind == kind && s.has_free_slot());
        if understaffed {
            continue;
        }
        if !state.settlements[id].stockpile.has_materials(&kind.cost()) {
            continue;
        }
        match state.create_build_task(id, kind) {
            Ok(Some(task)) => return Some(task),
            Ok(None) => {}
            Err(e) => {
                let name = state.settlements[id].name.clone();
                state.message(format!("{}: {} for {}", name, e, kind.name()));
            }
        }
    }
    None
}
