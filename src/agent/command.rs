//! Commands - the only way agent logic changes shared state
//!
//! An agent step reads the state, updates its own copy of the agent and
//! returns commands. The tick applies them immediately after that agent, so
//! reservations and deductions are visible to every agent evaluated later
//! in the same step.

use crate::agent::{AgentRole, BuilderState, BuilderTask, Target, WorkerState};
use crate::city::construction::RoadCellStep;
use crate::city::settlement::{RoadNeed, RoadTarget};
use crate::city::stockpile::{Materials, ResourceType};
use crate::city::structure::{StructureKind, StructureState};
use crate::core::types::{AgentId, Cell, RoadId, SettlementId, StructureId, Vec2};
use crate::simulation::state::SimulationState;
use crate::simulation::tick::SimulationEvent;
use crate::spatial::tile::Tile;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Remove a global build task now owned by a builder
    TakeBuildTask { task: u64 },
    /// Drop a global build task nobody can reach and refund what it paid
    AbandonBuildTask { task: u64 },
    /// Remove the oldest queued entry of `kind`
    DequeueBuild {
        settlement: SettlementId,
        kind: StructureKind,
    },
    Deduct {
        settlement: SettlementId,
        materials: Materials,
    },
    Refund {
        settlement: SettlementId,
        materials: Materials,
    },
    /// Finished construction; the site is re-verified before placing
    CompleteStructure {
        agent: AgentId,
        settlement: SettlementId,
        kind: StructureKind,
        site: Vec2,
        paid: Materials,
    },
    /// Create a road along `tiles` and hand it to the builder
    StartRoad {
        agent: AgentId,
        settlement: SettlementId,
        need: RoadNeed,
        tiles: Vec<Cell>,
    },
    ClaimRoad {
        road: RoadId,
        agent: AgentId,
    },
    ReleaseRoad {
        road: RoadId,
        agent: AgentId,
    },
    LayRoadCell {
        road: RoadId,
        settlement: SettlementId,
        step: RoadCellStep,
    },
    /// Forget a road need that cannot be built right now
    DropRoadNeed {
        settlement: SettlementId,
        target: RoadTarget,
    },
    AssignWorker {
        structure: StructureId,
        agent: AgentId,
    },
    ReleaseWorker { agent: AgentId },
    HarvestForest { cell: Cell },
    /// Unload a worker's carried resource at its settlement
    Deliver {
        settlement: SettlementId,
        structure: Option<StructureId>,
        resource: ResourceType,
        amount: u32,
    },
    BindTrader {
        market: StructureId,
        agent: AgentId,
    },
    TradeCompleted {
        agent: AgentId,
        settlement: SettlementId,
        distance: f32,
        payout: u32,
    },
    Message(String),
}

impl Command {
    pub fn apply(self, state: &mut SimulationState, events: &mut Vec<SimulationEvent>) {
        match self {
            Command::TakeBuildTask { task } => {
                state.build_tasks.retain(|t| t.id != task);
            }
            Command::AbandonBuildTask { task } => {
                let Some(index) = state.build_tasks.iter().position(|t| t.id == task) else {
                    return;
                };
                let task = state.build_tasks.remove(index);
                tracing::info!(
                    "Abandoned unreachable {} task {}",
                    task.kind.name(),
                    task.id
                );
                if let Some(s) = state.settlements.get_mut(task.settlement) {
                    s.stockpile.refund(&task.paid);
                }
            }
            Command::DequeueBuild { settlement, kind } => {
                if let Some(s) = state.settlements.get_mut(settlement) {
                    s.build_queue.decrement(kind);
                }
            }
            Command::Deduct {
                settlement,
                materials,
            } => {
                if let Some(s) = state.settlements.get_mut(settlement) {
                    if !s.stockpile.consume_materials(&materials) {
                        tracing::warn!("Deduction failed for {}: insufficient stock", s.name);
                    }
                }
            }
            Command::Refund {
                settlement,
                materials,
            } => {
                if let Some(s) = state.settlements.get_mut(settlement) {
                    s.stockpile.refund(&materials);
                }
            }
            Command::CompleteStructure {
                agent,
                settlement,
                kind,
                site,
                paid,
            } => complete_structure(state, events, agent, settlement, kind, site, paid),
            Command::StartRoad {
                agent,
                settlement,
                need,
                tiles,
            } => start_road(state, events, agent, settlement, need, tiles),
            Command::ClaimRoad { road, agent } => {
                if let Some(r) = state.roads.get_mut(road) {
                    if r.builder.is_none() {
                        r.builder = Some(agent);
                    }
                }
            }
            Command::ReleaseRoad { road, agent } => {
                if let Some(r) = state.roads.get_mut(road) {
                    if r.builder == Some(agent) {
                        r.builder = None;
                    }
                }
            }
            Command::LayRoadCell {
                road,
                settlement,
                step,
            } => lay_road_cell(state, events, road, settlement, step),
            Command::DropRoadNeed { settlement, target } => {
                if let Some(s) = state.settlements.get_mut(settlement) {
                    s.needs.roads.retain(|n| n.target != target);
                    if let RoadTarget::Planned { from, to } = target {
                        s.planned_roads.retain(|p| p.from != from || p.to != to);
                    }
                }
            }
            Command::AssignWorker { structure, agent } => {
                if !state.assign_worker(structure, agent) {
                    // Slot taken in the meantime: send the worker back to idle
                    if let Some(a) = state.agents.get_mut(agent) {
                        if let AgentRole::Worker(w) = &mut a.role {
                            w.workplace = None;
                            w.state = WorkerState::Idle;
                        }
                        a.clear_target();
                    }
                }
            }
            Command::ReleaseWorker { agent } => state.release_worker(agent),
            Command::HarvestForest { cell } => {
                let amount = state.config.wood_per_harvest;
                state.grid.harvest_forest(cell, amount);
            }
            Command::Deliver {
                settlement,
                structure,
                resource,
                amount,
            } => {
                let Some(s) = state.settlements.get_mut(settlement) else {
                    return;
                };
                s.stockpile.add(resource, amount);
                let gold = (amount as f32 * resource.gold_value()).round() as u32;
                s.stockpile.add(ResourceType::Gold, gold);
                if let Some(StructureState::Workplace { deliveries }) = structure
                    .and_then(|id| state.structures.get_mut(id))
                    .map(|st| &mut st.state)
                {
                    *deliveries += 1;
                }
                events.push(SimulationEvent::ResourcesDelivered {
                    settlement,
                    resource,
                    amount,
                });
            }
            Command::BindTrader { market, agent } => {
                if let Some(StructureState::Market { trader }) =
                    state.structures.get_mut(market).map(|s| &mut s.state)
                {
                    *trader = Some(agent);
                }
            }
            Command::TradeCompleted {
                agent,
                settlement,
                distance,
                payout,
            } => {
                if let Some(s) = state.settlements.get_mut(settlement) {
                    s.stockpile.add(ResourceType::Gold, payout);
                }
                tracing::debug!("Trade round trip of {:.0} paid {} gold", distance, payout);
                events.push(SimulationEvent::TradeCompleted {
                    agent,
                    settlement,
                    distance,
                    payout,
                });
            }
            Command::Message(text) => state.message(text),
        }
    }
}

fn complete_structure(
    state: &mut SimulationState,
    events: &mut Vec<SimulationEvent>,
    agent: AgentId,
    settlement: SettlementId,
    kind: StructureKind,
    site: Vec2,
    paid: Materials,
) {
    let spacing = state.config.structure_spacing;
    let clear = state
        .occupied_sites(Some(agent))
        .iter()
        .all(|o| o.distance_squared(&site) >= spacing * spacing);
    let settlement_exists = state.settlements.contains_key(settlement);

    if !settlement_exists {
        return;
    }
    if !clear || !state.grid.is_buildable(site) {
        state.settlements[settlement].stockpile.refund(&paid);
        state.message(format!(
            "Could not finish {}: site is no longer clear, materials refunded",
            kind.name()
        ));
        events.push(SimulationEvent::ConstructionFailed { kind, settlement });
        return;
    }

    let id = state.spawn_structure(kind, site, settlement);
    tracing::info!(
        "{} completed at ({:.0}, {:.0}) for {}",
        kind.name(),
        site.x,
        site.y,
        state.settlements[settlement].name
    );
    events.push(SimulationEvent::StructureCompleted {
        structure: id,
        kind,
        settlement,
    });
}

fn start_road(
    state: &mut SimulationState,
    events: &mut Vec<SimulationEvent>,
    agent: AgentId,
    settlement: SettlementId,
    need: RoadNeed,
    tiles: Vec<Cell>,
) {
    if tiles.is_empty() || !state.settlements.contains_key(settlement) {
        return;
    }
    let partner = match need.target {
        RoadTarget::Settlement(other) => Some(other),
        _ => None,
    };
    let cells = tiles.len();
    let first = state.grid.cell_to_world(tiles[0]);
    let road = state.add_road(Some(settlement), partner, need.from, need.to, tiles);
    state.roads[road].builder = Some(agent);
    state.settlements[settlement]
        .needs
        .roads
        .retain(|n| n.target != need.target);

    if let Some(a) = state.agents.get_mut(agent) {
        if let AgentRole::Builder(b) = &mut a.role {
            b.task = Some(BuilderTask::Road { road, work: 0.0 });
            b.state = BuilderState::Moving;
        }
        a.set_target(Target::Road(road), first);
    }

    tracing::debug!("Road {:?} started with {} cells", road, cells);
    events.push(SimulationEvent::RoadStarted {
        road,
        settlement,
        cells,
    });
}

fn lay_road_cell(
    state: &mut SimulationState,
    events: &mut Vec<SimulationEvent>,
    road: RoadId,
    settlement: SettlementId,
    step: RoadCellStep,
) {
    let Some(r) = state.roads.get(road) else {
        return;
    };
    if r.next_cell() != Some(step.cell) {
        return;
    }

    if let Some(s) = state.settlements.get_mut(settlement) {
        s.stockpile.remove(ResourceType::Wood, step.wood_cost);
    }

    let mut cleared = false;
    if let Some(bonus) = step.forest_bonus {
        if let Some(wood) = state.grid.harvest_forest(step.cell, bonus) {
            if let Some(s) = state.settlements.get_mut(settlement) {
                s.stockpile.add(ResourceType::Wood, wood);
            }
            cleared = true;
        }
    }

    match state.grid.tile_at(step.cell) {
        Some(Tile::Settlement) | None => {}
        Some(t) if t.is_passable() => {
            state.grid.set_tile(step.cell, Tile::Road);
        }
        Some(_) => {}
    }
    state.overlay.clear(step.cell);

    let r = &mut state.roads[road];
    if cleared {
        r.forest_cleared += 1;
    }
    r.advance();
    if r.is_usable() {
        r.builder = None;
        tracing::info!("Road {:?} completed ({} cells)", road, r.len());
        events.push(SimulationEvent::RoadCompleted { road });
    }
}
