//! Trader state machine
//!
//! A trader belongs to a market. It picks a foreign market (closer is better,
//! road-connected is better), travels there, dwells, returns home and is paid
//! for the distance covered. Unreachable markets cost a bounded number of
//! path searches per step; after that the trader parks and waits.

use serde::{Deserialize, Serialize};

use crate::agent::movement::{self, MoveOutcome};
use crate::agent::{Agent, AgentRole, Command, Target, TraderData};
use crate::city::structure::{Structure, StructureKind, StructureState};
use crate::core::types::StructureId;
use crate::simulation::state::SimulationState;
use crate::spatial::pathfinding::PathOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeLeg {
    /// At or heading to the foreign market
    Outbound,
    /// Back at the home market, settling the journey
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraderState {
    SeekingMarket,
    Trading(TradeLeg),
    ReturningHome,
}

pub fn step(state: &SimulationState, agent: &mut Agent, dt: f32) -> Vec<Command> {
    let mut commands = Vec::new();
    let mut data = match &agent.role {
        AgentRole::Trader(t) => t.clone(),
        _ => return commands,
    };

    match data.state {
        TraderState::SeekingMarket => seek_market(state, agent, &mut data, dt, &mut commands),
        TraderState::Trading(TradeLeg::Outbound) => trade_outbound(state, agent, &mut data, dt),
        TraderState::ReturningHome => return_home(state, agent, &mut data, dt),
        TraderState::Trading(TradeLeg::Home) => settle(state, agent, &mut data, dt, &mut commands),
    }

    agent.role = AgentRole::Trader(data);
    commands
}

fn market(state: &SimulationState, id: Option<StructureId>) -> Option<&Structure> {
    state
        .structures
        .get(id?)
        .filter(|s| s.kind == StructureKind::Market)
}

/// Give up on the current journey and wait before searching again
fn park(state: &SimulationState, agent: &mut Agent, data: &mut TraderData) {
    data.state = TraderState::SeekingMarket;
    data.target_market = None;
    // An abandoned journey earns nothing later
    data.odometer = 0.0;
    data.timer = state.config.market_retry_seconds;
    match market(state, data.home_market) {
        Some(home) => agent.set_target(Target::Structure(home.id), home.position),
        None => agent.clear_target(),
    }
}

/// Find a market of the trader's own settlement not served by another trader
fn rebind<'a>(state: &'a SimulationState, agent: &Agent) -> Option<&'a Structure> {
    state.structures.values().find(|s| {
        s.settlement == agent.settlement
            && match s.state {
                StructureState::Market { trader } => {
                    trader.is_none()
                        || trader == Some(agent.id)
                        || trader.is_some_and(|t| !state.agents.contains_key(t))
                }
                _ => false,
            }
    })
}

fn seek_market(
    state: &SimulationState,
    agent: &mut Agent,
    data: &mut TraderData,
    dt: f32,
    commands: &mut Vec<Command>,
) {
    if data.timer > 0.0 {
        data.timer -= dt;
        // Drift to the parking spot while waiting; the drift is not paid
        if let Err(e) = movement::move_toward_target(
            state,
            agent,
            PathOptions::long_distance(),
            state.config.trader_speed,
            dt,
        ) {
            tracing::debug!("Parked trader {:?} stays put: {}", agent.id, e);
        }
        return;
    }

    let home = match market(state, data.home_market) {
        Some(home) => home,
        None => match rebind(state, agent) {
            Some(found) => {
                data.home_market = Some(found.id);
                commands.push(Command::BindTrader {
                    market: found.id,
                    agent: agent.id,
                });
                found
            }
            None => {
                data.home_market = None;
                park(state, agent, data);
                return;
            }
        },
    };

    let foreign: Vec<&Structure> = state
        .structures
        .values()
        .filter(|s| s.kind == StructureKind::Market && s.settlement != agent.settlement)
        .collect();
    if foreign.is_empty() {
        park(state, agent, data);
        return;
    }

    let max_dist = foreign
        .iter()
        .map(|m| m.position.distance(&home.position))
        .fold(f32::EPSILON, f32::max);
    let mut scored: Vec<(&Structure, f32)> = foreign
        .into_iter()
        .map(|m| {
            let mut score = 1.0 - m.position.distance(&home.position) / max_dist;
            if state.roads_connect(home.position, m.position, true) {
                score += state.config.trade_road_bonus;
            }
            (m, score)
        })
        .collect();
    // Stable: among equal scores the first encountered wins
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (candidate, _) in scored.into_iter().take(state.config.max_market_attempts) {
        data.searches += 1;
        let path = movement::plan_waypoints(
            state,
            agent.position,
            candidate.position,
            PathOptions::long_distance(),
        );
        if let Ok(path) = path {
            tracing::debug!("Trader {:?} heading to market {:?}", agent.id, candidate.id);
            data.target_market = Some(candidate.id);
            data.state = TraderState::Trading(TradeLeg::Outbound);
            data.timer = 0.0;
            agent.set_target(Target::Structure(candidate.id), candidate.position);
            agent.receive_path(path);
            return;
        }
    }

    let name = state
        .settlements
        .get(agent.settlement)
        .map(|s| s.name.as_str())
        .unwrap_or("?");
    commands.push(Command::Message(format!(
        "Trader from {} found no reachable market",
        name
    )));
    park(state, agent, data);
}

fn has_arrived(agent: &Agent) -> bool {
    agent.path().is_some_and(|p| p.is_finished())
}

fn trade_outbound(state: &SimulationState, agent: &mut Agent, data: &mut TraderData, dt: f32) {
    let Some(target) = market(state, data.target_market) else {
        park(state, agent, data);
        return;
    };

    if !has_arrived(agent) {
        agent.set_target(Target::Structure(target.id), target.position);
        match movement::move_toward_target(
            state,
            agent,
            PathOptions::long_distance(),
            state.config.trader_speed,
            dt,
        ) {
            Ok((_, distance)) => data.odometer += distance,
            Err(_) => park(state, agent, data),
        }
        return;
    }

    data.timer += dt;
    if data.timer >= state.config.trade_dwell {
        data.timer = 0.0;
        data.state = TraderState::ReturningHome;
        match market(state, data.home_market) {
            Some(home) => agent.set_target(Target::Structure(home.id), home.position),
            None => park(state, agent, data),
        }
    }
}

fn return_home(state: &SimulationState, agent: &mut Agent, data: &mut TraderData, dt: f32) {
    let Some(home) = market(state, data.home_market) else {
        data.home_market = None;
        park(state, agent, data);
        return;
    };
    agent.set_target(Target::Structure(home.id), home.position);
    match movement::move_toward_target(
        state,
        agent,
        PathOptions::long_distance(),
        state.config.trader_speed,
        dt,
    ) {
        Ok((outcome, distance)) => {
            data.odometer += distance;
            if outcome == MoveOutcome::Arrived {
                data.state = TraderState::Trading(TradeLeg::Home);
                data.timer = 0.0;
            }
        }
        Err(_) => park(state, agent, data),
    }
}

/// Dwell at home, then get paid for the round trip
fn settle(
    state: &SimulationState,
    agent: &mut Agent,
    data: &mut TraderData,
    dt: f32,
    commands: &mut Vec<Command>,
) {
    data.timer += dt;
    if data.timer < state.config.trade_dwell {
        return;
    }

    let config = &state.config;
    let payout = (data.odometer * config.trade_reward_per_unit * data.multiplier).round() as u32;
    commands.push(Command::TradeCompleted {
        agent: agent.id,
        settlement: agent.settlement,
        distance: data.odometer,
        payout,
    });
    data.journeys += 1;
    data.total_earned += payout;
    data.multiplier = (1.0 + config.trade_multiplier_step * data.journeys as f32)
        .min(config.trade_multiplier_cap);
    data.odometer = 0.0;
    data.timer = 0.0;
    data.target_market = None;
    data.state = TraderState::SeekingMarket;
    agent.clear_path();
}
