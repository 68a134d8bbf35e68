//! Agents - builders, workers and traders
//!
//! Every agent shares a position, a target and an optional path. The role
//! carries the kind-specific state machine. Each step an agent runs exactly
//! the logic of its current state, mutating only itself and returning
//! `Command`s for everything that touches shared state.

pub mod builder;
pub mod command;
pub mod movement;
pub mod trader;
pub mod worker;

use serde::{Deserialize, Serialize};

use crate::city::stockpile::{Materials, ResourceType};
use crate::city::structure::StructureKind;
use crate::core::types::{AgentId, RoadId, SettlementId, StructureId, Vec2};
use crate::simulation::state::SimulationState;

pub use builder::{BuilderState, BuilderTask};
pub use command::Command;
pub use trader::{TradeLeg, TraderState};
pub use worker::WorkerState;

/// What an agent is heading for, resolved by id each step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Structure(StructureId),
    Road(RoadId),
    Settlement(SettlementId),
    Position(Vec2),
}

/// Computed waypoints plus the index of the next one to reach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathCursor {
    pub waypoints: Vec<Vec2>,
    pub index: usize,
}

impl PathCursor {
    pub fn new(waypoints: Vec<Vec2>) -> Self {
        Self { waypoints, index: 0 }
    }

    pub fn current(&self) -> Option<Vec2> {
        self.waypoints.get(self.index).copied()
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.waypoints.len()
    }

    pub fn remaining(&self) -> &[Vec2] {
        &self.waypoints[self.index.min(self.waypoints.len())..]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderData {
    pub state: BuilderState,
    pub task: Option<BuilderTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerData {
    pub state: WorkerState,
    pub workplace: Option<StructureId>,
    pub carrying: Option<(ResourceType, u32)>,
    /// Seconds worked toward the next load
    pub timer: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderData {
    pub state: TraderState,
    pub home_market: Option<StructureId>,
    pub target_market: Option<StructureId>,
    /// Distance traveled since the last payout
    pub odometer: f32,
    pub journeys: u32,
    pub multiplier: f32,
    /// Dwell time at a market, or wait time while parked
    pub timer: f32,
    pub total_earned: u32,
    /// Market path searches attempted, for diagnostics
    pub searches: u32,
}

/// Role-specific payload and state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentRole {
    Builder(BuilderData),
    Worker(WorkerData),
    Trader(TraderData),
}

impl AgentRole {
    pub fn builder() -> Self {
        AgentRole::Builder(BuilderData {
            state: BuilderState::Idle,
            task: None,
        })
    }

    pub fn worker() -> Self {
        AgentRole::Worker(WorkerData {
            state: WorkerState::Idle,
            workplace: None,
            carrying: None,
            timer: 0.0,
        })
    }

    pub fn trader(home_market: Option<StructureId>) -> Self {
        AgentRole::Trader(TraderData {
            state: TraderState::SeekingMarket,
            home_market,
            target_market: None,
            odometer: 0.0,
            journeys: 0,
            multiplier: 1.0,
            timer: 0.0,
            total_earned: 0,
            searches: 0,
        })
    }

    pub fn kind(&self) -> AgentKind {
        match self {
            AgentRole::Builder(_) => AgentKind::Builder,
            AgentRole::Worker(_) => AgentKind::Worker,
            AgentRole::Trader(_) => AgentKind::Trader,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Builder,
    Worker,
    Trader,
}

/// Discriminated state for presentation (color/iconography)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStateTag {
    Builder(BuilderState),
    Worker(WorkerState),
    Trader(TraderState),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub position: Vec2,
    pub settlement: SettlementId,
    pub role: AgentRole,
    target: Option<Target>,
    target_pos: Option<Vec2>,
    path: Option<PathCursor>,
    /// Seconds spent with nothing to do
    pub idle_time: f32,
}

impl Agent {
    pub fn new(id: AgentId, position: Vec2, settlement: SettlementId, role: AgentRole) -> Self {
        Self {
            id,
            position,
            settlement,
            role,
            target: None,
            target_pos: None,
            path: None,
            idle_time: 0.0,
        }
    }

    pub fn kind(&self) -> AgentKind {
        self.role.kind()
    }

    pub fn state_tag(&self) -> AgentStateTag {
        match &self.role {
            AgentRole::Builder(b) => AgentStateTag::Builder(b.state),
            AgentRole::Worker(w) => AgentStateTag::Worker(w.state),
            AgentRole::Trader(t) => AgentStateTag::Trader(t.state),
        }
    }

    pub fn target(&self) -> Option<Target> {
        self.target
    }

    pub fn target_position(&self) -> Option<Vec2> {
        self.target_pos
    }

    pub fn path(&self) -> Option<&PathCursor> {
        self.path.as_ref()
    }

    /// Point the agent at a new target. The path is discarded whenever the
    /// target coordinates change.
    pub fn set_target(&mut self, target: Target, position: Vec2) {
        if self.target_pos != Some(position) {
            self.path = None;
        }
        self.target = Some(target);
        self.target_pos = Some(position);
    }

    pub fn clear_target(&mut self) {
        self.target = None;
        self.target_pos = None;
        self.path = None;
    }

    /// Install a freshly computed path toward the current target
    pub fn receive_path(&mut self, waypoints: Vec<Vec2>) {
        self.path = Some(PathCursor::new(waypoints));
    }

    pub fn clear_path(&mut self) {
        self.path = None;
    }

    pub(crate) fn path_mut(&mut self) -> Option<&mut PathCursor> {
        self.path.as_mut()
    }

    pub fn as_builder(&self) -> Option<&BuilderData> {
        match &self.role {
            AgentRole::Builder(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_worker(&self) -> Option<&WorkerData> {
        match &self.role {
            AgentRole::Worker(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_trader(&self) -> Option<&TraderData> {
        match &self.role {
            AgentRole::Trader(t) => Some(t),
            _ => None,
        }
    }

    /// Site this agent has reserved for a structure it is about to build
    pub fn reserved_site(&self) -> Option<Vec2> {
        match &self.role {
            AgentRole::Builder(BuilderData {
                task: Some(BuilderTask::Structure { site, .. }),
                ..
            }) => Some(*site),
            _ => None,
        }
    }

    /// Structure kind under construction by this agent, if any
    pub fn building_kind(&self) -> Option<StructureKind> {
        match &self.role {
            AgentRole::Builder(BuilderData {
                task: Some(BuilderTask::Structure { kind, .. }),
                ..
            }) => Some(*kind),
            _ => None,
        }
    }

    /// Materials paid up front for the structure this agent is building
    pub fn paid_materials(&self) -> Option<&Materials> {
        match &self.role {
            AgentRole::Builder(BuilderData {
                task: Some(BuilderTask::Structure { paid, .. }),
                ..
            }) => Some(paid),
            _ => None,
        }
    }
}

/// Run one step of an agent's state machine
///
/// The agent is a detached copy; the caller writes it back and then applies
/// the returned commands, so agents later in the same step see the effects.
pub fn step_agent(state: &SimulationState, agent: &mut Agent, dt: f32) -> Vec<Command> {
    match agent.role.kind() {
        AgentKind::Builder => builder::step(state, agent, dt),
        AgentKind::Worker => worker::step(state, agent, dt),
        AgentKind::Trader => trader::step(state, agent, dt),
    }
}
