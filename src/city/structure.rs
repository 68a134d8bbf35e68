//! Structures - completed buildings owned by a settlement
//!
//! A structure only references its workers by id. The worker list never
//! grows past the structure's capacity and never holds an id twice.

use serde::{Deserialize, Serialize};

use crate::city::stockpile::{Materials, ResourceType};
use crate::core::config::SimulationConfig;
use crate::core::types::{AgentId, SettlementId, StructureId, Vec2};
use crate::spatial::site::TerrainRequirement;

/// Type of structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructureKind {
    House,
    Farm,
    LumberMill,
    Quarry,
    Mine,
    Fishery,
    Market,
}

impl StructureKind {
    pub const ALL: [StructureKind; 7] = [
        StructureKind::House,
        StructureKind::Farm,
        StructureKind::LumberMill,
        StructureKind::Quarry,
        StructureKind::Mine,
        StructureKind::Fishery,
        StructureKind::Market,
    ];

    /// Kinds that employ workers to extract a resource
    pub const PRODUCERS: [StructureKind; 5] = [
        StructureKind::Farm,
        StructureKind::LumberMill,
        StructureKind::Quarry,
        StructureKind::Mine,
        StructureKind::Fishery,
    ];

    /// Materials required to construct this structure
    pub fn cost(&self) -> Materials {
        match self {
            StructureKind::House => vec![(ResourceType::Wood, 20), (ResourceType::Stone, 5)],
            StructureKind::Farm => vec![(ResourceType::Wood, 15)],
            StructureKind::LumberMill => vec![(ResourceType::Wood, 10)],
            StructureKind::Quarry => vec![(ResourceType::Wood, 15)],
            StructureKind::Mine => vec![(ResourceType::Wood, 20), (ResourceType::Stone, 10)],
            StructureKind::Fishery => vec![(ResourceType::Wood, 15)],
            StructureKind::Market => vec![(ResourceType::Wood, 30), (ResourceType::Stone, 20)],
        }
    }

    /// Seconds of builder work on site
    pub fn build_time(&self) -> f32 {
        match self {
            StructureKind::House => 6.0,
            StructureKind::Farm => 8.0,
            StructureKind::LumberMill => 8.0,
            StructureKind::Quarry => 10.0,
            StructureKind::Mine => 12.0,
            StructureKind::Fishery => 8.0,
            StructureKind::Market => 15.0,
        }
    }

    /// Maximum workers that can be assigned
    pub fn worker_capacity(&self) -> usize {
        match self {
            StructureKind::Farm | StructureKind::LumberMill => 3,
            StructureKind::Quarry | StructureKind::Mine | StructureKind::Fishery => 2,
            StructureKind::House | StructureKind::Market => 0,
        }
    }

    /// Resource extracted by workers here
    pub fn produces(&self) -> Option<ResourceType> {
        match self {
            StructureKind::Farm | StructureKind::Fishery => Some(ResourceType::Food),
            StructureKind::LumberMill => Some(ResourceType::Wood),
            StructureKind::Quarry => Some(ResourceType::Stone),
            StructureKind::Mine => Some(ResourceType::Iron),
            StructureKind::House | StructureKind::Market => None,
        }
    }

    /// Seconds of work before a load is ready to carry
    pub fn extraction_time(&self) -> f32 {
        match self {
            StructureKind::Farm => 6.0,
            StructureKind::LumberMill => 5.0,
            StructureKind::Quarry => 7.0,
            StructureKind::Mine => 9.0,
            StructureKind::Fishery => 5.0,
            StructureKind::House | StructureKind::Market => 0.0,
        }
    }

    pub fn requirement(&self, config: &SimulationConfig) -> TerrainRequirement {
        match self {
            StructureKind::Fishery => TerrainRequirement::WaterAdjacent,
            StructureKind::Mine | StructureKind::Quarry => TerrainRequirement::MountainAdjacent,
            StructureKind::LumberMill => TerrainRequirement::ForestDensity {
                min_count: config.min_forest_count,
                radius: config.forest_check_radius,
            },
            _ => TerrainRequirement::None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StructureKind::House => "House",
            StructureKind::Farm => "Farm",
            StructureKind::LumberMill => "Lumber Mill",
            StructureKind::Quarry => "Quarry",
            StructureKind::Mine => "Mine",
            StructureKind::Fishery => "Fishery",
            StructureKind::Market => "Market",
        }
    }

    /// Producer kinds whose output is `resource`
    pub fn producers_of(resource: ResourceType) -> impl Iterator<Item = StructureKind> {
        Self::PRODUCERS
            .into_iter()
            .filter(move |k| k.produces() == Some(resource))
    }
}

/// Per-kind state carried by a structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StructureState {
    Housing { occupants: u32, spawn_countdown: f32 },
    Workplace { deliveries: u32 },
    Market { trader: Option<AgentId> },
}

impl StructureState {
    pub fn initial(kind: StructureKind, config: &SimulationConfig) -> Self {
        match kind {
            StructureKind::House => StructureState::Housing {
                occupants: 0,
                spawn_countdown: config.spawn_interval,
            },
            StructureKind::Market => StructureState::Market { trader: None },
            _ => StructureState::Workplace { deliveries: 0 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub id: StructureId,
    pub kind: StructureKind,
    pub position: Vec2,
    pub settlement: SettlementId,
    pub worker_capacity: usize,
    workers: Vec<AgentId>,
    pub state: StructureState,
}

impl Structure {
    pub fn new(
        id: StructureId,
        kind: StructureKind,
        position: Vec2,
        settlement: SettlementId,
        config: &SimulationConfig,
    ) -> Self {
        Self {
            id,
            kind,
            position,
            settlement,
            worker_capacity: kind.worker_capacity(),
            workers: Vec::new(),
            state: StructureState::initial(kind, config),
        }
    }

    pub fn workers(&self) -> &[AgentId] {
        &self.workers
    }

    pub fn has_worker(&self, agent: AgentId) -> bool {
        self.workers.contains(&agent)
    }

    pub fn has_free_slot(&self) -> bool {
        self.workers.len() < self.worker_capacity
    }

    /// Add a worker; refuses when full or already assigned
    pub fn try_assign(&mut self, agent: AgentId) -> bool {
        if !self.has_free_slot() || self.has_worker(agent) {
            return false;
        }
        self.workers.push(agent);
        true
    }

    pub fn release(&mut self, agent: AgentId) -> bool {
        let before = self.workers.len();
        self.workers.retain(|w| *w != agent);
        self.workers.len() != before
    }

    /// Drop workers failing the predicate, returning how many were dropped
    pub fn retain_workers(&mut self, mut keep: impl FnMut(AgentId) -> bool) -> usize {
        let before = self.workers.len();
        self.workers.retain(|w| keep(*w));
        before - self.workers.len()
    }

    /// Fraction of worker slots filled
    pub fn saturation(&self) -> f32 {
        if self.worker_capacity == 0 {
            0.0
        } else {
            self.workers.len() as f32 / self.worker_capacity as f32
        }
    }
}
