//! Settlements - population counters, needs, stockpile and build queue

use serde::{Deserialize, Serialize};

use crate::city::build_queue::BuildQueue;
use crate::city::stockpile::Stockpile;
use crate::city::structure::StructureKind;
use crate::core::types::{SettlementId, StructureId, Vec2};

/// How badly a settlement needs more housing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum HousingUrgency {
    #[default]
    None,
    Normal,
    High,
    Critical,
}

impl HousingUrgency {
    /// One tier more urgent, saturating at Critical
    pub fn escalate(self) -> Self {
        match self {
            HousingUrgency::None => HousingUrgency::Normal,
            HousingUrgency::Normal => HousingUrgency::High,
            HousingUrgency::High | HousingUrgency::Critical => HousingUrgency::Critical,
        }
    }

    pub fn is_needed(&self) -> bool {
        *self != HousingUrgency::None
    }
}

/// What a road need connects the settlement to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RoadTarget {
    Structure(StructureId),
    Settlement(SettlementId),
    /// Player-planned road between two points
    Planned { from: Vec2, to: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadNeed {
    pub target: RoadTarget,
    pub from: Vec2,
    pub to: Vec2,
    pub priority: f32,
}

/// Needs computed on the last refresh
///
/// `roads` is sorted by descending priority. Order among equal priorities
/// is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementNeeds {
    pub housing: HousingUrgency,
    pub resources: Vec<StructureKind>,
    pub roads: Vec<RoadNeed>,
}

/// A road the player asked for, kept until a road connects its endpoints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedRoad {
    pub from: Vec2,
    pub to: Vec2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub name: String,
    pub position: Vec2,
    pub builders: u32,
    pub workers: u32,
    pub traders: u32,
    pub houses: u32,
    pub capacity: u32,
    /// Population at the previous refresh, for growth detection
    pub last_population: u32,
    pub needs: SettlementNeeds,
    pub stockpile: Stockpile,
    pub build_queue: BuildQueue,
    pub planned_roads: Vec<PlannedRoad>,
}

impl Settlement {
    pub fn new(id: SettlementId, name: impl Into<String>, position: Vec2, base_capacity: u32) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            builders: 0,
            workers: 0,
            traders: 0,
            houses: 0,
            capacity: base_capacity,
            last_population: 0,
            needs: SettlementNeeds::default(),
            stockpile: Stockpile::new(),
            build_queue: BuildQueue::new(),
            planned_roads: Vec::new(),
        }
    }

    /// Builders plus workers
    pub fn population(&self) -> u32 {
        self.builders + self.workers
    }

    pub fn occupancy(&self) -> f32 {
        if self.capacity == 0 {
            1.0
        } else {
            self.population() as f32 / self.capacity as f32
        }
    }

    pub fn is_growing(&self) -> bool {
        self.population() > self.last_population
    }

    /// Highest-priority road need, if any
    pub fn next_road_need(&self) -> Option<&RoadNeed> {
        self.needs.roads.first()
    }
}
