//! Stockpile - settlement-level resource storage

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Resources tracked by the economy. Gold is the secondary currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    Wood,
    Stone,
    Food,
    Iron,
    Gold,
}

impl ResourceType {
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Wood,
        ResourceType::Stone,
        ResourceType::Food,
        ResourceType::Iron,
        ResourceType::Gold,
    ];

    /// Gold credited per unit delivered to a settlement
    pub fn gold_value(&self) -> f32 {
        match self {
            ResourceType::Wood => 0.1,
            ResourceType::Stone => 0.2,
            ResourceType::Food => 0.1,
            ResourceType::Iron => 0.5,
            ResourceType::Gold => 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResourceType::Wood => "wood",
            ResourceType::Stone => "stone",
            ResourceType::Food => "food",
            ResourceType::Iron => "iron",
            ResourceType::Gold => "gold",
        }
    }
}

/// A list of (resource, amount) pairs, used for costs and refunds
pub type Materials = Vec<(ResourceType, u32)>;

/// A stockpile holding resources for a settlement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stockpile {
    resources: AHashMap<ResourceType, u32>,
}

impl Stockpile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stockpile from initial amounts
    pub fn with(amounts: &[(ResourceType, u32)]) -> Self {
        let mut stockpile = Self::new();
        for (res, amount) in amounts {
            stockpile.add(*res, *amount);
        }
        stockpile
    }

    /// Get current amount of a resource
    pub fn get(&self, resource: ResourceType) -> u32 {
        self.resources.get(&resource).copied().unwrap_or(0)
    }

    pub fn add(&mut self, resource: ResourceType, amount: u32) {
        *self.resources.entry(resource).or_insert(0) += amount;
    }

    /// Try to remove resources, returns amount actually removed
    pub fn remove(&mut self, resource: ResourceType, amount: u32) -> u32 {
        if let Some(current) = self.resources.get_mut(&resource) {
            let removed = amount.min(*current);
            *current -= removed;
            removed
        } else {
            0
        }
    }

    /// Check if stockpile has enough of all required materials
    pub fn has_materials(&self, requirements: &[(ResourceType, u32)]) -> bool {
        requirements.iter().all(|(res, amount)| self.get(*res) >= *amount)
    }

    /// Consume materials all-or-nothing, returns true if successful
    pub fn consume_materials(&mut self, requirements: &[(ResourceType, u32)]) -> bool {
        if !self.has_materials(requirements) {
            return false;
        }
        for (res, amount) in requirements {
            self.remove(*res, *amount);
        }
        true
    }

    /// Return previously consumed materials
    pub fn refund(&mut self, materials: &[(ResourceType, u32)]) {
        for (res, amount) in materials {
            self.add(*res, *amount);
        }
    }
}
