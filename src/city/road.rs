//! Roads - tile paths computed once and realized cell by cell

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, Cell, RoadId, SettlementId, Vec2};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Road {
    pub id: RoadId,
    pub start: Vec2,
    pub end: Vec2,
    pub owner: Option<SettlementId>,
    /// Second settlement for settlement-to-settlement roads
    pub partner: Option<SettlementId>,
    tiles: Vec<Cell>,
    built: usize,
    /// Builder currently laying this road, if any
    pub builder: Option<AgentId>,
    /// Forest cells cleared while building
    pub forest_cleared: u32,
}

impl Road {
    pub fn new(
        id: RoadId,
        start: Vec2,
        end: Vec2,
        owner: Option<SettlementId>,
        partner: Option<SettlementId>,
        tiles: Vec<Cell>,
    ) -> Self {
        Self {
            id,
            start,
            end,
            owner,
            partner,
            tiles,
            built: 0,
            builder: None,
            forest_cleared: 0,
        }
    }

    /// The tile path, fixed at creation
    pub fn tiles(&self) -> &[Cell] {
        &self.tiles
    }

    pub fn built_cells(&self) -> &[Cell] {
        &self.tiles[..self.built]
    }

    pub fn cells_built(&self) -> usize {
        self.built
    }

    /// Next cell to realize, or None when complete
    pub fn next_cell(&self) -> Option<Cell> {
        self.tiles.get(self.built).copied()
    }

    /// Record the next cell as built
    pub fn advance(&mut self) -> Option<Cell> {
        let cell = self.next_cell()?;
        self.built += 1;
        Some(cell)
    }

    /// Progress in [0, 1]
    pub fn completion(&self) -> f32 {
        if self.tiles.is_empty() {
            1.0
        } else {
            self.built as f32 / self.tiles.len() as f32
        }
    }

    pub fn is_usable(&self) -> bool {
        self.completion() >= 1.0
    }

    pub fn is_claimed(&self) -> bool {
        self.builder.is_some()
    }

    pub fn touches(&self, settlement: SettlementId) -> bool {
        self.owner == Some(settlement) || self.partner == Some(settlement)
    }

    /// Either endpoint within `radius` of `pos`
    pub fn has_endpoint_near(&self, pos: Vec2, radius: f32) -> bool {
        let limit = radius * radius;
        self.start.distance_squared(&pos) <= limit || self.end.distance_squared(&pos) <= limit
    }

    /// Length of the realized tile path in cells
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
