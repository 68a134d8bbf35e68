//! Planned-road overlay - cells marked as "intended road, not yet built"
//!
//! Purely advisory: the presentation layer draws it, regrowth skips it, and
//! road construction clears a cell when it promotes it to a road tile.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::Cell;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannedRoadOverlay {
    cells: AHashSet<Cell>,
}

impl PlannedRoadOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, cell: Cell) {
        self.cells.insert(cell);
    }

    pub fn mark_all<'a>(&mut self, cells: impl IntoIterator<Item = &'a Cell>) {
        self.cells.extend(cells.into_iter().copied());
    }

    /// Remove a cell once it has been built; returns whether it was planned
    pub fn clear(&mut self, cell: Cell) -> bool {
        self.cells.remove(&cell)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    pub fn cells(&self) -> &AHashSet<Cell> {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
