//! Per-settlement building queue, fed by the player and drained by builders

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::city::structure::StructureKind;

/// FIFO of requested structure kinds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildQueue {
    entries: VecDeque<StructureKind>,
}

impl BuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, kind: StructureKind) {
        self.entries.push_back(kind);
    }

    pub fn peek_next(&self) -> Option<StructureKind> {
        self.entries.front().copied()
    }

    pub fn dequeue_next(&mut self) -> Option<StructureKind> {
        self.entries.pop_front()
    }

    /// Remove the oldest entry of `kind`
    pub fn decrement(&mut self, kind: StructureKind) -> bool {
        match self.entries.iter().position(|k| *k == kind) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn pending(&self, kind: StructureKind) -> usize {
        self.entries.iter().filter(|k| **k == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all queued entries; work already started is unaffected
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
