//! Transient advisory messages for the player
//!
//! Failures that the simulation recovers from on its own (no site, no path,
//! unaffordable work) end up here rather than as errors.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::Tick;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub tick: Tick,
    pub text: String,
}

/// Bounded log of recent messages, oldest dropped first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLog {
    entries: VecDeque<Message>,
    capacity: usize,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Record a message. Text already present in the log is dropped so a
    /// condition that persists across steps is reported once.
    pub fn show(&mut self, tick: Tick, text: impl Into<String>) -> bool {
        let text = text.into();
        if self.entries.iter().any(|m| m.text == text) {
            return false;
        }
        tracing::info!("{}", text);
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Message { tick, text });
        true
    }

    pub fn latest(&self) -> Option<&Message> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> {
        self.entries.iter()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|m| m.text.contains(needle))
    }

    /// Take every message, leaving the log empty
    pub fn drain(&mut self) -> Vec<Message> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeats_are_collapsed() {
        let mut log = MessageLog::new(8);
        assert!(log.show(1, "No water-adjacent site for Fishery"));
        assert!(!log.show(2, "No water-adjacent site for Fishery"));
        assert!(log.show(3, "Not enough wood"));
        assert!(!log.show(4, "No water-adjacent site for Fishery"));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut log = MessageLog::new(2);
        log.show(1, "a");
        log.show(2, "b");
        log.show(3, "c");
        let texts: Vec<_> = log.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);
        assert_eq!(log.drain().len(), 2);
        assert!(log.is_empty());
    }
}
