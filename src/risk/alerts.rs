//! Append-only log of escalating protection decisions.

use std::collections::VecDeque;
use std::sync::RwLock;

use super::protector::ProtectionDecision;

/// Time-ordered alert log shared between monitoring tasks.
///
/// Holds at most `capacity` entries; the oldest are dropped first.
#[derive(Debug)]
pub struct AlertLog {
    entries: RwLock<VecDeque<ProtectionDecision>>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Append a decision.
    pub fn append(&self, decision: ProtectionDecision) {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(decision);
    }

    /// The newest `limit` decisions, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<ProtectionDecision> {
        let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Newest decisions for one symbol, oldest first.
    pub fn recent_for(&self, symbol: &str, limit: usize) -> Vec<ProtectionDecision> {
        let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut matching: Vec<ProtectionDecision> = entries
            .iter()
            .rev()
            .filter(|d| d.symbol == symbol)
            .take(limit)
            .cloned()
            .collect();
        matching.reverse();
        matching
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
