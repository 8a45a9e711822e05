//! Acquisition plan and child order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::phase::MarketPhase;

/// How closely the plan follows the dominant participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowStrategy {
    Aggressive,
    Moderate,
    Conservative,
}

/// Lifecycle state of an acquisition plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Created, nothing executed yet
    Planning,
    /// At least one batch executed
    Executing,
    /// Halted because distribution was observed
    Paused,
    /// Every batch dispatched
    Completed,
}

/// Record of one executed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedBatch {
    pub sequence: usize,
    pub size: Decimal,
    pub child_orders: usize,
    pub executed_at: DateTime<Utc>,
}

/// Multi-batch plan for building a position in one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionPlan {
    pub symbol: String,
    pub total_target_size: Decimal,
    pub current_size: Decimal,
    /// Size still to acquire when the plan was created
    pub remaining_size: Decimal,
    pub batch_count: usize,
    pub current_batch_index: usize,
    pub batch_sizes: Vec<Decimal>,
    /// Interval `i` is the wait in seconds after batch `i`
    pub batch_intervals: Vec<u64>,
    pub phase: MarketPhase,
    pub follow_strategy: FollowStrategy,
    pub status: PlanStatus,
    pub executed_batches: Vec<ExecutedBatch>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AcquisitionPlan {
    /// Sum of the batches not yet executed.
    pub fn outstanding_size(&self) -> Decimal {
        self.batch_sizes
            .iter()
            .skip(self.current_batch_index)
            .sum()
    }

    /// Fraction of the target already held.
    pub fn progress(&self) -> Decimal {
        if self.total_target_size <= Decimal::ZERO {
            return Decimal::ONE;
        }
        self.current_size / self.total_target_size
    }

    /// Whether every batch has been recorded.
    pub fn is_finished(&self) -> bool {
        self.current_batch_index >= self.batch_count
    }

    /// Size of the next batch, if any remain.
    pub fn next_batch_size(&self) -> Option<Decimal> {
        self.batch_sizes.get(self.current_batch_index).copied()
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One order slice inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildOrder {
    pub size: Decimal,
    /// Seconds to wait before sending the next child order
    pub delay_after_secs: Option<u64>,
}

/// Ready-to-dispatch batch produced by the splitter.
///
/// Not stored anywhere; report completion via `mark_executed` with the same
/// `sequence` to advance the owning plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildOrderBatch {
    pub symbol: String,
    /// Index of the plan batch this was cut from
    pub sequence: usize,
    pub total_size: Decimal,
    pub orders: Vec<ChildOrder>,
    pub stealth: bool,
    /// Seconds to wait after this batch before requesting the next one
    pub wait_after_secs: Option<u64>,
}

impl ChildOrderBatch {
    /// Sum of child order sizes.
    pub fn child_total(&self) -> Decimal {
        self.orders.iter().map(|o| o.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_plan() -> AcquisitionPlan {
        AcquisitionPlan {
            symbol: "BTCUSDT".to_string(),
            total_target_size: dec!(1000),
            current_size: dec!(400),
            remaining_size: dec!(1000),
            batch_count: 3,
            current_batch_index: 1,
            batch_sizes: vec![dec!(400), dec!(350), dec!(250)],
            batch_intervals: vec![300, 600],
            phase: MarketPhase::Accumulation,
            follow_strategy: FollowStrategy::Aggressive,
            status: PlanStatus::Executing,
            executed_batches: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_progress_helpers() {
        let plan = sample_plan();
        assert_eq!(plan.outstanding_size(), dec!(600));
        assert_eq!(plan.progress(), dec!(0.4));
        assert_eq!(plan.next_batch_size(), Some(dec!(350)));
        assert!(!plan.is_finished());
    }

    #[test]
    fn test_finished_plan_has_no_next_batch() {
        let mut plan = sample_plan();
        plan.current_batch_index = 3;
        assert!(plan.is_finished());
        assert_eq!(plan.next_batch_size(), None);
        assert_eq!(plan.outstanding_size(), Decimal::ZERO);
    }
}
