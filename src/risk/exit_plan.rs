//! Liquidation plans keyed by urgency.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::protector::{ProtectionAction, Urgency};
use crate::error::{EngineError, Result};
use crate::utils::split_by_weights;

/// Lifecycle state of an exit plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPlanStatus {
    Planning,
    Executing,
    Completed,
}

/// One slice of an exit plan ready to dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExitBatch {
    pub symbol: String,
    pub sequence: usize,
    pub size: Decimal,
    /// Seconds to wait after this slice before the next one
    pub wait_after_secs: Option<u64>,
}

/// Multi-batch plan for reducing a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitPlan {
    pub symbol: String,
    pub action: ProtectionAction,
    pub urgency: Urgency,
    pub total_reduce_size: Decimal,
    pub batch_count: usize,
    pub batch_sizes: Vec<Decimal>,
    pub batch_intervals: Vec<u64>,
    pub strategy_description: String,
    pub status: ExitPlanStatus,
    pub current_batch_index: usize,
    pub executed_size: Decimal,
    pub created_at: DateTime<Utc>,
}

impl ExitPlan {
    /// Next slice to dispatch, if any remain.
    pub fn next_batch(&self) -> Option<ExitBatch> {
        let sequence = self.current_batch_index;
        self.batch_sizes.get(sequence).map(|&size| ExitBatch {
            symbol: self.symbol.clone(),
            sequence,
            size,
            wait_after_secs: self.batch_intervals.get(sequence).copied(),
        })
    }

    /// Record an executed slice. Same sequencing rule as acquisition plans.
    pub fn mark_executed(&mut self, sequence: usize, size: Decimal) -> Result<()> {
        if size < Decimal::ZERO {
            return Err(EngineError::NegativeSize {
                symbol: self.symbol.clone(),
                size,
            });
        }

        if self.current_batch_index >= self.batch_count {
            return Err(EngineError::PlanExhausted {
                symbol: self.symbol.clone(),
            });
        }

        if sequence != self.current_batch_index {
            return Err(EngineError::BatchOutOfSequence {
                symbol: self.symbol.clone(),
                expected: self.current_batch_index,
                received: sequence,
            });
        }

        self.current_batch_index += 1;
        self.executed_size += size;
        self.status = if self.current_batch_index >= self.batch_count {
            ExitPlanStatus::Completed
        } else {
            ExitPlanStatus::Executing
        };

        Ok(())
    }

    pub fn remaining_size(&self) -> Decimal {
        (self.total_reduce_size - self.executed_size).max(Decimal::ZERO)
    }
}

/// Build an exit plan reducing `current_position` by `reduce_ratio`.
pub fn build_exit_plan(
    symbol: &str,
    current_position: Decimal,
    reduce_ratio: Decimal,
    urgency: Urgency,
) -> ExitPlan {
    let total_reduce_size = current_position * reduce_ratio;

    let (weights, intervals, description): (Vec<Decimal>, Vec<u64>, &str) = match urgency {
        Urgency::Critical => (vec![Decimal::ONE], vec![], "Immediate full exit in a single order"),
        Urgency::High => (
            vec![dec!(0.6), dec!(0.4)],
            vec![300],
            "Fast exit in two batches five minutes apart",
        ),
        Urgency::Medium | Urgency::Low => (
            vec![dec!(0.4), dec!(0.35), dec!(0.25)],
            vec![600, 900],
            "Gradual exit in three batches over 25 minutes",
        ),
    };

    let batch_sizes = split_by_weights(total_reduce_size, &weights);

    info!(
        %symbol,
        urgency = urgency.as_str(),
        %total_reduce_size,
        batches = batch_sizes.len(),
        "Exit plan created"
    );

    ExitPlan {
        symbol: symbol.to_string(),
        action: ProtectionAction::Exit,
        urgency,
        total_reduce_size,
        batch_count: batch_sizes.len(),
        batch_sizes,
        batch_intervals: intervals,
        strategy_description: description.to_string(),
        status: ExitPlanStatus::Planning,
        current_batch_index: 0,
        executed_size: Decimal::ZERO,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_exit_is_single_batch() {
        let plan = build_exit_plan("BTCUSDT", dec!(1000), Decimal::ONE, Urgency::Critical);

        assert_eq!(plan.total_reduce_size, dec!(1000));
        assert_eq!(plan.batch_count, 1);
        assert_eq!(plan.batch_sizes, vec![dec!(1000)]);
        assert!(plan.batch_intervals.is_empty());
        assert_eq!(plan.action, ProtectionAction::Exit);
    }

    #[test]
    fn test_high_urgency_two_batches() {
        let plan = build_exit_plan("BTCUSDT", dec!(1000), dec!(0.5), Urgency::High);

        assert_eq!(plan.total_reduce_size, dec!(500));
        assert_eq!(plan.batch_sizes, vec![dec!(300), dec!(200)]);
        assert_eq!(plan.batch_intervals, vec![300]);
    }

    #[test]
    fn test_medium_urgency_three_batches() {
        let plan = build_exit_plan("ETHUSDT", dec!(200), dec!(0.3), Urgency::Medium);

        assert_eq!(plan.total_reduce_size, dec!(60));
        assert_eq!(plan.batch_sizes, vec![dec!(24), dec!(21), dec!(15)]);
        assert_eq!(plan.batch_intervals, vec![600, 900]);
    }

    #[test]
    fn test_low_urgency_uses_default_layout() {
        let plan = build_exit_plan("ETHUSDT", dec!(100), dec!(0.3), Urgency::Low);
        assert_eq!(plan.batch_count, 3);
    }

    #[test]
    fn test_exit_plan_tracking() {
        let mut plan = build_exit_plan("BTCUSDT", dec!(1000), dec!(0.5), Urgency::High);

        let first = plan.next_batch().unwrap();
        assert_eq!(first.size, dec!(300));
        assert_eq!(first.wait_after_secs, Some(300));
        plan.mark_executed(first.sequence, first.size).unwrap();
        assert_eq!(plan.status, ExitPlanStatus::Executing);

        assert!(matches!(
            plan.mark_executed(first.sequence, first.size),
            Err(EngineError::BatchOutOfSequence { .. })
        ));

        let second = plan.next_batch().unwrap();
        assert_eq!(second.wait_after_secs, None);
        plan.mark_executed(second.sequence, second.size).unwrap();

        assert_eq!(plan.status, ExitPlanStatus::Completed);
        assert_eq!(plan.remaining_size(), Decimal::ZERO);
        assert!(plan.next_batch().is_none());
        assert!(matches!(
            plan.mark_executed(2, dec!(1)),
            Err(EngineError::PlanExhausted { .. })
        ));
    }

    #[test]
    fn test_exit_negative_size_rejected() {
        let mut plan = build_exit_plan("BTCUSDT", dec!(1000), dec!(0.5), Urgency::High);

        assert!(matches!(
            plan.mark_executed(0, dec!(-1)),
            Err(EngineError::NegativeSize { .. })
        ));
        assert_eq!(plan.current_batch_index, 0);
        assert_eq!(plan.executed_size, Decimal::ZERO);
    }
}
