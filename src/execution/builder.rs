//! Phase-keyed acquisition plan synthesis.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use super::plan::{AcquisitionPlan, FollowStrategy, PlanStatus};
use crate::phase::{MarketPhase, PhaseSignal};
use crate::utils::split_by_weights;

/// Batch layout chosen for a phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTemplate {
    pub strategy: FollowStrategy,
    pub weights: Vec<Decimal>,
    pub intervals: Vec<u64>,
}

impl PlanTemplate {
    /// Template for the given phase. Distribution has no template; callers
    /// never build into it.
    pub fn for_phase(phase: MarketPhase) -> Self {
        match phase {
            MarketPhase::Accumulation => Self {
                strategy: FollowStrategy::Aggressive,
                weights: vec![dec!(0.40), dec!(0.35), dec!(0.25)],
                intervals: vec![300, 600],
            },
            MarketPhase::WashOut => Self {
                strategy: FollowStrategy::Moderate,
                weights: vec![dec!(0.15), dec!(0.18), dec!(0.20), dec!(0.22), dec!(0.25)],
                intervals: vec![600, 900, 1200, 1800],
            },
            // Only half the remainder is planned; the rest waits for a better phase.
            MarketPhase::Markup => Self {
                strategy: FollowStrategy::Conservative,
                weights: vec![dec!(0.30), dec!(0.20)],
                intervals: vec![1800],
            },
            MarketPhase::Distribution | MarketPhase::Unknown => Self {
                strategy: FollowStrategy::Moderate,
                weights: vec![dec!(0.25); 4],
                intervals: vec![900, 1200, 1800],
            },
        }
    }
}

/// Build a plan to grow `current_size` toward `target_size`.
///
/// Returns `None` when the target is already reached or distribution is
/// suspected.
pub fn build_plan(
    symbol: &str,
    target_size: Decimal,
    current_size: Decimal,
    signal: &PhaseSignal,
) -> Option<AcquisitionPlan> {
    let remaining_size = target_size - current_size;

    if remaining_size <= Decimal::ZERO {
        debug!(%symbol, %target_size, %current_size, "Target already reached, no plan");
        return None;
    }

    if signal.phase() == MarketPhase::Distribution {
        info!(
            %symbol,
            confidence = %signal.confidence(),
            "Distribution suspected, refusing to build acquisition plan"
        );
        return None;
    }

    let template = PlanTemplate::for_phase(signal.phase());
    let batch_sizes = split_by_weights(remaining_size, &template.weights);
    let now = Utc::now();

    let plan = AcquisitionPlan {
        symbol: symbol.to_string(),
        total_target_size: target_size,
        current_size,
        remaining_size,
        batch_count: batch_sizes.len(),
        current_batch_index: 0,
        batch_sizes,
        batch_intervals: template.intervals,
        phase: signal.phase(),
        follow_strategy: template.strategy,
        status: PlanStatus::Planning,
        executed_batches: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    info!(
        %symbol,
        phase = %plan.phase,
        strategy = ?plan.follow_strategy,
        batches = plan.batch_count,
        %remaining_size,
        "Acquisition plan created"
    );

    Some(plan)
}
