//! In-place plan adjustment on phase transitions.

use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{info, warn};

use super::plan::{AcquisitionPlan, FollowStrategy, PlanStatus};
use crate::phase::{MarketPhase, PhaseSignal};
use crate::utils::scale_secs;

/// Floor for intervals shortened on a wash-out to accumulation transition.
pub const MIN_SPED_UP_INTERVAL_SECS: u64 = 300;

/// What an adjustment did to the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAdjustment {
    /// Signal phase equals the stored phase
    Unchanged,
    /// Distribution appeared, plan halted
    Paused,
    /// Remaining intervals stretched by 1.5x
    SlowedDown,
    /// Remaining intervals shortened to 0.7x
    SpedUp,
    /// Remaining batches cut to 0.6x
    Downsized,
    /// Phase recorded, parameters untouched
    PhaseOnly,
}

/// Apply a new phase signal to a plan.
pub fn adjust_plan(plan: &mut AcquisitionPlan, signal: &PhaseSignal) -> PlanAdjustment {
    let from = plan.phase;
    let to = signal.phase();

    if from == to {
        return PlanAdjustment::Unchanged;
    }

    let start = plan.current_batch_index;
    let adjustment = match (from, to) {
        // A finished plan has nothing left to halt.
        (_, MarketPhase::Distribution) if plan.status != PlanStatus::Completed => {
            plan.status = PlanStatus::Paused;
            PlanAdjustment::Paused
        }
        (MarketPhase::Accumulation, MarketPhase::WashOut) => {
            for interval in plan.batch_intervals.iter_mut().skip(start) {
                *interval = scale_secs(*interval, dec!(1.5));
            }
            plan.follow_strategy = FollowStrategy::Moderate;
            PlanAdjustment::SlowedDown
        }
        (MarketPhase::WashOut, MarketPhase::Accumulation) => {
            for interval in plan.batch_intervals.iter_mut().skip(start) {
                *interval = scale_secs(*interval, dec!(0.7)).max(MIN_SPED_UP_INTERVAL_SECS);
            }
            plan.follow_strategy = FollowStrategy::Aggressive;
            PlanAdjustment::SpedUp
        }
        (_, MarketPhase::Markup) => {
            for size in plan.batch_sizes.iter_mut().skip(start) {
                *size *= dec!(0.6);
            }
            plan.follow_strategy = FollowStrategy::Conservative;
            PlanAdjustment::Downsized
        }
        _ => PlanAdjustment::PhaseOnly,
    };

    plan.phase = to;
    plan.touch();

    if adjustment == PlanAdjustment::Paused {
        warn!(
            symbol = %plan.symbol,
            %from,
            confidence = %signal.confidence(),
            "Distribution detected, acquisition plan paused"
        );
    } else {
        info!(
            symbol = %plan.symbol,
            %from,
            %to,
            ?adjustment,
            "Acquisition plan adjusted"
        );
    }

    adjustment
}
