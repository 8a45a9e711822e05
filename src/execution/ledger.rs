//! Recording executed batches against their plan.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use super::plan::{AcquisitionPlan, ChildOrderBatch, ExecutedBatch, PlanStatus};
use crate::error::{EngineError, Result};

/// Record a dispatched batch on its plan.
///
/// The batch must belong to the plan's symbol, carry a non-negative size and
/// the plan's next sequence number; anything else is rejected and leaves the
/// plan untouched. Completion is not flagged here,
/// the next split request notices the plan has run out of batches.
pub fn record_execution(plan: &mut AcquisitionPlan, batch: &ChildOrderBatch) -> Result<()> {
    if batch.symbol != plan.symbol {
        return Err(EngineError::SymbolMismatch {
            expected: plan.symbol.clone(),
            received: batch.symbol.clone(),
        });
    }

    if batch.total_size < Decimal::ZERO {
        return Err(EngineError::NegativeSize {
            symbol: plan.symbol.clone(),
            size: batch.total_size,
        });
    }

    if plan.is_finished() {
        return Err(EngineError::PlanExhausted {
            symbol: plan.symbol.clone(),
        });
    }

    if batch.sequence != plan.current_batch_index {
        return Err(EngineError::BatchOutOfSequence {
            symbol: plan.symbol.clone(),
            expected: plan.current_batch_index,
            received: batch.sequence,
        });
    }

    plan.executed_batches.push(ExecutedBatch {
        sequence: batch.sequence,
        size: batch.total_size,
        child_orders: batch.orders.len(),
        executed_at: Utc::now(),
    });
    plan.current_batch_index += 1;
    plan.current_size += batch.total_size;

    if plan.status == PlanStatus::Planning {
        plan.status = PlanStatus::Executing;
    }
    plan.touch();

    info!(
        symbol = %plan.symbol,
        sequence = batch.sequence,
        size = %batch.total_size,
        current_size = %plan.current_size,
        batches_done = plan.current_batch_index,
        batch_count = plan.batch_count,
        "Batch executed"
    );

    Ok(())
}
