//! Stealth splitting of plan batches into child orders.
//!
//! A stealth batch is cut into 2-4 pieces. Every piece but the last takes a
//! random 20-40% share of what is left; the last piece takes the exact
//! remainder so the children always sum to the batch size. Random delays
//! separate consecutive children.

use rust_decimal::Decimal;
use tracing::debug;

use super::plan::{AcquisitionPlan, ChildOrder, ChildOrderBatch};
use super::random::RandomSource;
use crate::config::StealthConfig;
use crate::utils::from_basis_points;

/// Cut the plan's next batch into child orders.
///
/// Returns `None` when no batch remains. The plan itself is not modified.
pub fn split_next_batch(
    plan: &AcquisitionPlan,
    stealth: bool,
    config: &StealthConfig,
    rng: &dyn RandomSource,
) -> Option<ChildOrderBatch> {
    let sequence = plan.current_batch_index;
    let total_size = plan.next_batch_size()?;

    let orders = if stealth {
        split_size(total_size, config, rng)
    } else {
        vec![ChildOrder {
            size: total_size,
            delay_after_secs: None,
        }]
    };

    debug!(
        symbol = %plan.symbol,
        sequence,
        %total_size,
        children = orders.len(),
        stealth,
        "Batch prepared"
    );

    Some(ChildOrderBatch {
        symbol: plan.symbol.clone(),
        sequence,
        total_size,
        orders,
        stealth,
        wait_after_secs: plan.batch_intervals.get(sequence).copied(),
    })
}

/// Randomly split `size` into child orders summing exactly to `size`.
pub fn split_size(size: Decimal, config: &StealthConfig, rng: &dyn RandomSource) -> Vec<ChildOrder> {
    let count = rng.range_inclusive(config.min_child_orders, config.max_child_orders) as usize;
    let count = count.max(1);

    let mut orders = Vec::with_capacity(count);
    let mut balance = size;

    for _ in 0..count - 1 {
        let share = from_basis_points(rng.range_inclusive(config.min_slice_bps, config.max_slice_bps));
        let piece = balance * share;
        balance -= piece;

        orders.push(ChildOrder {
            size: piece,
            delay_after_secs: Some(rng.range_inclusive(config.min_delay_secs, config.max_delay_secs)),
        });
    }

    orders.push(ChildOrder {
        size: balance,
        delay_after_secs: None,
    });

    orders
}
